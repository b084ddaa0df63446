//! 快照仓储协议与策略
//!
//! 快照只是某一版本的物化缓存，从不作为事实来源。
//!
use crate::{
    aggregate::Aggregate, entity::AggregateId, error::DomainResult as Result,
    persist::SerializedSnapshot,
};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// 取版本不超过 `max_version` 的最新快照；`None` 表示不限
    async fn get_snapshot<A: Aggregate>(
        &self,
        aggregate_uuid: AggregateId,
        max_version: Option<usize>,
    ) -> Result<Option<SerializedSnapshot>>;

    async fn save<A: Aggregate>(&self, aggregate: &A) -> Result<()>;
}

#[async_trait]
impl<T> SnapshotRepository for Arc<T>
where
    T: SnapshotRepository + ?Sized,
{
    async fn get_snapshot<A: Aggregate>(
        &self,
        aggregate_uuid: AggregateId,
        max_version: Option<usize>,
    ) -> Result<Option<SerializedSnapshot>> {
        (**self).get_snapshot::<A>(aggregate_uuid, max_version).await
    }

    async fn save<A: Aggregate>(&self, aggregate: &A) -> Result<()> {
        (**self).save::<A>(aggregate).await
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SnapshotPolicy {
    #[default]
    Never,
    Every(usize),
}

impl SnapshotPolicy {
    pub fn should_snapshot(&self, version: usize) -> bool {
        match self {
            SnapshotPolicy::Never => false,
            SnapshotPolicy::Every(interval) => {
                let interval = (*interval).max(1);
                version > 0 && version % interval == 0
            }
        }
    }
}
