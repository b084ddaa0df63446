//! 事件日志与暂存事件协议
//!
use crate::{
    entity::{AggregateId, UserId},
    error::DomainResult as Result,
    persist::SerializedEvent,
};
use async_trait::async_trait;
use std::sync::Arc;

/// 有序、只追加的事件日志
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// 原子追加同一聚合的一批事件：版本必须从当前流头 + 1 开始连续，
    /// 否则整批拒绝并返回 `VersionConflict`
    async fn append(&self, events: &[SerializedEvent]) -> Result<()>;

    /// 版本位于 `(after, up_to]` 的事件，升序
    async fn find_events(
        &self,
        aggregate_uuid: AggregateId,
        after: usize,
        up_to: Option<usize>,
    ) -> Result<Vec<SerializedEvent>>;

    /// 当前流头版本，空流为 0
    async fn stream_version(&self, aggregate_uuid: AggregateId) -> Result<usize>;
}

/// 按 (聚合, 用户) 划分的暂存事件队列
#[async_trait]
pub trait QueuedEventRepository: Send + Sync {
    async fn enqueue(&self, event: &SerializedEvent) -> Result<()>;

    async fn find_queued(
        &self,
        aggregate_uuid: AggregateId,
        user_id: UserId,
    ) -> Result<Vec<SerializedEvent>>;

    /// 丢弃整条暂存链，返回丢弃的条数
    async fn discard_queued(&self, aggregate_uuid: AggregateId, user_id: UserId) -> Result<usize>;
}

#[async_trait]
impl<T> EventRepository for Arc<T>
where
    T: EventRepository + ?Sized,
{
    async fn append(&self, events: &[SerializedEvent]) -> Result<()> {
        (**self).append(events).await
    }

    async fn find_events(
        &self,
        aggregate_uuid: AggregateId,
        after: usize,
        up_to: Option<usize>,
    ) -> Result<Vec<SerializedEvent>> {
        (**self).find_events(aggregate_uuid, after, up_to).await
    }

    async fn stream_version(&self, aggregate_uuid: AggregateId) -> Result<usize> {
        (**self).stream_version(aggregate_uuid).await
    }
}

#[async_trait]
impl<T> QueuedEventRepository for Arc<T>
where
    T: QueuedEventRepository + ?Sized,
{
    async fn enqueue(&self, event: &SerializedEvent) -> Result<()> {
        (**self).enqueue(event).await
    }

    async fn find_queued(
        &self,
        aggregate_uuid: AggregateId,
        user_id: UserId,
    ) -> Result<Vec<SerializedEvent>> {
        (**self).find_queued(aggregate_uuid, user_id).await
    }

    async fn discard_queued(&self, aggregate_uuid: AggregateId, user_id: UserId) -> Result<usize> {
        (**self).discard_queued(aggregate_uuid, user_id).await
    }
}
