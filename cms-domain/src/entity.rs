//! 实体（Entity）基础抽象
//!
//! 聚合的标识与簿记字段统一收纳在 `AggregateMeta` 中，
//! 由 `#[aggregate]` 宏注入并实现本 trait。
//!
use crate::aggregate::{AggregateMeta, HistoryEntry};
use uuid::Uuid;

/// 聚合标识
pub type AggregateId = Uuid;

/// 触发命令的用户标识
pub type UserId = i64;

/// 具备标识、版本与历史的实体抽象
pub trait Entity: Send + Sync {
    /// 使用给定标识创建零值聚合（版本 0）
    fn new(uuid: AggregateId) -> Self;

    fn meta(&self) -> &AggregateMeta;

    fn meta_mut(&mut self) -> &mut AggregateMeta;

    fn uuid(&self) -> AggregateId {
        self.meta().uuid
    }

    /// 当前实例所代表的版本（含暂存事件）
    fn version(&self) -> usize {
        self.meta().version
    }

    /// 已提交事件流的最高版本
    fn stream_version(&self) -> usize {
        self.meta().stream_version
    }

    fn history(&self) -> &[HistoryEntry] {
        &self.meta().history
    }

    /// 首条命令被接受后聚合即存在
    fn exists(&self) -> bool {
        self.version() > 0
    }
}
