//! 命令（Command）
//!
//! 命令携带发起用户、命令标识、目标聚合、乐观并发版本与载荷；
//! 每个被接受的命令 1:1 派生一个领域事件，事件沿用命令的载荷类型。
//!
use crate::aggregate::Seed;
use crate::entity::{AggregateId, UserId};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;
use uuid::Uuid;

/// 稳定的事件类型名，通常由 `#[payload]` 宏生成
pub trait EventKind {
    fn event_type(&self) -> &'static str;

    /// 事件类型对应的枚举变体名，未知类型返回 `None`
    fn variant_of(event_type: &str) -> Option<&'static str>
    where
        Self: Sized;
}

/// 命令/事件载荷
pub trait Payload:
    EventKind + Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// 载荷结构版本，结构变化时递增并注册上抬器
    const SCHEMA_VERSION: usize = 1;

    /// 写入审计历史的人类可读描述
    fn message(&self) -> String;

    /// 需要播种（回滚/克隆）的载荷返回来源
    fn seed(&self) -> Option<Seed> {
        None
    }
}

/// 命令
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command<P> {
    pub user_id: UserId,
    pub command_uuid: Uuid,
    pub aggregate_uuid: AggregateId,
    /// 发起方认为聚合当前所处的版本
    pub on_version: usize,
    pub payload: P,
}

impl<P: Payload> Command<P> {
    pub fn new(user_id: UserId, aggregate_uuid: AggregateId, on_version: usize, payload: P) -> Self {
        Self {
            user_id,
            command_uuid: Uuid::new_v4(),
            aggregate_uuid,
            on_version,
            payload,
        }
    }

    pub fn with_command_uuid(mut self, command_uuid: Uuid) -> Self {
        self.command_uuid = command_uuid;
        self
    }

    pub fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }
}
