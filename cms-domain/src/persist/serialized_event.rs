//! 事件持久化模型（SerializedEvent）
//!
//! 定义事件在持久化层的标准形态与在 `Event<P>` 间的转换，
//! 并提供批量序列化/反序列化与上抬组合的工具函数。
//!
use crate::{
    aggregate::Aggregate,
    command::Payload,
    domain_event::{Event, EventMetadata},
    entity::{AggregateId, UserId},
    error::{DomainError, DomainResult},
    event_upcaster::EventUpcasterChain,
};
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct SerializedEvent {
    /// 派生该事件的命令标识
    command_uuid: Uuid,
    /// 事件类型，用于区分不同的事件
    #[builder(into)]
    event_type: String,
    /// 载荷结构版本，用于事件上抬
    event_version: usize,
    aggregate_uuid: AggregateId,
    #[builder(into)]
    aggregate_type: String,
    /// 聚合流内的版本，从 1 开始连续
    version: usize,
    user_id: UserId,
    occurred_at: DateTime<Utc>,
    payload: Value,
    metadata: Value,
}

impl SerializedEvent {
    pub fn command_uuid(&self) -> Uuid {
        self.command_uuid
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_version(&self) -> usize {
        self.event_version
    }

    pub fn aggregate_uuid(&self) -> AggregateId {
        self.aggregate_uuid
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn version(&self) -> usize {
        self.version
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn metadata(&self) -> &Value {
        &self.metadata
    }

    /// 上抬器使用：保留流位置与审计信息，替换类型、结构版本与载荷
    pub fn upcasted(self, event_type: impl Into<String>, event_version: usize, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            event_version,
            payload,
            ..self
        }
    }
}

impl<P> TryFrom<&Event<P>> for SerializedEvent
where
    P: Payload,
{
    type Error = serde_json::Error;

    fn try_from(event: &Event<P>) -> Result<Self, Self::Error> {
        Ok(SerializedEvent {
            command_uuid: event.command_uuid,
            event_type: event.payload.event_type().to_string(),
            event_version: P::SCHEMA_VERSION,
            aggregate_uuid: event.aggregate_uuid,
            aggregate_type: event.aggregate_type.clone(),
            version: event.version,
            user_id: event.user_id,
            occurred_at: event.timestamp,
            payload: serde_json::to_value(&event.payload)?,
            metadata: serde_json::to_value(&event.metadata)?,
        })
    }
}

impl<P> TryFrom<&SerializedEvent> for Event<P>
where
    P: Payload,
{
    type Error = serde_json::Error;

    fn try_from(value: &SerializedEvent) -> Result<Self, Self::Error> {
        let payload: P = serde_json::from_value(value.payload.clone())?;

        let metadata: EventMetadata = if value.metadata.is_null() {
            EventMetadata::default()
        } else {
            serde_json::from_value(value.metadata.clone())?
        };

        Ok(Event {
            aggregate_uuid: value.aggregate_uuid,
            aggregate_type: value.aggregate_type.clone(),
            command_uuid: value.command_uuid,
            version: value.version,
            user_id: value.user_id,
            payload,
            timestamp: value.occurred_at,
            metadata,
        })
    }
}

pub fn serialize_events<P>(events: &[Event<P>]) -> DomainResult<Vec<SerializedEvent>>
where
    P: Payload,
{
    let events = events
        .iter()
        .map(SerializedEvent::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

/// 先经上抬链，再按聚合类型反序列化
pub fn deserialize_events<A>(
    upcaster_chain: &EventUpcasterChain,
    events: Vec<SerializedEvent>,
) -> DomainResult<Vec<Event<A::Command>>>
where
    A: Aggregate,
{
    let events = upcaster_chain.upcast_all(events)?;

    events
        .iter()
        .map(|event| {
            if event.aggregate_type != A::TYPE {
                return Err(DomainError::TypeMismatch {
                    expected: A::TYPE.to_string(),
                    found: event.aggregate_type.clone(),
                });
            }
            Event::try_from(event).map_err(DomainError::from)
        })
        .collect()
}
