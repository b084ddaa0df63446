use super::EventMetadata;
use crate::aggregate::Aggregate;
use crate::command::{Command, Payload};
use crate::entity::{AggregateId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 领域事件：已被接受的命令，版本为命令的 `on_version + 1`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event<P> {
    pub aggregate_uuid: AggregateId,
    pub aggregate_type: String,
    pub command_uuid: Uuid,
    pub version: usize,
    pub user_id: UserId,
    pub payload: P,
    pub timestamp: DateTime<Utc>,
    pub metadata: EventMetadata,
}

impl<P: Payload> Event<P> {
    pub fn from_command<A>(
        command: &Command<P>,
        timestamp: DateTime<Utc>,
        metadata: EventMetadata,
    ) -> Self
    where
        A: Aggregate<Command = P>,
    {
        Self {
            aggregate_uuid: command.aggregate_uuid,
            aggregate_type: A::TYPE.to_string(),
            command_uuid: command.command_uuid,
            version: command.on_version + 1,
            user_id: command.user_id,
            payload: command.payload.clone(),
            timestamp,
            metadata,
        }
    }

    pub fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }
}
