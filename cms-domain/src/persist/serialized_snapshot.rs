use crate::{
    aggregate::Aggregate,
    entity::AggregateId,
    error::{DomainError, DomainResult as Result},
};
use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct SerializedSnapshot {
    aggregate_uuid: AggregateId,
    #[builder(into)]
    aggregate_type: String,
    version: usize,
    payload: Value,
}

impl SerializedSnapshot {
    pub fn aggregate_uuid(&self) -> AggregateId {
        self.aggregate_uuid
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn version(&self) -> usize {
        self.version
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// 将快照反序列化为聚合实例
    pub fn to_aggregate<A>(&self) -> Result<A>
    where
        A: Aggregate,
    {
        if A::TYPE != self.aggregate_type {
            return Err(DomainError::TypeMismatch {
                expected: A::TYPE.to_string(),
                found: self.aggregate_type.clone(),
            });
        }

        let aggregate = serde_json::from_value(self.payload.clone())?;
        Ok(aggregate)
    }

    /// 从聚合实例创建快照
    pub fn from_aggregate<A>(aggregate: &A) -> Result<Self>
    where
        A: Aggregate,
    {
        Ok(Self {
            aggregate_uuid: aggregate.uuid(),
            aggregate_type: A::TYPE.to_string(),
            version: aggregate.version(),
            payload: serde_json::to_value(aggregate)?,
        })
    }
}
