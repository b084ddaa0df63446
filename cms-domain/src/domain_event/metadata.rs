use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 事件元数据（可序列化、可扩展）
#[derive(Debug, Clone, Default, PartialEq, Builder, Serialize, Deserialize)]
pub struct EventMetadata {
    #[builder(into)]
    correlation_id: Option<String>,
    #[builder(into)]
    causation_id: Option<String>,
    #[builder(into)]
    ip_address: Option<String>,
    extensions: Option<Value>,
}

impl EventMetadata {
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn causation_id(&self) -> Option<&str> {
        self.causation_id.as_deref()
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    pub fn extensions(&self) -> Option<&Value> {
        self.extensions.as_ref()
    }
}
