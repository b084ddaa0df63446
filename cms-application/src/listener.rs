//! 事件监听器
//!
//! 命令总线在事件进入已提交流后通知匹配的监听器（读模型投影、通知等）。
//!
use async_trait::async_trait;
use cms_domain::persist::SerializedEvent;

#[derive(Clone, Debug)]
pub enum HandledEventType {
    One(String),
    Many(Vec<String>),
    All,
}

impl HandledEventType {
    pub fn matches(&self, event_type: &str) -> bool {
        match self {
            HandledEventType::One(t) => t == event_type,
            HandledEventType::Many(ts) => ts.iter().any(|t| t == event_type),
            HandledEventType::All => true,
        }
    }
}

#[async_trait]
pub trait EventListener: Send + Sync {
    /// 监听器名称（用于日志与错误）
    fn listener_name(&self) -> &str;
    /// 订阅的事件类型
    fn handled_event_type(&self) -> HandledEventType;
    async fn handle(&self, event: &SerializedEvent) -> anyhow::Result<()>;
}
