//! 事件上抬（Event Upcasting）
//!
//! 读取路径上把旧结构的事件转换成当前载荷能反序列化的形式。每个事件反复交给
//! 第一个适用的上抬器，直到没有上抬器适用为止；转换可以拆分或丢弃事件。
//!
//! 内置的 [`TagBarePayload`] 处理结构版本 0 的页面、菜单等事件：
//! 当时载荷只保存字段，变体由事件类型隐含。
//!
use crate::{
    command::Payload,
    error::{DomainError, DomainResult as Result},
    persist::SerializedEvent,
};
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::sync::Arc;

/// 单个事件最多经历的上抬次数，超过视为上抬器之间形成了循环
const MAX_STEPS: usize = 16;

/// 事件版本升级器
pub trait EventUpcaster: Send + Sync {
    fn applies(&self, event_type: &str, event_version: usize) -> bool;

    fn upcast(&self, event: SerializedEvent) -> Result<EventUpcasterResult>;
}

/// 升级结果：单个、拆分成多个、或丢弃
#[allow(clippy::large_enum_variant)]
pub enum EventUpcasterResult {
    One(SerializedEvent),
    Many(Vec<SerializedEvent>),
    Drop,
}

#[derive(Default, Clone)]
pub struct EventUpcasterChain {
    stages: Vec<Arc<dyn EventUpcaster>>,
}

impl EventUpcasterChain {
    pub fn with(mut self, stage: impl EventUpcaster + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// 保持事件顺序地升级一批事件；拆分出的事件占据原事件的位置
    pub fn upcast_all(&self, events: Vec<SerializedEvent>) -> Result<Vec<SerializedEvent>> {
        if self.stages.is_empty() {
            return Ok(events);
        }

        let mut settled = Vec::with_capacity(events.len());
        for event in events {
            self.settle(event, &mut settled)?;
        }
        Ok(settled)
    }

    fn settle(&self, event: SerializedEvent, settled: &mut Vec<SerializedEvent>) -> Result<()> {
        let mut pending = vec![(event, 0)];

        while let Some((event, steps)) = pending.pop() {
            let Some(stage) = self
                .stages
                .iter()
                .find(|stage| stage.applies(event.event_type(), event.event_version()))
            else {
                settled.push(event);
                continue;
            };

            if steps == MAX_STEPS {
                return Err(DomainError::UpcastFailed {
                    event_type: event.event_type().to_string(),
                    from_version: event.event_version(),
                    reason: format!("upcasters did not settle after {MAX_STEPS} steps"),
                });
            }

            match stage.upcast(event)? {
                EventUpcasterResult::One(next) => pending.push((next, steps + 1)),
                EventUpcasterResult::Many(split) => {
                    pending.extend(split.into_iter().rev().map(|next| (next, steps + 1)));
                }
                EventUpcasterResult::Drop => {}
            }
        }
        Ok(())
    }
}

/// 结构版本 0 的载荷只有字段，按事件类型补上变体标签并升到 `P::SCHEMA_VERSION`
///
/// 无字段的变体在版本 0 中存为 `null`，升级后为变体名字符串。
pub struct TagBarePayload<P> {
    _payload: PhantomData<fn() -> P>,
}

impl<P> TagBarePayload<P> {
    pub fn new() -> Self {
        Self {
            _payload: PhantomData,
        }
    }
}

impl<P> Default for TagBarePayload<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Payload> EventUpcaster for TagBarePayload<P> {
    fn applies(&self, event_type: &str, event_version: usize) -> bool {
        event_version == 0 && P::variant_of(event_type).is_some()
    }

    fn upcast(&self, event: SerializedEvent) -> Result<EventUpcasterResult> {
        let Some(variant) = P::variant_of(event.event_type()) else {
            return Ok(EventUpcasterResult::One(event));
        };

        let payload = match event.payload() {
            Value::Null => Value::String(variant.to_string()),
            Value::Object(fields) => {
                let mut tagged = Map::new();
                tagged.insert(variant.to_string(), Value::Object(fields.clone()));
                Value::Object(tagged)
            }
            other => {
                return Err(DomainError::UpcastFailed {
                    event_type: event.event_type().to_string(),
                    from_version: event.event_version(),
                    reason: format!("expected bare fields, found {other}"),
                });
            }
        };

        let event_type = event.event_type().to_string();
        Ok(EventUpcasterResult::One(event.upcasted(
            event_type,
            P::SCHEMA_VERSION,
            payload,
        )))
    }
}
