//! CMS 应用层（cms-application）
//!
//! 命令总线：构建聚合 → 乐观并发检查 → 校验 → 派生事件 → 追加（或暂存）→ 折叠 → 通知监听器。
//!
pub mod command_bus;
pub mod config;
pub mod context;
pub mod error;
pub mod listener;

pub use command_bus::{CommandBus, Dispatched, EventSourcedCommandBus};
pub use config::CommandBusConfig;
pub use context::AppContext;
pub use error::{AppError, AppResult};
pub use listener::{EventListener, HandledEventType};
