//! CMS 领域层（cms-domain）
//!
//! 以事件溯源方式承载页面、菜单、角色、文件与用户五类聚合：
//! - 聚合（`aggregate`）与实体（`entity`）：簿记字段、折叠（fold）与校验协议
//! - 命令（`command`）与领域事件（`domain_event`）：命令 1:1 派生事件
//! - 具体聚合（`aggregates`）：Page / Menu / Role / File / UserAggregate
//! - 树变更算法（`tree`）：页面元素与菜单项共用的增删移复排序
//! - 持久化（`persist`）：事件日志、暂存事件、快照协议与内存实现，以及聚合工厂
//! - 事件上抬（`event_upcaster`）：读取路径上兼容旧事件载荷
//!
//! 存储与传输技术不在本 crate 范围内，仅定义协议并提供内存实现，
//! 命令总线位于 `cms-application`。
//!
pub mod aggregate;
pub mod aggregates;
pub mod command;
pub mod domain_event;
pub mod entity;
pub mod error;
pub mod event_upcaster;
pub mod persist;
pub mod tree;
pub mod value_object;

// 允许在本 crate 内部通过 ::cms_domain 进行自引用，
// 以便过程宏展开后的路径在本 crate 内也能解析。
extern crate self as cms_domain;
