//! 具体聚合
//!
//! 页面与菜单共享树变更算法；角色、文件与用户是平面的设置类聚合。
//!
mod file;
mod menu;
mod page;
mod role;
mod user;

pub use file::{File, FileCommand};
pub use menu::{Menu, MenuCommand};
pub use page::{COPY_MARKER, Page, PageCommand, PageState, ScheduleEntry};
pub use role::{Role, RoleCommand};
pub use user::{UserAggregate, UserCommand};

use crate::command::Payload;
use crate::domain_event::Event;
use crate::error::Rejection;
use crate::tree::{self, TreeNode};
use tracing::error;
use uuid::Uuid;

/// 校验阶段：目标节点必须存在
pub(crate) fn require_node(nodes: &[TreeNode], uuid: Uuid) -> Result<(), Rejection> {
    if tree::contains(nodes, uuid) {
        Ok(())
    } else {
        Err(Rejection::conflict(format!("node {uuid} does not exist")))
    }
}

/// 校验阶段：新节点的 uuid 在整棵树内必须未被占用
pub(crate) fn require_fresh_node(nodes: &[TreeNode], uuid: Uuid) -> Result<(), Rejection> {
    if tree::contains(nodes, uuid) {
        Err(Rejection::conflict(format!("node {uuid} already exists")))
    } else {
        Ok(())
    }
}

/// 校验阶段：复制得到的子树 uuid 不得与现有节点冲突
pub(crate) fn require_fresh_copy(
    nodes: &[TreeNode],
    uuid: Uuid,
    command_uuid: Uuid,
) -> Result<(), Rejection> {
    tree::duplicate_uuids(nodes, uuid, command_uuid)
        .into_iter()
        .try_for_each(|copied| require_fresh_node(nodes, copied))
}

/// 折叠阶段：树变更未命中节点时记录不变式错误，该事件对树不产生影响
pub(crate) fn tree_applied<P: Payload>(applied: bool, event: &Event<P>, node: Uuid) -> bool {
    if !applied {
        error!(
            aggregate_type = %event.aggregate_type,
            aggregate_uuid = %event.aggregate_uuid,
            version = event.version,
            event_type = event.event_type(),
            %node,
            "tree node missing while folding, mutation skipped"
        );
    }
    applied
}

pub(crate) fn require_text(value: &str, field: &str) -> Result<(), Rejection> {
    if value.trim().is_empty() {
        Err(Rejection::bad_request(format!("{field} is required")))
    } else {
        Ok(())
    }
}
