//! 页面聚合
//!
//! 页面由设置字段、元素树与发布状态机组成。任何元素变更都会把状态置为 `Draft`；
//! 删除是终态，之后的命令一律拒绝。
//!
mod command;
mod state;

pub use command::PageCommand;
pub use state::{PageState, ScheduleEntry};

use super::{require_fresh_copy, require_fresh_node, require_node, require_text, tree_applied};
use crate::aggregate::Aggregate;
use crate::command::Command;
use crate::domain_event::Event;
use crate::entity::Entity;
use crate::error::Rejection;
use crate::tree::{self, TreeNode};
use crate::value_object::ValueObject;
use cms_macros::aggregate;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// 克隆得到的页面标题后缀
pub const COPY_MARKER: &str = " (copy)";

#[aggregate]
pub struct Page {
    pub title: String,
    pub language: String,
    pub template: String,
    pub website: Option<i64>,
    pub description: String,
    pub keywords: String,
    pub attributes: Map<String, Value>,
    pub elements: Vec<TreeNode>,
    pub published: bool,
    pub locked: bool,
    pub deleted: bool,
    pub state: PageState,
    pub schedule: BTreeMap<Uuid, ScheduleEntry>,
}

impl Page {
    fn require_exists(&self) -> Result<(), Rejection> {
        if self.exists() {
            Ok(())
        } else {
            Err(Rejection::bad_request("You must choose an existing page"))
        }
    }

    fn require_unlocked(&self) -> Result<(), Rejection> {
        if self.locked {
            Err(Rejection::conflict("page is locked"))
        } else {
            Ok(())
        }
    }

    fn has_future_start(&self, event: &Event<PageCommand>) -> bool {
        self.schedule
            .values()
            .any(|entry| entry.starts_after(event.timestamp))
    }

    /// 元素树变更成功后进入草稿
    fn touched(&mut self, applied: bool) {
        if applied {
            self.state = PageState::Draft;
        }
    }
}

impl Aggregate for Page {
    const TYPE: &'static str = "page";
    type Command = PageCommand;

    fn validate(&self, command: &Command<Self::Command>) -> Result<(), Rejection> {
        use PageCommand::*;

        if self.deleted {
            return Err(Rejection::bad_request("page has been deleted"));
        }

        match &command.payload {
            Create { title, language, .. } => {
                if self.exists() {
                    return Err(Rejection::conflict("page already exists"));
                }
                require_text(title, "title")?;
                require_text(language, "language")
            }
            ChangeSettings {
                title, language, ..
            } => {
                self.require_exists()?;
                self.require_unlocked()?;
                require_text(title, "title")?;
                require_text(language, "language")
            }
            AddElement {
                element_name,
                parent,
                ..
            } => {
                self.require_unlocked()?;
                require_text(element_name, "element name")?;
                require_fresh_node(&self.elements, command.command_uuid)?;
                match parent {
                    Some(parent) => require_node(&self.elements, *parent),
                    None => Ok(()),
                }
            }
            DuplicateElement { uuid } => {
                self.require_unlocked()?;
                require_node(&self.elements, *uuid)?;
                require_fresh_copy(&self.elements, *uuid, command.command_uuid)
            }
            EditElement { uuid, .. }
            | RemoveElement { uuid }
            | ShiftElement { uuid, .. }
            | EnableElement { uuid }
            | DisableElement { uuid } => {
                self.require_unlocked()?;
                require_node(&self.elements, *uuid)
            }
            ResizeColumn { uuid, width, .. } => {
                self.require_unlocked()?;
                width.validate()?;
                require_node(&self.elements, *uuid)
            }
            SaveOrder { .. } => {
                self.require_exists()?;
                self.require_unlocked()
            }
            Submit | Unpublish | Delete => self.require_exists(),
            Publish => {
                if self.version() <= 1 {
                    return Err(Rejection::bad_request("You must choose an existing page"));
                }
                Ok(())
            }
            Lock => {
                self.require_exists()?;
                if self.locked {
                    return Err(Rejection::conflict("page is already locked"));
                }
                Ok(())
            }
            Unlock => {
                self.require_exists()?;
                if !self.locked {
                    return Err(Rejection::conflict("page is not locked"));
                }
                Ok(())
            }
            AddSchedule {
                start_date,
                end_date,
            } => {
                self.require_exists()?;
                if self.schedule.contains_key(&command.command_uuid) {
                    return Err(Rejection::conflict(format!(
                        "schedule {} already exists",
                        command.command_uuid
                    )));
                }
                match (start_date, end_date) {
                    (None, None) => Err(Rejection::bad_request(
                        "a schedule needs a start date or an end date",
                    )),
                    (Some(start), Some(end)) if start >= end => Err(Rejection::bad_request(
                        "schedule start date must be before its end date",
                    )),
                    _ => Ok(()),
                }
            }
            RemoveSchedule { schedule_uuid } => {
                self.require_exists()?;
                if !self.schedule.contains_key(schedule_uuid) {
                    return Err(Rejection::conflict(format!(
                        "schedule {schedule_uuid} does not exist"
                    )));
                }
                Ok(())
            }
            Rollback { previous_version } => {
                self.require_exists()?;
                if *previous_version < 1 || *previous_version >= self.version() {
                    return Err(Rejection::bad_request(format!(
                        "cannot roll back to version {previous_version} from version {}",
                        self.version()
                    )));
                }
                Ok(())
            }
            CloneFrom {
                original_uuid,
                original_version,
            } => {
                if self.exists() {
                    return Err(Rejection::conflict("clone target already exists"));
                }
                if *original_uuid == self.uuid() {
                    return Err(Rejection::bad_request("a page cannot be cloned into itself"));
                }
                if *original_version < 1 {
                    return Err(Rejection::bad_request("original version must be at least 1"));
                }
                Ok(())
            }
        }
    }

    fn execute(&mut self, event: &Event<Self::Command>) {
        use PageCommand::*;

        match &event.payload {
            Create {
                title,
                language,
                template,
                website,
                description,
                keywords,
            } => {
                self.title = title.clone();
                self.language = language.clone();
                self.template = template.clone();
                self.website = *website;
                self.description = description.clone();
                self.keywords = keywords.clone();
            }
            ChangeSettings {
                title,
                language,
                template,
                website,
                description,
                keywords,
                attributes,
            } => {
                self.title = title.clone();
                self.language = language.clone();
                self.template = template.clone();
                self.website = *website;
                self.description = description.clone();
                self.keywords = keywords.clone();
                self.attributes = attributes.clone();
            }
            AddElement {
                element_name,
                data,
                parent,
            } => {
                let node = TreeNode::new(event.command_uuid, element_name.clone(), data.clone());
                let applied = tree::add(&mut self.elements, *parent, node);
                let applied =
                    tree_applied(applied, event, parent.unwrap_or(event.command_uuid));
                self.touched(applied);
            }
            EditElement { uuid, data } => {
                let applied = tree::edit(&mut self.elements, *uuid, data.clone());
                self.touched(tree_applied(applied, event, *uuid));
            }
            RemoveElement { uuid } => {
                let applied = tree::remove(&mut self.elements, *uuid).is_some();
                self.touched(tree_applied(applied, event, *uuid));
            }
            ShiftElement { uuid, direction } => {
                let applied = tree::shift(&mut self.elements, *uuid, *direction);
                self.touched(tree_applied(applied, event, *uuid));
            }
            DuplicateElement { uuid } => {
                let applied = tree::duplicate(&mut self.elements, *uuid, event.command_uuid).is_some();
                self.touched(tree_applied(applied, event, *uuid));
            }
            EnableElement { uuid } => {
                let applied = tree::set_enabled(&mut self.elements, *uuid, true);
                self.touched(tree_applied(applied, event, *uuid));
            }
            DisableElement { uuid } => {
                let applied = tree::set_enabled(&mut self.elements, *uuid, false);
                self.touched(tree_applied(applied, event, *uuid));
            }
            ResizeColumn {
                uuid,
                breakpoint,
                width,
            } => {
                let applied = tree::resize(&mut self.elements, *uuid, *breakpoint, *width);
                self.touched(tree_applied(applied, event, *uuid));
            }
            SaveOrder { order } => {
                tree::save_order(&mut self.elements, order);
                self.touched(true);
            }
            Submit => self.state = PageState::Staged,
            Publish => {
                self.published = true;
                self.state = PageState::Published;
            }
            Unpublish => {
                self.published = false;
                self.state = if self.has_future_start(event) {
                    PageState::Scheduled
                } else {
                    PageState::Unpublished
                };
            }
            Lock => self.locked = true,
            Unlock => self.locked = false,
            AddSchedule {
                start_date,
                end_date,
            } => {
                self.schedule.insert(
                    event.command_uuid,
                    ScheduleEntry {
                        start_date: *start_date,
                        end_date: *end_date,
                    },
                );
                match (start_date, end_date, self.state) {
                    (Some(_), _, PageState::Unpublished | PageState::Staged) => {
                        self.state = PageState::Scheduled;
                    }
                    (None, Some(_), PageState::Published) => {
                        self.state = PageState::ScheduledUnpublish;
                    }
                    _ => {}
                }
            }
            RemoveSchedule { schedule_uuid } => {
                self.schedule.remove(schedule_uuid);
                if self.schedule.is_empty() {
                    self.state = if self.published {
                        PageState::Published
                    } else {
                        PageState::Unpublished
                    };
                }
            }
            // 领域字段已由播种替换
            Rollback { .. } => {}
            CloneFrom { .. } => {
                self.title.push_str(COPY_MARKER);
                self.published = false;
                self.locked = false;
                self.deleted = false;
                self.schedule.clear();
                self.state = PageState::Unpublished;
            }
            Delete => {
                self.deleted = true;
                self.published = false;
                self.state = PageState::Deleted;
            }
        }
    }
}
