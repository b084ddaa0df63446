use crate::aggregate::Seed;
use crate::command::Payload;
use crate::entity::AggregateId;
use crate::tree::OrderNode;
use crate::value_object::{Breakpoint, ColumnWidth, Direction};
use chrono::{DateTime, Utc};
use cms_macros::payload;
use serde_json::{Map, Value};
use uuid::Uuid;

/// 页面命令；事件沿用同一载荷
#[payload(prefix = "page")]
pub enum PageCommand {
    Create {
        title: String,
        language: String,
        template: String,
        website: Option<i64>,
        description: String,
        keywords: String,
    },
    ChangeSettings {
        title: String,
        language: String,
        template: String,
        website: Option<i64>,
        description: String,
        keywords: String,
        attributes: Map<String, Value>,
    },
    AddElement {
        element_name: String,
        data: Map<String, Value>,
        parent: Option<Uuid>,
    },
    EditElement {
        uuid: Uuid,
        data: Map<String, Value>,
    },
    RemoveElement {
        uuid: Uuid,
    },
    ShiftElement {
        uuid: Uuid,
        direction: Direction,
    },
    DuplicateElement {
        uuid: Uuid,
    },
    EnableElement {
        uuid: Uuid,
    },
    DisableElement {
        uuid: Uuid,
    },
    ResizeColumn {
        uuid: Uuid,
        breakpoint: Breakpoint,
        width: ColumnWidth,
    },
    SaveOrder {
        order: Vec<OrderNode>,
    },
    Submit,
    Publish,
    Unpublish,
    Lock,
    Unlock,
    AddSchedule {
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    },
    RemoveSchedule {
        schedule_uuid: Uuid,
    },
    Rollback {
        previous_version: usize,
    },
    #[payload(event_type = "page.clone")]
    CloneFrom {
        original_uuid: AggregateId,
        original_version: usize,
    },
    Delete,
}

impl Payload for PageCommand {
    fn message(&self) -> String {
        match self {
            Self::Create { title, .. } => format!("Page \"{title}\" created"),
            Self::ChangeSettings { .. } => "Page settings changed".to_string(),
            Self::AddElement { element_name, .. } => format!("Element \"{element_name}\" added"),
            Self::EditElement { .. } => "Element edited".to_string(),
            Self::RemoveElement { .. } => "Element removed".to_string(),
            Self::ShiftElement { direction, .. } => format!("Element shifted {direction}"),
            Self::DuplicateElement { .. } => "Element duplicated".to_string(),
            Self::EnableElement { .. } => "Element enabled".to_string(),
            Self::DisableElement { .. } => "Element disabled".to_string(),
            Self::ResizeColumn { breakpoint, width, .. } => {
                format!("Column resized to {width} at {breakpoint}")
            }
            Self::SaveOrder { .. } => "Element order saved".to_string(),
            Self::Submit => "Page submitted for review".to_string(),
            Self::Publish => "Page published".to_string(),
            Self::Unpublish => "Page unpublished".to_string(),
            Self::Lock => "Page locked".to_string(),
            Self::Unlock => "Page unlocked".to_string(),
            Self::AddSchedule { .. } => "Schedule added".to_string(),
            Self::RemoveSchedule { .. } => "Schedule removed".to_string(),
            Self::Rollback { previous_version } => {
                format!("Page rolled back to version {previous_version}")
            }
            Self::CloneFrom {
                original_uuid,
                original_version,
            } => format!("Page cloned from {original_uuid} at version {original_version}"),
            Self::Delete => "Page deleted".to_string(),
        }
    }

    fn seed(&self) -> Option<Seed> {
        match self {
            Self::Rollback { previous_version } => Some(Seed::Rollback {
                version: *previous_version,
            }),
            Self::CloneFrom {
                original_uuid,
                original_version,
            } => Some(Seed::Clone {
                uuid: *original_uuid,
                version: *original_version,
            }),
            _ => None,
        }
    }
}
