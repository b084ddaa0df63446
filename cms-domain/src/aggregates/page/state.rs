use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 页面发布状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageState {
    Draft,
    Staged,
    Scheduled,
    ScheduledUnpublish,
    Published,
    #[default]
    Unpublished,
    Deleted,
}

impl PageState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Staged => "staged",
            Self::Scheduled => "scheduled",
            Self::ScheduledUnpublish => "scheduled_unpublish",
            Self::Published => "published",
            Self::Unpublished => "unpublished",
            Self::Deleted => "deleted",
        }
    }
}

/// 定时发布条目，起止时间至少有一个
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl ScheduleEntry {
    pub fn starts_after(&self, instant: DateTime<Utc>) -> bool {
        self.start_date.is_some_and(|start| start > instant)
    }
}
