//! 聚合（Aggregate）抽象
//!
//! 约束一个聚合的核心行为：
//! - `validate` 依据当前状态校验命令（不改变状态）；
//! - `execute` 将事件折叠进领域字段（改变状态，必须是确定性的纯函数）；
//! - `apply` 在 `execute` 外层处理播种（回滚/克隆）与簿记（版本、时间、历史）。
//!
use crate::command::{Command, Payload};
use crate::domain_event::Event;
use crate::entity::{AggregateId, Entity, UserId};
use crate::error::Rejection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::fmt;

/// 聚合簿记字段
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateMeta {
    pub uuid: AggregateId,
    /// 当前实例所代表的版本，可能落后于 `stream_version`
    pub version: usize,
    pub stream_version: usize,
    pub snapshot_version: Option<usize>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub history: Vec<HistoryEntry>,
}

impl AggregateMeta {
    pub fn new(uuid: AggregateId) -> Self {
        Self {
            uuid,
            ..Default::default()
        }
    }
}

/// 审计历史条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub version: usize,
    pub message: String,
    pub payload: Value,
    pub user: UserId,
    pub timestamp: DateTime<Utc>,
}

/// 折叠前需要从其他版本取得领域状态的事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seed {
    /// 同一聚合的历史版本
    Rollback { version: usize },
    /// 另一个聚合的指定版本
    Clone { uuid: AggregateId, version: usize },
}

/// 聚合根接口
pub trait Aggregate:
    Entity + Default + Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + 'static
{
    const TYPE: &'static str;

    /// 该聚合支持的命令载荷，事件沿用同一载荷
    type Command: Payload;

    /// 校验命令；只读，失败时给出原因
    fn validate(&self, command: &Command<Self::Command>) -> Result<(), Rejection>;

    /// 折叠领域字段
    fn execute(&mut self, event: &Event<Self::Command>);

    /// 完整折叠：播种 → 领域折叠 → 簿记。
    ///
    /// `seed` 为播种事件所需的来源聚合：领域字段取自来源，簿记字段保留当前实例，
    /// 因此回滚后历史依旧单调追加。
    fn apply(&mut self, event: &Event<Self::Command>, seed: Option<Self>) {
        if let Some(mut seeded) = seed {
            seeded.meta_mut().clone_from(self.meta());
            *self = seeded;
        }

        self.execute(event);

        let entry = HistoryEntry {
            version: event.version,
            message: event.payload.message(),
            payload: serde_json::to_value(&event.payload).unwrap_or(Value::Null),
            user: event.user_id,
            timestamp: event.timestamp,
        };

        let meta = self.meta_mut();
        meta.version = event.version;
        if meta.created.is_none() {
            meta.created = Some(event.timestamp);
        }
        meta.modified = Some(event.timestamp);
        meta.history.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_event::EventMetadata;
    use cms_macros::{aggregate, payload};
    use uuid::Uuid;

    #[aggregate]
    struct Note {
        text: String,
    }

    #[payload(prefix = "note")]
    enum NoteCommand {
        Write { text: String },
        Restore { version: usize },
    }

    impl Payload for NoteCommand {
        fn message(&self) -> String {
            match self {
                Self::Write { .. } => "Note written".to_string(),
                Self::Restore { version } => format!("Restored version {version}"),
            }
        }

        fn seed(&self) -> Option<Seed> {
            match self {
                Self::Restore { version } => Some(Seed::Rollback { version: *version }),
                _ => None,
            }
        }
    }

    impl Aggregate for Note {
        const TYPE: &'static str = "note";
        type Command = NoteCommand;

        fn validate(&self, command: &Command<Self::Command>) -> Result<(), Rejection> {
            match &command.payload {
                NoteCommand::Write { text } if text.is_empty() => {
                    Err(Rejection::bad_request("text is required"))
                }
                _ => Ok(()),
            }
        }

        fn execute(&mut self, event: &Event<Self::Command>) {
            if let NoteCommand::Write { text } = &event.payload {
                self.text = text.clone();
            }
        }
    }

    fn event(note: &Note, payload: NoteCommand) -> Event<NoteCommand> {
        let command = Command::new(7, note.uuid(), note.version(), payload);
        Event::from_command::<Note>(&command, Utc::now(), EventMetadata::default())
    }

    #[test]
    fn apply_keeps_bookkeeping_in_step() {
        let mut note = <Note as Entity>::new(Uuid::new_v4());
        assert_eq!(note.version(), 0);
        assert!(!note.exists());

        let e1 = event(&note, NoteCommand::Write { text: "a".into() });
        note.apply(&e1, None);
        let e2 = event(&note, NoteCommand::Write { text: "b".into() });
        note.apply(&e2, None);

        assert_eq!(note.version(), 2);
        assert_eq!(note.text, "b");
        assert_eq!(note.meta.created, Some(e1.timestamp));
        assert_eq!(note.meta.modified, Some(e2.timestamp));
        assert_eq!(note.history().len(), 2);
        assert_eq!(note.history()[1].message, "Note written");
        assert_eq!(note.history()[1].user, 7);
    }

    #[test]
    fn seeded_apply_takes_domain_fields_only() {
        let mut note = <Note as Entity>::new(Uuid::new_v4());
        let e1 = event(&note, NoteCommand::Write { text: "first".into() });
        note.apply(&e1, None);
        let old = note.clone();
        let e2 = event(&note, NoteCommand::Write { text: "second".into() });
        note.apply(&e2, None);

        let e3 = event(&note, NoteCommand::Restore { version: 1 });
        note.apply(&e3, Some(old));

        assert_eq!(note.text, "first");
        assert_eq!(note.version(), 3);
        assert_eq!(note.history().len(), 3);
        assert_eq!(note.meta.created, Some(e1.timestamp));
    }

    #[test]
    fn validate_does_not_touch_state() {
        let note = <Note as Entity>::new(Uuid::new_v4());
        let command = Command::new(1, note.uuid(), 0, NoteCommand::Write { text: String::new() });
        assert_eq!(
            note.validate(&command),
            Err(Rejection::bad_request("text is required"))
        );
        assert_eq!(note.version(), 0);
    }

    #[test]
    fn payload_macro_names_events() {
        use crate::command::EventKind;
        assert_eq!(NoteCommand::Write { text: "x".into() }.event_type(), "note.write");
        assert_eq!(NoteCommand::Restore { version: 1 }.event_type(), "note.restore");
    }
}
