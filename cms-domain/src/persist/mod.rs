//! 持久化与事件溯源（persist）
//!
//! 定义事件日志、暂存事件与快照仓储协议，并提供：
//! - 事件与快照的持久化形态（`SerializedEvent`/`SerializedSnapshot`）；
//! - 上抬与反序列化组合（`deserialize_events`）；
//! - 内存实现（`InMemoryEventStore`/`InMemorySnapshotStore`）；
//! - 从快照与事件流重建聚合的 `AggregateFactory`。
//!
//! 具体存储后端由上层实现协议后注入。
//!
mod aggregate_factory;
mod event_repository;
mod memory;
mod serialized_event;
mod serialized_snapshot;
mod snapshot_repository;

pub use aggregate_factory::AggregateFactory;
pub use event_repository::{EventRepository, QueuedEventRepository};
pub use memory::{InMemoryEventStore, InMemorySnapshotStore};
pub use serialized_event::{SerializedEvent, deserialize_events, serialize_events};
pub use serialized_snapshot::SerializedSnapshot;
pub use snapshot_repository::{SnapshotPolicy, SnapshotRepository};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregate;
    use crate::command::{Command, Payload};
    use crate::domain_event::{Event, EventMetadata};
    use crate::entity::Entity;
    use crate::error::{DomainError, DomainResult, Rejection};
    use crate::event_upcaster::{EventUpcaster, EventUpcasterChain, EventUpcasterResult};
    use chrono::Utc;
    use cms_macros::{aggregate, payload};
    use serde_json::json;
    use uuid::Uuid;

    #[aggregate]
    struct Tag {
        label: String,
    }

    #[payload(prefix = "tag")]
    enum TagCommand {
        Rename { label: String },
    }

    impl Payload for TagCommand {
        const SCHEMA_VERSION: usize = 2;

        fn message(&self) -> String {
            "Tag renamed".to_string()
        }
    }

    impl Aggregate for Tag {
        const TYPE: &'static str = "tag";
        type Command = TagCommand;

        fn validate(&self, _command: &Command<Self::Command>) -> Result<(), Rejection> {
            Ok(())
        }

        fn execute(&mut self, event: &Event<Self::Command>) {
            let TagCommand::Rename { label } = &event.payload;
            self.label = label.clone();
        }
    }

    #[test]
    fn serialize_deserialize_roundtrip() {
        let id = Uuid::new_v4();
        let command = Command::new(3, id, 0, TagCommand::Rename { label: "rust".into() });
        let metadata = EventMetadata::builder().correlation_id("c-1").build();
        let event = Event::from_command::<Tag>(&command, Utc::now(), metadata);

        let ser = serialize_events(std::slice::from_ref(&event)).unwrap();
        assert_eq!(ser.len(), 1);
        assert_eq!(ser[0].event_type(), "tag.rename");
        assert_eq!(ser[0].event_version(), 2);
        assert_eq!(ser[0].aggregate_type(), Tag::TYPE);
        assert_eq!(ser[0].version(), 1);
        assert_eq!(ser[0].user_id(), 3);
        assert_eq!(ser[0].command_uuid(), command.command_uuid);

        let chain = EventUpcasterChain::default();
        let de = deserialize_events::<Tag>(&chain, ser).unwrap();
        assert_eq!(de, vec![event]);
    }

    // v1 的 Rename { name } 升级为 v2 的 Rename { label }
    struct RenameV1ToV2;
    impl EventUpcaster for RenameV1ToV2 {
        fn applies(&self, event_type: &str, event_version: usize) -> bool {
            event_type == "tag.rename" && event_version == 1
        }

        fn upcast(&self, event: SerializedEvent) -> DomainResult<EventUpcasterResult> {
            let mut payload = event.payload().clone();
            if let Some(inner) = payload
                .get_mut("Rename")
                .and_then(|v| v.as_object_mut())
            {
                if let Some(name) = inner.remove("name") {
                    inner.insert("label".to_string(), name);
                }
            }
            Ok(EventUpcasterResult::One(event.upcasted("tag.rename", 2, payload)))
        }
    }

    #[test]
    fn deserialize_with_upcast_compat_legacy_payload() {
        let raw = SerializedEvent::builder()
            .command_uuid(Uuid::new_v4())
            .event_type("tag.rename")
            .event_version(1)
            .aggregate_uuid(Uuid::new_v4())
            .aggregate_type("tag")
            .version(1)
            .user_id(1)
            .occurred_at(Utc::now())
            .payload(json!({"Rename": {"name": "legacy"}}))
            .metadata(json!(null))
            .build();

        let chain = EventUpcasterChain::default().with(RenameV1ToV2);
        let out = deserialize_events::<Tag>(&chain, vec![raw]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].payload, TagCommand::Rename { label: "legacy".into() });
        assert_eq!(out[0].metadata, EventMetadata::default());
    }

    #[test]
    fn events_of_another_aggregate_type_are_rejected() {
        let raw = SerializedEvent::builder()
            .command_uuid(Uuid::new_v4())
            .event_type("tag.rename")
            .event_version(2)
            .aggregate_uuid(Uuid::new_v4())
            .aggregate_type("page")
            .version(1)
            .user_id(1)
            .occurred_at(Utc::now())
            .payload(json!({"Rename": {"label": "x"}}))
            .metadata(json!(null))
            .build();

        let err = deserialize_events::<Tag>(&EventUpcasterChain::default(), vec![raw]).unwrap_err();
        assert!(matches!(err, DomainError::TypeMismatch { .. }));
    }

    #[test]
    fn snapshot_serde_and_type_check() {
        let tag = <Tag as Entity>::new(Uuid::new_v4());
        let snap = SerializedSnapshot::from_aggregate(&tag).unwrap();
        assert_eq!(snap.aggregate_uuid(), tag.uuid());
        assert_eq!(snap.aggregate_type(), Tag::TYPE);
        assert_eq!(snap.version(), 0);

        let restored: Tag = snap.to_aggregate().unwrap();
        assert_eq!(restored, tag);

        #[aggregate]
        struct Other {}
        #[payload(prefix = "other")]
        enum OtherCommand {
            Noop,
        }
        impl Payload for OtherCommand {
            fn message(&self) -> String {
                String::new()
            }
        }
        impl Aggregate for Other {
            const TYPE: &'static str = "other";
            type Command = OtherCommand;
            fn validate(&self, _c: &Command<Self::Command>) -> Result<(), Rejection> {
                Ok(())
            }
            fn execute(&mut self, _e: &Event<Self::Command>) {}
        }

        let err = snap.to_aggregate::<Other>().unwrap_err();
        assert!(matches!(err, DomainError::TypeMismatch { .. }));
    }

    #[test]
    fn snapshot_policy_should_snapshot() {
        assert!(!SnapshotPolicy::Never.should_snapshot(1));
        assert_eq!(SnapshotPolicy::default(), SnapshotPolicy::Never);
        for v in 1..=9 {
            let should = SnapshotPolicy::Every(3).should_snapshot(v);
            assert_eq!(should, v % 3 == 0);
        }
        assert!(!SnapshotPolicy::Every(0).should_snapshot(0));
        assert!(SnapshotPolicy::Every(0).should_snapshot(1));
    }
}
