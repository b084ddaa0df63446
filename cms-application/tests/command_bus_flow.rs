use anyhow::Result as AnyResult;
use async_trait::async_trait;
use cms_application::{
    AppContext, AppError, CommandBus, CommandBusConfig, EventListener, EventSourcedCommandBus,
    HandledEventType,
};
use cms_domain::aggregates::{Page, PageCommand, PageState};
use cms_domain::command::Command;
use cms_domain::domain_event::EventMetadata;
use cms_domain::entity::{AggregateId, Entity};
use cms_domain::error::{CODE_BAD_REQUEST, CODE_CONFLICT, DomainError};
use cms_domain::event_upcaster::EventUpcasterChain;
use cms_domain::persist::{
    AggregateFactory, EventRepository, InMemoryEventStore, InMemorySnapshotStore, SerializedEvent,
    SnapshotPolicy,
};
use pretty_assertions::assert_eq;
use serde_json::Map;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

type Bus = EventSourcedCommandBus<InMemoryEventStore, InMemorySnapshotStore>;

fn bus_with(config: CommandBusConfig) -> (Bus, Arc<InMemoryEventStore>, Arc<InMemorySnapshotStore>) {
    let events = Arc::new(InMemoryEventStore::new());
    let snapshots = Arc::new(InMemorySnapshotStore::new());
    let factory = AggregateFactory::new(
        Arc::clone(&events),
        Arc::clone(&snapshots),
        Arc::new(EventUpcasterChain::default()),
    );
    (EventSourcedCommandBus::new(factory, config), events, snapshots)
}

fn bus() -> Bus {
    bus_with(CommandBusConfig::default()).0
}

fn ctx() -> AppContext {
    AppContext {
        metadata: EventMetadata::builder().correlation_id("req-1").build(),
    }
}

fn add_element(name: &str) -> PageCommand {
    PageCommand::AddElement {
        element_name: name.into(),
        data: Map::new(),
        parent: None,
    }
}

async fn send(bus: &Bus, uuid: AggregateId, on_version: usize, payload: PageCommand) -> Result<Page, AppError> {
    let command = Command::new(1, uuid, on_version, payload);
    Ok(bus.dispatch::<Page>(&ctx(), command, false).await?.aggregate)
}

fn code(err: &AppError) -> Option<u16> {
    err.code()
}

#[tokio::test]
async fn add_element_on_fresh_page() -> AnyResult<()> {
    let bus = bus();
    let uuid = Uuid::new_v4();

    let page = send(&bus, uuid, 0, add_element("text")).await?;
    assert_eq!(page.version(), 1);
    assert_eq!(page.stream_version(), 1);
    assert_eq!(page.state, PageState::Draft);
    assert_eq!(page.elements.len(), 1);

    let stored = bus.factory().events().find_events(uuid, 0, None).await?;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].event_type(), "page.add_element");
    assert_eq!(stored[0].metadata()["correlation_id"], "req-1");
    Ok(())
}

#[tokio::test]
async fn publish_at_version_one_is_bad_request() -> AnyResult<()> {
    let bus = bus();
    let uuid = Uuid::new_v4();
    send(&bus, uuid, 0, add_element("text")).await?;

    let err = send(&bus, uuid, 1, PageCommand::Publish).await.unwrap_err();
    assert_eq!(code(&err), Some(CODE_BAD_REQUEST));
    assert!(matches!(
        err,
        AppError::Domain(DomainError::InvalidCommand { ref reason, .. })
            if reason == "You must choose an existing page"
    ));
    assert_eq!(bus.factory().events().stream_version(uuid).await?, 1);
    Ok(())
}

#[tokio::test]
async fn stale_on_version_is_conflict() -> AnyResult<()> {
    let bus = bus();
    let uuid = Uuid::new_v4();
    send(&bus, uuid, 0, add_element("a")).await?;

    let err = send(&bus, uuid, 0, add_element("b")).await.unwrap_err();
    assert_eq!(code(&err), Some(CODE_CONFLICT));
    assert!(!err.is_store_conflict());
    Ok(())
}

#[tokio::test]
async fn rollback_restores_version_two() -> AnyResult<()> {
    let bus = bus();
    let uuid = Uuid::new_v4();
    for (on_version, name) in ["v1", "v2", "v3", "v4", "v5"].iter().enumerate() {
        send(&bus, uuid, on_version, add_element(name)).await?;
    }

    let page = send(&bus, uuid, 5, PageCommand::Rollback { previous_version: 2 }).await?;
    let v2: Page = bus.factory().build(uuid, Some(2), None).await?;

    assert_eq!(page.version(), 6);
    assert_eq!(page.elements, v2.elements);
    assert_eq!(page.history().len(), 6);
    assert_eq!(page.history()[5].message, "Page rolled back to version 2");

    let err = send(&bus, uuid, 6, PageCommand::Rollback { previous_version: 6 })
        .await
        .unwrap_err();
    assert_eq!(code(&err), Some(CODE_BAD_REQUEST));
    Ok(())
}

#[tokio::test]
async fn clone_from_missing_version_is_rejected() -> AnyResult<()> {
    let bus = bus();
    let source = Uuid::new_v4();
    send(&bus, source, 0, add_element("a")).await?;

    let target = Uuid::new_v4();
    let err = send(
        &bus,
        target,
        0,
        PageCommand::CloneFrom {
            original_uuid: source,
            original_version: 4,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(code(&err), Some(CODE_BAD_REQUEST));
    assert_eq!(bus.factory().events().stream_version(target).await?, 0);

    let page = send(
        &bus,
        target,
        0,
        PageCommand::CloneFrom {
            original_uuid: source,
            original_version: 1,
        },
    )
    .await?;
    assert_eq!(page.elements.len(), 1);
    assert!(page.title.ends_with(" (copy)"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_dispatch_has_one_winner() -> AnyResult<()> {
    let bus = Arc::new(bus());
    let uuid = Uuid::new_v4();
    send(&bus, uuid, 0, add_element("root")).await?;

    let mut handles = Vec::new();
    for i in 0..8 {
        let bus = Arc::clone(&bus);
        handles.push(tokio::spawn(async move {
            send(&bus, uuid, 1, add_element(&format!("racer-{i}"))).await
        }));
    }

    let mut winners = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => winners += 1,
            Err(err) => assert!(
                err.is_store_conflict() || err.code() == Some(CODE_CONFLICT),
                "unexpected error: {err}"
            ),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(bus.factory().events().stream_version(uuid).await?, 2);
    Ok(())
}

#[tokio::test]
async fn queued_events_submit_and_discard() -> AnyResult<()> {
    let bus = bus();
    let uuid = Uuid::new_v4();
    let user = 42;
    send(&bus, uuid, 0, add_element("committed")).await?;

    let queued = bus
        .dispatch::<Page>(&ctx(), Command::new(user, uuid, 1, add_element("queued")), true)
        .await?;
    assert_eq!(queued.aggregate.version(), 2);
    assert_eq!(queued.aggregate.stream_version(), 1);
    let queued = bus
        .dispatch::<Page>(&ctx(), Command::new(user, uuid, 2, PageCommand::Submit), true)
        .await?;
    assert_eq!(queued.aggregate.state, PageState::Staged);

    // 其他用户看到的仍是已提交状态
    let head: Page = bus.factory().build(uuid, None, None).await?;
    assert_eq!(head.version(), 1);

    let submitted = bus.submit_queued::<Page>(&ctx(), uuid, user).await?;
    assert_eq!(submitted.iter().map(|e| e.version).collect::<Vec<_>>(), vec![2, 3]);
    let head: Page = bus.factory().build(uuid, None, Some(user)).await?;
    assert_eq!(head.version(), 3);
    assert_eq!(head.stream_version(), 3);
    assert_eq!(head.state, PageState::Staged);
    assert!(bus.submit_queued::<Page>(&ctx(), uuid, user).await?.is_empty());

    bus.dispatch::<Page>(&ctx(), Command::new(user, uuid, 3, add_element("draft")), true)
        .await?;
    assert_eq!(bus.discard_queued(uuid, user).await?, 1);
    let head: Page = bus.factory().build(uuid, None, Some(user)).await?;
    assert_eq!(head.version(), 3);
    Ok(())
}

#[tokio::test]
async fn stale_queue_is_rejected() -> AnyResult<()> {
    let bus = bus();
    let uuid = Uuid::new_v4();
    send(&bus, uuid, 0, add_element("a")).await?;

    bus.dispatch::<Page>(&ctx(), Command::new(9, uuid, 1, add_element("mine")), true)
        .await?;
    send(&bus, uuid, 1, add_element("theirs")).await?;

    let err = bus.submit_queued::<Page>(&ctx(), uuid, 9).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Domain(DomainError::StaleQueue {
            base_version: 1,
            stream_version: 2,
            ..
        })
    ));

    let err = bus
        .dispatch::<Page>(&ctx(), Command::new(9, uuid, 2, add_element("more")), true)
        .await
        .unwrap_err();
    assert_eq!(code(&err), Some(CODE_CONFLICT));
    assert_eq!(bus.discard_queued(uuid, 9).await?, 1);
    Ok(())
}

struct Recorder {
    types: HandledEventType,
    seen: Mutex<Vec<String>>,
    fail: bool,
}

impl Recorder {
    fn new(types: HandledEventType, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            types,
            seen: Mutex::new(Vec::new()),
            fail,
        })
    }
}

#[async_trait]
impl EventListener for Recorder {
    fn listener_name(&self) -> &str {
        "recorder"
    }

    fn handled_event_type(&self) -> HandledEventType {
        self.types.clone()
    }

    async fn handle(&self, event: &SerializedEvent) -> anyhow::Result<()> {
        self.seen.lock().unwrap().push(event.event_type().to_string());
        if self.fail {
            anyhow::bail!("projection unavailable");
        }
        Ok(())
    }
}

#[tokio::test]
async fn listeners_receive_committed_events() -> AnyResult<()> {
    let publish_only = Recorder::new(HandledEventType::One("page.publish".into()), false);
    let everything = Recorder::new(HandledEventType::All, false);
    let bus = bus()
        .with_listener(publish_only.clone())
        .with_listener(everything.clone());
    let uuid = Uuid::new_v4();

    send(&bus, uuid, 0, add_element("a")).await?;
    send(&bus, uuid, 1, add_element("b")).await?;
    send(&bus, uuid, 2, PageCommand::Publish).await?;
    bus.dispatch::<Page>(&ctx(), Command::new(1, uuid, 3, PageCommand::Unpublish), true)
        .await?;

    assert_eq!(*publish_only.seen.lock().unwrap(), vec!["page.publish"]);
    assert_eq!(everything.seen.lock().unwrap().len(), 3);

    bus.submit_queued::<Page>(&ctx(), uuid, 1).await?;
    assert_eq!(everything.seen.lock().unwrap().last().map(String::as_str), Some("page.unpublish"));
    Ok(())
}

#[tokio::test]
async fn listener_failures_are_logged_or_strict() -> AnyResult<()> {
    let uuid = Uuid::new_v4();
    let lenient = bus().with_listener(Recorder::new(HandledEventType::All, true));
    send(&lenient, uuid, 0, add_element("a")).await?;

    let (strict, events, _) = bus_with(CommandBusConfig::builder().strict_listeners(true).build());
    let strict = strict.with_listener(Recorder::new(HandledEventType::All, true));
    let err = send(&strict, uuid, 0, add_element("a")).await.unwrap_err();
    assert!(matches!(err, AppError::Listener { .. }));
    // 事件已提交，错误只反映监听器失败
    assert_eq!(events.stream_version(uuid).await?, 1);
    Ok(())
}

#[tokio::test]
async fn callback_runs_after_success_only() -> AnyResult<()> {
    let bus = bus();
    let uuid = Uuid::new_v4();
    let calls = AtomicUsize::new(0);

    bus.dispatch_with_callback::<Page, _>(
        &ctx(),
        Command::new(1, uuid, 0, add_element("a")),
        false,
        |bus, event| {
            assert_eq!(event.version, 1);
            assert_eq!(bus.config().snapshot_policy, SnapshotPolicy::Never);
            calls.fetch_add(1, Ordering::SeqCst);
        },
    )
    .await?;

    let result = bus
        .dispatch_with_callback::<Page, _>(
            &ctx(),
            Command::new(1, uuid, 1, PageCommand::Publish),
            false,
            |_, _| {
                calls.fetch_add(1, Ordering::SeqCst);
            },
        )
        .await;
    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn snapshot_policy_takes_snapshots() -> AnyResult<()> {
    let (bus, _, snapshots) = bus_with(
        CommandBusConfig::builder()
            .snapshot_policy(SnapshotPolicy::Every(2))
            .build(),
    );
    let uuid = Uuid::new_v4();
    for on_version in 0..5 {
        send(&bus, uuid, on_version, add_element("x")).await?;
    }
    assert_eq!(snapshots.versions(uuid), vec![2, 4]);

    let page: Page = bus.factory().build(uuid, None, None).await?;
    assert_eq!(page.version(), 5);
    assert_eq!(page.meta.snapshot_version, Some(4));
    assert_eq!(bus.snapshot::<Page>(uuid).await?, Some(5));
    Ok(())
}
