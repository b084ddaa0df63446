//! 命令总线（Command Bus）
//!
//! 一次分发完整执行：构建聚合 → 乐观并发检查 → 校验 → 解析播种 → 派生事件 →
//! 追加到事件日志或暂存到用户队列 → 折叠 → 通知监听器。
//! 任一步失败都不会留下部分提交。
//!
use crate::{
    config::CommandBusConfig,
    context::AppContext,
    error::{AppError, AppResult},
    listener::EventListener,
};
use async_trait::async_trait;
use chrono::Utc;
use cms_domain::{
    aggregate::Aggregate,
    command::{Command, EventKind, Payload},
    domain_event::Event,
    entity::{AggregateId, Entity, UserId},
    error::DomainError,
    persist::{
        AggregateFactory, EventRepository, QueuedEventRepository, SerializedEvent,
        SnapshotRepository, deserialize_events, serialize_events,
    },
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 分发结果：派生的事件与折叠后的聚合
#[derive(Debug, Clone)]
pub struct Dispatched<A: Aggregate> {
    pub event: Event<A::Command>,
    pub aggregate: A,
}

#[async_trait]
pub trait CommandBus: Send + Sync {
    /// 分发命令。`queue` 为真时事件进入发起用户的暂存队列，而不是已提交流
    async fn dispatch<A: Aggregate>(
        &self,
        ctx: &AppContext,
        command: Command<A::Command>,
        queue: bool,
    ) -> AppResult<Dispatched<A>>;

    /// 将用户的暂存链按序原子地追加到已提交流，成功后清空队列
    async fn submit_queued<A: Aggregate>(
        &self,
        ctx: &AppContext,
        aggregate_uuid: AggregateId,
        user_id: UserId,
    ) -> AppResult<Vec<Event<A::Command>>>;

    async fn discard_queued(&self, aggregate_uuid: AggregateId, user_id: UserId) -> AppResult<usize>;
}

/// 基于事件溯源的命令总线实现
pub struct EventSourcedCommandBus<E, S> {
    factory: AggregateFactory<E, S>,
    listeners: Vec<Arc<dyn EventListener>>,
    config: CommandBusConfig,
}

impl<E, S> EventSourcedCommandBus<E, S>
where
    E: EventRepository + QueuedEventRepository,
    S: SnapshotRepository,
{
    pub fn new(factory: AggregateFactory<E, S>, config: CommandBusConfig) -> Self {
        Self {
            factory,
            listeners: Vec::new(),
            config,
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn factory(&self) -> &AggregateFactory<E, S> {
        &self.factory
    }

    pub fn config(&self) -> &CommandBusConfig {
        &self.config
    }

    /// 分发成功后以 `(&总线, &事件)` 调用 `on_success`
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(
            aggregate_type = A::TYPE,
            aggregate_uuid = %command.aggregate_uuid,
            command_uuid = %command.command_uuid,
            event_type = command.payload.event_type(),
            on_version = command.on_version,
            queue = queue,
        )
    )]
    pub async fn dispatch_with_callback<A, F>(
        &self,
        ctx: &AppContext,
        command: Command<A::Command>,
        queue: bool,
        on_success: F,
    ) -> AppResult<Dispatched<A>>
    where
        A: Aggregate,
        F: FnOnce(&Self, &Event<A::Command>) + Send,
    {
        let uuid = command.aggregate_uuid;
        let user_id = command.user_id;

        if queue {
            self.ensure_queue_current(uuid, user_id).await?;
        }

        let mut aggregate: A = self
            .factory
            .build(uuid, None, queue.then_some(user_id))
            .await?;

        if command.on_version != aggregate.version() {
            warn!(actual = aggregate.version(), "command targets a stale version");
            return Err(DomainError::Conflict {
                command_uuid: command.command_uuid,
                aggregate_uuid: uuid,
                reason: format!(
                    "expected version {}, {} is at version {}",
                    command.on_version,
                    A::TYPE,
                    aggregate.version()
                ),
            }
            .into());
        }

        if let Err(rejection) = aggregate.validate(&command) {
            warn!(%rejection, "command rejected");
            return Err(
                DomainError::from_rejection(rejection, command.command_uuid, uuid).into(),
            );
        }

        let seed = match command.payload.seed() {
            Some(seed) => match self.factory.resolve_seed::<A>(uuid, seed).await {
                Ok(source) => Some(source),
                Err(DomainError::NotFound { reason }) => {
                    warn!(%reason, "seed version does not exist");
                    return Err(DomainError::InvalidCommand {
                        command_uuid: command.command_uuid,
                        aggregate_uuid: uuid,
                        reason,
                    }
                    .into());
                }
                Err(err) => return Err(err.into()),
            },
            None => None,
        };

        let event = Event::from_command::<A>(&command, Utc::now(), ctx.metadata.clone());
        let serialized = serialize_events(std::slice::from_ref(&event))?;

        if queue {
            for record in &serialized {
                self.factory.events().enqueue(record).await?;
            }
        } else {
            self.factory.events().append(&serialized).await?;
        }

        aggregate.apply(&event, seed);

        if queue {
            debug!(version = event.version, "event queued");
        } else {
            aggregate.meta_mut().stream_version = event.version;
            info!(version = event.version, "event committed");
            self.maybe_snapshot(&mut aggregate).await;
            self.notify(&serialized).await?;
        }

        on_success(self, &event);
        Ok(Dispatched { event, aggregate })
    }

    /// 显式生成快照
    pub async fn snapshot<A: Aggregate>(&self, aggregate_uuid: AggregateId) -> AppResult<Option<usize>> {
        Ok(self.factory.snapshot::<A>(aggregate_uuid).await?)
    }

    /// 暂存链必须以已提交流头为基础
    async fn ensure_queue_current(&self, uuid: AggregateId, user_id: UserId) -> AppResult<()> {
        let events = self.factory.events();
        let queued = events.find_queued(uuid, user_id).await?;
        let Some(first) = queued.first() else {
            return Ok(());
        };

        let stream_version = events.stream_version(uuid).await?;
        let base_version = first.version().saturating_sub(1);
        if base_version != stream_version {
            warn!(%uuid, user_id, base_version, stream_version, "queued events are stale");
            return Err(DomainError::StaleQueue {
                aggregate_uuid: uuid,
                user_id,
                base_version,
                stream_version,
            }
            .into());
        }
        Ok(())
    }

    async fn maybe_snapshot<A: Aggregate>(&self, aggregate: &mut A) {
        let version = aggregate.version();
        if !self.config.snapshot_policy.should_snapshot(version) {
            return;
        }

        aggregate.meta_mut().snapshot_version = Some(version);
        match self.factory.snapshots().save::<A>(aggregate).await {
            Ok(()) => debug!(version, "snapshot saved"),
            // 快照只是缓存，失败不影响已提交的事件
            Err(err) => {
                aggregate.meta_mut().snapshot_version = None;
                warn!(version, error = %err, "snapshot failed");
            }
        }
    }

    async fn notify(&self, events: &[SerializedEvent]) -> AppResult<()> {
        for event in events {
            for listener in &self.listeners {
                if !listener.handled_event_type().matches(event.event_type()) {
                    continue;
                }
                if let Err(err) = listener.handle(event).await {
                    warn!(
                        listener = listener.listener_name(),
                        event_type = event.event_type(),
                        version = event.version(),
                        error = %err,
                        "listener failed"
                    );
                    if self.config.strict_listeners {
                        return Err(AppError::Listener {
                            listener: listener.listener_name().to_string(),
                            event_type: event.event_type().to_string(),
                            reason: err.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<E, S> CommandBus for EventSourcedCommandBus<E, S>
where
    E: EventRepository + QueuedEventRepository,
    S: SnapshotRepository,
{
    async fn dispatch<A: Aggregate>(
        &self,
        ctx: &AppContext,
        command: Command<A::Command>,
        queue: bool,
    ) -> AppResult<Dispatched<A>> {
        self.dispatch_with_callback::<A, _>(ctx, command, queue, |_, _| {})
            .await
    }

    #[tracing::instrument(level = "debug", skip(self, ctx), fields(aggregate_type = A::TYPE))]
    async fn submit_queued<A: Aggregate>(
        &self,
        ctx: &AppContext,
        aggregate_uuid: AggregateId,
        user_id: UserId,
    ) -> AppResult<Vec<Event<A::Command>>> {
        let events = self.factory.events();
        let queued = events.find_queued(aggregate_uuid, user_id).await?;
        if queued.is_empty() {
            return Ok(Vec::new());
        }

        self.ensure_queue_current(aggregate_uuid, user_id).await?;
        let submitted = deserialize_events::<A>(self.factory.upcasters(), queued.clone())?;

        events.append(&queued).await?;
        events.discard_queued(aggregate_uuid, user_id).await?;

        let head = submitted.last().map(|e| e.version).unwrap_or_default();
        info!(
            correlation_id = ctx.metadata.correlation_id(),
            count = submitted.len(),
            version = head,
            "queued events submitted"
        );

        let policy = self.config.snapshot_policy;
        if submitted.iter().any(|e| policy.should_snapshot(e.version)) {
            if let Err(err) = self.factory.snapshot::<A>(aggregate_uuid).await {
                warn!(version = head, error = %err, "snapshot failed");
            }
        }

        self.notify(&queued).await?;
        Ok(submitted)
    }

    async fn discard_queued(&self, aggregate_uuid: AggregateId, user_id: UserId) -> AppResult<usize> {
        let discarded = self
            .factory
            .events()
            .discard_queued(aggregate_uuid, user_id)
            .await?;
        debug!(%aggregate_uuid, user_id, discarded, "queued events discarded");
        Ok(discarded)
    }
}
