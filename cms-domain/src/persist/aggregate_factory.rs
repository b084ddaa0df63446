//! 聚合工厂
//!
//! 从最近快照（若有）出发，按版本升序上抬、反序列化并折叠事件，重建聚合到指定版本；
//! 指定用户时在流头之上继续折叠该用户的暂存事件，得到“预览”状态。
//! 回滚/克隆事件所需的来源状态由工厂递归构建后交给 `Aggregate::apply`。
//!
use crate::{
    aggregate::{Aggregate, Seed},
    command::Payload,
    domain_event::Event,
    entity::{AggregateId, UserId},
    error::{DomainError, DomainResult as Result},
    event_upcaster::EventUpcasterChain,
    persist::{
        EventRepository, QueuedEventRepository, SnapshotRepository, deserialize_events,
    },
};
use futures_util::future::BoxFuture;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct AggregateFactory<E, S> {
    events: Arc<E>,
    snapshots: Arc<S>,
    upcasters: Arc<EventUpcasterChain>,
}

impl<E, S> AggregateFactory<E, S>
where
    E: EventRepository + QueuedEventRepository,
    S: SnapshotRepository,
{
    pub fn new(events: Arc<E>, snapshots: Arc<S>, upcasters: Arc<EventUpcasterChain>) -> Self {
        Self {
            events,
            snapshots,
            upcasters,
        }
    }

    pub fn events(&self) -> &Arc<E> {
        &self.events
    }

    pub fn snapshots(&self) -> &Arc<S> {
        &self.snapshots
    }

    pub fn upcasters(&self) -> &Arc<EventUpcasterChain> {
        &self.upcasters
    }

    /// 重建聚合。
    ///
    /// - `version` 为空时构建到流头；
    /// - `user_id` 非空且已提交状态位于流头时，继续折叠该用户的暂存事件，
    ///   `stream_version` 保持为已提交流头。
    #[tracing::instrument(level = "debug", skip(self), fields(aggregate_type = A::TYPE))]
    pub async fn build<A: Aggregate>(
        &self,
        uuid: AggregateId,
        version: Option<usize>,
        user_id: Option<UserId>,
    ) -> Result<A> {
        let mut aggregate = self.build_committed::<A>(uuid, version).await?;

        let Some(user_id) = user_id else {
            return Ok(aggregate);
        };
        if aggregate.version() != aggregate.stream_version() {
            return Ok(aggregate);
        }

        let queued = self.queued_events::<A>(uuid, user_id).await?;
        let Some(first) = queued.first() else {
            return Ok(aggregate);
        };
        if first.version != aggregate.version() + 1 {
            warn!(
                %uuid,
                user_id,
                base_version = first.version.saturating_sub(1),
                stream_version = aggregate.stream_version(),
                "skipping stale queued events"
            );
            return Ok(aggregate);
        }

        debug!(%uuid, user_id, count = queued.len(), "folding queued events");
        for event in &queued {
            self.fold(&mut aggregate, event).await?;
        }
        Ok(aggregate)
    }

    /// 只包含已提交事件的重建
    pub fn build_committed<'a, A: Aggregate>(
        &'a self,
        uuid: AggregateId,
        version: Option<usize>,
    ) -> BoxFuture<'a, Result<A>> {
        Box::pin(async move {
            let mut aggregate = match self.snapshots.get_snapshot::<A>(uuid, version).await? {
                Some(snapshot) => {
                    debug!(%uuid, snapshot_version = snapshot.version(), "starting from snapshot");
                    snapshot.to_aggregate::<A>()?
                }
                None => A::new(uuid),
            };

            let serialized = self
                .events
                .find_events(uuid, aggregate.version(), version)
                .await?;
            let events = deserialize_events::<A>(&self.upcasters, serialized)?;
            debug!(%uuid, from = aggregate.version(), count = events.len(), "replaying events");

            for event in &events {
                self.fold(&mut aggregate, event).await?;
            }

            aggregate.meta_mut().stream_version = self.events.stream_version(uuid).await?;
            Ok(aggregate)
        })
    }

    /// 折叠单个事件，必要时先构建播种来源
    pub async fn fold<A: Aggregate>(&self, aggregate: &mut A, event: &Event<A::Command>) -> Result<()> {
        let seed = match event.payload.seed() {
            Some(seed) => Some(self.resolve_seed::<A>(event.aggregate_uuid, seed).await?),
            None => None,
        };
        aggregate.apply(event, seed);
        Ok(())
    }

    /// 构建播种来源；来源版本不存在时返回 `NotFound`
    pub async fn resolve_seed<A: Aggregate>(&self, uuid: AggregateId, seed: Seed) -> Result<A> {
        let (source_uuid, version) = match seed {
            Seed::Rollback { version } => (uuid, version),
            Seed::Clone { uuid, version } => (uuid, version),
        };

        let source = self.build_committed::<A>(source_uuid, Some(version)).await?;
        if version == 0 || source.version() != version {
            return Err(DomainError::NotFound {
                reason: format!("{} {source_uuid} has no version {version}", A::TYPE),
            });
        }
        Ok(source)
    }

    pub async fn queued_events<A: Aggregate>(
        &self,
        uuid: AggregateId,
        user_id: UserId,
    ) -> Result<Vec<Event<A::Command>>> {
        let serialized = self.events.find_queued(uuid, user_id).await?;
        deserialize_events::<A>(&self.upcasters, serialized)
    }

    /// 在已提交流头生成并保存快照，返回快照版本；空流不生成
    #[tracing::instrument(level = "debug", skip(self), fields(aggregate_type = A::TYPE))]
    pub async fn snapshot<A: Aggregate>(&self, uuid: AggregateId) -> Result<Option<usize>> {
        let mut aggregate = self.build_committed::<A>(uuid, None).await?;
        if !aggregate.exists() {
            return Ok(None);
        }

        let version = aggregate.version();
        aggregate.meta_mut().snapshot_version = Some(version);
        self.snapshots.save::<A>(&aggregate).await?;
        debug!(%uuid, version, "snapshot saved");
        Ok(Some(version))
    }
}

impl<E, S> Clone for AggregateFactory<E, S> {
    fn clone(&self) -> Self {
        Self {
            events: Arc::clone(&self.events),
            snapshots: Arc::clone(&self.snapshots),
            upcasters: Arc::clone(&self.upcasters),
        }
    }
}
