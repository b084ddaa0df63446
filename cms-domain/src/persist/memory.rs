//! 内存存储实现
//!
//! 基于 `DashMap` 的事件日志、暂存队列与快照存储，用于测试与嵌入式场景。
//! 追加在聚合所在分片的写锁内完成，从而保证“仅当版本为流头 + 1 时追加”的原子性。
//!
use crate::{
    aggregate::Aggregate,
    entity::{AggregateId, UserId},
    error::{DomainError, DomainResult as Result},
    persist::{
        EventRepository, QueuedEventRepository, SerializedEvent, SerializedSnapshot,
        SnapshotRepository,
    },
};
use async_trait::async_trait;
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: DashMap<AggregateId, Vec<SerializedEvent>>,
    queues: DashMap<(AggregateId, UserId), Vec<SerializedEvent>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventRepository for InMemoryEventStore {
    async fn append(&self, events: &[SerializedEvent]) -> Result<()> {
        let Some(first) = events.first() else {
            return Ok(());
        };
        let aggregate_uuid = first.aggregate_uuid();
        if events.iter().any(|e| e.aggregate_uuid() != aggregate_uuid) {
            return Err(DomainError::EventRepository {
                reason: "a batch must target a single aggregate".to_string(),
            });
        }

        let mut stream = self.streams.entry(aggregate_uuid).or_default();
        let head = stream.last().map(SerializedEvent::version).unwrap_or(0);

        for (offset, event) in events.iter().enumerate() {
            let expected = head + offset + 1;
            if event.version() != expected {
                return Err(DomainError::VersionConflict {
                    aggregate_uuid,
                    expected,
                    actual: event.version(),
                });
            }
        }

        stream.extend_from_slice(events);
        Ok(())
    }

    async fn find_events(
        &self,
        aggregate_uuid: AggregateId,
        after: usize,
        up_to: Option<usize>,
    ) -> Result<Vec<SerializedEvent>> {
        let Some(stream) = self.streams.get(&aggregate_uuid) else {
            return Ok(Vec::new());
        };

        Ok(stream
            .iter()
            .filter(|e| e.version() > after && up_to.is_none_or(|max| e.version() <= max))
            .cloned()
            .collect())
    }

    async fn stream_version(&self, aggregate_uuid: AggregateId) -> Result<usize> {
        Ok(self
            .streams
            .get(&aggregate_uuid)
            .and_then(|stream| stream.last().map(SerializedEvent::version))
            .unwrap_or(0))
    }
}

#[async_trait]
impl QueuedEventRepository for InMemoryEventStore {
    async fn enqueue(&self, event: &SerializedEvent) -> Result<()> {
        self.queues
            .entry((event.aggregate_uuid(), event.user_id()))
            .or_default()
            .push(event.clone());
        Ok(())
    }

    async fn find_queued(
        &self,
        aggregate_uuid: AggregateId,
        user_id: UserId,
    ) -> Result<Vec<SerializedEvent>> {
        Ok(self
            .queues
            .get(&(aggregate_uuid, user_id))
            .map(|queue| queue.clone())
            .unwrap_or_default())
    }

    async fn discard_queued(&self, aggregate_uuid: AggregateId, user_id: UserId) -> Result<usize> {
        Ok(self
            .queues
            .remove(&(aggregate_uuid, user_id))
            .map(|(_, queue)| queue.len())
            .unwrap_or(0))
    }
}

#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    snapshots: DashMap<AggregateId, Vec<SerializedSnapshot>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已保存的快照版本，升序
    pub fn versions(&self, aggregate_uuid: AggregateId) -> Vec<usize> {
        self.snapshots
            .get(&aggregate_uuid)
            .map(|list| list.iter().map(SerializedSnapshot::version).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SnapshotRepository for InMemorySnapshotStore {
    async fn get_snapshot<A: Aggregate>(
        &self,
        aggregate_uuid: AggregateId,
        max_version: Option<usize>,
    ) -> Result<Option<SerializedSnapshot>> {
        let Some(list) = self.snapshots.get(&aggregate_uuid) else {
            return Ok(None);
        };

        Ok(list
            .iter()
            .rev()
            .find(|s| max_version.is_none_or(|max| s.version() <= max))
            .cloned())
    }

    async fn save<A: Aggregate>(&self, aggregate: &A) -> Result<()> {
        let snapshot = SerializedSnapshot::from_aggregate(aggregate)?;
        let mut list = self.snapshots.entry(snapshot.aggregate_uuid()).or_default();
        match list.binary_search_by_key(&snapshot.version(), SerializedSnapshot::version) {
            Ok(i) => list[i] = snapshot,
            Err(i) => list.insert(i, snapshot),
        }
        Ok(())
    }
}
