//! Shared remote-state container.
//!
//! A read-mostly snapshot store over the Data Service's collections, shared
//! by every consumer in the process. The store is an explicit object handed
//! to consumers by reference - no ambient globals - and guarantees:
//!
//! - [`SnapshotStore::snapshot`] never blocks beyond a read lock and always
//!   returns the last complete snapshot, even while a fetch is in flight
//! - [`SnapshotStore::refresh`] coalesces concurrent callers onto a single
//!   outbound fetch per key and is a no-op inside the staleness window
//! - a failed fetch records its error on the snapshot and preserves the
//!   previous data; it never propagates into unrelated consumers
//! - optimistic patches are local-only and survive until the next
//!   successful refresh overwrites them (last-fetch-wins, no rollback)
//!
//! The in-flight fetch runs on a spawned task, so a caller that stops
//! awaiting merely discards the result; other waiters and the snapshot
//! itself still see the outcome.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use segundo_lote_core::{EventId, TicketStatus};

use crate::backend::BackendError;
use crate::backend::types::{Category, Event, Location, Order};

/// Buffered change notifications per subscriber before they start lagging.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Logical resource addressed by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    Events,
    Categories,
    Locations,
    Orders,
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Events => write!(f, "events"),
            Self::Categories => write!(f, "categories"),
            Self::Locations => write!(f, "locations"),
            Self::Orders => write!(f, "orders"),
        }
    }
}

/// A fetched collection, one variant per [`ResourceKey`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceData {
    Events(Vec<Event>),
    Categories(Vec<Category>),
    Locations(Vec<Location>),
    Orders(Vec<Order>),
}

impl ResourceData {
    /// Number of entities in the collection.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Events(v) => v.len(),
            Self::Categories(v) => v.len(),
            Self::Locations(v) => v.len(),
            Self::Orders(v) => v.len(),
        }
    }

    /// Whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Errors recorded on snapshots and returned from refresh operations.
///
/// Cloneable so one failure can be handed to every coalesced waiter and
/// kept on the snapshot at the same time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The fetch failed before reaching the Data Service.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The Data Service answered with a non-success status.
    #[error("upstream returned status {status}")]
    Upstream { status: u16 },

    /// The response body did not match the expected shape.
    #[error("malformed upstream payload: {0}")]
    Decode(String),

    /// The in-flight fetch went away without publishing a result.
    #[error("refresh cancelled before completion")]
    Cancelled,

    /// Nothing has been fetched for this key yet.
    #[error("no snapshot available for {0}")]
    Unavailable(ResourceKey),
}

impl From<BackendError> for StoreError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Http(e) => Self::Transport(e.to_string()),
            BackendError::Status { status, .. } => Self::Upstream { status },
            BackendError::Decode { endpoint, source } => {
                Self::Decode(format!("{endpoint}: {source}"))
            }
        }
    }
}

/// The last known state of one resource.
///
/// `data` and `error` are independent: a snapshot can carry stale data and
/// the error that prevented its replacement at the same time.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Last successfully fetched collection, possibly locally patched.
    pub data: Option<ResourceData>,
    /// Whether a fetch for this key is currently in flight.
    pub is_loading: bool,
    /// Error from the most recent failed fetch, cleared on success.
    pub error: Option<StoreError>,
    /// When `data` was last replaced by a successful fetch.
    pub fetched_at: Option<Instant>,
}

impl Snapshot {
    /// Whether the snapshot is inside the staleness window.
    #[must_use]
    pub fn is_fresh(&self, window: Duration) -> bool {
        self.fetched_at
            .is_some_and(|fetched_at| fetched_at.elapsed() < window)
    }
}

/// Local-only partial update for an [`Event`].
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub ticket_count: Option<u32>,
    pub price: Option<Decimal>,
}

/// Local-only partial update for an [`Order`].
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub status: Option<TicketStatus>,
    pub quantity: Option<u32>,
}

/// A partial update addressed at one entity in a snapshot.
#[derive(Debug, Clone)]
pub enum EntityPatch {
    Event(EventPatch),
    Order(OrderPatch),
}

/// The seam between the store and the source of truth.
///
/// Production code plugs in the Data Service client; tests inject
/// counting fakes.
pub trait ResourceFetcher: Send + Sync + 'static {
    /// Fetch the full collection for `key`.
    fn fetch(
        &self,
        key: ResourceKey,
    ) -> impl std::future::Future<Output = Result<ResourceData, StoreError>> + Send;
}

type FetchResult = Result<(), StoreError>;

/// Shared snapshot store over the Data Service's collections.
///
/// Cheap to clone; all clones share state.
pub struct SnapshotStore<F> {
    inner: Arc<Inner<F>>,
}

impl<F> Clone for SnapshotStore<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<F> {
    fetcher: F,
    staleness: Duration,
    snapshots: RwLock<HashMap<ResourceKey, Snapshot>>,
    /// One completion channel per key with a fetch in flight.
    inflight: Mutex<HashMap<ResourceKey, watch::Receiver<Option<FetchResult>>>>,
    changes: broadcast::Sender<ResourceKey>,
}

impl<F: ResourceFetcher> SnapshotStore<F> {
    /// Create a store over `fetcher` with the given staleness window.
    #[must_use]
    pub fn new(fetcher: F, staleness: Duration) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                fetcher,
                staleness,
                snapshots: RwLock::new(HashMap::new()),
                inflight: Mutex::new(HashMap::new()),
                changes,
            }),
        }
    }

    /// Return the last known snapshot for `key` immediately.
    ///
    /// Reads during an in-flight fetch see the previous complete value
    /// (with `is_loading` set), never a partial one.
    #[must_use]
    pub fn snapshot(&self, key: ResourceKey) -> Snapshot {
        self.inner
            .snapshots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
            .unwrap_or_default()
    }

    /// Subscribe to change notifications.
    ///
    /// A key is published whenever its snapshot data changes: successful
    /// refresh or optimistic patch.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ResourceKey> {
        self.inner.changes.subscribe()
    }

    /// Refresh `key` unless its snapshot is still fresh.
    ///
    /// Concurrent callers for the same key share a single outbound fetch
    /// and all receive its result.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the previous snapshot data stays in place.
    pub async fn refresh(&self, key: ResourceKey) -> FetchResult {
        self.refresh_inner(key, false).await
    }

    /// Refresh `key` regardless of the staleness window.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the previous snapshot data stays in place.
    pub async fn force_refresh(&self, key: ResourceKey) -> FetchResult {
        self.refresh_inner(key, true).await
    }

    async fn refresh_inner(&self, key: ResourceKey, force: bool) -> FetchResult {
        if !force && self.snapshot(key).is_fresh(self.inner.staleness) {
            debug!(%key, "snapshot still fresh, skipping refresh");
            return Ok(());
        }

        let mut rx = {
            let mut inflight = self
                .inner
                .inflight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            if let Some(rx) = inflight.get(&key).cloned() {
                // Coalesce onto the fetch already in flight.
                rx
            } else {
                let (tx, rx) = watch::channel(None);
                inflight.insert(key, rx.clone());

                {
                    let mut snapshots = self
                        .inner
                        .snapshots
                        .write()
                        .unwrap_or_else(PoisonError::into_inner);
                    snapshots.entry(key).or_default().is_loading = true;
                }

                // Drive the fetch on its own task: a caller that stops
                // awaiting discards the result without aborting the fetch.
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move {
                    let result = inner.run_fetch(key).await;
                    inner
                        .inflight
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .remove(&key);
                    let _ = tx.send(Some(result));
                });
                rx
            }
        };

        match rx.wait_for(Option::is_some).await {
            Ok(result) => (*result).clone().unwrap_or(Err(StoreError::Cancelled)),
            Err(_) => Err(StoreError::Cancelled),
        }
    }

    /// Apply a local-only partial update to one entity under `key`.
    ///
    /// Returns whether an entity was actually modified. The change is not
    /// sent anywhere; the next successful refresh overwrites it with
    /// server truth.
    pub fn patch_entity(&self, key: ResourceKey, entity_id: &str, patch: &EntityPatch) -> bool {
        let changed = {
            let mut snapshots = self
                .inner
                .snapshots
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let Some(data) = snapshots.get_mut(&key).and_then(|s| s.data.as_mut()) else {
                return false;
            };

            match (data, patch) {
                (ResourceData::Events(events), EntityPatch::Event(patch)) => events
                    .iter_mut()
                    .find(|event| event.id.as_str() == entity_id)
                    .map(|event| {
                        if let Some(ticket_count) = patch.ticket_count {
                            event.ticket_count = ticket_count;
                        }
                        if let Some(price) = patch.price {
                            event.price = price;
                        }
                    })
                    .is_some(),
                (ResourceData::Orders(orders), EntityPatch::Order(patch)) => orders
                    .iter_mut()
                    .find(|order| order.id.as_str() == entity_id)
                    .map(|order| {
                        if let Some(status) = patch.status {
                            order.status = status;
                        }
                        if let Some(quantity) = patch.quantity {
                            order.quantity = quantity;
                        }
                    })
                    .is_some(),
                _ => false,
            }
        };

        if changed {
            let _ = self.inner.changes.send(key);
        }
        changed
    }

    /// Optimistically take `quantity` tickets off an event's local count.
    ///
    /// Saturates at zero. Used after a purchase action so consumers see the
    /// reduced inventory before the next refresh reconciles it.
    pub fn decrement_ticket_count(&self, event_id: &EventId, quantity: u32) -> bool {
        let changed = {
            let mut snapshots = self
                .inner
                .snapshots
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let Some(ResourceData::Events(events)) = snapshots
                .get_mut(&ResourceKey::Events)
                .and_then(|s| s.data.as_mut())
            else {
                return false;
            };

            events
                .iter_mut()
                .find(|event| event.id == *event_id)
                .map(|event| {
                    event.ticket_count = event.ticket_count.saturating_sub(quantity);
                })
                .is_some()
        };

        if changed {
            let _ = self.inner.changes.send(ResourceKey::Events);
        }
        changed
    }
}

impl<F: ResourceFetcher> Inner<F> {
    async fn run_fetch(&self, key: ResourceKey) -> FetchResult {
        let result = self.fetcher.fetch(key).await;

        let outcome = {
            let mut snapshots = self.snapshots.write().unwrap_or_else(PoisonError::into_inner);
            let state = snapshots.entry(key).or_default();
            state.is_loading = false;

            match result {
                Ok(data) => {
                    debug!(%key, count = data.len(), "snapshot refreshed");
                    state.data = Some(data);
                    state.error = None;
                    state.fetched_at = Some(Instant::now());
                    Ok(())
                }
                Err(error) => {
                    warn!(%key, %error, "refresh failed, keeping previous snapshot");
                    state.error = Some(error.clone());
                    Err(error)
                }
            }
        };

        if outcome.is_ok() {
            let _ = self.changes.send(key);
        }
        outcome
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{TimeZone, Utc};
    use tokio::sync::Semaphore;
    use tokio::time::{Duration as TokioDuration, sleep, timeout};

    const WINDOW: Duration = Duration::from_secs(300);

    fn make_event(id: &str, ticket_count: u32) -> Event {
        Event {
            id: EventId::new(id),
            title: "Noite de Samba".to_string(),
            date: Utc.with_ymd_and_hms(2026, 9, 12, 21, 0, 0).unwrap(),
            location: "Circo Voador".to_string(),
            price: "120.00".parse().unwrap(),
            category: "shows".to_string(),
            city: "Rio de Janeiro".to_string(),
            ticket_count,
        }
    }

    fn events(data: Vec<Event>) -> ResourceData {
        ResourceData::Events(data)
    }

    /// Test fetcher: counts calls, pops queued responses, and can hold
    /// fetches at a gate until the test releases them.
    struct MockFetcher {
        calls: AtomicUsize,
        gate: Semaphore,
        responses: Mutex<VecDeque<Result<ResourceData, StoreError>>>,
    }

    impl MockFetcher {
        fn new(
            permits: usize,
            responses: Vec<Result<ResourceData, StoreError>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                gate: Semaphore::new(permits),
                responses: Mutex::new(responses.into_iter().collect()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ResourceFetcher for Arc<MockFetcher> {
        fn fetch(
            &self,
            _key: ResourceKey,
        ) -> impl std::future::Future<Output = Result<ResourceData, StoreError>> + Send {
            async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let permit = self
                    .gate
                    .acquire()
                    .await
                    .map_err(|_| StoreError::Cancelled)?;
                permit.forget();
                self.responses
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or_else(|| Ok(events(vec![])))
            }
        }
    }

    fn store(fetcher: &Arc<MockFetcher>) -> SnapshotStore<Arc<MockFetcher>> {
        SnapshotStore::new(Arc::clone(fetcher), WINDOW)
    }

    #[tokio::test]
    async fn test_empty_snapshot_before_first_refresh() {
        let fetcher = MockFetcher::new(0, vec![]);
        let store = store(&fetcher);

        let snapshot = store.snapshot(ResourceKey::Events);
        assert!(snapshot.data.is_none());
        assert!(snapshot.error.is_none());
        assert!(!snapshot.is_loading);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_coalesce_into_one_fetch() {
        let fetcher = MockFetcher::new(0, vec![Ok(events(vec![make_event("evt_1", 5)]))]);
        let store = store(&fetcher);

        let a = tokio::spawn({
            let store = store.clone();
            async move { store.refresh(ResourceKey::Events).await }
        });
        let b = tokio::spawn({
            let store = store.clone();
            async move { store.refresh(ResourceKey::Events).await }
        });

        // Both callers are parked on the same in-flight fetch.
        sleep(TokioDuration::from_millis(50)).await;
        assert_eq!(fetcher.calls(), 1);

        fetcher.gate.add_permits(1);
        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_during_inflight_returns_previous_value() {
        let fetcher = MockFetcher::new(
            1,
            vec![
                Ok(events(vec![make_event("evt_1", 5)])),
                Ok(events(vec![make_event("evt_1", 3)])),
            ],
        );
        let store = store(&fetcher);

        store.refresh(ResourceKey::Events).await.unwrap();

        // Second fetch is gated; the store must keep serving the first value.
        let handle = tokio::spawn({
            let store = store.clone();
            async move { store.force_refresh(ResourceKey::Events).await }
        });
        sleep(TokioDuration::from_millis(50)).await;

        let snapshot = store.snapshot(ResourceKey::Events);
        assert!(snapshot.is_loading);
        assert_eq!(snapshot.data, Some(events(vec![make_event("evt_1", 5)])));

        fetcher.gate.add_permits(1);
        handle.await.unwrap().unwrap();

        let snapshot = store.snapshot(ResourceKey::Events);
        assert!(!snapshot.is_loading);
        assert_eq!(snapshot.data, Some(events(vec![make_event("evt_1", 3)])));
    }

    #[tokio::test]
    async fn test_refresh_within_staleness_window_is_noop() {
        let fetcher = MockFetcher::new(1, vec![Ok(events(vec![make_event("evt_1", 5)]))]);
        let store = store(&fetcher);

        store.refresh(ResourceKey::Events).await.unwrap();
        assert_eq!(fetcher.calls(), 1);

        // Fresh snapshot: no second fetch, and no hang on the empty gate.
        timeout(TokioDuration::from_secs(1), store.refresh(ResourceKey::Events))
            .await
            .expect("no-op refresh must not block")
            .unwrap();
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_ignores_staleness_window() {
        let fetcher = MockFetcher::new(2, vec![]);
        let store = store(&fetcher);

        store.refresh(ResourceKey::Events).await.unwrap();
        store.force_refresh(ResourceKey::Events).await.unwrap();
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_preserves_data_and_records_error() {
        let fetcher = MockFetcher::new(2, vec![
            Ok(events(vec![make_event("evt_1", 5)])),
            Err(StoreError::Upstream { status: 503 }),
        ]);
        let store = store(&fetcher);

        store.refresh(ResourceKey::Events).await.unwrap();

        let err = store.force_refresh(ResourceKey::Events).await.unwrap_err();
        assert_eq!(err, StoreError::Upstream { status: 503 });

        let snapshot = store.snapshot(ResourceKey::Events);
        assert_eq!(snapshot.data, Some(events(vec![make_event("evt_1", 5)])));
        assert_eq!(snapshot.error, Some(StoreError::Upstream { status: 503 }));
    }

    #[tokio::test]
    async fn test_error_cleared_after_successful_refresh() {
        let fetcher = MockFetcher::new(2, vec![
            Err(StoreError::Transport("connection refused".to_string())),
            Ok(events(vec![make_event("evt_1", 5)])),
        ]);
        let store = store(&fetcher);

        assert!(store.refresh(ResourceKey::Events).await.is_err());
        assert!(store.snapshot(ResourceKey::Events).error.is_some());

        store.force_refresh(ResourceKey::Events).await.unwrap();
        let snapshot = store.snapshot(ResourceKey::Events);
        assert!(snapshot.error.is_none());
        assert!(snapshot.data.is_some());
    }

    #[tokio::test]
    async fn test_optimistic_patch_survives_failed_refresh() {
        let fetcher = MockFetcher::new(2, vec![
            Ok(events(vec![make_event("evt_1", 10)])),
            Err(StoreError::Upstream { status: 500 }),
        ]);
        let store = store(&fetcher);

        store.refresh(ResourceKey::Events).await.unwrap();

        let patch = EntityPatch::Event(EventPatch {
            ticket_count: Some(7),
            ..EventPatch::default()
        });
        assert!(store.patch_entity(ResourceKey::Events, "evt_1", &patch));

        // Failed refresh: the optimistic value stays (no rollback).
        assert!(store.force_refresh(ResourceKey::Events).await.is_err());
        assert_eq!(
            store.snapshot(ResourceKey::Events).data,
            Some(events(vec![make_event("evt_1", 7)]))
        );
    }

    #[tokio::test]
    async fn test_successful_refresh_overwrites_optimistic_patch() {
        let fetcher = MockFetcher::new(2, vec![
            Ok(events(vec![make_event("evt_1", 10)])),
            Ok(events(vec![make_event("evt_1", 10)])),
        ]);
        let store = store(&fetcher);

        store.refresh(ResourceKey::Events).await.unwrap();
        store.patch_entity(
            ResourceKey::Events,
            "evt_1",
            &EntityPatch::Event(EventPatch {
                ticket_count: Some(2),
                ..EventPatch::default()
            }),
        );

        // Server truth wins on the next successful fetch.
        store.force_refresh(ResourceKey::Events).await.unwrap();
        assert_eq!(
            store.snapshot(ResourceKey::Events).data,
            Some(events(vec![make_event("evt_1", 10)]))
        );
    }

    #[tokio::test]
    async fn test_patch_misses_are_noops() {
        let fetcher = MockFetcher::new(1, vec![Ok(events(vec![make_event("evt_1", 10)]))]);
        let store = store(&fetcher);

        let patch = EntityPatch::Event(EventPatch::default());

        // No snapshot yet.
        assert!(!store.patch_entity(ResourceKey::Events, "evt_1", &patch));

        store.refresh(ResourceKey::Events).await.unwrap();

        // Unknown entity, and a patch aimed at the wrong collection.
        assert!(!store.patch_entity(ResourceKey::Events, "evt_404", &patch));
        assert!(!store.patch_entity(
            ResourceKey::Events,
            "evt_1",
            &EntityPatch::Order(OrderPatch::default())
        ));
    }

    #[tokio::test]
    async fn test_decrement_ticket_count_saturates() {
        let fetcher = MockFetcher::new(1, vec![Ok(events(vec![make_event("evt_1", 3)]))]);
        let store = store(&fetcher);
        store.refresh(ResourceKey::Events).await.unwrap();

        assert!(store.decrement_ticket_count(&EventId::new("evt_1"), 2));
        assert!(store.decrement_ticket_count(&EventId::new("evt_1"), 5));

        let Some(ResourceData::Events(events)) = store.snapshot(ResourceKey::Events).data else {
            panic!("events snapshot missing");
        };
        assert_eq!(events.first().map(|e| e.ticket_count), Some(0));

        assert!(!store.decrement_ticket_count(&EventId::new("evt_404"), 1));
    }

    #[tokio::test]
    async fn test_subscribers_notified_on_refresh_and_patch() {
        let fetcher = MockFetcher::new(1, vec![Ok(events(vec![make_event("evt_1", 10)]))]);
        let store = store(&fetcher);
        let mut changes = store.subscribe();

        store.refresh(ResourceKey::Events).await.unwrap();
        assert_eq!(changes.recv().await.unwrap(), ResourceKey::Events);

        store.decrement_ticket_count(&EventId::new("evt_1"), 1);
        assert_eq!(changes.recv().await.unwrap(), ResourceKey::Events);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let fetcher = MockFetcher::new(2, vec![
            Ok(events(vec![make_event("evt_1", 10)])),
            Err(StoreError::Upstream { status: 500 }),
        ]);
        let store = store(&fetcher);

        store.refresh(ResourceKey::Events).await.unwrap();
        assert!(store.refresh(ResourceKey::Categories).await.is_err());

        // The failure over one key never bleeds into another's snapshot.
        assert!(store.snapshot(ResourceKey::Events).error.is_none());
        assert!(store.snapshot(ResourceKey::Categories).error.is_some());
    }
}
