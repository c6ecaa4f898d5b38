use crate::cache::SnapshotCache;
use crate::store::{
    to_document, Document, DocumentStore, Snapshot, StoreError, StoreEvent, Subscription,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

const RETRY_BASE: Duration = Duration::from_millis(500);
const RETRY_MAX: Duration = Duration::from_secs(30);

/// A record together with the store key it lives under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyed<T> {
    pub id: String,
    #[serde(flatten)]
    pub record: T,
}

#[derive(Debug, Default, Clone)]
pub struct Backoff {
    attempt: u32,
}

impl Backoff {
    pub fn next_delay(&mut self) -> Duration {
        let factor = 1u32 << self.attempt.min(16);
        self.attempt = self.attempt.saturating_add(1);
        RETRY_BASE.saturating_mul(factor).min(RETRY_MAX)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Binds one collection path to live, cached client state.
///
/// Items only ever change when the store pushes a snapshot: mutators write
/// through and wait for the resulting push rather than patching local state.
pub struct LiveCollection<T> {
    path: String,
    store: Rc<DocumentStore>,
    cache: Rc<SnapshotCache>,
    items: Vec<Keyed<T>>,
    loading: bool,
    error: Option<String>,
    subscription: Option<Subscription>,
    backoff: Backoff,
    retry_at: Option<Instant>,
}

impl<T> LiveCollection<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub fn bind(store: Rc<DocumentStore>, cache: Rc<SnapshotCache>, path: &str) -> Self {
        let items = cache.load::<Keyed<T>>(path);
        let mut live = Self {
            path: path.to_string(),
            store,
            cache,
            items,
            loading: true,
            error: None,
            subscription: None,
            backoff: Backoff::default(),
            retry_at: None,
        };
        live.subscribe(Instant::now());
        live
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn items(&self) -> &[Keyed<T>] {
        &self.items
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn find(&self, id: &str) -> Option<&Keyed<T>> {
        self.items.iter().find(|k| k.id == id)
    }

    /// Drains queued store events. Returns how many snapshots were applied.
    pub fn pump(&mut self) -> usize {
        self.pump_at(Instant::now())
    }

    pub(crate) fn pump_at(&mut self, now: Instant) -> usize {
        if self.subscription.is_none() && self.retry_at.is_some_and(|at| at <= now) {
            self.subscribe(now);
        }
        let mut applied = 0;
        loop {
            let Some(event) = self.subscription.as_ref().and_then(|s| s.try_next()) else {
                break;
            };
            if matches!(event, StoreEvent::Snapshot(_)) {
                applied += 1;
            }
            self.apply_event(event, now);
        }
        applied
    }

    pub(crate) fn apply_event(&mut self, event: StoreEvent, now: Instant) {
        match event {
            StoreEvent::Snapshot(snapshot) => {
                self.items = decode_snapshot(&snapshot);
                if let Err(e) = self.cache.save(&self.path, &self.items) {
                    warn!(path = %self.path, error = %e, "failed to save snapshot cache");
                }
                self.error = None;
                self.loading = false;
                self.backoff.reset();
                self.retry_at = None;
            }
            StoreEvent::Error(message) => {
                error!(path = %self.path, error = %message, "collection read failed");
                self.error = Some(message);
                self.loading = false;
                self.subscription = None;
                let delay = self.backoff.next_delay();
                self.retry_at = Some(now + delay);
                debug!(path = %self.path, ?delay, "resubscribe scheduled");
            }
        }
    }

    fn subscribe(&mut self, now: Instant) {
        match self.store.subscribe(&self.path) {
            Ok(sub) => {
                self.subscription = Some(sub);
                self.retry_at = None;
            }
            Err(e) => self.apply_event(StoreEvent::Error(e.to_string()), now),
        }
    }

    /// Writes `record` under a generated key and returns the key.
    pub fn create(&self, record: &T) -> Result<String, StoreError> {
        let result = to_document(record).and_then(|body| self.store.push(&self.path, body));
        result.map_err(|e| {
            error!(path = %self.path, error = %e, "create failed");
            e
        })
    }

    /// Merges only the supplied fields into the record at `id`.
    pub fn update<P: Serialize>(&self, id: &str, patch: &P) -> Result<(), StoreError> {
        if id.trim().is_empty() {
            return Err(StoreError::MissingId { op: "update" });
        }
        let result = to_document(patch).and_then(|body| self.store.update(&self.path, id, body));
        result.map_err(|e| {
            error!(path = %self.path, id, error = %e, "update failed");
            e
        })
    }

    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        if id.trim().is_empty() {
            return Err(StoreError::MissingId { op: "delete" });
        }
        self.store.remove(&self.path, id).map_err(|e| {
            error!(path = %self.path, id, error = %e, "delete failed");
            e
        })
    }
}

fn decode_snapshot<T: DeserializeOwned>(snapshot: &Snapshot) -> Vec<Keyed<T>> {
    snapshot
        .children
        .iter()
        .filter_map(|(key, body)| match decode_child(key, body) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(collection = %snapshot.collection, key = %key, error = %e, "skipping malformed record");
                None
            }
        })
        .collect()
}

fn decode_child<T: DeserializeOwned>(key: &str, body: &Document) -> serde_json::Result<Keyed<T>> {
    let mut obj = body.clone();
    obj.insert("id".to_string(), Value::String(key.to_string()));
    serde_json::from_value(Value::Object(obj))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Row {
        name: String,
    }

    fn fixture() -> (Rc<DocumentStore>, Rc<SnapshotCache>) {
        (
            Rc::new(DocumentStore::in_memory()),
            Rc::new(SnapshotCache::in_memory("test")),
        )
    }

    fn snapshot(children: &[(&str, &str)]) -> StoreEvent {
        StoreEvent::Snapshot(Snapshot {
            collection: "rows".into(),
            children: children
                .iter()
                .map(|(k, n)| {
                    let body = json!({ "name": n }).as_object().cloned().expect("object");
                    (k.to_string(), body)
                })
                .collect(),
        })
    }

    #[test]
    fn bind_returns_cached_items_until_first_snapshot() {
        let (store, cache) = fixture();
        let cached = vec![Keyed {
            id: "old".to_string(),
            record: Row { name: "cached".into() },
        }];
        cache.save("rows", &cached).expect("seed cache");

        let mut live: LiveCollection<Row> = LiveCollection::bind(store, cache, "rows");
        assert_eq!(live.items(), cached.as_slice());
        assert!(live.loading());

        live.pump();
        assert!(live.items().is_empty());
        assert!(!live.loading());
    }

    #[test]
    fn last_snapshot_wins_without_merging() {
        let (store, cache) = fixture();
        let mut live: LiveCollection<Row> = LiveCollection::bind(store, cache.clone(), "rows");
        let now = Instant::now();
        live.apply_event(snapshot(&[("a", "A"), ("b", "B")]), now);
        live.apply_event(snapshot(&[("c", "C")]), now);
        let ids: Vec<&str> = live.items().iter().map(|k| k.id.as_str()).collect();
        assert_eq!(ids, vec!["c"]);

        let cached: Vec<Keyed<Row>> = cache.load("rows");
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].id, "c");
    }

    #[test]
    fn create_result_shows_up_after_push() {
        let (store, cache) = fixture();
        let mut live: LiveCollection<Row> = LiveCollection::bind(store, cache, "rows");
        live.pump();
        let key = live.create(&Row { name: "new".into() }).expect("create");
        assert!(live.find(&key).is_none());
        live.pump();
        let found = live.find(&key).expect("record with returned key");
        assert_eq!(found.record.name, "new");
    }

    #[test]
    fn empty_ids_fail_before_any_write() {
        let (store, cache) = fixture();
        let mut live: LiveCollection<Row> = LiveCollection::bind(store.clone(), cache, "rows");
        live.pump();
        let err = live.update("", &json!({ "name": "x" })).unwrap_err();
        assert!(matches!(err, StoreError::MissingId { op: "update" }));
        let err = live.delete("  ").unwrap_err();
        assert!(matches!(err, StoreError::MissingId { op: "delete" }));
        assert_eq!(live.pump(), 0);
        assert!(store.snapshot("rows").expect("snapshot").children.is_empty());
    }

    #[test]
    fn error_keeps_items_and_schedules_retry() {
        let (store, cache) = fixture();
        let mut live: LiveCollection<Row> = LiveCollection::bind(store, cache, "rows");
        let now = Instant::now();
        live.apply_event(snapshot(&[("a", "A")]), now);
        live.apply_event(StoreEvent::Error("permission denied".into()), now);
        assert_eq!(live.items().len(), 1);
        assert_eq!(live.error(), Some("permission denied"));
        assert!(!live.is_subscribed());

        // Not due yet.
        live.pump_at(now);
        assert!(!live.is_subscribed());

        live.pump_at(now + Duration::from_secs(1));
        assert!(live.is_subscribed());
        assert!(live.error().is_none());
    }

    #[test]
    fn malformed_records_are_skipped() {
        let (store, cache) = fixture();
        store
            .set("rows", "good", json!({ "name": "ok" }).as_object().cloned().expect("obj"))
            .expect("set");
        store
            .set("rows", "bad", json!({ "name": 7 }).as_object().cloned().expect("obj"))
            .expect("set");
        let mut live: LiveCollection<Row> = LiveCollection::bind(store, cache, "rows");
        live.pump();
        assert_eq!(live.items().len(), 1);
        assert_eq!(live.items()[0].id, "good");
    }

    #[test]
    fn independent_bindings_and_unsubscribe_on_drop() {
        let (store, cache) = fixture();
        let a: LiveCollection<Row> = LiveCollection::bind(store.clone(), cache.clone(), "rows");
        let b: LiveCollection<Row> = LiveCollection::bind(store.clone(), cache, "rows");
        assert_eq!(store.subscriber_count("rows"), 2);
        drop(a);
        assert_eq!(store.subscriber_count("rows"), 1);
        drop(b);
        assert_eq!(store.subscriber_count("rows"), 0);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let mut b = Backoff::default();
        assert_eq!(b.next_delay(), Duration::from_millis(500));
        assert_eq!(b.next_delay(), Duration::from_millis(1000));
        assert_eq!(b.next_delay(), Duration::from_millis(2000));
        for _ in 0..20 {
            b.next_delay();
        }
        assert_eq!(b.next_delay(), Duration::from_secs(30));
        b.reset();
        assert_eq!(b.next_delay(), Duration::from_millis(500));
    }
}
