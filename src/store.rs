use crate::db;
use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, warn};
use uuid::Uuid;

/// A single record body. Bodies are always JSON objects.
pub type Document = Map<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no id provided for {op}")]
    MissingId { op: &'static str },
    #[error("invalid path segment {0:?}")]
    InvalidPath(String),
    #[error("record body must be a JSON object")]
    NotAnObject,
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::MissingId { .. } => "missing_id",
            StoreError::InvalidPath(_) => "invalid_path",
            StoreError::NotAnObject => "bad_params",
            StoreError::Db(_) | StoreError::Json(_) => "store_failed",
        }
    }
}

/// Every child of one collection at a point in time, ordered by key.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub collection: String,
    pub children: Vec<(String, Document)>,
}

#[derive(Debug, Clone)]
pub enum StoreEvent {
    Snapshot(Snapshot),
    Error(String),
}

#[derive(Debug, Clone)]
pub enum Write {
    Set {
        collection: String,
        key: String,
        body: Document,
    },
    Merge {
        collection: String,
        key: String,
        patch: Document,
    },
    Remove {
        collection: String,
        key: String,
    },
    Clear {
        collection: String,
    },
}

impl Write {
    fn collection(&self) -> &str {
        match self {
            Write::Set { collection, .. }
            | Write::Merge { collection, .. }
            | Write::Remove { collection, .. }
            | Write::Clear { collection } => collection.as_str(),
        }
    }

    fn op(&self) -> &'static str {
        match self {
            Write::Set { .. } => "set",
            Write::Merge { .. } => "update",
            Write::Remove { .. } => "remove",
            Write::Clear { .. } => "clear",
        }
    }

    fn key(&self) -> Option<&str> {
        match self {
            Write::Set { key, .. } | Write::Merge { key, .. } | Write::Remove { key, .. } => {
                Some(key.as_str())
            }
            Write::Clear { .. } => None,
        }
    }
}

struct Subscriber {
    collection: String,
    tx: Sender<StoreEvent>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: HashMap<u64, Subscriber>,
}

/// Live listener on one collection. Dropping it unregisters the listener.
pub struct Subscription {
    id: u64,
    collection: String,
    registry: Rc<RefCell<Registry>>,
    rx: Receiver<StoreEvent>,
}

impl Subscription {
    pub fn try_next(&self) -> Option<StoreEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.borrow_mut().subscribers.remove(&self.id);
        debug!(collection = %self.collection, id = self.id, "unsubscribed");
    }
}

/// Collection store addressed by `collection/key` paths, with push
/// notification to subscribers after every committed write.
pub struct DocumentStore {
    conn: Connection,
    registry: Rc<RefCell<Registry>>,
}

impl DocumentStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            registry: Rc::new(RefCell::new(Registry::default())),
        }
    }

    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        Ok(Self::new(db::open_store_db(workspace)?))
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        let conn = Connection::open_in_memory().expect("in-memory sqlite");
        db::init_store_schema(&conn).expect("store schema");
        Self::new(conn)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn snapshot(&self, collection: &str) -> Result<Snapshot, StoreError> {
        validate_collection(collection)?;
        let mut stmt = self.conn.prepare(
            "SELECT key, body
             FROM documents
             WHERE collection = ?
             ORDER BY key",
        )?;
        let rows = stmt
            .query_map([collection], |r| {
                Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        let mut children = Vec::with_capacity(rows.len());
        for (key, body) in rows {
            children.push((key, parse_body(&body)?));
        }
        Ok(Snapshot {
            collection: collection.to_string(),
            children,
        })
    }

    pub fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        validate_collection(collection)?;
        validate_key("get", key)?;
        read_body(&self.conn, collection, key)
    }

    /// Writes `body` under a freshly generated, time-ordered key.
    pub fn push(&self, collection: &str, body: Document) -> Result<String, StoreError> {
        let key = Uuid::now_v7().to_string();
        self.apply(vec![Write::Set {
            collection: collection.to_string(),
            key: key.clone(),
            body,
        }])?;
        Ok(key)
    }

    pub fn set(&self, collection: &str, key: &str, body: Document) -> Result<(), StoreError> {
        self.apply(vec![Write::Set {
            collection: collection.to_string(),
            key: key.to_string(),
            body,
        }])
    }

    pub fn update(&self, collection: &str, key: &str, patch: Document) -> Result<(), StoreError> {
        self.apply(vec![Write::Merge {
            collection: collection.to_string(),
            key: key.to_string(),
            patch,
        }])
    }

    pub fn remove(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        self.apply(vec![Write::Remove {
            collection: collection.to_string(),
            key: key.to_string(),
        }])
    }

    /// Runs every write in one transaction. Subscribers of each touched
    /// collection receive one fresh snapshot after commit.
    pub fn apply(&self, writes: Vec<Write>) -> Result<(), StoreError> {
        if writes.is_empty() {
            return Ok(());
        }
        for w in &writes {
            validate_collection(w.collection())?;
            if let Some(key) = w.key() {
                validate_key(w.op(), key)?;
            }
        }

        let now = timestamp();
        let mut touched = BTreeSet::new();
        let tx = self.conn.unchecked_transaction()?;
        for w in writes {
            touched.insert(w.collection().to_string());
            match w {
                Write::Set {
                    collection,
                    key,
                    mut body,
                } => {
                    body.remove("id");
                    put_body(&tx, &collection, &key, &body, &now)?;
                }
                Write::Merge {
                    collection,
                    key,
                    patch,
                } => {
                    let mut body = read_body(&tx, &collection, &key)?.unwrap_or_default();
                    for (field, value) in patch {
                        if field == "id" {
                            continue;
                        }
                        if value.is_null() {
                            body.remove(&field);
                        } else {
                            body.insert(field, value);
                        }
                    }
                    if body.is_empty() {
                        tx.execute(
                            "DELETE FROM documents WHERE collection = ? AND key = ?",
                            (&collection, &key),
                        )?;
                    } else {
                        put_body(&tx, &collection, &key, &body, &now)?;
                    }
                }
                Write::Remove { collection, key } => {
                    tx.execute(
                        "DELETE FROM documents WHERE collection = ? AND key = ?",
                        (&collection, &key),
                    )?;
                }
                Write::Clear { collection } => {
                    tx.execute("DELETE FROM documents WHERE collection = ?", [&collection])?;
                }
            }
        }
        tx.commit()?;

        self.notify(&touched);
        Ok(())
    }

    /// Registers a listener. The current snapshot is queued immediately.
    pub fn subscribe(&self, collection: &str) -> Result<Subscription, StoreError> {
        validate_collection(collection)?;
        let (tx, rx) = mpsc::channel();
        let id = {
            let mut reg = self.registry.borrow_mut();
            reg.next_id += 1;
            let id = reg.next_id;
            reg.subscribers.insert(
                id,
                Subscriber {
                    collection: collection.to_string(),
                    tx: tx.clone(),
                },
            );
            id
        };
        debug!(collection, id, "subscribed");
        let _ = tx.send(self.event_for(collection));
        Ok(Subscription {
            id,
            collection: collection.to_string(),
            registry: Rc::clone(&self.registry),
            rx,
        })
    }

    pub fn subscriber_count(&self, collection: &str) -> usize {
        self.registry
            .borrow()
            .subscribers
            .values()
            .filter(|s| s.collection == collection)
            .count()
    }

    pub fn total_subscribers(&self) -> usize {
        self.registry.borrow().subscribers.len()
    }

    fn event_for(&self, collection: &str) -> StoreEvent {
        match self.snapshot(collection) {
            Ok(s) => StoreEvent::Snapshot(s),
            Err(e) => {
                warn!(collection, error = %e, "snapshot read failed");
                StoreEvent::Error(e.to_string())
            }
        }
    }

    fn notify(&self, touched: &BTreeSet<String>) {
        let targets: Vec<(u64, String, Sender<StoreEvent>)> = self
            .registry
            .borrow()
            .subscribers
            .iter()
            .filter(|(_, s)| touched.contains(&s.collection))
            .map(|(id, s)| (*id, s.collection.clone(), s.tx.clone()))
            .collect();
        if targets.is_empty() {
            return;
        }

        let mut events: HashMap<String, StoreEvent> = HashMap::new();
        let mut dead = Vec::new();
        for (id, collection, tx) in targets {
            let event = events
                .entry(collection.clone())
                .or_insert_with(|| self.event_for(&collection))
                .clone();
            if tx.send(event).is_err() {
                dead.push(id);
            }
        }
        if !dead.is_empty() {
            let mut reg = self.registry.borrow_mut();
            for id in dead {
                reg.subscribers.remove(&id);
            }
        }
    }
}

pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serializes a value into a record body.
pub fn to_document<T: serde::Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject),
    }
}

fn validate_collection(collection: &str) -> Result<(), StoreError> {
    let ok = !collection.is_empty()
        && collection
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidPath(collection.to_string()))
    }
}

fn validate_key(op: &'static str, key: &str) -> Result<(), StoreError> {
    if key.trim().is_empty() {
        return Err(StoreError::MissingId { op });
    }
    if key.chars().any(|c| matches!(c, '/' | '.' | '#' | '$' | '[' | ']')) {
        return Err(StoreError::InvalidPath(key.to_string()));
    }
    Ok(())
}

fn parse_body(raw: &str) -> Result<Document, StoreError> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject),
    }
}

fn read_body(conn: &Connection, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT body FROM documents WHERE collection = ? AND key = ?",
            (collection, key),
            |r| r.get(0),
        )
        .optional()?;
    raw.map(|s| parse_body(&s)).transpose()
}

fn put_body(
    conn: &Connection,
    collection: &str,
    key: &str,
    body: &Document,
    now: &str,
) -> Result<(), StoreError> {
    let text = serde_json::to_string(body)?;
    conn.execute(
        "INSERT INTO documents(collection, key, body, updated_at)
         VALUES(?, ?, ?, ?)
         ON CONFLICT(collection, key) DO UPDATE SET
           body = excluded.body,
           updated_at = excluded.updated_at",
        (collection, key, &text, now),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        v.as_object().cloned().expect("object")
    }

    #[test]
    fn push_then_snapshot_contains_generated_key() {
        let store = DocumentStore::in_memory();
        let key = store
            .push("students", doc(json!({ "fullName": "Ada" })))
            .expect("push");
        let snap = store.snapshot("students").expect("snapshot");
        assert_eq!(snap.children.len(), 1);
        assert_eq!(snap.children[0].0, key);
        assert_eq!(snap.children[0].1.get("fullName"), Some(&json!("Ada")));
    }

    #[test]
    fn update_merges_fields_and_null_removes() {
        let store = DocumentStore::in_memory();
        store
            .set("fees", "f1", doc(json!({ "amount": 100, "note": "x", "id": "ignored" })))
            .expect("set");
        store
            .update("fees", "f1", doc(json!({ "amount": 120, "note": null })))
            .expect("update");
        let body = store.get("fees", "f1").expect("get").expect("exists");
        assert_eq!(body.get("amount"), Some(&json!(120)));
        assert!(body.get("note").is_none());
        assert!(body.get("id").is_none());
    }

    #[test]
    fn invalid_batch_writes_nothing() {
        let store = DocumentStore::in_memory();
        let err = store
            .apply(vec![
                Write::Set {
                    collection: "students".into(),
                    key: "s1".into(),
                    body: doc(json!({ "fullName": "A" })),
                },
                Write::Set {
                    collection: "students".into(),
                    key: "bad/key".into(),
                    body: doc(json!({ "fullName": "B" })),
                },
            ])
            .unwrap_err();
        assert_eq!(err.code(), "invalid_path");
        assert!(store.snapshot("students").expect("snapshot").children.is_empty());
    }

    #[test]
    fn empty_key_is_missing_id() {
        let store = DocumentStore::in_memory();
        let err = store.remove("students", "").unwrap_err();
        assert!(matches!(err, StoreError::MissingId { op: "remove" }));
    }

    #[test]
    fn subscription_receives_initial_and_followup_snapshots() {
        let store = DocumentStore::in_memory();
        let sub = store.subscribe("classes").expect("subscribe");
        match sub.try_next() {
            Some(StoreEvent::Snapshot(s)) => assert!(s.children.is_empty()),
            other => panic!("expected initial snapshot, got {other:?}"),
        }
        store
            .set("classes", "c1", doc(json!({ "name": "Grade 1" })))
            .expect("set");
        match sub.try_next() {
            Some(StoreEvent::Snapshot(s)) => assert_eq!(s.children.len(), 1),
            other => panic!("expected pushed snapshot, got {other:?}"),
        }
        // Writes elsewhere do not wake this listener.
        store
            .set("subjects", "m1", doc(json!({ "name": "Math" })))
            .expect("set");
        assert!(sub.try_next().is_none());
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let store = DocumentStore::in_memory();
        let a = store.subscribe("students").expect("subscribe");
        let b = store.subscribe("students").expect("subscribe");
        assert_eq!(store.subscriber_count("students"), 2);
        drop(a);
        assert_eq!(store.subscriber_count("students"), 1);
        drop(b);
        assert_eq!(store.total_subscribers(), 0);
    }

    #[test]
    fn clear_and_set_land_in_one_snapshot() {
        let store = DocumentStore::in_memory();
        store
            .set("announcements", "a1", doc(json!({ "message": "old", "active": true })))
            .expect("set");
        let sub = store.subscribe("announcements").expect("subscribe");
        let _ = sub.try_next();
        store
            .apply(vec![
                Write::Clear {
                    collection: "announcements".into(),
                },
                Write::Set {
                    collection: "announcements".into(),
                    key: "a2".into(),
                    body: doc(json!({ "message": "new", "active": true })),
                },
            ])
            .expect("apply");
        match sub.try_next() {
            Some(StoreEvent::Snapshot(s)) => {
                assert_eq!(s.children.len(), 1);
                assert_eq!(s.children[0].0, "a2");
            }
            other => panic!("expected snapshot, got {other:?}"),
        }
        assert!(sub.try_next().is_none());
    }
}
