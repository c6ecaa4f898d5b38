use crate::db;
use crate::store::timestamp;
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

/// Durable last-known array per collection path, read synchronously at bind
/// time so callers can render before the live subscription settles.
pub struct SnapshotCache {
    conn: Connection,
    prefix: String,
}

impl SnapshotCache {
    pub fn open(workspace: &Path, prefix: &str) -> anyhow::Result<Self> {
        Ok(Self {
            conn: db::open_cache_db(workspace)?,
            prefix: prefix.to_string(),
        })
    }

    #[cfg(test)]
    pub fn in_memory(prefix: &str) -> Self {
        let conn = Connection::open_in_memory().expect("in-memory sqlite");
        db::init_cache_schema(&conn).expect("cache schema");
        Self {
            conn,
            prefix: prefix.to_string(),
        }
    }

    pub fn cache_key(&self, path: &str) -> String {
        format!("{}_cache_{}", self.prefix, path)
    }

    /// Last array saved for `path`; empty when absent or undecodable.
    pub fn load<T: DeserializeOwned>(&self, path: &str) -> Vec<T> {
        let key = self.cache_key(path);
        let raw: Option<String> = match self
            .conn
            .query_row(
                "SELECT value FROM snapshot_cache WHERE cache_key = ?",
                [&key],
                |r| r.get(0),
            )
            .optional()
        {
            Ok(v) => v,
            Err(e) => {
                warn!(cache_key = %key, error = %e, "cache read failed");
                return Vec::new();
            }
        };
        let Some(raw) = raw else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(items) => items,
            Err(e) => {
                warn!(cache_key = %key, error = %e, "discarding undecodable cache entry");
                Vec::new()
            }
        }
    }

    pub fn save<T: Serialize>(&self, path: &str, items: &[T]) -> anyhow::Result<()> {
        let key = self.cache_key(path);
        let text = serde_json::to_string(items)?;
        self.conn.execute(
            "INSERT INTO snapshot_cache(cache_key, value, saved_at)
             VALUES(?, ?, ?)
             ON CONFLICT(cache_key) DO UPDATE SET
               value = excluded.value,
               saved_at = excluded.saved_at",
            (&key, &text, timestamp()),
        )?;
        Ok(())
    }

    pub fn evict(&self, path: &str) -> anyhow::Result<()> {
        self.conn.execute(
            "DELETE FROM snapshot_cache WHERE cache_key = ?",
            [self.cache_key(path)],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn key_format_uses_prefix_and_path() {
        let cache = SnapshotCache::in_memory("ayatiin");
        assert_eq!(cache.cache_key("students"), "ayatiin_cache_students");
    }

    #[test]
    fn save_then_load_returns_last_array() {
        let cache = SnapshotCache::in_memory("t");
        cache
            .save("classes", &[json!({ "id": "c1" })])
            .expect("save");
        cache
            .save("classes", &[json!({ "id": "c2" }), json!({ "id": "c3" })])
            .expect("save");
        let items: Vec<Value> = cache.load("classes");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["id"], "c2");
    }

    #[test]
    fn missing_and_evicted_paths_load_empty() {
        let cache = SnapshotCache::in_memory("t");
        assert!(cache.load::<Value>("fees").is_empty());
        cache.save("fees", &[json!({ "id": "f1" })]).expect("save");
        cache.evict("fees").expect("evict");
        assert!(cache.load::<Value>("fees").is_empty());
    }

    #[test]
    fn undecodable_entry_loads_empty() {
        let cache = SnapshotCache::in_memory("t");
        cache
            .conn
            .execute(
                "INSERT INTO snapshot_cache(cache_key, value, saved_at) VALUES(?, ?, ?)",
                ("t_cache_exams", "{not json", "now"),
            )
            .expect("insert");
        assert!(cache.load::<Value>("exams").is_empty());
    }
}
