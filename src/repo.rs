use crate::cache::SnapshotCache;
use crate::live::{Keyed, LiveCollection};
use crate::model::Entity;
use crate::store::{to_document, DocumentStore, StoreError, Write};
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::rc::Rc;

/// Typed access to one entity's collection. Callers never see the path.
pub struct Repository<E> {
    store: Rc<DocumentStore>,
    cache: Rc<SnapshotCache>,
    _entity: PhantomData<E>,
}

impl<E: Entity> Repository<E> {
    pub fn new(store: Rc<DocumentStore>, cache: Rc<SnapshotCache>) -> Self {
        Self {
            store,
            cache,
            _entity: PhantomData,
        }
    }

    /// Binds the collection and applies whatever the store has queued.
    pub fn mount(&self) -> LiveCollection<E> {
        let mut live = LiveCollection::bind(
            Rc::clone(&self.store),
            Rc::clone(&self.cache),
            E::COLLECTION,
        );
        live.pump();
        live
    }

    pub fn get(&self, id: &str) -> Result<Option<Keyed<E>>, StoreError> {
        let Some(mut body) = self.store.get(E::COLLECTION, id)? else {
            return Ok(None);
        };
        body.insert("id".to_string(), Value::String(id.to_string()));
        Ok(Some(serde_json::from_value(Value::Object(body))?))
    }

    /// Whole-record write under a caller-chosen key.
    pub fn put(&self, id: &str, record: &E) -> Result<(), StoreError> {
        self.store.set(E::COLLECTION, id, to_document(record)?)
    }

    /// Field-level merge into an existing record.
    pub fn merge<P: Serialize>(&self, id: &str, patch: &P) -> Result<(), StoreError> {
        self.store.update(E::COLLECTION, id, to_document(patch)?)
    }

    pub fn set_write(&self, id: &str, record: &E) -> Result<Write, StoreError> {
        Ok(Write::Set {
            collection: E::COLLECTION.to_string(),
            key: id.to_string(),
            body: to_document(record)?,
        })
    }

    pub fn remove_write(&self, id: &str) -> Write {
        Write::Remove {
            collection: E::COLLECTION.to_string(),
            key: id.to_string(),
        }
    }

    pub fn clear_write(&self) -> Write {
        Write::Clear {
            collection: E::COLLECTION.to_string(),
        }
    }

    pub fn apply(&self, writes: Vec<Write>) -> Result<(), StoreError> {
        self.store.apply(writes)
    }

    pub fn evict_cache(&self) -> anyhow::Result<()> {
        self.cache.evict(E::COLLECTION)
    }
}
