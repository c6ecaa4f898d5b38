use crate::cache::SnapshotCache;
use crate::features::settings;
use crate::live::LiveCollection;
use crate::model::{Entity, UserProfile};
use crate::repo::Repository;
use crate::session::{IdentityProvider, LocalIdentity, SessionContext};
use crate::shell::Route;
use crate::store::{Document, DocumentStore, StoreError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Open `live.watch` bindings per workspace; the oldest is dropped past this.
pub const MAX_WATCHES: usize = 32;

/// A raw binding plus the page that had to authorize it.
pub struct Watch {
    pub route: Route,
    pub live: LiveCollection<Document>,
}

/// Everything opened for one workspace directory.
pub struct Workspace {
    pub path: PathBuf,
    pub store: Rc<DocumentStore>,
    pub cache: Rc<SnapshotCache>,
    pub identity: LocalIdentity,
    pub session: SessionContext,
    /// Raw bindings opened by `live.watch`, keyed by time-ordered watch id.
    pub watches: BTreeMap<String, Watch>,
}

impl Workspace {
    pub fn open(path: &Path, cache_prefix: &str) -> anyhow::Result<Self> {
        let store = Rc::new(DocumentStore::open(path)?);
        let cache = Rc::new(SnapshotCache::open(path, cache_prefix)?);
        let identity = LocalIdentity::open(path)?;
        let mut ws = Self {
            path: path.to_path_buf(),
            store,
            cache,
            identity,
            session: SessionContext::default(),
            watches: BTreeMap::new(),
        };
        ws.refresh_session()?;
        info!(path = %path.display(), "workspace opened");
        Ok(ws)
    }

    pub fn repo<E: Entity>(&self) -> Repository<E> {
        Repository::new(Rc::clone(&self.store), Rc::clone(&self.cache))
    }

    pub fn mount<E: Entity>(&self) -> LiveCollection<E> {
        self.repo::<E>().mount()
    }

    /// Re-reads the principal and its profile, plus the app name.
    pub fn refresh_session(&mut self) -> Result<(), StoreError> {
        let principal = self.identity.current();
        let users: Repository<UserProfile> = self.repo();
        self.session.refresh(principal, &users)?;
        match settings::app_name(&self.repo()) {
            Ok(name) => self.session.set_app_name(&name),
            Err(e) => warn!(error = %e, "failed to read app name"),
        }
        Ok(())
    }

    /// Keeps at most `MAX_WATCHES` bindings; ids sort by creation time.
    pub fn add_watch(&mut self, watch_id: String, watch: Watch) {
        self.watches.insert(watch_id, watch);
        while self.watches.len() > MAX_WATCHES {
            if let Some((evicted, w)) = self.watches.pop_first() {
                debug!(watch_id = %evicted, path = %w.live.path(), "watch evicted");
            }
        }
    }

    pub fn sign_out(&mut self) {
        self.identity.sign_out();
        self.session.clear();
        self.watches.clear();
    }
}
