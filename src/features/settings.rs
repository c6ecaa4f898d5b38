use super::{require, FeatureError};
use crate::live::Keyed;
use crate::model::{Announcement, AppSettings, UserProfile, DEFAULT_APP_NAME, GENERAL_SETTINGS_ID};
use crate::repo::Repository;
use crate::store::{timestamp, StoreError};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

pub fn app_name(repo: &Repository<AppSettings>) -> Result<String, StoreError> {
    Ok(repo
        .get(GENERAL_SETTINGS_ID)?
        .map(|k| k.record.app_name)
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_APP_NAME.to_string()))
}

pub fn set_app_name(repo: &Repository<AppSettings>, name: &str) -> Result<String, FeatureError> {
    require(name, "appName")?;
    let app_name = name.trim().to_string();
    repo.put(
        GENERAL_SETTINGS_ID,
        &AppSettings {
            app_name: app_name.clone(),
        },
    )?;
    info!(app_name = %app_name, "app name updated");
    Ok(app_name)
}

/// Replaces whatever announcement exists with a new active one.
pub fn post_announcement(
    repo: &Repository<Announcement>,
    title: Option<&str>,
    message: &str,
) -> Result<Keyed<Announcement>, FeatureError> {
    require(message, "message")?;
    let id = Uuid::now_v7().to_string();
    let record = Announcement {
        title: title.map(str::trim).filter(|t| !t.is_empty()).map(str::to_string),
        message: message.trim().to_string(),
        date: timestamp(),
        active: true,
    };
    repo.apply(vec![repo.clear_write(), repo.set_write(&id, &record)?])?;
    if let Err(e) = repo.evict_cache() {
        warn!(error = %e, "failed to evict announcement cache");
    }
    info!(id = %id, "announcement posted");
    Ok(Keyed { id, record })
}

pub fn active_announcement(list: &[Keyed<Announcement>]) -> Option<&Keyed<Announcement>> {
    list.iter().find(|a| a.record.active)
}

pub fn update_display_name(
    users: &Repository<UserProfile>,
    uid: &str,
    name: &str,
) -> Result<String, FeatureError> {
    require(name, "displayName")?;
    let name = name.trim().to_string();
    users.merge(uid, &json!({ "displayName": name }))?;
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SnapshotCache;
    use crate::store::DocumentStore;
    use std::rc::Rc;

    fn fixture() -> (Rc<DocumentStore>, Rc<SnapshotCache>) {
        (
            Rc::new(DocumentStore::in_memory()),
            Rc::new(SnapshotCache::in_memory("t")),
        )
    }

    #[test]
    fn app_name_defaults_until_set() {
        let (store, cache) = fixture();
        let repo: Repository<AppSettings> = Repository::new(store, cache);
        assert_eq!(app_name(&repo).expect("name"), "Ayatiin");
        set_app_name(&repo, " Hope Academy ").expect("set");
        assert_eq!(app_name(&repo).expect("name"), "Hope Academy");
        assert!(set_app_name(&repo, "").is_err());
    }

    #[test]
    fn posting_replaces_the_previous_announcement() {
        let (store, cache) = fixture();
        let repo: Repository<Announcement> = Repository::new(store, cache.clone());
        post_announcement(&repo, None, "first").expect("first");
        let mut live = repo.mount();
        assert_eq!(live.items().len(), 1);

        let second = post_announcement(&repo, Some("Notice"), "second").expect("second");
        assert!(cache.load::<Keyed<Announcement>>("announcements").is_empty());
        live.pump();
        assert_eq!(live.items().len(), 1);
        let active = active_announcement(live.items()).expect("active");
        assert_eq!(active.id, second.id);
        assert_eq!(active.record.title.as_deref(), Some("Notice"));
    }

    #[test]
    fn display_name_merge_keeps_role() {
        let (store, cache) = fixture();
        let users: Repository<UserProfile> = Repository::new(store, cache);
        users
            .put(
                "u1",
                &UserProfile {
                    email: "a@s.org".into(),
                    display_name: "Old".into(),
                    role: crate::model::Role::Finance,
                    ..UserProfile::default()
                },
            )
            .expect("put");
        update_display_name(&users, "u1", "New").expect("rename");
        let u = users.get("u1").expect("get").expect("exists");
        assert_eq!(u.record.display_name, "New");
        assert_eq!(u.record.role, crate::model::Role::Finance);
    }
}
