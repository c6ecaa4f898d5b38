use crate::db;
use crate::model::{Role, UserProfile, DEFAULT_APP_NAME};
use crate::repo::Repository;
use crate::store::{timestamp, StoreError};
use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Signed-in identity as reported by the identity provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("email already registered: {0}")]
    EmailTaken(String),
    #[error("password must be at least 6 characters")]
    WeakPassword,
    #[error("missing {0}")]
    MissingField(&'static str),
    #[error("accounts already exist")]
    AlreadyInitialized,
    #[error("identity storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "auth_failed",
            AuthError::EmailTaken(_) | AuthError::AlreadyInitialized => "conflict",
            AuthError::WeakPassword | AuthError::MissingField(_) => "validation_failed",
            AuthError::Storage(_) => "store_failed",
            AuthError::Store(e) => e.code(),
        }
    }
}

pub trait IdentityProvider {
    fn sign_in(&self, email: &str, password: &str) -> Result<Principal, AuthError>;
    fn sign_out(&self);
    fn current(&self) -> Option<Principal>;
    /// Registers a login without touching the current session.
    fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Principal, AuthError>;
    fn has_accounts(&self) -> Result<bool, AuthError>;
}

/// Email/password accounts kept next to the workspace.
pub struct LocalIdentity {
    conn: Connection,
    current: RefCell<Option<Principal>>,
}

impl LocalIdentity {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        Ok(Self::new(db::open_identity_db(workspace)?))
    }

    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            current: RefCell::new(None),
        }
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        let conn = Connection::open_in_memory().expect("in-memory sqlite");
        db::init_identity_schema(&conn).expect("identity schema");
        Self::new(conn)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

impl IdentityProvider for LocalIdentity {
    fn sign_in(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        let email = normalize_email(email);
        let row: Option<(String, Option<String>, String, String)> = self
            .conn
            .query_row(
                "SELECT uid, display_name, salt, password_hash FROM accounts WHERE email = ?",
                [&email],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .optional()?;
        let Some((uid, display_name, salt, expected)) = row else {
            return Err(AuthError::InvalidCredentials);
        };
        if hash_password(&salt, password) != expected {
            return Err(AuthError::InvalidCredentials);
        }
        let principal = Principal {
            uid,
            email,
            display_name,
        };
        *self.current.borrow_mut() = Some(principal.clone());
        info!(uid = %principal.uid, "signed in");
        Ok(principal)
    }

    fn sign_out(&self) {
        if let Some(p) = self.current.borrow_mut().take() {
            info!(uid = %p.uid, "signed out");
        }
    }

    fn current(&self) -> Option<Principal> {
        self.current.borrow().clone()
    }

    fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Principal, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AuthError::MissingField("email"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }
        let taken: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM accounts WHERE email = ?", [&email], |r| {
                r.get(0)
            })
            .optional()?;
        if taken.is_some() {
            return Err(AuthError::EmailTaken(email));
        }

        let uid = Uuid::new_v4().simple().to_string();
        let salt = Uuid::new_v4().simple().to_string();
        let display_name = display_name.trim();
        self.conn.execute(
            "INSERT INTO accounts(uid, email, display_name, salt, password_hash, created_at)
             VALUES(?, ?, ?, ?, ?, ?)",
            (
                &uid,
                &email,
                if display_name.is_empty() {
                    None
                } else {
                    Some(display_name)
                },
                &salt,
                hash_password(&salt, password),
                timestamp(),
            ),
        )?;
        Ok(Principal {
            uid,
            email,
            display_name: Some(display_name.to_string()).filter(|s| !s.is_empty()),
        })
    }

    fn has_accounts(&self) -> Result<bool, AuthError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM accounts", [], |r| r.get(0))?;
        Ok(n > 0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionUser {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Loading,
    SignedOut,
    SignedIn(SessionUser),
}

/// Current principal, role and app name, passed to whatever needs them.
#[derive(Debug, Clone)]
pub struct SessionContext {
    state: SessionState,
    app_name: String,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self {
            state: SessionState::Loading,
            app_name: DEFAULT_APP_NAME.to_string(),
        }
    }
}

impl SessionContext {
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn user(&self) -> Option<&SessionUser> {
        match &self.state {
            SessionState::SignedIn(u) => Some(u),
            _ => None,
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn set_app_name(&mut self, name: &str) {
        let name = name.trim();
        self.app_name = if name.is_empty() {
            DEFAULT_APP_NAME.to_string()
        } else {
            name.to_string()
        };
    }

    /// Re-derives the session from the provider's principal and its profile.
    pub fn refresh(
        &mut self,
        principal: Option<Principal>,
        users: &Repository<UserProfile>,
    ) -> Result<(), StoreError> {
        self.state = match principal {
            None => SessionState::SignedOut,
            Some(p) => {
                let profile = users.get(&p.uid)?.map(|k| k.record);
                SessionState::SignedIn(resolve_user(&p, profile.as_ref()))
            }
        };
        Ok(())
    }

    pub fn clear(&mut self) {
        self.state = SessionState::SignedOut;
    }
}

pub fn resolve_user(principal: &Principal, profile: Option<&UserProfile>) -> SessionUser {
    let from_profile = profile
        .map(|p| p.display_name.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let display_name = from_profile
        .or_else(|| principal.display_name.clone().filter(|s| !s.trim().is_empty()))
        .unwrap_or_else(|| "User".to_string());
    SessionUser {
        uid: principal.uid.clone(),
        email: principal.email.clone(),
        display_name,
        role: profile.map(|p| p.role).unwrap_or(Role::Teacher),
    }
}

/// Creates a login plus its profile record.
pub fn register_user(
    identity: &dyn IdentityProvider,
    users: &Repository<UserProfile>,
    email: &str,
    password: &str,
    display_name: &str,
    role: Role,
) -> Result<Principal, AuthError> {
    if display_name.trim().is_empty() {
        return Err(AuthError::MissingField("displayName"));
    }
    let principal = identity.create_account(email, password, display_name)?;
    users.put(
        &principal.uid,
        &UserProfile {
            email: principal.email.clone(),
            display_name: display_name.trim().to_string(),
            role,
            phone: None,
            join_date: Some(timestamp()),
        },
    )?;
    info!(uid = %principal.uid, role = %role, "user registered");
    Ok(principal)
}

/// First-run setup: only allowed while no login exists.
pub fn bootstrap_admin(
    identity: &dyn IdentityProvider,
    users: &Repository<UserProfile>,
    email: &str,
    password: &str,
    display_name: &str,
) -> Result<Principal, AuthError> {
    if identity.has_accounts()? {
        return Err(AuthError::AlreadyInitialized);
    }
    register_user(identity, users, email, password, display_name, Role::Admin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SnapshotCache;
    use crate::store::DocumentStore;
    use std::rc::Rc;

    fn users() -> Repository<UserProfile> {
        Repository::new(
            Rc::new(DocumentStore::in_memory()),
            Rc::new(SnapshotCache::in_memory("t")),
        )
    }

    #[test]
    fn sign_in_checks_password_and_tracks_current() {
        let id = LocalIdentity::in_memory();
        id.create_account("Head@School.org", "secret1", "Head")
            .expect("create");
        assert!(matches!(
            id.sign_in("head@school.org", "wrong!!"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(id.current().is_none());
        let p = id.sign_in(" HEAD@school.org ", "secret1").expect("sign in");
        assert_eq!(id.current(), Some(p));
        id.sign_out();
        assert!(id.current().is_none());
    }

    #[test]
    fn create_account_rejects_duplicates_and_short_passwords() {
        let id = LocalIdentity::in_memory();
        assert!(matches!(
            id.create_account("a@b.c", "123", "A"),
            Err(AuthError::WeakPassword)
        ));
        id.create_account("a@b.c", "123456", "A").expect("create");
        assert!(matches!(
            id.create_account("A@B.C", "abcdef", "B"),
            Err(AuthError::EmailTaken(_))
        ));
    }

    #[test]
    fn missing_profile_falls_back_to_teacher() {
        let p = Principal {
            uid: "u1".into(),
            email: "t@s.org".into(),
            display_name: None,
        };
        let u = resolve_user(&p, None);
        assert_eq!(u.role, Role::Teacher);
        assert_eq!(u.display_name, "User");

        let profile = UserProfile {
            display_name: "Ms. Finance".into(),
            role: Role::Finance,
            ..UserProfile::default()
        };
        let u = resolve_user(&p, Some(&profile));
        assert_eq!(u.role, Role::Finance);
        assert_eq!(u.display_name, "Ms. Finance");
    }

    #[test]
    fn bootstrap_only_once_and_session_resolves_admin() {
        let id = LocalIdentity::in_memory();
        let users = users();
        bootstrap_admin(&id, &users, "admin@s.org", "admin123", "Admin").expect("bootstrap");
        assert!(matches!(
            bootstrap_admin(&id, &users, "x@s.org", "admin123", "X"),
            Err(AuthError::AlreadyInitialized)
        ));

        let mut session = SessionContext::default();
        assert_eq!(session.state(), &SessionState::Loading);
        let p = id.sign_in("admin@s.org", "admin123").expect("sign in");
        session.refresh(Some(p), &users).expect("refresh");
        assert_eq!(session.user().map(|u| u.role), Some(Role::Admin));
        session.refresh(None, &users).expect("refresh");
        assert_eq!(session.state(), &SessionState::SignedOut);
    }
}
