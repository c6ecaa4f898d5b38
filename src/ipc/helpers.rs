use crate::ipc::error::HandlerErr;
use crate::ipc::types::AppState;
use crate::model::Role;
use crate::session::SessionUser;
use crate::shell::{self, GuardState, Outcome, Route};
use crate::workspace::Workspace;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

pub fn get_required_str(params: &Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_opt_str(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Deserializes `params[key]` into a typed form.
pub fn get_form<T: DeserializeOwned>(params: &Value, key: &str) -> Result<T, HandlerErr> {
    let raw = params
        .get(key)
        .cloned()
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))?;
    serde_json::from_value(raw).map_err(|e| HandlerErr::bad_params(format!("invalid {}: {}", key, e)))
}

pub fn workspace_mut(state: &mut AppState) -> Result<&mut Workspace, HandlerErr> {
    state
        .workspace
        .as_mut()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

/// Runs the route guard against the current session.
pub fn authorize(state: &mut AppState, route: Route) -> Result<&mut Workspace, HandlerErr> {
    let ws = workspace_mut(state)?;
    let decision = shell::guard(ws.session.state(), route);
    let redirect = match decision.outcome {
        Outcome::Redirect(r) => Some(r.path()),
        _ => None,
    };
    match decision.state {
        GuardState::Authorized => Ok(ws),
        GuardState::LoadingSession | GuardState::Unauthenticated => {
            Err(HandlerErr::new("unauthenticated", "sign in first")
                .with_details(json!({ "redirect": redirect })))
        }
        GuardState::Unauthorized => Err(HandlerErr::new(
            "forbidden",
            format!("{} is not available for this role", route.path()),
        )
        .with_details(json!({ "redirect": redirect }))),
    }
}

pub fn current_user(ws: &Workspace) -> Result<SessionUser, HandlerErr> {
    ws.session
        .user()
        .cloned()
        .ok_or_else(|| HandlerErr::new("unauthenticated", "sign in first"))
}

pub fn require_admin(ws: &Workspace) -> Result<(), HandlerErr> {
    if current_user(ws)?.role == Role::Admin {
        Ok(())
    } else {
        Err(HandlerErr::new("forbidden", "admin only"))
    }
}

pub fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, HandlerErr> {
    serde_json::to_value(value).map_err(|e| HandlerErr::new("store_failed", e.to_string()))
}
