use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{get_opt_str, get_required_str, workspace_mut};
use crate::ipc::types::{AppState, Request};
use crate::model::UserProfile;
use crate::session::{bootstrap_admin, IdentityProvider, SessionState};
use crate::shell::navigation;
use crate::workspace::Workspace;
use serde_json::{json, Value};

pub fn session_value(ws: &Workspace) -> Value {
    let (state, user) = match ws.session.state() {
        SessionState::Loading => ("loading", Value::Null),
        SessionState::SignedOut => ("signedOut", Value::Null),
        SessionState::SignedIn(u) => (
            "signedIn",
            json!({
                "uid": u.uid,
                "email": u.email,
                "displayName": u.display_name,
                "role": u.role,
            }),
        ),
    };
    let nav: Vec<Value> = ws
        .session
        .user()
        .map(|u| navigation(u.role))
        .unwrap_or_default()
        .into_iter()
        .map(|n| json!({ "name": n.name, "path": n.route.path() }))
        .collect();
    json!({
        "state": state,
        "user": user,
        "appName": ws.session.app_name(),
        "navigation": nav,
    })
}

fn handle_session(state: &mut AppState, _req: &Request) -> Result<Value, HandlerErr> {
    let ws = workspace_mut(state)?;
    ws.refresh_session()?;
    Ok(session_value(ws))
}

fn handle_sign_in(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let email = get_required_str(&req.params, "email")?;
    let password = get_required_str(&req.params, "password")?;
    let ws = workspace_mut(state)?;
    ws.identity.sign_in(&email, &password)?;
    ws.watches.clear();
    ws.refresh_session()?;
    Ok(session_value(ws))
}

fn handle_sign_out(state: &mut AppState, _req: &Request) -> Result<Value, HandlerErr> {
    let ws = workspace_mut(state)?;
    ws.sign_out();
    Ok(session_value(ws))
}

fn handle_bootstrap(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let email = get_required_str(&req.params, "email")?;
    let password = get_required_str(&req.params, "password")?;
    let display_name = get_opt_str(&req.params, "displayName").unwrap_or_else(|| "Admin".to_string());
    let ws = workspace_mut(state)?;
    let users = ws.repo::<UserProfile>();
    let principal = bootstrap_admin(&ws.identity, &users, &email, &password, &display_name)?;
    Ok(json!({ "uid": principal.uid, "email": principal.email }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "auth.session" => handle_session(state, req),
        "auth.signIn" => handle_sign_in(state, req),
        "auth.signOut" => handle_sign_out(state, req),
        "auth.bootstrap" => handle_bootstrap(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
