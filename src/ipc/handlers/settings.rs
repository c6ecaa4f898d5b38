use crate::features::settings::{
    active_announcement, app_name, post_announcement, set_app_name, update_display_name,
};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{
    authorize, current_user, get_opt_str, get_required_str, to_value,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{Announcement, Role, UserProfile};
use crate::session::register_user;
use crate::shell::Route;
use serde_json::{json, Value};

fn handle_get(state: &mut AppState, _req: &Request) -> Result<Value, HandlerErr> {
    let ws = authorize(state, Route::Settings)?;
    let name = app_name(&ws.repo())?;
    let announcements = ws.mount::<Announcement>();
    Ok(json!({
        "appName": name,
        "announcement": to_value(&active_announcement(announcements.items()))?,
    }))
}

fn handle_set_app_name(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let name = get_required_str(&req.params, "appName")?;
    let ws = authorize(state, Route::Settings)?;
    let saved = set_app_name(&ws.repo(), &name)?;
    ws.session.set_app_name(&saved);
    Ok(json!({ "appName": saved, "notice": "Settings saved" }))
}

fn handle_post_announcement(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let message = get_required_str(&req.params, "message")?;
    let title = get_opt_str(&req.params, "title");
    let ws = authorize(state, Route::Settings)?;
    let posted = post_announcement(&ws.repo(), title.as_deref(), &message)?;
    Ok(json!({
        "announcement": to_value(&posted)?,
        "notice": "Announcement posted",
    }))
}

/// Any signed-in user may rename themselves.
fn handle_update_profile(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let name = get_required_str(&req.params, "displayName")?;
    let ws = authorize(state, Route::Dashboard)?;
    let user = current_user(ws)?;
    let saved = update_display_name(&ws.repo(), &user.uid, &name)?;
    ws.refresh_session()?;
    Ok(json!({ "displayName": saved, "notice": "Profile updated" }))
}

fn handle_create_user(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let email = get_required_str(&req.params, "email")?;
    let password = get_required_str(&req.params, "password")?;
    let display_name = get_required_str(&req.params, "displayName")?;
    let role: Role = match get_opt_str(&req.params, "role") {
        Some(r) => r.parse().map_err(HandlerErr::bad_params)?,
        None => Role::Teacher,
    };
    let ws = authorize(state, Route::Settings)?;
    let users = ws.repo::<UserProfile>();
    let principal = register_user(&ws.identity, &users, &email, &password, &display_name, role)?;
    Ok(json!({
        "uid": principal.uid,
        "email": principal.email,
        "role": role,
        "notice": "User created",
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "settings.get" => handle_get(state, req),
        "settings.setAppName" => handle_set_app_name(state, req),
        "settings.postAnnouncement" => handle_post_announcement(state, req),
        "settings.updateProfile" => handle_update_profile(state, req),
        "settings.createUser" => handle_create_user(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
