use crate::features::teachers::{create, teachers, update};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{authorize, get_form, get_required_str, to_value};
use crate::ipc::types::{AppState, Request};
use crate::model::UserProfile;
use crate::shell::Route;
use serde_json::{json, Value};
use tracing::warn;

fn handle_list(state: &mut AppState, _req: &Request) -> Result<Value, HandlerErr> {
    let ws = authorize(state, Route::Teachers)?;
    let users = ws.mount::<UserProfile>();
    Ok(json!({ "teachers": to_value(&teachers(users.items()))? }))
}

fn handle_create(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let form: UserProfile = get_form(&req.params, "teacher")?;
    let ws = authorize(state, Route::Teachers)?;
    let id = create(&ws.mount::<UserProfile>(), &form)?;
    Ok(json!({ "id": id, "notice": "Teacher added" }))
}

fn handle_update(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let id = get_required_str(&req.params, "id")?;
    let form: UserProfile = get_form(&req.params, "teacher")?;
    let ws = authorize(state, Route::Teachers)?;
    update(&ws.mount::<UserProfile>(), &id, &form)?;
    Ok(json!({ "id": id, "notice": "Teacher updated" }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let id = get_required_str(&req.params, "id")?;
    let ws = authorize(state, Route::Teachers)?;
    ws.mount::<UserProfile>().delete(&id)?;
    warn!(uid = %id, "teacher profile removed; the login itself stays registered");
    Ok(json!({ "deleted": id, "notice": "Teacher removed" }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "teachers.list" => handle_list(state, req),
        "teachers.create" => handle_create(state, req),
        "teachers.update" => handle_update(state, req),
        "teachers.delete" => handle_delete(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
