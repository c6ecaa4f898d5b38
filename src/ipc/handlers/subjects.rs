use crate::features::subjects::{available_for, save};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{authorize, get_form, get_opt_str, get_required_str, to_value};
use crate::ipc::types::{AppState, Request};
use crate::model::{ClassLevel, Subject};
use crate::shell::Route;
use serde_json::{json, Value};

fn handle_list(state: &mut AppState, _req: &Request) -> Result<Value, HandlerErr> {
    let ws = authorize(state, Route::Subjects)?;
    let subjects = ws.mount::<Subject>();
    Ok(json!({ "subjects": to_value(&subjects.items())? }))
}

/// Readable by class editors as well, so it is gated on the classes page.
fn handle_for_level(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let level: ClassLevel = get_form(&req.params, "level")?;
    let ws = authorize(state, Route::Classes)?;
    let subjects = ws.mount::<Subject>();
    Ok(json!({ "subjects": to_value(&available_for(subjects.items(), level))? }))
}

fn handle_save(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let form: Subject = get_form(&req.params, "subject")?;
    let id = get_opt_str(&req.params, "id");
    let ws = authorize(state, Route::Subjects)?;
    let id = save(&ws.mount::<Subject>(), id.as_deref(), &form)?;
    Ok(json!({ "id": id, "notice": "Subject saved" }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let id = get_required_str(&req.params, "id")?;
    let ws = authorize(state, Route::Subjects)?;
    ws.mount::<Subject>().delete(&id)?;
    Ok(json!({ "deleted": id, "notice": "Subject deleted" }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "subjects.list" => handle_list(state, req),
        "subjects.forLevel" => handle_for_level(state, req),
        "subjects.save" => handle_save(state, req),
        "subjects.delete" => handle_delete(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
