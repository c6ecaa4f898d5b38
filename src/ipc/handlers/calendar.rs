use crate::features::calendar::{create, sorted};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{authorize, get_form, get_required_str, require_admin, to_value};
use crate::ipc::types::{AppState, Request};
use crate::model::CalendarEvent;
use crate::shell::Route;
use serde_json::{json, Value};

fn handle_list(state: &mut AppState, _req: &Request) -> Result<Value, HandlerErr> {
    let ws = authorize(state, Route::Calendar)?;
    let events = ws.mount::<CalendarEvent>();
    Ok(json!({ "events": to_value(&sorted(events.items()))? }))
}

fn handle_create(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let form: CalendarEvent = get_form(&req.params, "event")?;
    let ws = authorize(state, Route::Calendar)?;
    require_admin(ws)?;
    let id = create(&ws.mount::<CalendarEvent>(), &form)?;
    Ok(json!({ "id": id, "notice": "Event added" }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let id = get_required_str(&req.params, "id")?;
    let ws = authorize(state, Route::Calendar)?;
    require_admin(ws)?;
    ws.mount::<CalendarEvent>().delete(&id)?;
    Ok(json!({ "deleted": id, "notice": "Event deleted" }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "calendar.list" => handle_list(state, req),
        "calendar.create" => handle_create(state, req),
        "calendar.delete" => handle_delete(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
