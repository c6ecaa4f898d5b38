use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{authorize, get_required_str, to_value, workspace_mut};
use crate::ipc::types::{AppState, Request};
use crate::live::LiveCollection;
use crate::shell::Route;
use crate::store::Document;
use crate::workspace::Watch;
use serde_json::{json, Value};
use std::rc::Rc;
use tracing::debug;
use uuid::Uuid;

/// The page that owns each collection decides who may watch it.
fn owning_route(path: &str) -> Option<Route> {
    let route = match path {
        "students" => Route::Students,
        "classes" => Route::Classes,
        "subjects" => Route::Subjects,
        "attendance" => Route::Attendance,
        "exams" => Route::Exams,
        "results" => Route::Results,
        "fees" => Route::Finance,
        "timetables" => Route::Timetable,
        "calendar_events" => Route::Calendar,
        "users" => Route::Teachers,
        "announcements" | "settings" => Route::Dashboard,
        _ => return None,
    };
    Some(route)
}

fn binding_value(live: &LiveCollection<Document>) -> Result<Value, HandlerErr> {
    Ok(json!({
        "path": live.path(),
        "items": to_value(&live.items())?,
        "loading": live.loading(),
        "error": live.error(),
        "subscribed": live.is_subscribed(),
    }))
}

fn handle_watch(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let path = get_required_str(&req.params, "path")?;
    let route = owning_route(&path)
        .ok_or_else(|| HandlerErr::new("invalid_path", format!("unknown collection {}", path)))?;
    let ws = authorize(state, route)?;
    let live = LiveCollection::bind(Rc::clone(&ws.store), Rc::clone(&ws.cache), &path);
    let watch_id = Uuid::now_v7().to_string();
    let mut out = binding_value(&live)?;
    out["watchId"] = json!(watch_id);
    ws.add_watch(watch_id.clone(), Watch { route, live });
    debug!(
        watch_id = %watch_id,
        path = %path,
        listeners = ws.store.subscriber_count(&path),
        "watch opened"
    );
    Ok(out)
}

fn handle_poll(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let watch_id = get_required_str(&req.params, "watchId")?;
    let route = workspace_mut(state)?
        .watches
        .get(&watch_id)
        .map(|w| w.route)
        .ok_or_else(|| HandlerErr::not_found(format!("no watch {}", watch_id)))?;
    // The session may have changed since the watch was opened.
    if let Err(e) = authorize(state, route) {
        if let Ok(ws) = workspace_mut(state) {
            ws.watches.remove(&watch_id);
        }
        debug!(watch_id = %watch_id, code = %e.code, "watch dropped");
        return Err(e);
    }
    let ws = workspace_mut(state)?;
    let watch = ws
        .watches
        .get_mut(&watch_id)
        .ok_or_else(|| HandlerErr::not_found(format!("no watch {}", watch_id)))?;
    let applied = watch.live.pump();
    let mut out = binding_value(&watch.live)?;
    out["changed"] = json!(applied > 0);
    Ok(out)
}

fn handle_unwatch(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let watch_id = get_required_str(&req.params, "watchId")?;
    let ws = workspace_mut(state)?;
    let removed = ws.watches.remove(&watch_id).is_some();
    Ok(json!({ "removed": removed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "live.watch" => handle_watch(state, req),
        "live.poll" => handle_poll(state, req),
        "live.unwatch" => handle_unwatch(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
