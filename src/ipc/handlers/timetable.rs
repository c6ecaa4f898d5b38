use crate::features::timetable::{load, save, view, DAYS, PERIODS};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{authorize, get_form, get_required_str, to_value};
use crate::ipc::types::{AppState, Request};
use crate::model::{ClassTimetable, Subject};
use crate::shell::Route;
use serde_json::{json, Value};
use std::collections::BTreeMap;

fn handle_get(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let class_id = get_required_str(&req.params, "classId")?;
    let ws = authorize(state, Route::Timetable)?;
    let timetable = load(&ws.repo::<ClassTimetable>(), &class_id)?;
    Ok(json!({
        "classId": class_id,
        "days": DAYS,
        "periods": PERIODS,
        "schedule": to_value(&timetable.schedule)?,
    }))
}

fn handle_save(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let class_id = get_required_str(&req.params, "classId")?;
    let schedule: BTreeMap<String, Vec<String>> = get_form(&req.params, "schedule")?;
    let ws = authorize(state, Route::Timetable)?;
    let subjects = ws.mount::<Subject>();
    let saved = save(&ws.repo(), subjects.items(), &class_id, &schedule)?;
    Ok(json!({
        "classId": class_id,
        "schedule": to_value(&saved.schedule)?,
        "notice": "Timetable saved",
    }))
}

fn handle_view(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let class_id = get_required_str(&req.params, "classId")?;
    let ws = authorize(state, Route::Timetable)?;
    let timetable = load(&ws.repo::<ClassTimetable>(), &class_id)?;
    let subjects = ws.mount::<Subject>();
    Ok(json!({ "classId": class_id, "days": to_value(&view(&timetable, subjects.items()))? }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "timetable.get" => handle_get(state, req),
        "timetable.save" => handle_save(state, req),
        "timetable.view" => handle_view(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
