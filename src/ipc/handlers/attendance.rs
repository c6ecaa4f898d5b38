use crate::features::attendance::{open_sheet, save_sheet};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{authorize, get_opt_str, get_required_str, to_value};
use crate::ipc::types::{AppState, Request};
use crate::model::{AttendanceRecord, AttendanceStatus, Session, Student};
use crate::shell::Route;
use chrono::Local;
use serde_json::{json, Value};
use std::collections::BTreeMap;

fn session_param(params: &Value) -> Result<Session, HandlerErr> {
    match get_opt_str(params, "session") {
        Some(s) => s.parse().map_err(HandlerErr::bad_params),
        None => Ok(Session::default()),
    }
}

fn date_param(params: &Value) -> String {
    get_opt_str(params, "date").unwrap_or_else(|| Local::now().format("%Y-%m-%d").to_string())
}

fn handle_open(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let class_id = get_required_str(&req.params, "classId")?;
    let session = session_param(&req.params)?;
    let date = date_param(&req.params);
    let ws = authorize(state, Route::Attendance)?;
    let students = ws.mount::<Student>();
    let records = ws.mount::<AttendanceRecord>();
    let sheet = open_sheet(students.items(), records.items(), &class_id, &date, session)?;
    to_value(&sheet)
}

fn handle_save(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let class_id = get_required_str(&req.params, "classId")?;
    let session = session_param(&req.params)?;
    let date = date_param(&req.params);
    let marks: BTreeMap<String, AttendanceStatus> = match req.params.get("marks") {
        Some(v) => serde_json::from_value(v.clone())
            .map_err(|e| HandlerErr::bad_params(format!("invalid marks: {}", e)))?,
        None => BTreeMap::new(),
    };
    let marks: Vec<(String, AttendanceStatus)> = marks.into_iter().collect();
    let ws = authorize(state, Route::Attendance)?;
    let students = ws.mount::<Student>();
    let tally = save_sheet(
        &ws.repo::<AttendanceRecord>(),
        students.items(),
        &class_id,
        &date,
        session,
        &marks,
    )?;
    Ok(json!({
        "date": date,
        "session": session,
        "tally": to_value(&tally)?,
        "notice": "Attendance saved",
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "attendance.open" => handle_open(state, req),
        "attendance.save" => handle_save(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
