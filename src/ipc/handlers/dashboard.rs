use crate::features::dashboard::summary;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{authorize, to_value};
use crate::ipc::types::{AppState, Request};
use crate::model::{Announcement, CalendarEvent, Student, UserProfile};
use crate::shell::Route;
use chrono::Local;
use serde_json::Value;

fn handle_summary(state: &mut AppState, _req: &Request) -> Result<Value, HandlerErr> {
    let ws = authorize(state, Route::Dashboard)?;
    let students = ws.mount::<Student>();
    let users = ws.mount::<UserProfile>();
    let announcements = ws.mount::<Announcement>();
    let events = ws.mount::<CalendarEvent>();
    let today = Local::now().date_naive();
    to_value(&summary(
        ws.session.app_name(),
        students.items(),
        users.items(),
        announcements.items(),
        events.items(),
        today,
    ))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "dashboard.summary" => handle_summary(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
