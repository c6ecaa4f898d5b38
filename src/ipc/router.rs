use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;
use serde_json::Value;

type Family = fn(&mut AppState, &Request) -> Option<Value>;

const FAMILIES: &[Family] = &[
    handlers::core::try_handle,
    handlers::auth::try_handle,
    handlers::nav::try_handle,
    handlers::live::try_handle,
    handlers::dashboard::try_handle,
    handlers::students::try_handle,
    handlers::classes::try_handle,
    handlers::subjects::try_handle,
    handlers::attendance::try_handle,
    handlers::exams::try_handle,
    handlers::results::try_handle,
    handlers::finance::try_handle,
    handlers::timetable::try_handle,
    handlers::calendar::try_handle,
    handlers::teachers::try_handle,
    handlers::settings::try_handle,
    handlers::backup::try_handle,
];

pub fn handle_request(state: &mut AppState, req: Request) -> Value {
    for family in FAMILIES {
        if let Some(resp) = family(state, &req) {
            return resp;
        }
    }
    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
