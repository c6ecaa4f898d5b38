use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{get_required_str, workspace_mut};
use crate::ipc::types::{AppState, Request};
use crate::shell::{guard, navigation, GuardState, Outcome, RouteRequest};
use serde_json::{json, Value};

fn guard_state_str(state: GuardState) -> &'static str {
    match state {
        GuardState::LoadingSession => "loadingSession",
        GuardState::Unauthenticated => "unauthenticated",
        GuardState::Unauthorized => "unauthorized",
        GuardState::Authorized => "authorized",
    }
}

fn handle_items(state: &mut AppState, _req: &Request) -> Result<Value, HandlerErr> {
    let ws = workspace_mut(state)?;
    let items: Vec<Value> = ws
        .session
        .user()
        .map(|u| navigation(u.role))
        .unwrap_or_default()
        .into_iter()
        .map(|n| json!({ "name": n.name, "path": n.route.path() }))
        .collect();
    Ok(json!({ "items": items }))
}

/// Evaluates the guard for a navigation target such as
/// `/attendance?classId=c1&session=after_break`.
fn handle_resolve(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let target = get_required_str(&req.params, "target")?;
    let Some(request) = RouteRequest::parse(&target) else {
        return Err(HandlerErr::not_found(format!("no route for {}", target)));
    };
    let ws = workspace_mut(state)?;
    let decision = guard(ws.session.state(), request.route);
    let (outcome, path) = match decision.outcome {
        Outcome::Wait => ("wait", None),
        Outcome::Redirect(r) => ("redirect", Some(r.path())),
        Outcome::Render(r) => ("render", Some(r.path())),
    };
    Ok(json!({
        "state": guard_state_str(decision.state),
        "outcome": outcome,
        "path": path,
        "query": request.query,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "nav.items" => handle_items(state, req),
        "nav.resolve" => handle_resolve(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
