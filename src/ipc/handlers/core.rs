use crate::db;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::get_required_str;
use crate::ipc::types::{AppState, Request};
use crate::workspace::Workspace;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::{error, info};

fn handle_health(state: &mut AppState, _req: &Request) -> Result<Value, HandlerErr> {
    let counts = match state.workspace.as_ref() {
        Some(ws) => db::collection_counts(ws.store.connection())
            .map_err(|e| HandlerErr::new("store_failed", e.to_string()))?
            .into_iter()
            .map(|(c, n)| (c, json!(n)))
            .collect::<serde_json::Map<_, _>>(),
        None => serde_json::Map::new(),
    };
    Ok(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "workspacePath": state.workspace.as_ref().map(|ws| ws.path.to_string_lossy().to_string()),
        "collections": counts,
        "subscribers": state.workspace.as_ref().map(|ws| ws.store.total_subscribers()),
    }))
}

/// Replaces any open workspace with the one at `path`.
pub fn open_workspace(state: &mut AppState, path: &Path) -> Result<(), HandlerErr> {
    state.workspace = None;
    match Workspace::open(path, &state.config.cache_prefix) {
        Ok(ws) => {
            state.workspace = Some(ws);
            Ok(())
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "workspace open failed");
            Err(HandlerErr::new("db_open_failed", format!("{e:?}")))
        }
    }
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let path = PathBuf::from(get_required_str(&req.params, "path")?);
    open_workspace(state, &path)?;
    let app_name = state
        .workspace
        .as_ref()
        .map(|ws| ws.session.app_name().to_string());
    Ok(json!({ "workspacePath": path.to_string_lossy(), "appName": app_name }))
}

fn handle_workspace_close(state: &mut AppState, _req: &Request) -> Result<Value, HandlerErr> {
    if let Some(ws) = state.workspace.take() {
        info!(path = %ws.path.display(), "workspace closed");
    }
    Ok(json!({ "closed": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "health" => handle_health(state, req),
        "workspace.select" => handle_workspace_select(state, req),
        "workspace.close" => handle_workspace_close(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
