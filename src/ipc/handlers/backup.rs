use super::core::open_workspace;
use crate::backup;
use crate::db;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{authorize, get_required_str};
use crate::ipc::types::{AppState, Request};
use crate::shell::Route;
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::{error, info};

fn handle_export(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let out_path = PathBuf::from(get_required_str(&req.params, "outPath")?);
    let ws = authorize(state, Route::Settings)?;
    let counts = db::collection_counts(ws.store.connection())
        .map_err(|e| HandlerErr::new("store_failed", e.to_string()))?;
    let summary = backup::export_workspace_bundle(&ws.path, &out_path, &counts).map_err(|e| {
        error!(error = %e, "bundle export failed");
        HandlerErr::new("backup_failed", format!("{e:?}"))
    })?;
    info!(out = %out_path.display(), "workspace bundle exported");
    Ok(json!({
        "outPath": out_path.to_string_lossy(),
        "bundleFormat": summary.bundle_format,
        "entryCount": summary.entry_count,
    }))
}

/// Closes the workspace, swaps in the bundled store and reopens it. The
/// signed-in user has to sign in again afterwards.
fn handle_import(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let in_path = PathBuf::from(get_required_str(&req.params, "inPath")?);
    let path = authorize(state, Route::Settings)?.path.clone();
    state.workspace = None;
    let imported = backup::import_workspace_bundle(&in_path, &path);
    open_workspace(state, &path)?;
    let summary = imported.map_err(|e| {
        error!(error = %e, "bundle import failed");
        HandlerErr::new("backup_failed", format!("{e:?}"))
    })?;
    info!(bundle = %in_path.display(), "workspace bundle imported");
    Ok(json!({
        "workspacePath": path.to_string_lossy(),
        "bundleFormatDetected": summary.bundle_format_detected,
        "collections": summary.collections,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "backup.exportWorkspaceBundle" => handle_export(state, req),
        "backup.importWorkspaceBundle" => handle_import(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
