use crate::features::classes::{delete, rows, save};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{authorize, get_form, get_opt_str, get_required_str, to_value};
use crate::ipc::types::{AppState, Request};
use crate::model::{SchoolClass, Student, Subject};
use crate::shell::Route;
use serde_json::{json, Value};

fn handle_list(state: &mut AppState, _req: &Request) -> Result<Value, HandlerErr> {
    let ws = authorize(state, Route::Classes)?;
    let classes = ws.mount::<SchoolClass>();
    let students = ws.mount::<Student>();
    Ok(json!({ "classes": to_value(&rows(classes.items(), students.items()))? }))
}

fn handle_save(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let form: SchoolClass = get_form(&req.params, "class")?;
    let id = get_opt_str(&req.params, "id");
    let ws = authorize(state, Route::Classes)?;
    let classes = ws.mount::<SchoolClass>();
    let subjects = ws.mount::<Subject>();
    let id = save(&classes, subjects.items(), id.as_deref(), &form)?;
    Ok(json!({ "id": id, "notice": "Class saved" }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let id = get_required_str(&req.params, "id")?;
    let ws = authorize(state, Route::Classes)?;
    delete(&ws.mount::<SchoolClass>(), &id)?;
    Ok(json!({ "deleted": id, "notice": "Class deleted" }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "classes.list" => handle_list(state, req),
        "classes.save" => handle_save(state, req),
        "classes.delete" => handle_delete(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
