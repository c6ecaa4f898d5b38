use crate::features::exams::save;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{authorize, get_form, get_opt_str, get_required_str, to_value};
use crate::ipc::types::{AppState, Request};
use crate::live::Keyed;
use crate::model::Exam;
use crate::shell::Route;
use serde_json::{json, Value};

fn handle_list(state: &mut AppState, _req: &Request) -> Result<Value, HandlerErr> {
    let ws = authorize(state, Route::Exams)?;
    let exams = ws.mount::<Exam>();
    let mut list: Vec<Keyed<Exam>> = exams.items().to_vec();
    list.sort_by(|a, b| b.record.date.cmp(&a.record.date));
    Ok(json!({ "exams": to_value(&list)? }))
}

fn handle_save(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let form: Exam = get_form(&req.params, "exam")?;
    let id = get_opt_str(&req.params, "id");
    let ws = authorize(state, Route::Exams)?;
    let id = save(&ws.mount::<Exam>(), id.as_deref(), &form)?;
    Ok(json!({ "id": id, "notice": "Exam saved" }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let id = get_required_str(&req.params, "id")?;
    let ws = authorize(state, Route::Exams)?;
    ws.mount::<Exam>().delete(&id)?;
    Ok(json!({ "deleted": id, "notice": "Exam deleted" }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "exams.list" => handle_list(state, req),
        "exams.save" => handle_save(state, req),
        "exams.delete" => handle_delete(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
