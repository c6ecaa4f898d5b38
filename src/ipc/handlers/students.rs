use crate::exchange::{student_template_csv, students_to_csv, STUDENT_HEADERS};
use crate::features::students::{bulk_import, roster, save};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{authorize, get_form, get_opt_str, get_required_str, to_value};
use crate::ipc::types::{AppState, Request};
use crate::model::{SchoolClass, Student};
use crate::shell::Route;
use serde_json::{json, Value};

fn handle_list(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let ws = authorize(state, Route::Students)?;
    let students = ws.mount::<Student>();
    let classes = ws.mount::<SchoolClass>();
    let search = get_opt_str(&req.params, "search").unwrap_or_default();
    let class_id = get_opt_str(&req.params, "classId");
    let rows = roster(students.items(), classes.items(), &search, class_id.as_deref());
    Ok(json!({ "students": to_value(&rows)?, "total": students.items().len() }))
}

fn handle_save(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let form: Student = get_form(&req.params, "student")?;
    let id = get_opt_str(&req.params, "id");
    let ws = authorize(state, Route::Students)?;
    let live = ws.mount::<Student>();
    let id = save(&live, id.as_deref(), &form)?;
    Ok(json!({ "id": id, "notice": "Student saved" }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let id = get_required_str(&req.params, "id")?;
    let ws = authorize(state, Route::Students)?;
    ws.mount::<Student>().delete(&id)?;
    Ok(json!({ "deleted": id, "notice": "Student deleted" }))
}

fn handle_import(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let csv = get_required_str(&req.params, "csv")?;
    let ws = authorize(state, Route::Students)?;
    let ids = bulk_import(&ws.repo::<Student>(), &csv)?;
    Ok(json!({
        "imported": ids.len(),
        "ids": ids,
        "notice": format!("Imported {} students", ids.len()),
    }))
}

fn handle_export(state: &mut AppState, _req: &Request) -> Result<Value, HandlerErr> {
    let ws = authorize(state, Route::Students)?;
    let students = ws.mount::<Student>();
    Ok(json!({
        "csv": students_to_csv(students.items()),
        "count": students.items().len(),
    }))
}

fn handle_template(state: &mut AppState, _req: &Request) -> Result<Value, HandlerErr> {
    authorize(state, Route::Students)?;
    Ok(json!({ "csv": student_template_csv(), "headers": STUDENT_HEADERS }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "students.list" => handle_list(state, req),
        "students.save" => handle_save(state, req),
        "students.delete" => handle_delete(state, req),
        "students.import" => handle_import(state, req),
        "students.export" => handle_export(state, req),
        "students.template" => handle_template(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
