use crate::features::results::{open_sheet, save_sheet};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{authorize, get_form, get_required_str, to_value};
use crate::ipc::types::{AppState, Request};
use crate::live::Keyed;
use crate::model::{Exam, ExamResult, Student};
use crate::repo::Repository;
use crate::shell::Route;
use serde_json::{json, Value};
use std::collections::BTreeMap;

struct Scope {
    exam_id: String,
    class_id: String,
    subject_id: String,
}

fn scope(params: &Value) -> Result<Scope, HandlerErr> {
    Ok(Scope {
        exam_id: get_required_str(params, "examId")?,
        class_id: get_required_str(params, "classId")?,
        subject_id: get_required_str(params, "subjectId")?,
    })
}

fn load_exam(exams: &Repository<Exam>, id: &str) -> Result<Keyed<Exam>, HandlerErr> {
    exams
        .get(id)?
        .ok_or_else(|| HandlerErr::not_found(format!("exam not found: {}", id)))
}

fn handle_open(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let s = scope(&req.params)?;
    let ws = authorize(state, Route::Results)?;
    let exam = load_exam(&ws.repo(), &s.exam_id)?;
    let students = ws.mount::<Student>();
    let results = ws.mount::<ExamResult>();
    let sheet = open_sheet(
        &exam,
        students.items(),
        results.items(),
        &s.class_id,
        &s.subject_id,
    )?;
    to_value(&sheet)
}

fn handle_save(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let s = scope(&req.params)?;
    let marks: BTreeMap<String, u32> = get_form(&req.params, "marks")?;
    let ws = authorize(state, Route::Results)?;
    let exam = load_exam(&ws.repo(), &s.exam_id)?;
    let students = ws.mount::<Student>();
    let results = ws.mount::<ExamResult>();
    let saved = save_sheet(
        &ws.repo(),
        &exam,
        students.items(),
        results.items(),
        &s.class_id,
        &s.subject_id,
        &marks,
    )?;
    Ok(json!({ "saved": saved, "notice": "Results saved" }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "results.open" => handle_open(state, req),
        "results.save" => handle_save(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
