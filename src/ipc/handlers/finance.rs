use crate::features::finance::{collect, month_key, month_view, receipt, CollectFee};
use crate::features::parse_month;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{authorize, get_form, get_opt_str, get_required_str, to_value};
use crate::ipc::types::{AppState, Request};
use crate::model::{FeeRecord, SchoolClass, Student};
use crate::shell::Route;
use chrono::Local;
use serde_json::{json, Value};

fn handle_month(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let month = get_opt_str(&req.params, "month")
        .unwrap_or_else(|| month_key(Local::now().date_naive()));
    parse_month(&month).map_err(|e| HandlerErr::bad_params(e.to_string()))?;
    let ws = authorize(state, Route::Finance)?;
    let students = ws.mount::<Student>();
    let classes = ws.mount::<SchoolClass>();
    let fees = ws.mount::<FeeRecord>();
    to_value(&month_view(
        students.items(),
        classes.items(),
        fees.items(),
        &month,
    ))
}

fn handle_collect(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let form: CollectFee = get_form(&req.params, "fee")?;
    let ws = authorize(state, Route::Finance)?;
    let mut fees = ws.mount::<FeeRecord>();
    let school_name = ws.session.app_name().to_string();
    let id = collect(&fees, &form, &school_name)?;
    fees.pump();
    let fee = fees
        .find(&id)
        .ok_or_else(|| HandlerErr::not_found(format!("fee not found: {}", id)))?;
    let students = ws.mount::<Student>();
    let classes = ws.mount::<SchoolClass>();
    let r = receipt(fee, students.items(), classes.items(), &school_name);
    Ok(json!({
        "id": id,
        "receipt": to_value(&r)?,
        "notice": "Payment recorded",
    }))
}

fn handle_receipt(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let fee_id = get_required_str(&req.params, "feeId")?;
    let ws = authorize(state, Route::Finance)?;
    let fee = ws
        .repo::<FeeRecord>()
        .get(&fee_id)?
        .ok_or_else(|| HandlerErr::not_found(format!("fee not found: {}", fee_id)))?;
    let students = ws.mount::<Student>();
    let classes = ws.mount::<SchoolClass>();
    to_value(&receipt(
        &fee,
        students.items(),
        classes.items(),
        ws.session.app_name(),
    ))
}

fn handle_delete(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let id = get_required_str(&req.params, "id")?;
    let ws = authorize(state, Route::Finance)?;
    ws.mount::<FeeRecord>().delete(&id)?;
    Ok(json!({ "deleted": id, "notice": "Fee record deleted" }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "finance.month" => handle_month(state, req),
        "finance.collect" => handle_collect(state, req),
        "finance.receipt" => handle_receipt(state, req),
        "finance.delete" => handle_delete(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
