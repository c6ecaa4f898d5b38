use super::{class_label, parse_month, require, FeatureError, ValidationError, UNRESOLVED};
use crate::live::{Keyed, LiveCollection};
use crate::model::{FeeRecord, FeeStatus, SchoolClass, Student};
use crate::store::timestamp;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;

pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// `2024-05` becomes `May 2024`; anything unparseable is returned as is.
pub fn readable_month(month: &str) -> String {
    parse_month(month)
        .ok()
        .and_then(|(y, m)| NaiveDate::from_ymd_opt(y, m, 1))
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_else(|| month.to_string())
}

/// First record for the student and month, if any.
pub fn fee_for<'a>(
    fees: &'a [Keyed<FeeRecord>],
    student_id: &str,
    month: &str,
) -> Option<&'a Keyed<FeeRecord>> {
    fees.iter()
        .find(|f| f.record.student_id == student_id && f.record.month == month)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub collected: u64,
    pub paid: usize,
    pub students: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeRow {
    pub student_id: String,
    pub full_name: String,
    pub roll_number: String,
    pub class_label: String,
    pub status: FeeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthView {
    pub month: String,
    pub month_label: String,
    pub totals: Totals,
    pub rows: Vec<FeeRow>,
}

pub fn month_view(
    students: &[Keyed<Student>],
    classes: &[Keyed<SchoolClass>],
    fees: &[Keyed<FeeRecord>],
    month: &str,
) -> MonthView {
    let in_month: Vec<&Keyed<FeeRecord>> =
        fees.iter().filter(|f| f.record.month == month).collect();
    let paid = in_month
        .iter()
        .filter(|f| f.record.status == FeeStatus::Paid)
        .count();
    let totals = Totals {
        collected: in_month
            .iter()
            .fold(0u64, |acc, f| acc.saturating_add(f.record.amount)),
        paid,
        students: students.len(),
        pending: students.len().saturating_sub(paid),
    };
    let rows = students
        .iter()
        .map(|s| {
            let fee = fee_for(fees, &s.id, month);
            FeeRow {
                student_id: s.id.clone(),
                full_name: s.record.full_name.clone(),
                roll_number: s.record.roll_number.clone(),
                class_label: class_label(classes, &s.record.class_id),
                status: fee.map(|f| f.record.status).unwrap_or(FeeStatus::Unpaid),
                fee_id: fee.map(|f| f.id.clone()),
                amount: fee.map(|f| f.record.amount),
            }
        })
        .collect();
    MonthView {
        month: month.to_string(),
        month_label: readable_month(month),
        totals,
        rows,
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectFee {
    pub student_id: String,
    pub month: String,
    pub amount: u64,
    #[serde(default)]
    pub payment_type: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub fee_id: String,
    pub school_name: String,
    pub month: String,
    pub month_label: String,
    pub student_name: String,
    pub roll_number: String,
    pub class_label: String,
    pub amount: u64,
    pub status: FeeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_paid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// The school name printed is the one captured at payment time when present.
pub fn receipt(
    fee: &Keyed<FeeRecord>,
    students: &[Keyed<Student>],
    classes: &[Keyed<SchoolClass>],
    current_school_name: &str,
) -> Receipt {
    let student = students.iter().find(|s| s.id == fee.record.student_id);
    Receipt {
        fee_id: fee.id.clone(),
        school_name: fee
            .record
            .school_name_snapshot
            .clone()
            .unwrap_or_else(|| current_school_name.to_string()),
        month: fee.record.month.clone(),
        month_label: readable_month(&fee.record.month),
        student_name: student
            .map(|s| s.record.full_name.clone())
            .unwrap_or_else(|| UNRESOLVED.to_string()),
        roll_number: student
            .map(|s| s.record.roll_number.clone())
            .unwrap_or_default(),
        class_label: student
            .map(|s| class_label(classes, &s.record.class_id))
            .unwrap_or_else(|| UNRESOLVED.to_string()),
        amount: fee.record.amount,
        status: fee.record.status,
        date_paid: fee.record.date_paid.clone(),
        payment_type: fee.record.payment_type.clone(),
        note: fee.record.note.clone(),
    }
}

pub fn validate(form: &CollectFee, fees: &[Keyed<FeeRecord>]) -> Result<(), ValidationError> {
    let student_id = form.student_id.trim();
    let month = form.month.trim();
    require(student_id, "studentId")?;
    parse_month(month)?;
    if form.amount == 0 {
        return Err(ValidationError::Invalid {
            field: "amount",
            reason: "must be greater than 0".to_string(),
        });
    }
    let already_paid = fees.iter().any(|f| {
        f.record.student_id == student_id
            && f.record.month == month
            && f.record.status == FeeStatus::Paid
    });
    if already_paid {
        return Err(ValidationError::AlreadyPaid {
            month: month.to_string(),
        });
    }
    Ok(())
}

/// Records a paid fee and returns the new record id.
pub fn collect(
    live: &LiveCollection<FeeRecord>,
    form: &CollectFee,
    school_name: &str,
) -> Result<String, FeatureError> {
    validate(form, live.items())?;
    let record = FeeRecord {
        student_id: form.student_id.trim().to_string(),
        month: form.month.trim().to_string(),
        amount: form.amount,
        status: FeeStatus::Paid,
        date_paid: Some(timestamp()),
        payment_type: form
            .payment_type
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| Some("Cash".to_string())),
        note: form.note.clone().filter(|s| !s.trim().is_empty()),
        school_name_snapshot: Some(school_name.to_string()),
    };
    let id = live.create(&record)?;
    info!(fee_id = %id, student_id = %record.student_id, month = %record.month, "fee collected");
    Ok(id)
}
