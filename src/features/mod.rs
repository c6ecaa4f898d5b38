pub mod attendance;
pub mod calendar;
pub mod classes;
pub mod dashboard;
pub mod exams;
pub mod finance;
pub mod results;
pub mod settings;
pub mod students;
pub mod subjects;
pub mod teachers;
pub mod timetable;

use crate::live::Keyed;
use crate::model::SchoolClass;
use crate::store::StoreError;
use chrono::NaiveDate;

/// Rendered wherever a reference no longer resolves.
pub const UNRESOLVED: &str = "N/A";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("{field} {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("unknown {kind}: {id}")]
    UnknownReference { kind: &'static str, id: String },
    #[error("fee for {month} is already paid")]
    AlreadyPaid { month: String },
}

#[derive(Debug, thiserror::Error)]
pub enum FeatureError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FeatureError {
    pub fn code(&self) -> &'static str {
        match self {
            FeatureError::Invalid(ValidationError::AlreadyPaid { .. }) => "already_paid",
            FeatureError::Invalid(ValidationError::UnknownReference { .. }) => "not_found",
            FeatureError::Invalid(_) => "validation_failed",
            FeatureError::Store(e) => e.code(),
        }
    }
}

pub fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Required(field))
    } else {
        Ok(())
    }
}

pub fn parse_date(value: &str, field: &'static str) -> Result<NaiveDate, ValidationError> {
    require(value, field)?;
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ValidationError::Invalid {
        field,
        reason: "must be YYYY-MM-DD".to_string(),
    })
}

/// Accepts `YYYY-MM` and returns (year, month).
pub fn parse_month(value: &str) -> Result<(i32, u32), ValidationError> {
    let invalid = || ValidationError::Invalid {
        field: "month",
        reason: "must be YYYY-MM".to_string(),
    };
    require(value, "month")?;
    let (y, m) = value.trim().split_once('-').ok_or_else(invalid)?;
    if y.len() != 4 || m.len() != 2 {
        return Err(invalid());
    }
    let year = y.parse::<i32>().map_err(|_| invalid())?;
    let month = m.parse::<u32>().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    Ok((year, month))
}

/// `name suffix` of the class, or `N/A` when the class is gone.
pub fn class_label(classes: &[Keyed<SchoolClass>], class_id: &str) -> String {
    classes
        .iter()
        .find(|c| c.id == class_id)
        .map(|c| c.record.label())
        .unwrap_or_else(|| UNRESOLVED.to_string())
}
