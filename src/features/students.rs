use super::{class_label, require, FeatureError, ValidationError};
use crate::exchange::{self, ImportError};
use crate::live::{Keyed, LiveCollection};
use crate::model::{SchoolClass, Student};
use crate::repo::Repository;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRow {
    pub id: String,
    pub full_name: String,
    pub roll_number: String,
    pub class_id: String,
    pub class_label: String,
    pub parent_name: String,
    pub parent_contact: String,
}

/// Case-insensitive name match or roll-number substring, optionally limited
/// to one class.
pub fn roster(
    students: &[Keyed<Student>],
    classes: &[Keyed<SchoolClass>],
    search: &str,
    class_id: Option<&str>,
) -> Vec<StudentRow> {
    let needle = search.trim().to_lowercase();
    students
        .iter()
        .filter(|s| class_id.map_or(true, |c| s.record.class_id == c))
        .filter(|s| {
            needle.is_empty()
                || s.record.full_name.to_lowercase().contains(&needle)
                || s.record.roll_number.contains(search.trim())
        })
        .map(|s| StudentRow {
            id: s.id.clone(),
            full_name: s.record.full_name.clone(),
            roll_number: s.record.roll_number.clone(),
            class_id: s.record.class_id.clone(),
            class_label: class_label(classes, &s.record.class_id),
            parent_name: s.record.parent_name.clone(),
            parent_contact: s.record.parent_contact.clone(),
        })
        .collect()
}

pub fn in_class<'a>(students: &'a [Keyed<Student>], class_id: &str) -> Vec<&'a Keyed<Student>> {
    students
        .iter()
        .filter(|s| s.record.class_id == class_id)
        .collect()
}

pub fn validate(student: &Student) -> Result<(), ValidationError> {
    require(&student.full_name, "fullName")?;
    require(&student.class_id, "classId")?;
    Ok(())
}

/// Creates when `id` is `None`, otherwise merges the form into the record.
pub fn save(
    live: &LiveCollection<Student>,
    id: Option<&str>,
    form: &Student,
) -> Result<String, FeatureError> {
    validate(form)?;
    match id {
        Some(id) => {
            live.update(id, form)?;
            Ok(id.to_string())
        }
        None => Ok(live.create(form)?),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BulkImportError {
    #[error(transparent)]
    Parse(#[from] ImportError),
    #[error(transparent)]
    Write(#[from] FeatureError),
}

/// Writes every parsed row in one batch; a bad file writes nothing.
pub fn bulk_import(repo: &Repository<Student>, csv: &str) -> Result<Vec<String>, BulkImportError> {
    let rows = exchange::parse_student_rows(csv)?;
    let mut ids = Vec::with_capacity(rows.len());
    let mut writes = Vec::with_capacity(rows.len());
    for row in &rows {
        let id = Uuid::now_v7().to_string();
        writes.push(repo.set_write(&id, row).map_err(FeatureError::from)?);
        ids.push(id);
    }
    repo.apply(writes).map_err(FeatureError::from)?;
    info!(count = ids.len(), "students imported");
    Ok(ids)
}
