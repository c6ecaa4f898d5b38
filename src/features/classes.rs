use super::{require, FeatureError, ValidationError};
use crate::live::{Keyed, LiveCollection};
use crate::model::{SchoolClass, Student, Subject};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRow {
    pub id: String,
    pub label: String,
    #[serde(flatten)]
    pub class: SchoolClass,
    pub student_count: usize,
}

pub fn rows(classes: &[Keyed<SchoolClass>], students: &[Keyed<Student>]) -> Vec<ClassRow> {
    classes
        .iter()
        .map(|c| ClassRow {
            id: c.id.clone(),
            label: c.record.label(),
            class: c.record.clone(),
            student_count: students
                .iter()
                .filter(|s| s.record.class_id == c.id)
                .count(),
        })
        .collect()
}

pub fn validate(class: &SchoolClass, subjects: &[Keyed<Subject>]) -> Result<(), ValidationError> {
    require(&class.name, "name")?;
    if let Some(missing) = class
        .subject_ids
        .iter()
        .find(|id| !subjects.iter().any(|s| &s.id == *id))
    {
        return Err(ValidationError::UnknownReference {
            kind: "subject",
            id: missing.clone(),
        });
    }
    Ok(())
}

pub fn save(
    live: &LiveCollection<SchoolClass>,
    subjects: &[Keyed<Subject>],
    id: Option<&str>,
    form: &SchoolClass,
) -> Result<String, FeatureError> {
    validate(form, subjects)?;
    match id {
        Some(id) => {
            live.update(id, form)?;
            Ok(id.to_string())
        }
        None => Ok(live.create(form)?),
    }
}

/// Students keep their classId; they render `N/A` afterwards.
pub fn delete(live: &LiveCollection<SchoolClass>, id: &str) -> Result<(), FeatureError> {
    Ok(live.delete(id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassLevel, SubjectLevel};

    fn class(subject_ids: &[&str]) -> SchoolClass {
        SchoolClass {
            name: "Grade 2".into(),
            suffix: "B".into(),
            academic_year: "2024-2025".into(),
            level: ClassLevel::Primary,
            subject_ids: subject_ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn rows_count_students_per_class() {
        let classes = vec![Keyed {
            id: "c1".to_string(),
            record: class(&[]),
        }];
        let students = vec![
            Keyed {
                id: "s1".to_string(),
                record: Student {
                    full_name: "A".into(),
                    class_id: "c1".into(),
                    ..Student::default()
                },
            },
            Keyed {
                id: "s2".to_string(),
                record: Student {
                    full_name: "B".into(),
                    class_id: "c9".into(),
                    ..Student::default()
                },
            },
        ];
        let rows = rows(&classes, &students);
        assert_eq!(rows[0].student_count, 1);
        assert_eq!(rows[0].label, "Grade 2 B");
    }

    #[test]
    fn subject_ids_must_exist() {
        let subjects = vec![Keyed {
            id: "math".to_string(),
            record: Subject {
                name: "Math".into(),
                level: SubjectLevel::Both,
            },
        }];
        assert!(validate(&class(&["math"]), &subjects).is_ok());
        assert_eq!(
            validate(&class(&["art"]), &subjects),
            Err(ValidationError::UnknownReference {
                kind: "subject",
                id: "art".into()
            })
        );
        let mut unnamed = class(&[]);
        unnamed.name = " ".into();
        assert_eq!(
            validate(&unnamed, &subjects),
            Err(ValidationError::Required("name"))
        );
    }
}
