use super::students::in_class;
use super::{require, FeatureError, ValidationError};
use crate::live::Keyed;
use crate::model::{Exam, ExamResult, Student};
use crate::repo::Repository;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

pub fn result_id(exam_id: &str, class_id: &str, subject_id: &str, student_id: &str) -> String {
    format!("{exam_id}_{class_id}_{subject_id}_{student_id}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
}

/// Percentage rounded to the nearest whole number, 0 when the exam has no
/// marks to give.
pub fn percentage(marks: u32, max_marks: u32) -> u32 {
    if max_marks == 0 {
        return 0;
    }
    ((f64::from(marks) / f64::from(max_marks)) * 100.0).round() as u32
}

pub fn verdict(marks: u32, exam: &Exam) -> Verdict {
    if marks >= exam.pass_marks {
        Verdict::Pass
    } else {
        Verdict::Fail
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultLine {
    pub student_id: String,
    pub full_name: String,
    pub roll_number: String,
    pub marks: Option<u32>,
    pub percentage: Option<u32>,
    pub verdict: Option<Verdict>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSheet {
    pub exam_id: String,
    pub class_id: String,
    pub subject_id: String,
    pub max_marks: u32,
    pub pass_marks: u32,
    pub lines: Vec<ResultLine>,
}

fn check_scope(exam: &Keyed<Exam>, class_id: &str, subject_id: &str) -> Result<(), ValidationError> {
    require(class_id, "classId")?;
    require(subject_id, "subjectId")?;
    if !exam.record.class_ids.iter().any(|c| c == class_id) {
        return Err(ValidationError::Invalid {
            field: "classId",
            reason: format!("is not part of exam {}", exam.record.name),
        });
    }
    Ok(())
}

pub fn open_sheet(
    exam: &Keyed<Exam>,
    students: &[Keyed<Student>],
    results: &[Keyed<ExamResult>],
    class_id: &str,
    subject_id: &str,
) -> Result<ResultSheet, FeatureError> {
    check_scope(exam, class_id, subject_id)?;
    let lines = in_class(students, class_id)
        .into_iter()
        .map(|s| {
            let key = result_id(&exam.id, class_id, subject_id, &s.id);
            let marks = results.iter().find(|r| r.id == key).map(|r| r.record.marks);
            ResultLine {
                student_id: s.id.clone(),
                full_name: s.record.full_name.clone(),
                roll_number: s.record.roll_number.clone(),
                marks,
                percentage: marks.map(|m| percentage(m, exam.record.max_marks)),
                verdict: marks.map(|m| verdict(m, &exam.record)),
            }
        })
        .collect();
    Ok(ResultSheet {
        exam_id: exam.id.clone(),
        class_id: class_id.to_string(),
        subject_id: subject_id.to_string(),
        max_marks: exam.record.max_marks,
        pass_marks: exam.record.pass_marks,
        lines,
    })
}

/// Replaces every mark for (exam, class, subject) in one batch. Entries for
/// students not in `marks` are removed.
pub fn save_sheet(
    repo: &Repository<ExamResult>,
    exam: &Keyed<Exam>,
    students: &[Keyed<Student>],
    existing: &[Keyed<ExamResult>],
    class_id: &str,
    subject_id: &str,
    marks: &BTreeMap<String, u32>,
) -> Result<usize, FeatureError> {
    check_scope(exam, class_id, subject_id)?;
    let roster = in_class(students, class_id);
    for (student_id, m) in marks {
        if *m > exam.record.max_marks {
            return Err(ValidationError::Invalid {
                field: "marks",
                reason: format!("must be between 0 and {}", exam.record.max_marks),
            }
            .into());
        }
        if !roster.iter().any(|s| &s.id == student_id) {
            return Err(ValidationError::UnknownReference {
                kind: "student",
                id: student_id.clone(),
            }
            .into());
        }
    }

    let mut writes = Vec::new();
    for stale in existing.iter().filter(|r| {
        r.record.exam_id == exam.id
            && r.record.class_id == class_id
            && r.record.subject_id == subject_id
            && !marks.contains_key(&r.record.student_id)
    }) {
        writes.push(repo.remove_write(&stale.id));
    }
    for (student_id, m) in marks {
        let record = ExamResult {
            exam_id: exam.id.clone(),
            class_id: class_id.to_string(),
            subject_id: subject_id.to_string(),
            student_id: student_id.clone(),
            marks: *m,
        };
        writes.push(repo.set_write(
            &result_id(&exam.id, class_id, subject_id, student_id),
            &record,
        )?);
    }
    repo.apply(writes)?;
    info!(exam_id = %exam.id, class_id, subject_id, count = marks.len(), "results saved");
    Ok(marks.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SnapshotCache;
    use crate::store::DocumentStore;
    use std::rc::Rc;

    fn exam() -> Keyed<Exam> {
        Keyed {
            id: "mid".to_string(),
            record: Exam {
                name: "Midterm".into(),
                date: "2024-06-01".into(),
                max_marks: 80,
                pass_marks: 40,
                class_ids: vec!["c1".into()],
            },
        }
    }

    fn students() -> Vec<Keyed<Student>> {
        ["s1", "s2"]
            .iter()
            .map(|id| Keyed {
                id: id.to_string(),
                record: Student {
                    full_name: id.to_uppercase(),
                    class_id: "c1".into(),
                    ..Student::default()
                },
            })
            .collect()
    }

    #[test]
    fn percentage_rounds_and_handles_zero_max() {
        assert_eq!(percentage(40, 80), 50);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(5, 0), 0);
        assert_eq!(verdict(40, &exam().record), Verdict::Pass);
        assert_eq!(verdict(39, &exam().record), Verdict::Fail);
    }

    #[test]
    fn marks_above_max_and_foreign_classes_are_rejected() {
        let repo: Repository<ExamResult> = Repository::new(
            Rc::new(DocumentStore::in_memory()),
            Rc::new(SnapshotCache::in_memory("t")),
        );
        let too_high = BTreeMap::from([("s1".to_string(), 81)]);
        let err = save_sheet(&repo, &exam(), &students(), &[], "c1", "math", &too_high)
            .unwrap_err();
        assert_eq!(err.code(), "validation_failed");

        let err = open_sheet(&exam(), &students(), &[], "c2", "math").unwrap_err();
        assert_eq!(err.code(), "validation_failed");
    }

    #[test]
    fn saving_replaces_the_previous_sheet() {
        let repo: Repository<ExamResult> = Repository::new(
            Rc::new(DocumentStore::in_memory()),
            Rc::new(SnapshotCache::in_memory("t")),
        );
        let first = BTreeMap::from([("s1".to_string(), 70), ("s2".to_string(), 20)]);
        save_sheet(&repo, &exam(), &students(), &[], "c1", "math", &first).expect("save");
        let existing = repo.mount().items().to_vec();
        assert_eq!(existing.len(), 2);

        let second = BTreeMap::from([("s1".to_string(), 75)]);
        save_sheet(&repo, &exam(), &students(), &existing, "c1", "math", &second)
            .expect("resave");
        let live = repo.mount();
        assert_eq!(live.items().len(), 1);

        let sheet = open_sheet(&exam(), &students(), live.items(), "c1", "math").expect("sheet");
        assert_eq!(sheet.lines[0].marks, Some(75));
        assert_eq!(sheet.lines[0].verdict, Some(Verdict::Pass));
        assert_eq!(sheet.lines[1].marks, None);
    }
}
