use super::students::in_class;
use super::{parse_date, require, FeatureError};
use crate::live::Keyed;
use crate::model::{AttendanceRecord, AttendanceStatus, Session, Student};
use crate::repo::Repository;
use serde::Serialize;
use tracing::info;

/// Deterministic key: re-saving the same sheet overwrites instead of duplicating.
pub fn record_id(date: &str, session: Session, student_id: &str) -> String {
    format!("{}-{}-{}", date, session.as_str(), student_id)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetLine {
    pub student_id: String,
    pub full_name: String,
    pub roll_number: String,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub present: usize,
    pub absent: usize,
    pub late: usize,
}

impl Tally {
    pub fn of<'a>(statuses: impl IntoIterator<Item = &'a AttendanceStatus>) -> Self {
        let mut t = Tally::default();
        for s in statuses {
            match s {
                AttendanceStatus::Present => t.present += 1,
                AttendanceStatus::Absent => t.absent += 1,
                AttendanceStatus::Late => t.late += 1,
            }
        }
        t
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    pub class_id: String,
    pub date: String,
    pub session: Session,
    pub lines: Vec<SheetLine>,
    pub tally: Tally,
}

/// Existing statuses for the class/date/session, everyone else present.
pub fn open_sheet(
    students: &[Keyed<Student>],
    records: &[Keyed<AttendanceRecord>],
    class_id: &str,
    date: &str,
    session: Session,
) -> Result<Sheet, FeatureError> {
    require(class_id, "classId")?;
    parse_date(date, "date")?;
    let lines: Vec<SheetLine> = in_class(students, class_id)
        .into_iter()
        .map(|s| {
            let key = record_id(date, session, &s.id);
            let status = records
                .iter()
                .find(|r| r.id == key)
                .map(|r| r.record.status)
                .unwrap_or_default();
            SheetLine {
                student_id: s.id.clone(),
                full_name: s.record.full_name.clone(),
                roll_number: s.record.roll_number.clone(),
                status,
            }
        })
        .collect();
    let tally = Tally::of(lines.iter().map(|l| &l.status));
    Ok(Sheet {
        class_id: class_id.to_string(),
        date: date.to_string(),
        session,
        lines,
        tally,
    })
}

/// One record per class student, all in a single batch. Students missing from
/// `marks` are saved as present.
pub fn save_sheet(
    repo: &Repository<AttendanceRecord>,
    students: &[Keyed<Student>],
    class_id: &str,
    date: &str,
    session: Session,
    marks: &[(String, AttendanceStatus)],
) -> Result<Tally, FeatureError> {
    require(class_id, "classId")?;
    parse_date(date, "date")?;
    let roster = in_class(students, class_id);
    let mut writes = Vec::with_capacity(roster.len());
    let mut statuses = Vec::with_capacity(roster.len());
    for s in roster {
        let status = marks
            .iter()
            .find(|(id, _)| *id == s.id)
            .map(|(_, st)| *st)
            .unwrap_or_default();
        let record = AttendanceRecord {
            date: date.to_string(),
            student_id: s.id.clone(),
            class_id: class_id.to_string(),
            session,
            status,
        };
        writes.push(repo.set_write(&record_id(date, session, &s.id), &record)?);
        statuses.push(status);
    }
    let count = writes.len();
    repo.apply(writes)?;
    info!(class_id, date, session = session.as_str(), count, "attendance saved");
    Ok(Tally::of(&statuses))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SnapshotCache;
    use crate::store::DocumentStore;
    use std::rc::Rc;

    fn students() -> Vec<Keyed<Student>> {
        ["s1", "s2", "s3"]
            .iter()
            .map(|id| Keyed {
                id: id.to_string(),
                record: Student {
                    full_name: format!("Student {id}"),
                    class_id: if *id == "s3" { "c2" } else { "c1" }.into(),
                    ..Student::default()
                },
            })
            .collect()
    }

    #[test]
    fn record_ids_are_deterministic() {
        assert_eq!(
            record_id("2024-05-01", Session::AfterBreak, "s1"),
            "2024-05-01-after_break-s1"
        );
    }

    #[test]
    fn fresh_sheet_defaults_to_present() {
        let sheet = open_sheet(&students(), &[], "c1", "2024-05-01", Session::BeforeBreak)
            .expect("sheet");
        assert_eq!(sheet.lines.len(), 2);
        assert!(sheet
            .lines
            .iter()
            .all(|l| l.status == AttendanceStatus::Present));
        assert_eq!(sheet.tally.present, 2);
    }

    #[test]
    fn bad_inputs_are_rejected() {
        let err = open_sheet(&students(), &[], "", "2024-05-01", Session::BeforeBreak)
            .unwrap_err();
        assert_eq!(err.code(), "validation_failed");
        let err = open_sheet(&students(), &[], "c1", "05/01/2024", Session::BeforeBreak)
            .unwrap_err();
        assert_eq!(err.code(), "validation_failed");
    }

    #[test]
    fn saving_twice_overwrites_the_same_records() {
        let repo: Repository<AttendanceRecord> = Repository::new(
            Rc::new(DocumentStore::in_memory()),
            Rc::new(SnapshotCache::in_memory("t")),
        );
        let marks = vec![("s1".to_string(), AttendanceStatus::Absent)];
        let tally = save_sheet(&repo, &students(), "c1", "2024-05-01", Session::BeforeBreak, &marks)
            .expect("save");
        assert_eq!(tally, Tally { present: 1, absent: 1, late: 0 });

        let marks = vec![("s2".to_string(), AttendanceStatus::Late)];
        save_sheet(&repo, &students(), "c1", "2024-05-01", Session::BeforeBreak, &marks)
            .expect("save again");

        let live = repo.mount();
        assert_eq!(live.items().len(), 2);
        let sheet = open_sheet(
            &students(),
            live.items(),
            "c1",
            "2024-05-01",
            Session::BeforeBreak,
        )
        .expect("sheet");
        assert_eq!(sheet.tally, Tally { present: 1, absent: 0, late: 1 });
    }
}
