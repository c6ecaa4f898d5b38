use super::subjects::name_of;
use super::{require, FeatureError, ValidationError};
use crate::live::Keyed;
use crate::model::{ClassTimetable, Subject};
use crate::repo::Repository;
use serde::Serialize;
use std::collections::BTreeMap;

pub const DAYS: [&str; 5] = ["Saturday", "Sunday", "Monday", "Tuesday", "Wednesday"];
pub const PERIODS: usize = 7;
/// Periods 1-4 come before the break.
pub const PERIODS_BEFORE_BREAK: usize = 4;

pub fn load(repo: &Repository<ClassTimetable>, class_id: &str) -> Result<ClassTimetable, FeatureError> {
    require(class_id, "classId")?;
    Ok(repo.get(class_id)?.map(|k| k.record).unwrap_or_default())
}

/// Checks day names and subject ids, then pads or truncates every row to
/// the period count. Empty slots are allowed.
pub fn normalize(
    schedule: &BTreeMap<String, Vec<String>>,
    subjects: &[Keyed<Subject>],
) -> Result<ClassTimetable, ValidationError> {
    let mut out = BTreeMap::new();
    for (day, slots) in schedule {
        if !DAYS.contains(&day.as_str()) {
            return Err(ValidationError::Invalid {
                field: "schedule",
                reason: format!("unknown day {day}"),
            });
        }
        let mut row: Vec<String> = slots.iter().map(|s| s.trim().to_string()).collect();
        if let Some(bad) = row
            .iter()
            .find(|id| !id.is_empty() && !subjects.iter().any(|s| &s.id == *id))
        {
            return Err(ValidationError::UnknownReference {
                kind: "subject",
                id: bad.clone(),
            });
        }
        row.resize(PERIODS, String::new());
        out.insert(day.clone(), row);
    }
    Ok(ClassTimetable { schedule: out })
}

pub fn save(
    repo: &Repository<ClassTimetable>,
    subjects: &[Keyed<Subject>],
    class_id: &str,
    schedule: &BTreeMap<String, Vec<String>>,
) -> Result<ClassTimetable, FeatureError> {
    require(class_id, "classId")?;
    let timetable = normalize(schedule, subjects)?;
    repo.put(class_id, &timetable)?;
    Ok(timetable)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayView {
    pub day: &'static str,
    pub before_break: Vec<String>,
    pub after_break: Vec<String>,
}

/// Every day in display order with subject names; unknown slots are blank.
pub fn view(timetable: &ClassTimetable, subjects: &[Keyed<Subject>]) -> Vec<DayView> {
    DAYS.iter()
        .map(|&day| {
            let row = timetable.schedule.get(day);
            let names: Vec<String> = (0..PERIODS)
                .map(|p| {
                    row.and_then(|r| r.get(p))
                        .and_then(|id| name_of(subjects, id))
                        .unwrap_or_default()
                        .to_string()
                })
                .collect();
            let (before, after) = names.split_at(PERIODS_BEFORE_BREAK);
            DayView {
                day,
                before_break: before.to_vec(),
                after_break: after.to_vec(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SubjectLevel;

    fn subjects() -> Vec<Keyed<Subject>> {
        vec![Keyed {
            id: "math".to_string(),
            record: Subject {
                name: "Mathematics".into(),
                level: SubjectLevel::Both,
            },
        }]
    }

    #[test]
    fn rows_are_padded_to_seven_periods() {
        let schedule = BTreeMap::from([("Sunday".to_string(), vec!["math".to_string()])]);
        let t = normalize(&schedule, &subjects()).expect("normalize");
        assert_eq!(t.schedule["Sunday"].len(), PERIODS);

        let views = view(&t, &subjects());
        assert_eq!(views.len(), 5);
        assert_eq!(views[1].day, "Sunday");
        assert_eq!(views[1].before_break[0], "Mathematics");
        assert_eq!(views[1].after_break.len(), 3);
        assert_eq!(views[0].before_break, vec![""; 4]);
    }

    #[test]
    fn unknown_days_and_subjects_are_rejected() {
        let bad_day = BTreeMap::from([("Friday".to_string(), vec![])]);
        assert!(normalize(&bad_day, &subjects()).is_err());
        let bad_subject = BTreeMap::from([("Monday".to_string(), vec!["art".to_string()])]);
        assert!(matches!(
            normalize(&bad_subject, &subjects()),
            Err(ValidationError::UnknownReference { kind: "subject", .. })
        ));
    }
}
