use super::calendar::upcoming;
use super::settings::active_announcement;
use super::teachers::teachers;
use crate::live::Keyed;
use crate::model::{Announcement, CalendarEvent, Student, UserProfile};
use chrono::NaiveDate;
use serde::Serialize;

pub const UPCOMING_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub app_name: String,
    pub student_count: usize,
    pub teacher_count: usize,
    pub announcement: Option<Keyed<Announcement>>,
    pub upcoming_events: Vec<Keyed<CalendarEvent>>,
}

pub fn summary(
    app_name: &str,
    students: &[Keyed<Student>],
    users: &[Keyed<UserProfile>],
    announcements: &[Keyed<Announcement>],
    events: &[Keyed<CalendarEvent>],
    today: NaiveDate,
) -> Summary {
    Summary {
        app_name: app_name.to_string(),
        student_count: students.len(),
        teacher_count: teachers(users).len(),
        announcement: active_announcement(announcements).cloned(),
        upcoming_events: upcoming(events, today, UPCOMING_LIMIT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;

    #[test]
    fn counts_teachers_only() {
        let users = vec![
            Keyed {
                id: "a".to_string(),
                record: UserProfile {
                    role: Role::Admin,
                    ..UserProfile::default()
                },
            },
            Keyed {
                id: "t".to_string(),
                record: UserProfile::default(),
            },
        ];
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).expect("date");
        let s = summary("Ayatiin", &[], &users, &[], &[], today);
        assert_eq!(s.teacher_count, 1);
        assert_eq!(s.student_count, 0);
        assert!(s.announcement.is_none());
    }
}
