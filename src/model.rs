use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A record type stored as children of one fixed collection.
pub trait Entity: Serialize + DeserializeOwned + Clone {
    const COLLECTION: &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Teacher,
    Finance,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Finance => "finance",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "finance" => Ok(Role::Finance),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_date: Option<String>,
}

impl Entity for UserProfile {
    const COLLECTION: &'static str = "users";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClassLevel {
    #[default]
    Primary,
    Secondary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolClass {
    pub name: String,
    #[serde(default)]
    pub suffix: String,
    #[serde(default)]
    pub academic_year: String,
    #[serde(default)]
    pub level: ClassLevel,
    #[serde(default)]
    pub subject_ids: Vec<String>,
}

impl SchoolClass {
    pub fn label(&self) -> String {
        format!("{} {}", self.name, self.suffix).trim().to_string()
    }
}

impl Entity for SchoolClass {
    const COLLECTION: &'static str = "classes";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubjectLevel {
    Primary,
    Secondary,
    #[default]
    Both,
}

impl SubjectLevel {
    pub fn offered_for(self, level: ClassLevel) -> bool {
        matches!(
            (self, level),
            (SubjectLevel::Both, _)
                | (SubjectLevel::Primary, ClassLevel::Primary)
                | (SubjectLevel::Secondary, ClassLevel::Secondary)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub name: String,
    #[serde(default)]
    pub level: SubjectLevel,
}

impl Entity for Subject {
    const COLLECTION: &'static str = "subjects";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub full_name: String,
    #[serde(default)]
    pub roll_number: String,
    #[serde(default)]
    pub class_id: String,
    #[serde(default)]
    pub parent_name: String,
    #[serde(default)]
    pub parent_contact: String,
}

impl Entity for Student {
    const COLLECTION: &'static str = "students";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Session {
    #[default]
    BeforeBreak,
    AfterBreak,
}

impl Session {
    pub fn as_str(self) -> &'static str {
        match self {
            Session::BeforeBreak => "before_break",
            Session::AfterBreak => "after_break",
        }
    }
}

impl FromStr for Session {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "before_break" => Ok(Session::BeforeBreak),
            "after_break" => Ok(Session::AfterBreak),
            other => Err(format!("unknown session: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    #[default]
    Present,
    Absent,
    Late,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub date: String,
    pub student_id: String,
    pub class_id: String,
    pub session: Session,
    pub status: AttendanceStatus,
}

impl Entity for AttendanceRecord {
    const COLLECTION: &'static str = "attendance";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub name: String,
    pub date: String,
    pub max_marks: u32,
    pub pass_marks: u32,
    #[serde(default)]
    pub class_ids: Vec<String>,
}

impl Entity for Exam {
    const COLLECTION: &'static str = "exams";
}

/// One student's mark for one subject of one exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub exam_id: String,
    pub class_id: String,
    pub subject_id: String,
    pub student_id: String,
    pub marks: u32,
}

impl Entity for ExamResult {
    const COLLECTION: &'static str = "results";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeeStatus {
    #[default]
    Paid,
    Unpaid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeRecord {
    pub student_id: String,
    pub month: String,
    pub amount: u64,
    #[serde(default)]
    pub status: FeeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_paid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_name_snapshot: Option<String>,
}

impl Entity for FeeRecord {
    const COLLECTION: &'static str = "fees";
}

/// Weekly schedule for one class, stored under the class id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClassTimetable {
    #[serde(default)]
    pub schedule: BTreeMap<String, Vec<String>>,
}

impl Entity for ClassTimetable {
    const COLLECTION: &'static str = "timetables";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Holiday,
    Exam,
    #[default]
    Event,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub title: String,
    pub start: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(rename = "type", default)]
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Entity for CalendarEvent {
    const COLLECTION: &'static str = "calendar_events";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub message: String,
    pub date: String,
    #[serde(default)]
    pub active: bool,
}

impl Entity for Announcement {
    const COLLECTION: &'static str = "announcements";
}

pub const GENERAL_SETTINGS_ID: &str = "general";
pub const DEFAULT_APP_NAME: &str = "Ayatiin";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub app_name: String,
}

impl Entity for AppSettings {
    const COLLECTION: &'static str = "settings";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_names_match_stored_shape() {
        let rec = AttendanceRecord {
            date: "2024-05-01".into(),
            student_id: "s1".into(),
            class_id: "c1".into(),
            session: Session::BeforeBreak,
            status: AttendanceStatus::Late,
        };
        assert_eq!(
            serde_json::to_value(&rec).expect("serialize"),
            json!({
                "date": "2024-05-01",
                "studentId": "s1",
                "classId": "c1",
                "session": "before_break",
                "status": "late"
            })
        );
        let ev: CalendarEvent = serde_json::from_value(json!({
            "title": "Eid", "start": "2024-04-10", "type": "holiday"
        }))
        .expect("deserialize");
        assert_eq!(ev.event_type, EventType::Holiday);
    }

    #[test]
    fn profile_role_defaults_to_teacher() {
        let p: UserProfile = serde_json::from_value(json!({ "email": "a@b.c" })).expect("profile");
        assert_eq!(p.role, Role::Teacher);
        assert_eq!("FINANCE".parse::<Role>(), Ok(Role::Finance));
        assert!("janitor".parse::<Role>().is_err());
    }

    #[test]
    fn subject_levels_filter_by_class_level() {
        assert!(SubjectLevel::Both.offered_for(ClassLevel::Secondary));
        assert!(SubjectLevel::Primary.offered_for(ClassLevel::Primary));
        assert!(!SubjectLevel::Primary.offered_for(ClassLevel::Secondary));
    }

    #[test]
    fn class_label_joins_name_and_suffix() {
        let c = SchoolClass {
            name: "Grade 1".into(),
            suffix: "A".into(),
            academic_year: "2024-2025".into(),
            level: ClassLevel::Primary,
            subject_ids: vec![],
        };
        assert_eq!(c.label(), "Grade 1 A");
    }
}
