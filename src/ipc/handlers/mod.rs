pub mod attendance;
pub mod auth;
pub mod backup;
pub mod calendar;
pub mod classes;
pub mod core;
pub mod dashboard;
pub mod exams;
pub mod finance;
pub mod live;
pub mod nav;
pub mod results;
pub mod settings;
pub mod students;
pub mod subjects;
pub mod teachers;
pub mod timetable;
