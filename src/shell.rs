use crate::model::Role;
use crate::session::SessionState;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Dashboard,
    Students,
    Classes,
    Subjects,
    Attendance,
    Timetable,
    Teachers,
    Exams,
    Results,
    Finance,
    Calendar,
    Settings,
}

const ALL_ROLES: &[Role] = &[Role::Admin, Role::Teacher, Role::Finance];
const STAFF: &[Role] = &[Role::Admin, Role::Teacher];
const ADMIN: &[Role] = &[Role::Admin];
const MONEY: &[Role] = &[Role::Admin, Role::Finance];

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Dashboard => "/",
            Route::Students => "/students",
            Route::Classes => "/classes",
            Route::Subjects => "/subjects",
            Route::Attendance => "/attendance",
            Route::Timetable => "/timetable",
            Route::Teachers => "/teachers",
            Route::Exams => "/exams",
            Route::Results => "/results",
            Route::Finance => "/finance",
            Route::Calendar => "/calendar",
            Route::Settings => "/settings",
        }
    }

    pub fn from_path(path: &str) -> Option<Route> {
        let trimmed = path.trim().trim_end_matches('/');
        let route = match trimmed {
            "" => Route::Dashboard,
            "/login" => Route::Login,
            "/students" => Route::Students,
            "/classes" => Route::Classes,
            "/subjects" => Route::Subjects,
            "/attendance" => Route::Attendance,
            "/timetable" => Route::Timetable,
            "/teachers" => Route::Teachers,
            "/exams" => Route::Exams,
            "/results" => Route::Results,
            "/finance" => Route::Finance,
            "/calendar" => Route::Calendar,
            "/settings" => Route::Settings,
            _ => return None,
        };
        Some(route)
    }

    /// Empty for the login page, which needs no session.
    pub fn allowed_roles(self) -> &'static [Role] {
        match self {
            Route::Login => &[],
            Route::Dashboard | Route::Students | Route::Calendar => ALL_ROLES,
            Route::Classes
            | Route::Exams
            | Route::Results
            | Route::Timetable
            | Route::Attendance => STAFF,
            Route::Subjects | Route::Teachers | Route::Settings => ADMIN,
            Route::Finance => MONEY,
        }
    }

    pub fn allows(self, role: Role) -> bool {
        self.allowed_roles().contains(&role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavItem {
    pub name: &'static str,
    pub route: Route,
}

const NAV: &[(&str, Route)] = &[
    ("Dashboard", Route::Dashboard),
    ("Students", Route::Students),
    ("Classes", Route::Classes),
    ("Subjects", Route::Subjects),
    ("Attendance", Route::Attendance),
    ("Timetable", Route::Timetable),
    ("Teachers", Route::Teachers),
    ("Exams", Route::Exams),
    ("Results", Route::Results),
    ("Finance", Route::Finance),
    ("Calendar", Route::Calendar),
    ("Settings", Route::Settings),
];

pub fn navigation(role: Role) -> Vec<NavItem> {
    NAV.iter()
        .filter(|(_, route)| route.allows(role))
        .map(|&(name, route)| NavItem { name, route })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    LoadingSession,
    Unauthenticated,
    Unauthorized,
    Authorized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Wait,
    Redirect(Route),
    Render(Route),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub state: GuardState,
    pub outcome: Outcome,
}

/// Evaluated fresh for every navigation; nothing is remembered between calls.
pub fn guard(session: &SessionState, route: Route) -> Decision {
    if route == Route::Login {
        return Decision {
            state: GuardState::Authorized,
            outcome: Outcome::Render(Route::Login),
        };
    }
    match session {
        SessionState::Loading => Decision {
            state: GuardState::LoadingSession,
            outcome: Outcome::Wait,
        },
        SessionState::SignedOut => Decision {
            state: GuardState::Unauthenticated,
            outcome: Outcome::Redirect(Route::Login),
        },
        SessionState::SignedIn(user) if route.allows(user.role) => Decision {
            state: GuardState::Authorized,
            outcome: Outcome::Render(route),
        },
        SessionState::SignedIn(_) => Decision {
            state: GuardState::Unauthorized,
            outcome: Outcome::Redirect(Route::Dashboard),
        },
    }
}

/// A navigation target with its query parameters, e.g.
/// `/attendance?classId=c1&session=after_break`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRequest {
    pub route: Route,
    pub query: BTreeMap<String, String>,
}

impl RouteRequest {
    pub fn parse(target: &str) -> Option<RouteRequest> {
        let target = target.trim().trim_start_matches('#');
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, q),
            None => (target, ""),
        };
        let route = Route::from_path(path)?;
        let query = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
                (percent_decode(k), percent_decode(v))
            })
            .collect();
        Some(RouteRequest { route, query })
    }
}

fn percent_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("");
                match u8::from_str_radix(hex, 16) {
                    Ok(b) => {
                        out.push(b);
                        i += 2;
                    }
                    Err(_) => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
