use super::{parse_date, require, FeatureError};
use crate::live::{Keyed, LiveCollection};
use crate::model::CalendarEvent;
use chrono::NaiveDate;

/// Events ordered by start date, then title.
pub fn sorted(events: &[Keyed<CalendarEvent>]) -> Vec<Keyed<CalendarEvent>> {
    let mut out = events.to_vec();
    out.sort_by(|a, b| {
        a.record
            .start
            .cmp(&b.record.start)
            .then_with(|| a.record.title.cmp(&b.record.title))
    });
    out
}

/// The next `limit` events starting on or after `today`.
pub fn upcoming(
    events: &[Keyed<CalendarEvent>],
    today: NaiveDate,
    limit: usize,
) -> Vec<Keyed<CalendarEvent>> {
    let today = today.format("%Y-%m-%d").to_string();
    sorted(events)
        .into_iter()
        .filter(|e| e.record.start.as_str() >= today.as_str())
        .take(limit)
        .collect()
}

pub fn create(live: &LiveCollection<CalendarEvent>, form: &CalendarEvent) -> Result<String, FeatureError> {
    require(&form.title, "title")?;
    let start = parse_date(&form.start, "start")?;
    if let Some(end) = form.end.as_deref().filter(|e| !e.trim().is_empty()) {
        if parse_date(end, "end")? < start {
            return Err(super::ValidationError::Invalid {
                field: "end",
                reason: "must not be before start".to_string(),
            }
            .into());
        }
    }
    Ok(live.create(form)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EventType;

    fn event(id: &str, start: &str) -> Keyed<CalendarEvent> {
        Keyed {
            id: id.to_string(),
            record: CalendarEvent {
                title: id.to_uppercase(),
                start: start.into(),
                end: None,
                event_type: EventType::Event,
                description: None,
            },
        }
    }

    #[test]
    fn upcoming_skips_past_events_and_limits() {
        let events = vec![
            event("late", "2024-09-01"),
            event("past", "2024-01-01"),
            event("today", "2024-05-10"),
            event("soon", "2024-05-20"),
            event("later", "2024-07-01"),
        ];
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).expect("date");
        let ids: Vec<String> = upcoming(&events, today, 3).into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["today", "soon", "later"]);
    }
}
