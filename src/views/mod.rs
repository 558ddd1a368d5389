//! Derived views over the latest event snapshot: pure filter, sort and
//! partition functions. Nothing here touches the backend or the clock; "now"
//! is always an argument so the same inputs give the same outputs.

use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{Event, EventCategory};

#[derive(Debug, Clone, Default)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Inclusive containment; an unset bound matches everything on that side.
    pub fn contains(&self, when: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| when >= start) && self.end.is_none_or(|end| when <= end)
    }
}

/// Active filter predicates. `None` for category or campus means the
/// wildcard "all".
#[derive(Debug, Clone, Default)]
pub struct EventFilters {
    pub category: Option<EventCategory>,
    pub campus: Option<String>,
    pub search: String,
    pub date_range: DateRange,
    pub free_food: bool,
    pub beginner_friendly: bool,
    pub happening_today: bool,
}

impl EventFilters {
    /// Whether `event` survives the intersection of every active predicate.
    pub fn matches(&self, event: &Event, today: NaiveDate) -> bool {
        let category_ok = self.category.is_none_or(|c| event.category == c);
        let campus_ok = self.campus.as_deref().is_none_or(|c| event.campus == c);
        let search_ok = self.search.is_empty() || matches_search(event, &self.search);
        let range_ok = self.date_range.contains(event.start);
        let food_ok = !self.free_food || event.has_food;
        let beginner_ok = !self.beginner_friendly || is_beginner_friendly(event);
        let today_ok = !self.happening_today || event.start.date_naive() == today;

        category_ok && campus_ok && search_ok && range_ok && food_ok && beginner_ok && today_ok
    }
}

/// Case-insensitive substring match against title, description and tags.
fn matches_search(event: &Event, query: &str) -> bool {
    let needle = query.to_lowercase();
    event.title.to_lowercase().contains(&needle)
        || event.description.to_lowercase().contains(&needle)
        || event
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(&needle))
}

fn is_beginner_friendly(event: &Event) -> bool {
    event.is_beginner_friendly
        || event
            .tags
            .iter()
            .any(|tag| tag == "Beginner" || tag == "Beginner-Friendly")
}

pub fn filter_events(events: &[Event], filters: &EventFilters, today: NaiveDate) -> Vec<Event> {
    events
        .iter()
        .filter(|event| filters.matches(event, today))
        .cloned()
        .collect()
}

/// Stable sort: events the user attends first (when a user id is given),
/// then ascending by start date. Ties keep snapshot order.
pub fn sort_events(events: &mut [Event], user_id: Option<&str>) {
    events.sort_by(|a, b| {
        if let Some(uid) = user_id {
            match b.is_attended_by(uid).cmp(&a.is_attended_by(uid)) {
                std::cmp::Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        a.start.cmp(&b.start)
    });
}

/// Split into (attending, others). Without a user everything is "others".
pub fn partition_attending(events: &[Event], user_id: Option<&str>) -> (Vec<Event>, Vec<Event>) {
    match user_id {
        Some(uid) => events
            .iter()
            .cloned()
            .partition(|event| event.is_attended_by(uid)),
        None => (Vec::new(), events.to_vec()),
    }
}

/// The signed-in user's relationship to the snapshot: events they attend,
/// events they host, and past events they attended or hosted.
#[derive(Debug, Clone, Default)]
pub struct MyEvents {
    pub attending: Vec<Event>,
    pub hosting: Vec<Event>,
    pub past: Vec<Event>,
}

pub fn my_events(events: &[Event], user_id: &str, now: DateTime<Utc>) -> MyEvents {
    let mut views = MyEvents::default();
    for event in events {
        let attends = event.is_attended_by(user_id);
        let hosts = event.is_hosted_by(user_id);
        if attends {
            views.attending.push(event.clone());
        }
        if hosts {
            views.hosting.push(event.clone());
        }
        if event.start < now && (attends || hosts) {
            views.past.push(event.clone());
        }
    }
    views
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventHost;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn event(id: &str, title: &str, start: DateTime<Utc>) -> Event {
        Event {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            category: EventCategory::General,
            start,
            end: None,
            location: "TBA".into(),
            campus: "main".into(),
            image: None,
            host: EventHost::placeholder(),
            attendees: vec![],
            max_attendees: 50,
            is_free: true,
            tags: vec![],
            requirements: vec![],
            has_food: false,
            is_beginner_friendly: false,
            created_by: "unknown".into(),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    fn dec(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn no_filters_sorts_by_start_date() {
        let mut events = vec![
            event("e2", "Later", dec(18, 14)),
            event("e1", "Earlier", dec(15, 18)),
        ];
        sort_events(&mut events, None);
        assert_eq!(events[0].id, "e1");
        assert_eq!(events[1].id, "e2");
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let events = vec![
            event("e1", "Dumpling Making Workshop", dec(15, 18)),
            event("e2", "Trivia Night", dec(16, 18)),
            event("e3", "Career Fair", dec(17, 18)),
        ];
        let filters = EventFilters {
            search: "DUMPLING".into(),
            ..Default::default()
        };
        let matched = filter_events(&events, &filters, dec(15, 0).date_naive());
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, "e1");
    }

    #[test]
    fn search_also_matches_tags() {
        let mut tagged = event("e1", "Mystery Meetup", dec(15, 18));
        tagged.tags = vec!["Dumplings".into()];
        let events = vec![tagged, event("e2", "Other", dec(16, 18))];
        let filters = EventFilters {
            search: "dumpling".into(),
            ..Default::default()
        };
        assert_eq!(
            filter_events(&events, &filters, dec(15, 0).date_naive()).len(),
            1
        );
    }

    #[test]
    fn filters_intersect() {
        let mut a = event("e1", "Hack Night", dec(15, 18));
        a.category = EventCategory::Hackathon;
        a.campus = "RMIT University".into();
        a.has_food = true;
        let mut b = event("e2", "Hack Day", dec(16, 18));
        b.category = EventCategory::Hackathon;
        b.campus = "Monash University".into();
        b.has_food = true;
        let mut c = event("e3", "Hungry Hack", dec(17, 18));
        c.category = EventCategory::Hackathon;
        c.campus = "RMIT University".into();

        let events = vec![a, b, c];
        let filters = EventFilters {
            category: Some(EventCategory::Hackathon),
            campus: Some("RMIT University".into()),
            free_food: true,
            ..Default::default()
        };
        let matched = filter_events(&events, &filters, dec(15, 0).date_naive());
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, "e1");
    }

    #[test]
    fn filter_order_is_immaterial() {
        // Each predicate applied alone, intersected manually, must equal the
        // combined filter output.
        let mut a = event("e1", "Beginner Hack", dec(15, 18));
        a.category = EventCategory::Hackathon;
        a.is_beginner_friendly = true;
        let mut b = event("e2", "Pro Hack", dec(16, 18));
        b.category = EventCategory::Hackathon;
        let mut c = event("e3", "Beginner Yoga", dec(17, 18));
        c.category = EventCategory::Wellness;
        c.is_beginner_friendly = true;
        let events = vec![a, b, c];
        let today = dec(15, 0).date_naive();

        let combined = filter_events(
            &events,
            &EventFilters {
                category: Some(EventCategory::Hackathon),
                beginner_friendly: true,
                ..Default::default()
            },
            today,
        );

        let only_category = filter_events(
            &events,
            &EventFilters {
                category: Some(EventCategory::Hackathon),
                ..Default::default()
            },
            today,
        );
        let only_beginner = filter_events(
            &events,
            &EventFilters {
                beginner_friendly: true,
                ..Default::default()
            },
            today,
        );

        let intersection: Vec<_> = only_category
            .iter()
            .filter(|e| only_beginner.iter().any(|o| o.id == e.id))
            .map(|e| e.id.clone())
            .collect();
        let combined_ids: Vec<_> = combined.iter().map(|e| e.id.clone()).collect();
        assert_eq!(combined_ids, intersection);
    }

    #[test]
    fn happening_today_uses_calendar_day_equality() {
        let events = vec![
            event("e1", "Morning", dec(15, 8)),
            event("e2", "Tomorrow", dec(16, 8)),
        ];
        let filters = EventFilters {
            happening_today: true,
            ..Default::default()
        };
        let matched = filter_events(&events, &filters, dec(15, 0).date_naive());
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, "e1");
    }

    #[test]
    fn date_range_is_inclusive() {
        let events = vec![
            event("e1", "On the edge", dec(15, 18)),
            event("e2", "Outside", dec(20, 18)),
        ];
        let filters = EventFilters {
            date_range: DateRange {
                start: Some(dec(15, 18)),
                end: Some(dec(18, 0)),
            },
            ..Default::default()
        };
        let matched = filter_events(&events, &filters, dec(15, 0).date_naive());
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, "e1");
    }

    #[test]
    fn attending_events_sort_first_for_the_user() {
        let mut later_but_attending = event("e2", "Later", dec(18, 14));
        later_but_attending.attendees = vec!["u1".into()];
        let mut events = vec![later_but_attending, event("e1", "Earlier", dec(15, 18))];

        sort_events(&mut events, Some("u1"));
        assert_eq!(events[0].id, "e2");

        sort_events(&mut events, None);
        assert_eq!(events[0].id, "e1");
    }

    #[test]
    fn partition_without_user_yields_single_set() {
        let events = vec![event("e1", "A", dec(15, 18)), event("e2", "B", dec(16, 18))];
        let (attending, others) = partition_attending(&events, None);
        assert!(attending.is_empty());
        assert_eq!(others.len(), 2);
    }

    #[test]
    fn my_events_partitions_attending_hosting_past() {
        let now = dec(16, 12);
        let mut past_attended = event("e1", "Past", dec(15, 18));
        past_attended.attendees = vec!["u1".into()];
        let mut hosting = event("e2", "Mine", dec(18, 14));
        hosting.created_by = "u1".into();
        let upcoming = event("e3", "Unrelated", dec(19, 10));

        let views = my_events(&[past_attended, hosting, upcoming], "u1", now);
        assert_eq!(views.attending.len(), 1);
        assert_eq!(views.hosting.len(), 1);
        assert_eq!(views.past.len(), 1);
        assert_eq!(views.past[0].id, "e1");
    }
}
