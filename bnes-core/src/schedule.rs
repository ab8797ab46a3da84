//! Selection of the collections that should be announced today.

use chrono::{Duration, NaiveDate};

use crate::model::CollectionEvent;

/// Keep the events happening the day after `today`, or all events when `ignore_date_check` is set.
///
/// Order is preserved.
#[must_use]
pub fn due_tomorrow(
    events: Vec<CollectionEvent>,
    today: NaiveDate,
    ignore_date_check: bool,
) -> Vec<CollectionEvent> {
    if ignore_date_check {
        return events;
    }

    let tomorrow = today + Duration::days(1);
    events
        .into_iter()
        .filter(|event| event.date() == tomorrow)
        .collect()
}
