//! Pure helpers for the order -> review -> posting workflow.

use chrono::{DateTime, Datelike, Months, Utc};
use uuid::Uuid;

/// Compute the posting window for an approved review.
///
/// Starts at the advertiser's requested target date when one was given,
/// otherwise at `now`. Runs for `term_months` calendar months; chrono clamps
/// the day to the end of a shorter month (Jan 31 + 1 month = Feb 28/29).
pub fn posting_window(
    target_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    term_months: i32,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = target_date.unwrap_or(now);
    let months = Months::new(term_months.max(0) as u32);
    let end = start.checked_add_months(months).unwrap_or(start);
    (start, end)
}

/// Human-facing order number: `ORD-YYYYMMDD-XXXXXXXX`.
pub fn order_number(now: DateTime<Utc>, order_id: Uuid) -> String {
    let simple = order_id.simple().to_string();
    format!(
        "ORD-{:04}{:02}{:02}-{}",
        now.year(),
        now.month(),
        now.day(),
        simple[..8].to_ascii_uppercase()
    )
}
