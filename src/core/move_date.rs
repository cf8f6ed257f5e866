use chrono::{NaiveDate, NaiveDateTime};

use super::bucket::{Anchor, BucketKey, BucketPolicy, Window, shift_days};
use super::classify::parse_timestamp;

/// The timestamp an item gets when it is moved into `target`.
///
/// The date comes from the bucket's anchor; the time of day is kept from
/// `original`, or taken from `now` when there is no original. Returns `None`
/// when the bucket has no target date, in which case the move should not be
/// attempted.
pub fn compute_target_date(
    policy: &BucketPolicy,
    target: BucketKey,
    original: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> Option<NaiveDateTime> {
    let bucket = policy.get(target)?;
    let window = bucket.window(now);

    let date = match bucket.anchor {
        Anchor::None => return None,
        Anchor::WindowStart { plus_days } => shift_days(window.start?.date(), plus_days),
        Anchor::Clamp => clamp_date(&window, original.unwrap_or(now).date())?,
    };

    let time = original.unwrap_or(now).time();
    Some(date.and_time(time))
}

pub fn compute_target_date_raw(
    policy: &BucketPolicy,
    target: BucketKey,
    original: Option<&str>,
    now: NaiveDateTime,
) -> Option<NaiveDateTime> {
    compute_target_date(policy, target, original.and_then(parse_timestamp), now)
}

// Window edges are always midnights, so clamping by calendar day is exact.
fn clamp_date(window: &Window, date: NaiveDate) -> Option<NaiveDate> {
    if window.is_empty() {
        return None;
    }
    let first = window.start.map(|s| s.date());
    let last = window.end.map(|e| shift_days(e.date(), -1));

    let date = match first {
        Some(first) if date < first => first,
        _ => date,
    };
    Some(match last {
        Some(last) if date > last => last,
        _ => date,
    })
}
