use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::bucket::{BucketKey, BucketPolicy, start_of_day};
use super::item::Schedulable;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a backend timestamp. Offsets are converted to local time; date-only
/// values land at midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(start_of_day)
        })
}

/// Assign a timestamp to the first bucket whose window contains it.
///
/// Missing timestamps go to the policy's fallback bucket.
pub fn classify(
    now: NaiveDateTime,
    timestamp: Option<NaiveDateTime>,
    policy: &BucketPolicy,
) -> BucketKey {
    let Some(ts) = timestamp else {
        return policy.fallback();
    };
    policy
        .buckets()
        .iter()
        .find(|b| b.window(now).contains(ts))
        .map(|b| b.key)
        .unwrap_or_else(|| policy.fallback())
}

pub fn classify_raw(now: NaiveDateTime, raw: Option<&str>, policy: &BucketPolicy) -> BucketKey {
    classify(now, raw.and_then(parse_timestamp), policy)
}

/// Which items a board surfaces, applied after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewScope {
    /// Open items only.
    #[default]
    Active,
    /// Open items, plus closed ones that are past due. Closed items never
    /// show up in the future lanes.
    All,
}

impl ViewScope {
    pub fn surfaces<T: Schedulable>(&self, item: &T, bucket: BucketKey) -> bool {
        if !item.is_closed() {
            return true;
        }
        match self {
            Self::Active => false,
            Self::All => bucket == BucketKey::Overdue,
        }
    }
}

/// The items of one bucket, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucketed<'a, T> {
    pub key: BucketKey,
    pub items: Vec<&'a T>,
}

/// Classify every item and group them in policy order. Every bucket of the
/// policy is present, even when empty.
///
/// `surface` can suppress an item from the bucket it was classified into.
pub fn bucketize<'a, T, F>(
    items: &'a [T],
    now: NaiveDateTime,
    policy: &BucketPolicy,
    surface: F,
) -> Vec<Bucketed<'a, T>>
where
    T: Schedulable,
    F: Fn(&T, BucketKey) -> bool,
{
    let mut lanes: Vec<Bucketed<'a, T>> = policy
        .keys()
        .map(|key| Bucketed {
            key,
            items: Vec::new(),
        })
        .collect();

    for item in items {
        let key = classify(now, item.timestamp(), policy);
        if !surface(item, key) {
            continue;
        }
        if let Some(lane) = lanes.iter_mut().find(|l| l.key == key) {
            lane.items.push(item);
        }
    }

    lanes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bucket::WeekWindow;
    use crate::core::item::{ItemKind, WorkItem};
    use proptest::prelude::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn now() -> NaiveDateTime {
        dt(2024, 1, 15, 0, 0)
    }

    #[test]
    fn parses_common_formats() {
        assert_eq!(parse_timestamp("2024-01-10T09:00"), Some(dt(2024, 1, 10, 9, 0)));
        assert_eq!(parse_timestamp("2024-01-10T09:00:00"), Some(dt(2024, 1, 10, 9, 0)));
        assert_eq!(parse_timestamp("2024-01-10 09:00"), Some(dt(2024, 1, 10, 9, 0)));
        assert_eq!(parse_timestamp("2024-01-10"), Some(dt(2024, 1, 10, 0, 0)));
        assert!(parse_timestamp("2024-01-10T09:00:00Z").is_some());
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("soon"), None);
        assert_eq!(parse_timestamp("2024-13-40"), None);
    }

    #[test]
    fn four_lane_boundaries() {
        let policy = BucketPolicy::four_lane(WeekWindow::Rolling);
        let at = |ts| classify(now(), Some(ts), &policy);

        assert_eq!(at(dt(2024, 1, 14, 23, 59)), BucketKey::Overdue);
        assert_eq!(at(dt(2024, 1, 15, 0, 0)), BucketKey::Today);
        assert_eq!(
            at(NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(23, 59, 59)
                .unwrap()),
            BucketKey::Today
        );
        assert_eq!(at(dt(2024, 1, 16, 0, 0)), BucketKey::Week);
        assert_eq!(at(dt(2024, 1, 22, 23, 0)), BucketKey::Week);
        assert_eq!(at(dt(2024, 1, 23, 0, 0)), BucketKey::Next);
    }

    #[test]
    fn five_lane_boundaries() {
        let policy = BucketPolicy::five_lane(WeekWindow::Rolling);
        let at = |ts| classify(now(), Some(ts), &policy);

        assert_eq!(at(dt(2024, 1, 16, 0, 0)), BucketKey::Tomorrow);
        assert_eq!(at(dt(2024, 1, 16, 23, 0)), BucketKey::Tomorrow);
        assert_eq!(at(dt(2024, 1, 17, 0, 0)), BucketKey::Week);
        assert_eq!(at(dt(2024, 1, 23, 0, 0)), BucketKey::Next);
    }

    #[test]
    fn missing_or_malformed_falls_back_to_last_bucket() {
        let policy = BucketPolicy::five_lane(WeekWindow::Rolling);
        assert_eq!(classify(now(), None, &policy), BucketKey::Next);
        assert_eq!(classify_raw(now(), None, &policy), BucketKey::Next);
        assert_eq!(classify_raw(now(), Some("garbage"), &policy), BucketKey::Next);
    }

    #[test]
    fn bucketize_keeps_every_lane_in_order() {
        let policy = BucketPolicy::four_lane(WeekWindow::Rolling);
        let items = vec![
            WorkItem::new(ItemKind::Event, "Late").with_due(dt(2024, 1, 10, 9, 0)),
            WorkItem::new(ItemKind::FollowUp, "Undated"),
            WorkItem::new(ItemKind::Event, "Now").with_due(dt(2024, 1, 15, 14, 0)),
        ];

        let lanes = bucketize(&items, now(), &policy, |_, _| true);
        let keys: Vec<_> = lanes.iter().map(|l| l.key).collect();
        assert_eq!(
            keys,
            vec![BucketKey::Overdue, BucketKey::Today, BucketKey::Week, BucketKey::Next]
        );
        assert_eq!(lanes[0].items[0].title, "Late");
        assert_eq!(lanes[1].items[0].title, "Now");
        assert!(lanes[2].items.is_empty());
        assert_eq!(lanes[3].items[0].title, "Undated");
    }

    #[test]
    fn view_scope_suppresses_closed_items() {
        let policy = BucketPolicy::four_lane(WeekWindow::Rolling);
        let mut past = WorkItem::new(ItemKind::Opportunity, "Won deal").with_due(dt(2024, 1, 2, 9, 0));
        past.close();
        let mut future = WorkItem::new(ItemKind::Event, "Cancelled").with_due(dt(2024, 1, 18, 9, 0));
        future.close();
        let open = WorkItem::new(ItemKind::Event, "Open").with_due(dt(2024, 1, 2, 9, 0));
        let items = vec![past, future, open];

        let active = bucketize(&items, now(), &policy, |i, b| ViewScope::Active.surfaces(i, b));
        let total: usize = active.iter().map(|l| l.items.len()).sum();
        assert_eq!(total, 1);
        assert_eq!(active[0].items[0].title, "Open");

        let all = bucketize(&items, now(), &policy, |i, b| ViewScope::All.surfaces(i, b));
        assert_eq!(all[0].items.len(), 2);
        assert!(all[2].items.is_empty());
    }

    fn any_now() -> impl Strategy<Value = NaiveDateTime> {
        (0i64..20_000, 0u32..86_400).prop_map(|(days, secs)| {
            start_of_day(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap())
                + chrono::Duration::days(days)
                + chrono::Duration::seconds(i64::from(secs))
        })
    }

    fn any_policy() -> impl Strategy<Value = BucketPolicy> {
        prop_oneof![
            Just(BucketPolicy::four_lane(WeekWindow::Rolling)),
            Just(BucketPolicy::four_lane(WeekWindow::CalendarWeek)),
            Just(BucketPolicy::five_lane(WeekWindow::Rolling)),
            Just(BucketPolicy::five_lane(WeekWindow::CalendarWeek)),
        ]
    }

    proptest! {
        #[test]
        fn every_timestamp_lands_in_exactly_one_window(
            now in any_now(),
            offset in -40_000_000i64..40_000_000,
            policy in any_policy(),
        ) {
            let ts = now + chrono::Duration::seconds(offset);
            let hits = policy.buckets().iter().filter(|b| b.window(now).contains(ts)).count();
            prop_assert_eq!(hits, 1);
            prop_assert!(policy.contains(classify(now, Some(ts), &policy)));
        }

        #[test]
        fn classify_is_deterministic(
            now in any_now(),
            raw in proptest::option::of(".{0,24}"),
            policy in any_policy(),
        ) {
            let first = classify_raw(now, raw.as_deref(), &policy);
            let second = classify_raw(now, raw.as_deref(), &policy);
            prop_assert_eq!(first, second);
            prop_assert!(policy.contains(first));
        }
    }
}
