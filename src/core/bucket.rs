use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A temporal lane on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketKey {
    Overdue,
    Today,
    Tomorrow,
    Week,
    Next,
}

impl BucketKey {
    pub const ALL: [BucketKey; 5] = [
        Self::Overdue,
        Self::Today,
        Self::Tomorrow,
        Self::Week,
        Self::Next,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overdue => "overdue",
            Self::Today => "today",
            Self::Tomorrow => "tomorrow",
            Self::Week => "week",
            Self::Next => "next",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Overdue => "Overdue",
            Self::Today => "Today",
            Self::Tomorrow => "Tomorrow",
            Self::Week => "This week",
            Self::Next => "Next",
        }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BucketKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overdue" => Ok(Self::Overdue),
            "today" => Ok(Self::Today),
            "tomorrow" => Ok(Self::Tomorrow),
            "week" | "this-week" | "this_week" => Ok(Self::Week),
            "next" | "later" | "siguientes" => Ok(Self::Next),
            _ => Err(Error::UnknownBucket(s.to_string())),
        }
    }
}

/// How the "This week" lane ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekWindow {
    /// Through the end of day seven after today.
    #[default]
    Rolling,
    /// Through the end of the current ISO week (Sunday).
    CalendarWeek,
}

/// Which set of lanes a board shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneLayout {
    /// Overdue, Today, This week, Next
    #[default]
    FourLane,
    /// Overdue, Today, Tomorrow, This week, Next
    FiveLane,
}

/// A midnight cut point, relative to the day of "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Midnight starting the day `n` days after today.
    Days(i64),
    /// Midnight after the current ISO week ends, never earlier than `Days(at_least)`.
    WeekEnd { at_least: i64 },
}

impl Boundary {
    pub fn resolve(&self, today: NaiveDate) -> NaiveDateTime {
        let offset = match *self {
            Self::Days(n) => n,
            Self::WeekEnd { at_least } => {
                let to_monday = 7 - i64::from(today.weekday().num_days_from_monday());
                to_monday.max(at_least)
            }
        };
        start_of_day(shift_days(today, offset))
    }

    fn min_offset(&self) -> i64 {
        match *self {
            Self::Days(n) => n,
            Self::WeekEnd { at_least } => at_least,
        }
    }
}

/// Where a card lands when it is moved into a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// No well-defined target date. Moves into this bucket are not attempted.
    None,
    /// The first day of the window, shifted by `plus_days`.
    WindowStart { plus_days: i64 },
    /// Keep the original date when it is inside the window, else the nearer edge.
    Clamp,
}

/// A half-open interval `[start, end)`; `None` is unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl Window {
    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        self.start.is_none_or(|start| ts >= start) && self.end.is_none_or(|end| ts < end)
    }

    pub fn is_empty(&self) -> bool {
        matches!((self.start, self.end), (Some(start), Some(end)) if start >= end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketDefinition {
    pub key: BucketKey,
    pub start: Option<Boundary>,
    pub end: Option<Boundary>,
    /// Whether cards may be dropped into this lane.
    pub interactive: bool,
    pub anchor: Anchor,
}

impl BucketDefinition {
    pub fn window(&self, now: NaiveDateTime) -> Window {
        let today = now.date();
        Window {
            start: self.start.map(|b| b.resolve(today)),
            end: self.end.map(|b| b.resolve(today)),
        }
    }
}

/// An ordered set of bucket windows that partitions the timeline.
///
/// The last bucket doubles as the fallback for items without a usable timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketPolicy {
    buckets: Vec<BucketDefinition>,
}

impl BucketPolicy {
    /// Build a custom policy, checking that the windows chain without gaps or overlaps.
    pub fn new(buckets: Vec<BucketDefinition>) -> Result<Self> {
        validate(&buckets)?;
        Ok(Self { buckets })
    }

    pub fn four_lane(week: WeekWindow) -> Self {
        let week_end = week_boundary(week, 1);
        Self {
            buckets: vec![
                overdue(),
                today(),
                BucketDefinition {
                    key: BucketKey::Week,
                    start: Some(Boundary::Days(1)),
                    end: Some(week_end),
                    interactive: true,
                    anchor: Anchor::Clamp,
                },
                next(week_end),
            ],
        }
    }

    pub fn five_lane(week: WeekWindow) -> Self {
        let week_end = week_boundary(week, 2);
        Self {
            buckets: vec![
                overdue(),
                today(),
                BucketDefinition {
                    key: BucketKey::Tomorrow,
                    start: Some(Boundary::Days(1)),
                    end: Some(Boundary::Days(2)),
                    interactive: true,
                    anchor: Anchor::WindowStart { plus_days: 0 },
                },
                BucketDefinition {
                    key: BucketKey::Week,
                    start: Some(Boundary::Days(2)),
                    end: Some(week_end),
                    interactive: true,
                    anchor: Anchor::Clamp,
                },
                next(week_end),
            ],
        }
    }

    pub fn from_layout(layout: LaneLayout, week: WeekWindow) -> Self {
        match layout {
            LaneLayout::FourLane => Self::four_lane(week),
            LaneLayout::FiveLane => Self::five_lane(week),
        }
    }

    pub fn buckets(&self) -> &[BucketDefinition] {
        &self.buckets
    }

    pub fn keys(&self) -> impl Iterator<Item = BucketKey> + '_ {
        self.buckets.iter().map(|b| b.key)
    }

    pub fn get(&self, key: BucketKey) -> Option<&BucketDefinition> {
        self.buckets.iter().find(|b| b.key == key)
    }

    pub fn contains(&self, key: BucketKey) -> bool {
        self.get(key).is_some()
    }

    pub fn is_interactive(&self, key: BucketKey) -> bool {
        self.get(key).is_some_and(|b| b.interactive)
    }

    pub fn fallback(&self) -> BucketKey {
        // validate() and the built-in constructors guarantee at least one bucket
        self.buckets
            .last()
            .map(|b| b.key)
            .unwrap_or(BucketKey::Next)
    }
}

impl Default for BucketPolicy {
    fn default() -> Self {
        Self::four_lane(WeekWindow::default())
    }
}

fn overdue() -> BucketDefinition {
    BucketDefinition {
        key: BucketKey::Overdue,
        start: None,
        end: Some(Boundary::Days(0)),
        interactive: false,
        anchor: Anchor::None,
    }
}

fn today() -> BucketDefinition {
    BucketDefinition {
        key: BucketKey::Today,
        start: Some(Boundary::Days(0)),
        end: Some(Boundary::Days(1)),
        interactive: true,
        anchor: Anchor::WindowStart { plus_days: 0 },
    }
}

fn next(start: Boundary) -> BucketDefinition {
    BucketDefinition {
        key: BucketKey::Next,
        start: Some(start),
        end: None,
        interactive: true,
        anchor: Anchor::WindowStart { plus_days: 7 },
    }
}

fn week_boundary(week: WeekWindow, at_least: i64) -> Boundary {
    match week {
        WeekWindow::Rolling => Boundary::Days(8),
        WeekWindow::CalendarWeek => Boundary::WeekEnd { at_least },
    }
}

fn validate(buckets: &[BucketDefinition]) -> Result<()> {
    let invalid = |msg: String| Err(Error::InvalidPolicy(msg));

    let (Some(first), Some(last)) = (buckets.first(), buckets.last()) else {
        return invalid("a policy needs at least one bucket".into());
    };
    if first.start.is_some() {
        return invalid(format!("first bucket {} must be unbounded below", first.key));
    }
    if last.end.is_some() {
        return invalid(format!("last bucket {} must be unbounded above", last.key));
    }

    for (i, bucket) in buckets.iter().enumerate() {
        if buckets[..i].iter().any(|b| b.key == bucket.key) {
            return invalid(format!("bucket {} appears twice", bucket.key));
        }
        if i > 0 && bucket.start.is_none() {
            return invalid(format!("bucket {} must have a start", bucket.key));
        }
        if i + 1 < buckets.len() && bucket.end.is_none() {
            return invalid(format!("bucket {} must have an end", bucket.key));
        }
        if let (Some(start), Some(end)) = (bucket.start, bucket.end) {
            if matches!(start, Boundary::WeekEnd { .. }) {
                return invalid(format!(
                    "bucket {} starts at a week end, so it must be the last bucket",
                    bucket.key
                ));
            }
            if start.min_offset() > end.min_offset() {
                return invalid(format!("bucket {} ends before it starts", bucket.key));
            }
        }
    }

    for pair in buckets.windows(2) {
        if pair[0].end != pair[1].start {
            return invalid(format!(
                "gap or overlap between {} and {}",
                pair[0].key, pair[1].key
            ));
        }
    }

    Ok(())
}

pub(crate) fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Saturates at the ends of chrono's calendar instead of panicking.
pub(crate) fn shift_days(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(Duration::days(days))
        .unwrap_or(if days >= 0 { NaiveDate::MAX } else { NaiveDate::MIN })
}
