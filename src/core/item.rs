use std::fmt;
use std::hash::Hash;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::classify::parse_timestamp;
use crate::error::{Error, Result};

/// Anything the board can place in a lane.
///
/// The board never mutates items. Moves only propose a new timestamp to the
/// caller's persistence effect.
pub trait Schedulable {
    type Id: Clone + Eq + Hash + fmt::Display + fmt::Debug;

    /// `None` for items that have not been saved yet; those cannot be dragged or moved.
    fn id(&self) -> Option<Self::Id>;

    /// `None` when the item has no timestamp or it cannot be parsed.
    fn timestamp(&self) -> Option<NaiveDateTime>;

    fn is_closed(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Event,
    FollowUp,
    Opportunity,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::FollowUp => "follow-up",
            Self::Opportunity => "opportunity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    #[default]
    Open,
    Closed,
}

/// A work item as stored in a resource file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: Uuid,
    pub kind: ItemKind,
    pub title: String,
    /// Raw due timestamp as received from the backend; may be malformed.
    #[serde(default)]
    pub due: Option<String>,
    #[serde(default)]
    pub state: ItemState,
}

pub const DUE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

impl WorkItem {
    pub fn new(kind: ItemKind, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            title: title.into(),
            due: None,
            state: ItemState::Open,
        }
    }

    pub fn with_due(mut self, due: NaiveDateTime) -> Self {
        self.reschedule(due);
        self
    }

    pub fn reschedule(&mut self, due: NaiveDateTime) {
        self.due = Some(due.format(DUE_FORMAT).to_string());
    }

    pub fn close(&mut self) {
        self.state = ItemState::Closed;
    }
}

impl Schedulable for WorkItem {
    type Id = Uuid;

    fn id(&self) -> Option<Uuid> {
        Some(self.id)
    }

    fn timestamp(&self) -> Option<NaiveDateTime> {
        self.due.as_deref().and_then(parse_timestamp)
    }

    fn is_closed(&self) -> bool {
        self.state == ItemState::Closed
    }
}

pub fn load_items(path: &Path) -> Vec<WorkItem> {
    match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::error!("Failed to parse items in {}: {}", path.display(), e);
            Vec::new()
        }),
        Err(_) => Vec::new(),
    }
}

pub fn save_items(path: &Path, items: &[WorkItem]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(items)?;
    std::fs::write(path, json).map_err(|e| Error::io(path, e))
}
