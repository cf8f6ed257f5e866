use std::sync::Arc;

use crate::core::bucket::{BucketKey, BucketPolicy};
use crate::core::item::Schedulable;
use crate::error::{Error, Result};

use super::mover::MoveRequest;

/// MIME type of the native drag payload.
pub const DRAG_MIME: &str = "text/plain";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropEffect {
    Move,
}

/// What crosses the native drag boundary: only the item id, as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragTransfer {
    pub mime: &'static str,
    pub data: String,
    pub effect: DropEffect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragState<T> {
    Idle,
    Dragging { item: T, hover: Option<BucketKey> },
}

/// Drag-and-drop session for one board.
///
/// Transport-agnostic: the UI forwards its native events to these methods and
/// receives a [`MoveRequest`] when a drop lands on a lane that accepts it.
#[derive(Debug)]
pub struct DragDropController<T> {
    policy: Arc<BucketPolicy>,
    state: DragState<T>,
}

impl<T: Schedulable + Clone> DragDropController<T> {
    pub fn new(policy: Arc<BucketPolicy>) -> Self {
        Self {
            policy,
            state: DragState::Idle,
        }
    }

    pub fn state(&self) -> &DragState<T> {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn dragged_item(&self) -> Option<&T> {
        match &self.state {
            DragState::Dragging { item, .. } => Some(item),
            DragState::Idle => None,
        }
    }

    pub fn hover_bucket(&self) -> Option<BucketKey> {
        match self.state {
            DragState::Dragging { hover, .. } => hover,
            DragState::Idle => None,
        }
    }

    /// Pick up `item`. A session already in progress is replaced.
    pub fn drag_start(&mut self, item: T) -> Result<DragTransfer> {
        let id = item.id().ok_or(Error::MissingId)?;
        log::debug!("Drag started for {}", id);
        self.state = DragState::Dragging { item, hover: None };
        Ok(DragTransfer {
            mime: DRAG_MIME,
            data: id.to_string(),
            effect: DropEffect::Move,
        })
    }

    /// End the gesture, dropped or not.
    pub fn drag_end(&mut self) {
        self.state = DragState::Idle;
    }

    /// Returns whether the lane accepts the hover.
    pub fn bucket_drag_over(&mut self, bucket: BucketKey) -> bool {
        if !self.policy.is_interactive(bucket) {
            return false;
        }
        match &mut self.state {
            DragState::Dragging { hover, .. } => {
                *hover = Some(bucket);
                true
            }
            DragState::Idle => false,
        }
    }

    pub fn bucket_drag_leave(&mut self) {
        if let DragState::Dragging { hover, .. } = &mut self.state {
            *hover = None;
        }
    }

    /// Drop the carried item on `bucket`.
    ///
    /// Lanes that do not accept drops leave the session untouched, so the
    /// gesture can still end on another lane.
    pub fn bucket_drop(&mut self, bucket: BucketKey) -> Option<MoveRequest<T>> {
        if !self.policy.is_interactive(bucket) || !self.is_dragging() {
            return None;
        }
        match std::mem::replace(&mut self.state, DragState::Idle) {
            DragState::Dragging { item, .. } => Some(MoveRequest {
                item,
                target: bucket,
            }),
            DragState::Idle => None,
        }
    }
}
