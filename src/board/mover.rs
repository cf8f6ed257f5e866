use std::fmt;
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use futures::future::join_all;

use crate::core::bucket::{BucketKey, BucketPolicy};
use crate::core::item::Schedulable;
use crate::core::move_date::compute_target_date;

use super::guard::MoveGuard;

/// A request to put `item` into the `target` lane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest<T> {
    pub item: T,
    pub target: BucketKey,
}

/// What a persistence effect reports when it completes without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectOutcome {
    Applied,
    /// The effect chose not to persist anything.
    Skipped,
}

/// How a move request settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStatus {
    Applied,
    /// The effect returned [`EffectOutcome::Skipped`].
    Aborted,
    /// The effect failed; the handler's `on_move_error` has been called.
    Failed,
    /// The target is not on this board or `can_move` refused.
    Denied,
    /// The target lane has no date to offer, e.g. Overdue or an empty week.
    NoTarget,
    /// A move for the same item was already in flight.
    AlreadyMoving,
    /// The item has no id and cannot be moved.
    Unidentified,
}

impl MoveStatus {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Caller-side hooks of a move. Only `effect` talks to a backend.
#[allow(async_fn_in_trait)]
pub trait MoveHandler<T: Schedulable> {
    type Error: fmt::Display;

    async fn can_move(&self, _item: &T, _target: BucketKey) -> bool {
        true
    }

    /// Persist the move. `proposed` is the timestamp the item should get.
    async fn effect(
        &self,
        item: &T,
        target: BucketKey,
        proposed: NaiveDateTime,
    ) -> Result<EffectOutcome, Self::Error>;

    fn on_after_move(&self, _item: &T, _target: BucketKey) {}

    fn on_move_error(&self, error: Self::Error, item: &T, target: BucketKey) {
        log::warn!(
            "Moving {:?} to {} failed: {}",
            item.id(),
            target,
            error
        );
    }
}

type Clock = Box<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Runs moves through the handler, one at a time per item.
pub struct MoveController<T: Schedulable, H> {
    policy: Arc<BucketPolicy>,
    handler: H,
    guard: MoveGuard<T::Id>,
    clock: Clock,
}

impl<T: Schedulable, H: MoveHandler<T>> MoveController<T, H> {
    pub fn new(policy: Arc<BucketPolicy>, handler: H) -> Self {
        Self {
            policy,
            handler,
            guard: MoveGuard::new(),
            clock: Box::new(|| Local::now().naive_local()),
        }
    }

    /// Replace the wall clock used to compute proposed timestamps.
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDateTime + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn is_moving(&self, id: &T::Id) -> bool {
        self.guard.is_moving(id)
    }

    pub fn in_flight(&self) -> usize {
        self.guard.len()
    }

    pub async fn request_move(&self, item: &T, target: BucketKey) -> MoveStatus {
        let Some(id) = item.id() else {
            log::debug!("Ignoring move of an item without id to {}", target);
            return MoveStatus::Unidentified;
        };

        if self.guard.is_moving(&id) {
            log::debug!("Move of {} already in flight, ignoring", id);
            return MoveStatus::AlreadyMoving;
        }

        if !self.policy.contains(target) || !self.handler.can_move(item, target).await {
            log::debug!("Move of {} to {} denied", id, target);
            return MoveStatus::Denied;
        }

        let Some(proposed) =
            compute_target_date(&self.policy, target, item.timestamp(), (self.clock)())
        else {
            log::debug!("No target date for {} in {}, not moving", id, target);
            return MoveStatus::NoTarget;
        };

        // can_move may have yielded, so the slot is checked again while taking it
        let Some(_entry) = self.guard.try_acquire(id.clone()) else {
            log::debug!("Move of {} already in flight, ignoring", id);
            return MoveStatus::AlreadyMoving;
        };

        match self.handler.effect(item, target, proposed).await {
            Ok(EffectOutcome::Applied) => {
                log::info!("Moved {} to {}", id, target);
                self.handler.on_after_move(item, target);
                MoveStatus::Applied
            }
            Ok(EffectOutcome::Skipped) => {
                log::debug!("Move of {} to {} skipped by effect", id, target);
                MoveStatus::Aborted
            }
            Err(e) => {
                self.handler.on_move_error(e, item, target);
                MoveStatus::Failed
            }
        }
    }

    pub async fn submit(&self, request: &MoveRequest<T>) -> MoveStatus {
        self.request_move(&request.item, request.target).await
    }

    /// Move several items at once. Distinct items proceed concurrently;
    /// statuses come back in input order.
    pub async fn request_moves<'a, I>(&self, items: I, target: BucketKey) -> Vec<MoveStatus>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        join_all(items.into_iter().map(|item| self.request_move(item, target))).await
    }
}
