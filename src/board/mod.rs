//! The board: lanes built from classified items, plus the drag, move and
//! collapse state of one screen.

pub mod drag;
pub mod guard;
pub mod mover;

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::core::bucket::{BucketKey, BucketPolicy};
use crate::core::classify::{ViewScope, bucketize, classify};
use crate::core::collapse::CollapseState;
use crate::core::item::Schedulable;
use crate::core::move_date::compute_target_date;

use drag::DragDropController;
use mover::{MoveController, MoveHandler, MoveRequest, MoveStatus};

/// Something that can be collapsed on the board.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CollapseTarget<Id> {
    Lane(BucketKey),
    Card(Id),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardLayout {
    Compact,
    Detailed,
    Archived,
}

/// Chooses how a card is laid out, once per card per render.
pub trait CardStrategy<T> {
    fn layout(&self, bucket: BucketKey, item: &T) -> CardLayout;
}

/// Closed items are archived; lanes that need attention now get full cards.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCards;

impl<T: Schedulable> CardStrategy<T> for DefaultCards {
    fn layout(&self, bucket: BucketKey, item: &T) -> CardLayout {
        if item.is_closed() {
            return CardLayout::Archived;
        }
        match bucket {
            BucketKey::Overdue | BucketKey::Today => CardLayout::Detailed,
            BucketKey::Tomorrow | BucketKey::Week | BucketKey::Next => CardLayout::Compact,
        }
    }
}

/// Menu shortcuts that move a card without dragging it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAction {
    Today,
    Tomorrow,
    Week,
    Next,
}

impl QuickAction {
    pub const ALL: [QuickAction; 4] = [Self::Today, Self::Tomorrow, Self::Week, Self::Next];

    pub fn bucket(&self) -> BucketKey {
        match self {
            Self::Today => BucketKey::Today,
            Self::Tomorrow => BucketKey::Tomorrow,
            Self::Week => BucketKey::Week,
            Self::Next => BucketKey::Next,
        }
    }

    pub fn for_bucket(bucket: BucketKey) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.bucket() == bucket)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Today => "Move to today",
            Self::Tomorrow => "Move to tomorrow",
            Self::Week => "Move to this week",
            Self::Next => "Move to next",
        }
    }
}

/// Shortcuts worth offering for a card currently in `current`. Lanes that
/// have no date to offer at `now` are left out.
pub fn quick_actions(policy: &BucketPolicy, current: BucketKey, now: NaiveDateTime) -> Vec<QuickAction> {
    QuickAction::ALL
        .into_iter()
        .filter(|a| a.bucket() != current && policy.is_interactive(a.bucket()))
        .filter(|a| compute_target_date(policy, a.bucket(), None, now).is_some())
        .collect()
}

#[derive(Debug)]
pub struct Lane<'a, T> {
    pub key: BucketKey,
    pub label: &'static str,
    pub interactive: bool,
    pub collapsed: bool,
    pub hovered: bool,
    pub items: Vec<&'a T>,
}

/// One screen's board.
pub struct BucketBoard<T: Schedulable, H> {
    policy: Arc<BucketPolicy>,
    scope: ViewScope,
    drag: DragDropController<T>,
    mover: MoveController<T, H>,
    collapse: CollapseState<CollapseTarget<T::Id>>,
}

impl<T, H> BucketBoard<T, H>
where
    T: Schedulable + Clone,
    H: MoveHandler<T>,
{
    pub fn new(policy: BucketPolicy, handler: H) -> Self {
        let policy = Arc::new(policy);
        Self {
            drag: DragDropController::new(policy.clone()),
            mover: MoveController::new(policy.clone(), handler),
            policy,
            scope: ViewScope::default(),
            collapse: CollapseState::default(),
        }
    }

    pub fn with_scope(mut self, scope: ViewScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDateTime + Send + Sync + 'static) -> Self {
        self.mover = self.mover.with_clock(clock);
        self
    }

    pub fn policy(&self) -> &BucketPolicy {
        &self.policy
    }

    pub fn scope(&self) -> ViewScope {
        self.scope
    }

    pub fn set_scope(&mut self, scope: ViewScope) {
        self.scope = scope;
    }

    /// Rebuild every lane from the authoritative item collection.
    pub fn lanes<'a>(&self, items: &'a [T], now: NaiveDateTime) -> Vec<Lane<'a, T>> {
        let scope = self.scope;
        let hover = self.drag.hover_bucket();
        bucketize(items, now, &self.policy, |item, key| scope.surfaces(item, key))
            .into_iter()
            .map(|bucketed| Lane {
                key: bucketed.key,
                label: bucketed.key.label(),
                interactive: self.policy.is_interactive(bucketed.key),
                collapsed: self.collapse.is_collapsed(&CollapseTarget::Lane(bucketed.key)),
                hovered: hover == Some(bucketed.key),
                items: bucketed.items,
            })
            .collect()
    }

    pub fn bucket_of(&self, item: &T, now: NaiveDateTime) -> BucketKey {
        classify(now, item.timestamp(), &self.policy)
    }

    pub fn quick_actions_for(&self, item: &T, now: NaiveDateTime) -> Vec<QuickAction> {
        quick_actions(&self.policy, self.bucket_of(item, now), now)
    }

    pub fn drag(&self) -> &DragDropController<T> {
        &self.drag
    }

    pub fn drag_mut(&mut self) -> &mut DragDropController<T> {
        &mut self.drag
    }

    /// Finish a drag on `bucket`. The returned request goes to [`Self::submit`].
    pub fn drop_on(&mut self, bucket: BucketKey) -> Option<MoveRequest<T>> {
        self.drag.bucket_drop(bucket)
    }

    pub async fn submit(&self, request: &MoveRequest<T>) -> MoveStatus {
        self.mover.submit(request).await
    }

    pub async fn quick_action(&self, item: &T, action: QuickAction) -> MoveStatus {
        self.mover.request_move(item, action.bucket()).await
    }

    pub fn mover(&self) -> &MoveController<T, H> {
        &self.mover
    }

    pub fn collapse(&self) -> &CollapseState<CollapseTarget<T::Id>> {
        &self.collapse
    }

    pub fn collapse_mut(&mut self) -> &mut CollapseState<CollapseTarget<T::Id>> {
        &mut self.collapse
    }

    pub fn is_card_collapsed(&self, item: &T) -> bool {
        match item.id() {
            Some(id) => self.collapse.is_collapsed(&CollapseTarget::Card(id)),
            None => self.collapse.global_default(),
        }
    }

    /// Forget card overrides for items that are no longer in `items`.
    pub fn prune_cards(&mut self, items: &[T]) {
        let live: std::collections::HashSet<T::Id> = items.iter().filter_map(|i| i.id()).collect();
        self.collapse.retain(|target| match target {
            CollapseTarget::Lane(_) => true,
            CollapseTarget::Card(id) => live.contains(id),
        });
    }
}
