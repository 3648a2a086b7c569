// Ordered buffer of locally issued actions awaiting chain confirmation.

use crate::domain::{
    ConfirmedMove, Coords, CoordsRole, CorrelationKey, EntityId, MoveAction, PendingMove,
    SyncError, SyncTuning,
};
use crate::use_cases::coords_store::CoordinateStore;
use crate::use_cases::observable::Observable;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// Result of feeding a confirmation into the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Matched a pending entry; `corrected` is set when the store was moved
    /// to the confirmed value.
    Confirmed { corrected: bool },
    /// Matched, but an earlier move of the same character is still pending.
    Deferred,
    /// No pending entry; applied as an authoritative update.
    Unmatched,
}

#[derive(Debug)]
pub struct PendingMoveQueue {
    entries: VecDeque<PendingMove>,
    // Confirmations that arrived ahead of an earlier move by the same character.
    deferred: Vec<ConfirmedMove>,
    // Last confirmed position per character; `None` when nothing was known
    // before the first optimistic write.
    confirmed: HashMap<EntityId, Option<Coords>>,
    is_your_turn: bool,
    timeout_ms: u64,
    coord_tolerance: f64,
    published: Observable<Vec<PendingMove>>,
}

impl PendingMoveQueue {
    pub fn new(tuning: &SyncTuning) -> Self {
        Self {
            entries: VecDeque::new(),
            deferred: Vec::new(),
            confirmed: HashMap::new(),
            is_your_turn: false,
            timeout_ms: tuning.pending_timeout_ms,
            coord_tolerance: tuning.coord_tolerance,
            published: Observable::default(),
        }
    }

    pub fn set_your_turn(&mut self, is_your_turn: bool) {
        self.is_your_turn = is_your_turn;
    }

    pub fn is_your_turn(&self) -> bool {
        self.is_your_turn
    }

    /// Appends `pending` and applies its optimistic effect to the store.
    /// Out of turn input is rejected and changes nothing.
    pub fn enqueue(
        &mut self,
        pending: PendingMove,
        coords: &mut CoordinateStore,
    ) -> Result<(), SyncError> {
        if !self.is_your_turn {
            return Err(SyncError::NotYourTurn);
        }

        let character = pending.action.character();
        if !self.has_pending_for(character) {
            let baseline = coords.get_coords(CoordsRole::PlayerCurrent, character);
            self.confirmed.insert(character, baseline);
        }

        if let MoveAction::Move { target, .. } = pending.action {
            coords.set_coords(CoordsRole::PlayerCurrent, character, target);
        }

        debug!(key = pending.key, character, "move enqueued");
        self.entries.push_back(pending);
        self.publish();
        Ok(())
    }

    /// Matches `confirmed` against the queue by correlation key.
    pub fn reconcile(
        &mut self,
        confirmed: ConfirmedMove,
        coords: &mut CoordinateStore,
    ) -> ReconcileOutcome {
        let Some(index) = self.index_of(confirmed.key) else {
            self.note_confirmed(confirmed.character, confirmed.coords, coords);
            return ReconcileOutcome::Unmatched;
        };

        let character = self.entries[index].action.character();
        if self.has_earlier_for(index, character) {
            debug!(key = confirmed.key, character, "confirmation deferred");
            self.deferred.push(confirmed);
            return ReconcileOutcome::Deferred;
        }

        let corrected = self.resolve(index, confirmed, coords);
        self.drain_deferred(coords);
        self.publish();
        ReconcileOutcome::Confirmed { corrected }
    }

    /// Drops entries older than the timeout and rolls their effect back.
    /// Entries whose confirmation is only waiting on order never expire.
    pub fn expire(&mut self, now_ms: u64, coords: &mut CoordinateStore) -> Vec<PendingMove> {
        let mut expired = Vec::new();
        while let Some(index) = self.entries.iter().position(|entry| {
            now_ms.saturating_sub(entry.issued_at_ms) >= self.timeout_ms
                && !self.deferred.iter().any(|d| d.key == entry.key)
        }) {
            let Some(entry) = self.entries.remove(index) else {
                break;
            };
            let character = entry.action.character();
            info!(key = entry.key, character, "pending move expired; rolling back");
            self.rollback(character, coords);
            expired.push(entry);
            self.drain_deferred(coords);
        }

        if !expired.is_empty() {
            self.publish();
        }
        expired
    }

    /// Records an authoritative position. The store follows it unless a
    /// prediction for the character is still on screen.
    pub fn note_confirmed(
        &mut self,
        character: EntityId,
        position: Coords,
        coords: &mut CoordinateStore,
    ) -> bool {
        let position = coords.converter().normalize(position);
        self.confirmed.insert(character, Some(position));
        if self.has_pending_for(character) {
            return false;
        }
        coords.set_coords(CoordsRole::PlayerCurrent, character, position);
        true
    }

    pub fn has_pending_for(&self, character: EntityId) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.action.character() == character)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> Arc<Vec<PendingMove>> {
        self.published.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<PendingMove>>> {
        self.published.subscribe()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.deferred.clear();
        self.confirmed.clear();
        self.publish();
    }

    fn index_of(&self, key: CorrelationKey) -> Option<usize> {
        self.entries.iter().position(|entry| entry.key == key)
    }

    fn has_earlier_for(&self, index: usize, character: EntityId) -> bool {
        self.entries
            .iter()
            .take(index)
            .any(|entry| entry.action.character() == character)
    }

    // Latest optimistic position still owed to the character, if any.
    fn latest_prediction(&self, character: EntityId) -> Option<Coords> {
        self.entries.iter().rev().find_map(|entry| match entry.action {
            MoveAction::Move { character: c, target } if c == character => Some(target),
            _ => None,
        })
    }

    fn resolve(
        &mut self,
        index: usize,
        confirmed: ConfirmedMove,
        coords: &mut CoordinateStore,
    ) -> bool {
        let Some(entry) = self.entries.remove(index) else {
            return false;
        };
        let character = entry.action.character();
        let position = coords.converter().normalize(confirmed.coords);
        self.confirmed.insert(character, Some(position));

        // A later prediction keeps the screen; it will be checked on its own.
        if self.latest_prediction(character).is_some() {
            return false;
        }

        let drift = entry.action.predicted_position().distance(position);
        if drift > self.coord_tolerance {
            info!(key = entry.key, character, drift, "prediction corrected");
            coords.set_coords(CoordsRole::PlayerCurrent, character, position);
            return true;
        }
        debug!(key = entry.key, character, "prediction confirmed");
        false
    }

    fn drain_deferred(&mut self, coords: &mut CoordinateStore) {
        loop {
            let ready = self.deferred.iter().position(|d| match self.index_of(d.key) {
                Some(index) => !self.has_earlier_for(index, self.entries[index].action.character()),
                None => true,
            });
            let Some(position) = ready else {
                break;
            };
            let confirmed = self.deferred.remove(position);
            if let Some(index) = self.index_of(confirmed.key) {
                self.resolve(index, confirmed, coords);
            }
        }
    }

    // Reverts to the last confirmed value, then re-applies whatever is still
    // pending for the character.
    fn rollback(&mut self, character: EntityId, coords: &mut CoordinateStore) {
        if let Some(target) = self.latest_prediction(character) {
            coords.set_coords(CoordsRole::PlayerCurrent, character, target);
            return;
        }
        match self.confirmed.get(&character).copied().flatten() {
            Some(position) => {
                coords.set_coords(CoordsRole::PlayerCurrent, character, position);
            }
            None => {
                coords.remove(CoordsRole::PlayerCurrent, character);
            }
        }
    }

    fn publish(&self) {
        self.published.set(self.entries.iter().cloned().collect());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UnitConverter;

    const TIMEOUT: u64 = 15_000;

    fn setup() -> (PendingMoveQueue, CoordinateStore) {
        let mut queue = PendingMoveQueue::new(&SyncTuning::default());
        queue.set_your_turn(true);
        (queue, CoordinateStore::new(UnitConverter::default()))
    }

    fn move_to(key: CorrelationKey, character: EntityId, x: f64, y: f64, at: u64) -> PendingMove {
        PendingMove {
            key,
            action: MoveAction::Move {
                character,
                target: Coords::new(x, y),
            },
            issued_at_ms: at,
        }
    }

    fn confirmed(key: CorrelationKey, character: EntityId, x: f64, y: f64) -> ConfirmedMove {
        ConfirmedMove {
            key,
            character,
            coords: Coords::new(x, y),
        }
    }

    #[test]
    fn enqueue_applies_prediction_immediately() {
        let (mut queue, mut coords) = setup();
        queue
            .enqueue(move_to(1, 10, 3.0, 4.0, 0), &mut coords)
            .expect("your turn");

        assert_eq!(queue.len(), 1);
        assert_eq!(
            coords.get_coords(CoordsRole::PlayerCurrent, 10),
            Some(Coords::new(3.0, 4.0))
        );
        assert_eq!(queue.snapshot().len(), 1);
    }

    #[test]
    fn out_of_turn_enqueue_changes_nothing() {
        let (mut queue, mut coords) = setup();
        coords.set_coords(CoordsRole::PlayerCurrent, 10, Coords::new(1.0, 1.0));
        queue.set_your_turn(false);

        let result = queue.enqueue(move_to(1, 10, 3.0, 4.0, 0), &mut coords);

        assert_eq!(result, Err(SyncError::NotYourTurn));
        assert!(queue.is_empty());
        assert_eq!(
            coords.get_coords(CoordsRole::PlayerCurrent, 10),
            Some(Coords::new(1.0, 1.0))
        );
    }

    #[test]
    fn matching_confirmation_within_tolerance_keeps_prediction() {
        let (mut queue, mut coords) = setup();
        queue.enqueue(move_to(1, 10, 3.0, 4.0, 0), &mut coords).expect("your turn");

        let outcome = queue.reconcile(confirmed(1, 10, 3.01, 4.0), &mut coords);

        assert_eq!(outcome, ReconcileOutcome::Confirmed { corrected: false });
        assert!(queue.is_empty());
        assert_eq!(
            coords.get_coords(CoordsRole::PlayerCurrent, 10),
            Some(Coords::new(3.0, 4.0))
        );
    }

    #[test]
    fn drifted_confirmation_corrects_store() {
        let (mut queue, mut coords) = setup();
        queue.enqueue(move_to(1, 10, 3.0, 4.0, 0), &mut coords).expect("your turn");

        let outcome = queue.reconcile(confirmed(1, 10, 53_500.0, 54_000.0), &mut coords);

        assert_eq!(outcome, ReconcileOutcome::Confirmed { corrected: true });
        assert_eq!(
            coords.get_coords(CoordsRole::PlayerCurrent, 10),
            Some(Coords::new(3.5, 4.0))
        );
    }

    #[test]
    fn unmatched_confirmation_is_authoritative() {
        let (mut queue, mut coords) = setup();

        let outcome = queue.reconcile(confirmed(99, 11, 1.0, 2.0), &mut coords);

        assert_eq!(outcome, ReconcileOutcome::Unmatched);
        assert_eq!(
            coords.get_coords(CoordsRole::PlayerCurrent, 11),
            Some(Coords::new(1.0, 2.0))
        );
    }

    #[test]
    fn expired_move_reverts_to_pre_enqueue_value() {
        let (mut queue, mut coords) = setup();
        coords.set_coords(CoordsRole::PlayerCurrent, 10, Coords::new(-5.0, -5.0));
        queue.enqueue(move_to(1, 10, 3.0, 4.0, 1_000), &mut coords).expect("your turn");

        assert!(queue.expire(1_000 + TIMEOUT - 1, &mut coords).is_empty());
        let expired = queue.expire(1_000 + TIMEOUT, &mut coords);

        assert_eq!(expired.len(), 1);
        assert!(queue.is_empty());
        assert_eq!(
            coords.get_coords(CoordsRole::PlayerCurrent, 10),
            Some(Coords::new(-5.0, -5.0))
        );
    }

    #[test]
    fn expiry_without_prior_position_removes_entry() {
        let (mut queue, mut coords) = setup();
        queue.enqueue(move_to(1, 10, 3.0, 4.0, 0), &mut coords).expect("your turn");

        queue.expire(TIMEOUT, &mut coords);

        assert_eq!(coords.get_coords(CoordsRole::PlayerCurrent, 10), None);
    }

    #[test]
    fn rollback_replays_later_pending_moves() {
        let (mut queue, mut coords) = setup();
        coords.set_coords(CoordsRole::PlayerCurrent, 10, Coords::new(0.0, 0.0));
        queue.enqueue(move_to(1, 10, 1.0, 0.0, 0), &mut coords).expect("your turn");
        queue.enqueue(move_to(2, 10, 2.0, 0.0, 10_000), &mut coords).expect("your turn");

        let expired = queue.expire(TIMEOUT, &mut coords);

        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].key, 1);
        assert_eq!(queue.len(), 1);
        assert_eq!(
            coords.get_coords(CoordsRole::PlayerCurrent, 10),
            Some(Coords::new(2.0, 0.0))
        );
    }

    #[test]
    fn confirmations_apply_in_issue_order() {
        let (mut queue, mut coords) = setup();
        queue.enqueue(move_to(1, 10, 1.0, 0.0, 0), &mut coords).expect("your turn");
        queue.enqueue(move_to(2, 10, 2.0, 0.0, 0), &mut coords).expect("your turn");

        // Network delivers the second confirmation first.
        assert_eq!(
            queue.reconcile(confirmed(2, 10, 2.0, 0.0), &mut coords),
            ReconcileOutcome::Deferred
        );
        assert_eq!(queue.len(), 2);

        assert_eq!(
            queue.reconcile(confirmed(1, 10, 1.0, 0.0), &mut coords),
            ReconcileOutcome::Confirmed { corrected: false }
        );
        assert!(queue.is_empty());
        assert_eq!(
            coords.get_coords(CoordsRole::PlayerCurrent, 10),
            Some(Coords::new(2.0, 0.0))
        );
    }

    #[test]
    fn deferred_confirmation_survives_predecessor_expiry() {
        let (mut queue, mut coords) = setup();
        coords.set_coords(CoordsRole::PlayerCurrent, 10, Coords::new(0.0, 0.0));
        queue.enqueue(move_to(1, 10, 1.0, 0.0, 0), &mut coords).expect("your turn");
        queue.enqueue(move_to(2, 10, 2.0, 0.0, 0), &mut coords).expect("your turn");
        queue.reconcile(confirmed(2, 10, 2.0, 0.0), &mut coords);

        let expired = queue.expire(TIMEOUT, &mut coords);

        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].key, 1);
        assert!(queue.is_empty());
        assert_eq!(
            coords.get_coords(CoordsRole::PlayerCurrent, 10),
            Some(Coords::new(2.0, 0.0))
        );
    }

    #[test]
    fn other_characters_confirm_independently() {
        let (mut queue, mut coords) = setup();
        queue.enqueue(move_to(1, 10, 1.0, 0.0, 0), &mut coords).expect("your turn");
        queue.enqueue(move_to(2, 11, 2.0, 0.0, 0), &mut coords).expect("your turn");

        assert_eq!(
            queue.reconcile(confirmed(2, 11, 2.0, 0.0), &mut coords),
            ReconcileOutcome::Confirmed { corrected: false }
        );
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn remote_position_does_not_overwrite_live_prediction() {
        let (mut queue, mut coords) = setup();
        queue.enqueue(move_to(1, 10, 3.0, 4.0, 0), &mut coords).expect("your turn");

        assert!(!queue.note_confirmed(10, Coords::new(0.0, 0.0), &mut coords));
        assert_eq!(
            coords.get_coords(CoordsRole::PlayerCurrent, 10),
            Some(Coords::new(3.0, 4.0))
        );

        // The newer confirmed value becomes the rollback target.
        queue.expire(TIMEOUT, &mut coords);
        assert_eq!(
            coords.get_coords(CoordsRole::PlayerCurrent, 10),
            Some(Coords::new(0.0, 0.0))
        );
    }
}
