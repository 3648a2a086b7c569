// Bullet lifecycle: local prediction, on-chain confirmation, removal.

use crate::domain::{BulletCoords, Coords, EntityId, SyncTuning, UnitConverter};
use crate::use_cases::observable::Observable;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulletState {
    /// Shown immediately after a local shot; no chain id yet.
    Predicted { created_at_ms: u64 },
    Confirmed { id: u64 },
}

/// How an incoming confirmed bullet was merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// Already confirmed bullet; coordinates refreshed.
    Updated,
    /// Claimed a predicted bullet in place.
    Reconciled,
    /// No prediction matched; inserted as a new confirmed bullet.
    Inserted,
}

/// Visual offset blended away over a fixed number of frames.
#[derive(Debug, Clone, Copy)]
struct Correction {
    offset: Coords,
    frames_left: u32,
    total_frames: u32,
}

impl Correction {
    fn current(&self) -> Coords {
        let weight = f64::from(self.frames_left) / f64::from(self.total_frames);
        Coords::new(self.offset.x * weight, self.offset.y * weight)
    }
}

#[derive(Debug, Clone)]
struct TrackedBullet {
    state: BulletState,
    shot_by: EntityId,
    angle: f64,
    origin: Coords,
    // Logical position; the renderer sees it plus any pending correction.
    position: Coords,
    correction: Option<Correction>,
}

impl TrackedBullet {
    fn id(&self) -> Option<u64> {
        match self.state {
            BulletState::Confirmed { id } => Some(id),
            BulletState::Predicted { .. } => None,
        }
    }

    fn rendered(&self) -> Coords {
        match self.correction {
            Some(correction) => {
                let offset = correction.current();
                self.position.offset_by(offset.x, offset.y)
            }
            None => self.position,
        }
    }

    fn view(&self, coords: Coords) -> BulletCoords {
        BulletCoords {
            id: self.id(),
            coords,
            angle: self.angle,
            shot_by: self.shot_by,
        }
    }
}

/// Tracks every live bullet and publishes the render and start lists.
#[derive(Debug)]
pub struct BulletTracker {
    tuning: SyncTuning,
    converter: UnitConverter,
    bullets: Vec<TrackedBullet>,
    render: Observable<Vec<BulletCoords>>,
    start: Observable<Vec<BulletCoords>>,
}

impl BulletTracker {
    pub fn new(tuning: SyncTuning) -> Self {
        Self {
            tuning,
            converter: tuning.converter(),
            bullets: Vec::new(),
            render: Observable::default(),
            start: Observable::default(),
        }
    }

    /// Shows a locally fired bullet right away.
    ///
    /// A second shot with the same shooter and angle inside the duplicate
    /// window replaces the earlier unconfirmed one instead of stacking.
    pub fn predict(&mut self, shot_by: EntityId, origin: Coords, angle: f64, now_ms: u64) {
        let origin = self.converter.normalize(origin);
        let bullet = TrackedBullet {
            state: BulletState::Predicted {
                created_at_ms: now_ms,
            },
            shot_by,
            angle,
            origin,
            position: origin,
            correction: None,
        };

        let duplicate = self.duplicate_of(shot_by, angle, now_ms);

        match duplicate {
            Some(index) => {
                debug!(shot_by, angle, "duplicate predicted bullet replaced");
                self.bullets[index] = bullet;
            }
            None => self.bullets.push(bullet),
        }
        self.publish();
    }

    /// True when a shot like this one was predicted inside the duplicate
    /// window and is still unconfirmed.
    pub fn is_duplicate(&self, shot_by: EntityId, angle: f64, now_ms: u64) -> bool {
        self.duplicate_of(shot_by, angle, now_ms).is_some()
    }

    fn duplicate_of(&self, shot_by: EntityId, angle: f64, now_ms: u64) -> Option<usize> {
        self.bullets.iter().position(|b| match b.state {
            BulletState::Predicted { created_at_ms } => {
                b.shot_by == shot_by
                    && angle_delta(b.angle, angle) <= self.tuning.angle_tolerance
                    && now_ms.abs_diff(created_at_ms) <= self.tuning.duplicate_window_ms
            }
            BulletState::Confirmed { .. } => false,
        })
    }

    /// Merges a bullet confirmed by the chain.
    pub fn confirm(&mut self, id: u64, shot_by: EntityId, coords: Coords, angle: f64) -> ConfirmOutcome {
        let coords = self.converter.normalize(coords);

        if let Some(index) = self.bullets.iter().position(|b| b.id() == Some(id)) {
            self.correct(index, coords);
            self.bullets[index].angle = angle;
            self.publish();
            return ConfirmOutcome::Updated;
        }

        // Oldest matching prediction wins so repeated shots pair up in order.
        let predicted = self.bullets.iter().position(|b| {
            matches!(b.state, BulletState::Predicted { .. })
                && b.shot_by == shot_by
                && angle_delta(b.angle, angle) <= self.tuning.angle_tolerance
        });

        let outcome = match predicted {
            Some(index) => {
                self.correct(index, coords);
                let bullet = &mut self.bullets[index];
                bullet.state = BulletState::Confirmed { id };
                bullet.angle = angle;
                debug!(id, shot_by, "predicted bullet confirmed");
                ConfirmOutcome::Reconciled
            }
            None => {
                self.bullets.push(TrackedBullet {
                    state: BulletState::Confirmed { id },
                    shot_by,
                    angle,
                    origin: coords,
                    position: coords,
                    correction: None,
                });
                debug!(id, shot_by, "confirmed bullet inserted");
                ConfirmOutcome::Inserted
            }
        };
        self.publish();
        outcome
    }

    // Moves the logical position to `confirmed` and keeps the visible point
    // where it was, blending the difference away unless it is tiny.
    fn correct(&mut self, index: usize, confirmed: Coords) {
        let frames = self.tuning.interpolation_frames;
        let epsilon = self.tuning.snap_epsilon;
        let bullet = &mut self.bullets[index];
        let visible = bullet.rendered();
        bullet.position = confirmed;

        let drift = visible.distance(confirmed);
        bullet.correction = if drift <= epsilon || frames == 0 {
            None
        } else {
            Some(Correction {
                offset: Coords::new(visible.x - confirmed.x, visible.y - confirmed.y),
                frames_left: frames,
                total_frames: frames,
            })
        };
    }

    /// Explicit removal from the chain (hit or consumed).
    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.bullets.len();
        self.bullets.retain(|b| b.id() != Some(id));
        let removed = self.bullets.len() != before;
        if removed {
            self.publish();
        }
        removed
    }

    /// Advances every bullet one frame along its heading and drops bullets
    /// that left the grid. Returns how many were dropped.
    pub fn advance_frame(&mut self) -> usize {
        if self.bullets.is_empty() {
            return 0;
        }

        let speed = self.tuning.bullet_speed;
        for bullet in &mut self.bullets {
            let heading = bullet.angle.to_radians();
            bullet.position = bullet
                .position
                .offset_by(heading.cos() * speed, heading.sin() * speed);
            if let Some(correction) = bullet.correction.as_mut() {
                correction.frames_left -= 1;
                if correction.frames_left == 0 {
                    bullet.correction = None;
                }
            }
        }

        let before = self.bullets.len();
        self.bullets.retain(|b| b.position.in_bounds());
        let dropped = before - self.bullets.len();
        if dropped > 0 {
            trace!(dropped, "bullets left the grid");
        }
        self.publish();
        dropped
    }

    /// Silently drops predictions that were never confirmed in time.
    pub fn expire(&mut self, now_ms: u64) -> usize {
        let timeout = self.tuning.bullet_timeout_ms;
        let before = self.bullets.len();
        self.bullets.retain(|b| match b.state {
            BulletState::Predicted { created_at_ms } => {
                now_ms.saturating_sub(created_at_ms) < timeout
            }
            BulletState::Confirmed { .. } => true,
        });
        let expired = before - self.bullets.len();
        if expired > 0 {
            debug!(expired, "predicted bullets rolled back");
            self.publish();
        }
        expired
    }

    pub fn clear(&mut self) {
        self.bullets.clear();
        self.publish();
    }

    pub fn len(&self) -> usize {
        self.bullets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bullets.is_empty()
    }

    pub fn snapshot(&self) -> Arc<Vec<BulletCoords>> {
        self.render.get()
    }

    pub fn starts(&self) -> Arc<Vec<BulletCoords>> {
        self.start.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<BulletCoords>>> {
        self.render.subscribe()
    }

    pub fn subscribe_starts(&self) -> watch::Receiver<Arc<Vec<BulletCoords>>> {
        self.start.subscribe()
    }

    fn publish(&self) {
        self.render
            .set(self.bullets.iter().map(|b| b.view(b.rendered())).collect());
        self.start
            .set(self.bullets.iter().map(|b| b.view(b.origin)).collect());
    }
}

/// Smallest absolute difference between two headings, in degrees.
fn angle_delta(a: f64, b: f64) -> f64 {
    ((a - b + 180.0).rem_euclid(360.0) - 180.0).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> BulletTracker {
        BulletTracker::new(SyncTuning::default())
    }

    #[test]
    fn prediction_is_rendered_immediately() {
        let mut bullets = tracker();
        bullets.predict(1, Coords::new(0.0, 0.0), 45.0, 1_000);

        let snapshot = bullets.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot[0].is_predicted());
        assert_eq!(snapshot[0].shot_by, 1);
    }

    #[test]
    fn confirmation_replaces_prediction_in_place() {
        let mut bullets = tracker();
        bullets.predict(1, Coords::new(0.0, 0.0), 45.0, 1_000);

        let outcome = bullets.confirm(77, 1, Coords::new(0.1, 0.1), 45.0);

        assert_eq!(outcome, ConfirmOutcome::Reconciled);
        let snapshot = bullets.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, Some(77));
    }

    #[test]
    fn repeated_confirmation_never_duplicates() {
        let mut bullets = tracker();
        bullets.predict(1, Coords::new(0.0, 0.0), 45.0, 1_000);
        bullets.confirm(77, 1, Coords::new(0.0, 0.0), 45.0);

        let outcome = bullets.confirm(77, 1, Coords::new(1.0, 1.0), 45.0);

        assert_eq!(outcome, ConfirmOutcome::Updated);
        assert_eq!(bullets.len(), 1);
    }

    #[test]
    fn opponent_bullet_is_inserted_fresh() {
        let mut bullets = tracker();
        bullets.predict(1, Coords::new(0.0, 0.0), 45.0, 1_000);

        let outcome = bullets.confirm(5, 2, Coords::new(10.0, 10.0), 45.0);

        assert_eq!(outcome, ConfirmOutcome::Inserted);
        let snapshot = bullets.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.iter().filter(|b| b.is_predicted()).count(), 1);
    }

    #[test]
    fn angle_outside_tolerance_does_not_match() {
        let mut bullets = tracker();
        bullets.predict(1, Coords::new(0.0, 0.0), 45.0, 1_000);

        assert_eq!(bullets.confirm(9, 1, Coords::new(0.0, 0.0), 90.0), ConfirmOutcome::Inserted);
        assert_eq!(bullets.len(), 2);
    }

    #[test]
    fn angle_match_wraps_around_full_turn() {
        let mut bullets = tracker();
        bullets.predict(1, Coords::new(0.0, 0.0), 359.5, 1_000);

        assert_eq!(bullets.confirm(3, 1, Coords::new(0.0, 0.0), 0.2), ConfirmOutcome::Reconciled);
    }

    #[test]
    fn raw_confirmation_coordinates_are_normalized() {
        let mut bullets = tracker();
        bullets.confirm(3, 2, Coords::new(52_000.0, 3_000.0), 0.0);

        assert_eq!(bullets.snapshot()[0].coords, Coords::new(2.0, -47.0));
    }

    #[test]
    fn double_tap_inside_window_keeps_single_prediction() {
        let mut bullets = tracker();
        bullets.predict(1, Coords::new(0.0, 0.0), 45.0, 1_000);
        bullets.predict(1, Coords::new(0.0, 0.0), 45.0, 1_100);
        assert_eq!(bullets.len(), 1);

        bullets.predict(1, Coords::new(0.0, 0.0), 45.0, 2_000);
        assert_eq!(bullets.len(), 2);
    }

    #[test]
    fn large_correction_is_blended_over_frames() {
        let tuning = SyncTuning {
            bullet_speed: 0.0,
            interpolation_frames: 4,
            ..SyncTuning::default()
        };
        let mut bullets = BulletTracker::new(tuning);
        bullets.predict(1, Coords::new(0.0, 0.0), 0.0, 0);
        bullets.confirm(1, 1, Coords::new(4.0, 0.0), 0.0);

        // No visible jump on confirmation.
        assert_eq!(bullets.snapshot()[0].coords, Coords::new(0.0, 0.0));

        let mut seen = Vec::new();
        for _ in 0..4 {
            bullets.advance_frame();
            seen.push(bullets.snapshot()[0].coords.x);
        }
        assert_eq!(seen, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn small_correction_snaps() {
        let tuning = SyncTuning {
            bullet_speed: 0.0,
            ..SyncTuning::default()
        };
        let mut bullets = BulletTracker::new(tuning);
        bullets.predict(1, Coords::new(0.0, 0.0), 0.0, 0);
        bullets.confirm(1, 1, Coords::new(0.2, 0.0), 0.0);

        assert_eq!(bullets.snapshot()[0].coords, Coords::new(0.2, 0.0));
    }

    #[test]
    fn bullets_travel_linearly_and_leave_the_grid() {
        let mut bullets = tracker();
        bullets.predict(1, Coords::new(49.0, 0.0), 0.0, 0);

        assert_eq!(bullets.advance_frame(), 0);
        assert_eq!(bullets.snapshot()[0].coords, Coords::new(49.5, 0.0));
        assert_eq!(bullets.starts()[0].coords, Coords::new(49.0, 0.0));

        assert_eq!(bullets.advance_frame(), 0);
        assert_eq!(bullets.advance_frame(), 1);
        assert!(bullets.is_empty());
    }

    #[test]
    fn unconfirmed_prediction_expires_silently() {
        let mut bullets = tracker();
        bullets.predict(1, Coords::new(0.0, 0.0), 45.0, 1_000);
        bullets.confirm(8, 2, Coords::new(0.0, 0.0), 10.0);

        assert_eq!(bullets.expire(1_000 + 9_999), 0);
        assert_eq!(bullets.expire(1_000 + 10_000), 1);
        let snapshot = bullets.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, Some(8));
    }

    #[test]
    fn explicit_removal_by_id() {
        let mut bullets = tracker();
        bullets.confirm(8, 2, Coords::new(0.0, 0.0), 10.0);

        assert!(bullets.remove(8));
        assert!(!bullets.remove(8));
        assert!(bullets.is_empty());
    }

    #[test]
    fn duplicate_window_only_covers_unconfirmed_shots() {
        let mut bullets = tracker();
        bullets.predict(1, Coords::new(0.0, 0.0), 90.0, 1_000);

        assert!(bullets.is_duplicate(1, 90.5, 1_200));
        assert!(!bullets.is_duplicate(2, 90.0, 1_200));
        assert!(!bullets.is_duplicate(1, 90.0, 1_251));

        bullets.confirm(8, 1, Coords::new(0.0, 0.0), 90.0);
        assert!(!bullets.is_duplicate(1, 90.0, 1_100));
    }
}
