// Sync session: owns every store for one game session and dispatches events.

use crate::domain::{
    ChainAction, ConfirmedMove, Coords, CoordsRole, CorrelationKey, EntityId, MoveAction,
    PendingMove, SyncError, SyncTuning,
};
use crate::use_cases::bullets::BulletTracker;
use crate::use_cases::coords_store::CoordinateStore;
use crate::use_cases::pending::PendingMoveQueue;
use crate::use_cases::recorder::MoveRecorder;
use crate::use_cases::registry::SessionRegistry;
use crate::use_cases::types::{LocalCommand, RemoteEvent, TickReport};
use tracing::{debug, info, warn};

/// Explicitly owned state for one client. Construct at session start, drop at
/// session end; switching sessions resets the per-game stores.
#[derive(Debug)]
pub struct SyncSession {
    local_player: EntityId,
    tuning: SyncTuning,
    coords: CoordinateStore,
    bullets: BulletTracker,
    pending: PendingMoveQueue,
    registry: SessionRegistry,
    recorder: MoveRecorder,
}

impl SyncSession {
    pub fn new(local_player: EntityId, tuning: SyncTuning) -> Self {
        Self {
            local_player,
            tuning,
            coords: CoordinateStore::new(tuning.converter()),
            bullets: BulletTracker::new(tuning),
            pending: PendingMoveQueue::new(&tuning),
            registry: SessionRegistry::new(local_player),
            recorder: MoveRecorder::new(&tuning),
        }
    }

    pub fn local_player(&self) -> EntityId {
        self.local_player
    }

    pub fn tuning(&self) -> &SyncTuning {
        &self.tuning
    }

    pub fn coords(&self) -> &CoordinateStore {
        &self.coords
    }

    pub fn bullets(&self) -> &BulletTracker {
        &self.bullets
    }

    pub fn pending(&self) -> &PendingMoveQueue {
        &self.pending
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn recorder(&self) -> &MoveRecorder {
        &self.recorder
    }

    /// Applies a confirmed update from the chain. Never fails: unmatched or
    /// repeated events are merged last-write-wins.
    pub fn handle_remote(&mut self, event: RemoteEvent) {
        match event {
            RemoteEvent::CharacterPosition {
                role: CoordsRole::PlayerCurrent,
                key,
                coords,
            } => {
                self.pending.note_confirmed(key, coords, &mut self.coords);
            }
            RemoteEvent::CharacterPosition { role, key, coords } => {
                self.coords.set_coords(role, key, coords);
            }
            RemoteEvent::CharacterRemoved { role, key } => {
                self.coords.remove(role, key);
            }
            RemoteEvent::BulletUpdate {
                id,
                shot_by,
                coords,
                angle,
            } => {
                let outcome = self.bullets.confirm(id, shot_by, coords, angle);
                debug!(id, shot_by, ?outcome, "bullet update merged");
            }
            RemoteEvent::BulletRemoved { id } => {
                self.bullets.remove(id);
            }
            RemoteEvent::MoveConfirmed {
                key,
                character,
                coords,
            } => {
                let confirmed = ConfirmedMove {
                    key,
                    character,
                    coords,
                };
                let outcome = self.pending.reconcile(confirmed, &mut self.coords);
                debug!(key, character, ?outcome, "move confirmation merged");
            }
            RemoteEvent::SessionsListed(sessions) => self.registry.set_sessions(sessions),
            RemoteEvent::SessionUpdated(session) => self.registry.upsert_session(session),
            RemoteEvent::SessionMetaUpdated(meta) => {
                self.registry.update_meta(meta);
            }
            RemoteEvent::CamerasListed(views) => {
                if let Err(e) = self.registry.set_cameras(views) {
                    warn!(error = %e, "camera list ignored");
                }
            }
            RemoteEvent::TurnChanged { is_your_turn } => {
                info!(is_your_turn, "turn changed");
                self.registry.set_your_turn(is_your_turn);
                self.pending.set_your_turn(is_your_turn);
            }
            RemoteEvent::GameStarted { player_number } => {
                if self.registry.start_game(player_number) {
                    info!(player_number, "game started");
                }
            }
        }
    }

    /// Applies local input. Returns the chain action to submit, if any; in
    /// simulation mode actions stay local.
    pub fn handle_local(
        &mut self,
        command: LocalCommand,
        key: CorrelationKey,
        now_ms: u64,
    ) -> Result<Option<ChainAction>, SyncError> {
        match command {
            LocalCommand::Move { target } if self.recorder.is_recording() => {
                self.recorder.steer(target);
                Ok(None)
            }
            LocalCommand::Move { target } => {
                let target = self.coords.converter().normalize(target);
                let from = self.local_position();
                let action = self.issue_move(key, from.into_iter().collect(), target, now_ms)?;
                Ok(self.commit_move(action))
            }
            LocalCommand::Shoot { angle } => {
                let origin = self.local_position().ok_or(SyncError::NoCharacter(self.local_player))?;
                if !self.pending.is_your_turn() {
                    return Err(SyncError::NotYourTurn);
                }
                // A double tap is one shot: one bullet, one pending entry, one action.
                if self.bullets.is_duplicate(self.local_player, angle, now_ms) {
                    debug!(angle, "repeated shot inside duplicate window dropped");
                    return Ok(None);
                }
                let pending = PendingMove {
                    key,
                    action: MoveAction::Shoot {
                        character: self.local_player,
                        origin,
                        angle,
                    },
                    issued_at_ms: now_ms,
                };
                self.pending.enqueue(pending, &mut self.coords)?;
                self.bullets.predict(self.local_player, origin, angle, now_ms);
                let converter = self.coords.converter();
                Ok(self.outbound(ChainAction::Shoot {
                    key,
                    character: self.local_player,
                    origin: converter.to_chain_space(origin),
                    angle,
                }))
            }
            LocalCommand::SelectSession { session_id } => {
                if self.registry.select_session(session_id) {
                    self.reset_game_state();
                }
                Ok(None)
            }
            LocalCommand::LeaveSession => {
                self.registry.leave_session();
                self.reset_game_state();
                Ok(None)
            }
            LocalCommand::SelectCamera { camera_id } => {
                self.registry.select_camera(camera_id).map(|()| None)
            }
            LocalCommand::DeselectCamera { camera_id } => {
                self.registry.deselect_camera(camera_id).map(|()| None)
            }
            LocalCommand::SubmitCamera { camera_id } => {
                self.registry.submit_camera(camera_id).map(|()| None)
            }
            LocalCommand::SetSelectionMode(enabled) => {
                self.registry.set_selection_mode(enabled);
                Ok(None)
            }
            LocalCommand::SetSideViewMode(enabled) => {
                self.registry.set_side_view_mode(enabled);
                Ok(None)
            }
            LocalCommand::SetSimMode(enabled) => {
                self.registry.set_sim_mode(enabled);
                Ok(None)
            }
            LocalCommand::StartRecording => {
                let origin = self.local_position().ok_or(SyncError::NoCharacter(self.local_player))?;
                self.recorder.start(origin);
                Ok(None)
            }
            LocalCommand::FinishRecording => {
                if !self.pending.is_your_turn() {
                    return Err(SyncError::NotYourTurn);
                }
                let path = self.recorder.finish();
                let Some(&target) = path.last() else {
                    return Ok(None);
                };
                if path.len() < 2 {
                    return Ok(None);
                }
                let action = self.issue_move(key, path, target, now_ms)?;
                Ok(self.commit_move(action))
            }
        }
    }

    /// One render frame: expiry of stale predictions, bullet motion and
    /// recording.
    pub fn tick(&mut self, now_ms: u64) -> TickReport {
        let expired_moves = self.pending.expire(now_ms, &mut self.coords).len();
        let expired_bullets = self.bullets.expire(now_ms);
        let bullets_out_of_bounds = self.bullets.advance_frame();
        if self.recorder.is_recording() {
            self.recorder.record_frame();
        }
        TickReport {
            expired_moves,
            expired_bullets,
            bullets_out_of_bounds,
        }
    }

    fn local_position(&self) -> Option<Coords> {
        self.coords
            .get_coords(CoordsRole::PlayerCurrent, self.local_player)
    }

    // Enqueues the optimistic move and builds the chain action along `path`
    // (known waypoints before the target).
    fn issue_move(
        &mut self,
        key: CorrelationKey,
        mut path: Vec<Coords>,
        target: Coords,
        now_ms: u64,
    ) -> Result<ChainAction, SyncError> {
        let pending = PendingMove {
            key,
            action: MoveAction::Move {
                character: self.local_player,
                target,
            },
            issued_at_ms: now_ms,
        };
        self.pending.enqueue(pending, &mut self.coords)?;

        if path.last() != Some(&target) {
            path.push(target);
        }
        let waypoints = if path.len() < 2 {
            vec![self.coords.converter().to_chain_space(target)]
        } else {
            self.recorder.to_submoves(&path)
        };
        Ok(ChainAction::Move {
            key,
            character: self.local_player,
            path: waypoints,
        })
    }

    // A move that actually leaves for the chain ends the local move phase
    // until the turn comes back.
    fn commit_move(&mut self, action: ChainAction) -> Option<ChainAction> {
        let action = self.outbound(action)?;
        self.registry.set_move_over(true);
        Some(action)
    }

    fn outbound(&self, action: ChainAction) -> Option<ChainAction> {
        if self.registry.flags().sim_mode {
            debug!(key = action.key(), "simulation mode; action kept local");
            return None;
        }
        Some(action)
    }

    fn reset_game_state(&mut self) {
        self.coords.clear();
        self.bullets.clear();
        self.pending.clear();
        self.pending.set_your_turn(false);
        self.recorder.finish();
    }
}
