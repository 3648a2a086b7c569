// Session and camera registry: lobby lists, current session, camera states.

use crate::domain::{CameraState, CameraView, EntityId, Session, SessionMeta, SessionStatus, SyncError};
use crate::use_cases::observable::Observable;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Camera plus where it is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraEntry {
    pub view: CameraView,
    pub state: CameraState,
}

/// UI-facing mode flags.
///
/// `selection_mode` and `side_view_mode` are never both set. `sim_mode`
/// previews locally without emitting chain actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ViewFlags {
    pub selection_mode: bool,
    pub side_view_mode: bool,
    pub sim_mode: bool,
}

impl Default for ViewFlags {
    fn default() -> Self {
        Self {
            selection_mode: true,
            side_view_mode: false,
            sim_mode: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TurnState {
    pub is_your_turn: bool,
    pub game_started: bool,
    pub move_over: bool,
    /// 1 or 2 once the game started, 0 before.
    pub player_number: u8,
}

#[derive(Debug)]
pub struct SessionRegistry {
    /// Local player; decides which sessions are "mine".
    local_player: EntityId,
    available: Observable<Vec<Session>>,
    mine: Observable<Vec<Session>>,
    current_id: Observable<Option<u64>>,
    current_meta: Observable<Option<SessionMeta>>,
    cameras: Observable<Vec<CameraEntry>>,
    flags: Observable<ViewFlags>,
    turn: Observable<TurnState>,
}

impl SessionRegistry {
    pub fn new(local_player: EntityId) -> Self {
        Self {
            local_player,
            available: Observable::default(),
            mine: Observable::default(),
            current_id: Observable::default(),
            current_meta: Observable::default(),
            cameras: Observable::default(),
            flags: Observable::default(),
            turn: Observable::default(),
        }
    }

    /// Replaces the lobby lists with a full listing from the chain.
    pub fn set_sessions(&mut self, sessions: Vec<Session>) {
        let available = sessions
            .iter()
            .filter(|s| s.status == SessionStatus::Waiting)
            .cloned()
            .collect();
        let mine = sessions
            .into_iter()
            .filter(|s| s.players.contains(&self.local_player))
            .collect();
        self.available.set(available);
        self.mine.set(mine);
    }

    /// Re-keys a single session update into both lists.
    pub fn upsert_session(&mut self, session: Session) {
        let waiting = session.status == SessionStatus::Waiting;
        let joined = session.players.contains(&self.local_player);
        let id = session.session_id;

        if waiting || self.available.get().iter().any(|s| s.session_id == id) {
            self.available
                .update(|list| upsert_by_id(list, session.clone(), waiting));
        }
        if joined || self.mine.get().iter().any(|s| s.session_id == id) {
            self.mine.update(|list| upsert_by_id(list, session, joined));
        }
    }

    /// Switches the current session. Cameras belong to a session and are
    /// dropped on change. Returns true when the session actually changed.
    pub fn select_session(&mut self, session_id: u64) -> bool {
        if *self.current_id.get() == Some(session_id) {
            return false;
        }
        info!(session_id, "session selected");
        self.current_id.set(Some(session_id));
        self.current_meta.set(None);
        self.cameras.set(Vec::new());
        self.turn.set(TurnState::default());
        true
    }

    pub fn leave_session(&mut self) {
        self.current_id.set(None);
        self.current_meta.set(None);
        self.cameras.set(Vec::new());
        self.turn.set(TurnState::default());
    }

    pub fn current_session_id(&self) -> Option<u64> {
        *self.current_id.get()
    }

    /// Mirrors metadata for the current session; other sessions are ignored.
    pub fn update_meta(&mut self, meta: SessionMeta) -> bool {
        if self.current_session_id() != Some(meta.session_id) {
            debug!(session_id = meta.session_id, "meta for another session ignored");
            return false;
        }
        self.current_meta.set(Some(meta));
        true
    }

    pub fn current_meta(&self) -> Option<SessionMeta> {
        (*self.current_meta.get()).clone()
    }

    /// Merges the camera list of the current session. Known cameras keep
    /// their state; new ones start unused.
    pub fn set_cameras(&mut self, views: Vec<CameraView>) -> Result<(), SyncError> {
        if self.current_session_id().is_none() {
            return Err(SyncError::NoCurrentSession);
        }
        let previous = self.cameras.get();
        let next = views
            .into_iter()
            .map(|view| {
                let state = previous
                    .iter()
                    .find(|entry| entry.view.id == view.id)
                    .map(|entry| entry.state)
                    .unwrap_or_default();
                CameraEntry { view, state }
            })
            .collect();
        self.cameras.set(next);
        Ok(())
    }

    pub fn select_camera(&mut self, camera_id: u64) -> Result<(), SyncError> {
        if !self.flags.get().selection_mode {
            return Err(SyncError::SelectionModeRequired);
        }
        self.transition(camera_id, |state| match state {
            CameraState::Unused | CameraState::Active => Ok(CameraState::Active),
            CameraState::Submitted => Err(SyncError::CameraAlreadySubmitted(camera_id)),
        })
    }

    pub fn deselect_camera(&mut self, camera_id: u64) -> Result<(), SyncError> {
        self.transition(camera_id, |state| match state {
            CameraState::Unused | CameraState::Active => Ok(CameraState::Unused),
            CameraState::Submitted => Err(SyncError::CameraAlreadySubmitted(camera_id)),
        })
    }

    /// Marks an active camera as used in a completed turn.
    pub fn submit_camera(&mut self, camera_id: u64) -> Result<(), SyncError> {
        self.transition(camera_id, |state| match state {
            CameraState::Active => Ok(CameraState::Submitted),
            CameraState::Unused => Err(SyncError::CameraNotActive(camera_id)),
            CameraState::Submitted => Err(SyncError::CameraAlreadySubmitted(camera_id)),
        })
    }

    fn transition(
        &mut self,
        camera_id: u64,
        next: impl FnOnce(CameraState) -> Result<CameraState, SyncError>,
    ) -> Result<(), SyncError> {
        let cameras = self.cameras.get();
        let index = cameras
            .iter()
            .position(|entry| entry.view.id == camera_id)
            .ok_or(SyncError::UnknownCamera(camera_id))?;
        let state = next(cameras[index].state)?;
        if state != cameras[index].state {
            debug!(camera_id, ?state, "camera state changed");
            self.cameras.update(|list| list[index].state = state);
        }
        Ok(())
    }

    pub fn camera_state(&self, camera_id: u64) -> Option<CameraState> {
        self.cameras
            .get()
            .iter()
            .find(|entry| entry.view.id == camera_id)
            .map(|entry| entry.state)
    }

    pub fn active_cameras(&self) -> Vec<CameraView> {
        self.cameras_where(|state| state == CameraState::Active)
    }

    /// Cameras that left the unused state in this session.
    pub fn used_cameras(&self) -> Vec<CameraView> {
        self.cameras_where(|state| state != CameraState::Unused)
    }

    pub fn submitted_cameras(&self) -> Vec<CameraView> {
        self.cameras_where(|state| state == CameraState::Submitted)
    }

    fn cameras_where(&self, keep: impl Fn(CameraState) -> bool) -> Vec<CameraView> {
        self.cameras
            .get()
            .iter()
            .filter(|entry| keep(entry.state))
            .map(|entry| entry.view.clone())
            .collect()
    }

    pub fn set_selection_mode(&mut self, enabled: bool) {
        self.flags.update(|flags| {
            flags.selection_mode = enabled;
            if enabled {
                flags.side_view_mode = false;
            }
        });
    }

    pub fn set_side_view_mode(&mut self, enabled: bool) {
        self.flags.update(|flags| {
            flags.side_view_mode = enabled;
            if enabled {
                flags.selection_mode = false;
            }
        });
    }

    pub fn set_sim_mode(&mut self, enabled: bool) {
        self.flags.update(|flags| flags.sim_mode = enabled);
    }

    pub fn flags(&self) -> ViewFlags {
        *self.flags.get()
    }

    pub fn set_your_turn(&mut self, is_your_turn: bool) {
        self.turn.update(|turn| {
            turn.is_your_turn = is_your_turn;
            if is_your_turn {
                turn.move_over = false;
            }
        });
    }

    pub fn set_move_over(&mut self, move_over: bool) {
        self.turn.update(|turn| turn.move_over = move_over);
    }

    /// Marks the game as started for player 1 or 2. Any other number is
    /// ignored and leaves the turn state untouched.
    pub fn start_game(&mut self, player_number: u8) -> bool {
        if !(1..=2).contains(&player_number) {
            warn!(player_number, "game start with invalid player number ignored");
            return false;
        }
        self.turn.update(|turn| {
            turn.game_started = true;
            turn.player_number = player_number;
        });
        true
    }

    pub fn turn(&self) -> TurnState {
        *self.turn.get()
    }

    pub fn available_sessions(&self) -> Arc<Vec<Session>> {
        self.available.get()
    }

    pub fn my_sessions(&self) -> Arc<Vec<Session>> {
        self.mine.get()
    }

    pub fn subscribe_available(&self) -> watch::Receiver<Arc<Vec<Session>>> {
        self.available.subscribe()
    }

    pub fn subscribe_mine(&self) -> watch::Receiver<Arc<Vec<Session>>> {
        self.mine.subscribe()
    }

    pub fn subscribe_current(&self) -> watch::Receiver<Arc<Option<SessionMeta>>> {
        self.current_meta.subscribe()
    }

    pub fn subscribe_cameras(&self) -> watch::Receiver<Arc<Vec<CameraEntry>>> {
        self.cameras.subscribe()
    }

    pub fn subscribe_flags(&self) -> watch::Receiver<Arc<ViewFlags>> {
        self.flags.subscribe()
    }

    pub fn subscribe_turn(&self) -> watch::Receiver<Arc<TurnState>> {
        self.turn.subscribe()
    }
}

// Replaces or inserts `session` by id, or drops it when `keep` is false.
fn upsert_by_id(list: &mut Vec<Session>, session: Session, keep: bool) {
    let existing = list.iter().position(|s| s.session_id == session.session_id);
    match (existing, keep) {
        (Some(index), true) => list[index] = session,
        (Some(index), false) => {
            list.remove(index);
        }
        (None, true) => list.push(session),
        (None, false) => {}
    }
}
