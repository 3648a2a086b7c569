// Use-case level inputs/outputs for the sync session.

use crate::domain::{CameraView, Coords, CoordsRole, CorrelationKey, EntityId, Session, SessionMeta};

/// Confirmed updates pushed by the remote-sync collaborator.
///
/// Coordinates may arrive in either space; stores normalize on write.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    CharacterPosition {
        role: CoordsRole,
        key: EntityId,
        coords: Coords,
    },
    CharacterRemoved {
        role: CoordsRole,
        key: EntityId,
    },
    BulletUpdate {
        id: u64,
        shot_by: EntityId,
        coords: Coords,
        angle: f64,
    },
    BulletRemoved {
        id: u64,
    },
    MoveConfirmed {
        key: CorrelationKey,
        character: EntityId,
        coords: Coords,
    },
    SessionsListed(Vec<Session>),
    SessionUpdated(Session),
    SessionMetaUpdated(SessionMeta),
    CamerasListed(Vec<CameraView>),
    TurnChanged {
        is_your_turn: bool,
    },
    GameStarted {
        player_number: u8,
    },
}

/// Input from the local UI.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalCommand {
    Move { target: Coords },
    Shoot { angle: f64 },
    SelectSession { session_id: u64 },
    LeaveSession,
    SelectCamera { camera_id: u64 },
    DeselectCamera { camera_id: u64 },
    SubmitCamera { camera_id: u64 },
    SetSelectionMode(bool),
    SetSideViewMode(bool),
    SetSimMode(bool),
    StartRecording,
    FinishRecording,
}

/// What a single expiry/animation tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub expired_moves: usize,
    pub expired_bullets: usize,
    pub bullets_out_of_bounds: usize,
}
