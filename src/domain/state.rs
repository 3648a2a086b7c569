// Domain-level entities mirrored from the chain and produced by local input.

use crate::domain::coords::{Coords, RawCoords};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type EntityId = u64;
pub type CorrelationKey = u64;

/// Semantic role of a coordinate store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordsRole {
    PlayerStart,
    PlayerCurrent,
    EnemyCurrent,
}

impl CoordsRole {
    pub const ALL: [CoordsRole; 3] = [
        CoordsRole::PlayerStart,
        CoordsRole::PlayerCurrent,
        CoordsRole::EnemyCurrent,
    ];
}

pub type CoordsMap = BTreeMap<EntityId, Coords>;

/// Bullet as seen by the renderer. `id` is `None` until the chain assigns one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulletCoords {
    pub id: Option<u64>,
    pub coords: Coords,
    pub angle: f64,
    pub shot_by: EntityId,
}

impl BulletCoords {
    pub fn is_predicted(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MoveAction {
    Move {
        character: EntityId,
        target: Coords,
    },
    Shoot {
        character: EntityId,
        origin: Coords,
        angle: f64,
    },
}

impl MoveAction {
    pub fn character(&self) -> EntityId {
        match self {
            MoveAction::Move { character, .. } | MoveAction::Shoot { character, .. } => *character,
        }
    }

    /// Where the acting character is expected to stand once confirmed.
    pub fn predicted_position(&self) -> Coords {
        match self {
            MoveAction::Move { target, .. } => *target,
            MoveAction::Shoot { origin, .. } => *origin,
        }
    }
}

/// Locally issued action awaiting confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMove {
    pub key: CorrelationKey,
    pub action: MoveAction,
    pub issued_at_ms: u64,
}

/// Confirmation of a previously issued action, already in render space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfirmedMove {
    pub key: CorrelationKey,
    pub character: EntityId,
    pub coords: Coords,
}

/// Action submitted back to the chain, in chain space.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainAction {
    /// `path` holds every sub-move waypoint; the last one is the destination.
    Move {
        key: CorrelationKey,
        character: EntityId,
        path: Vec<RawCoords>,
    },
    Shoot {
        key: CorrelationKey,
        character: EntityId,
        origin: RawCoords,
        angle: f64,
    },
}

impl ChainAction {
    pub fn key(&self) -> CorrelationKey {
        match self {
            ChainAction::Move { key, .. } | ChainAction::Shoot { key, .. } => *key,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Waiting,
    Active,
    Finished,
}

/// Lobby-level view of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: u64,
    pub players: Vec<EntityId>,
    pub status: SessionStatus,
}

/// Turn and timing metadata of a session, mirrored from the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMeta {
    pub session_id: u64,
    pub turn_count: u32,
    #[serde(default)]
    pub turn_player: Option<EntityId>,
    #[serde(default)]
    pub started_at: Option<u64>,
    #[serde(default)]
    pub game_over: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraView {
    pub id: u64,
    pub coords: [f64; 2],
    pub is_owner: bool,
}

/// Lifecycle of a camera within a session: `Unused -> Active -> Submitted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CameraState {
    #[default]
    Unused,
    Active,
    Submitted,
}
