// Wire protocol DTOs and conversions for the line-oriented client driver.
// Inbound lines carry both remote-sync events and local UI commands.

use crate::domain::{
    CameraView, ChainAction, Coords, CoordsRole, RawCoords, Session, SessionMeta,
};
use crate::use_cases::{LocalCommand, RemoteEvent};
use serde::{Deserialize, Serialize};

/// Malformed inbound payloads. These are the only hard failures surfaced to
/// the collaborator layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("unknown entity type `{0}`")]
    UnknownEntityType(String),
}

/// Messages the client reads, one JSON object per line.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InboundMessage {
    // Confirmed state from the remote-sync collaborator.
    EntityUpdate(EntityUpdateDto),
    BulletUpdate(BulletUpdateDto),
    BulletRemoved { id: u64 },
    MoveConfirmed(MoveConfirmedDto),
    Sessions(Vec<Session>),
    Session(Session),
    SessionMeta(SessionMeta),
    Cameras(Vec<CameraView>),
    YourTurn(bool),
    GameStarted { player_number: u8 },

    // Local UI input.
    Move(CoordsDto),
    Shoot { angle: f64 },
    SelectSession { session_id: u64 },
    LeaveSession,
    SelectCamera { camera_id: u64 },
    DeselectCamera { camera_id: u64 },
    SubmitCamera { camera_id: u64 },
    SelectionMode(bool),
    SideViewMode(bool),
    SimMode(bool),
    StartRecording,
    FinishRecording,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct CoordsDto {
    pub x: f64,
    pub y: f64,
}

impl From<CoordsDto> for Coords {
    fn from(dto: CoordsDto) -> Self {
        Coords::new(dto.x, dto.y)
    }
}

/// Position update for a character entity. Coordinates may be raw or
/// normalized; `removed` marks the entity as gone.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityUpdateDto {
    pub entity_type: String,
    pub key: u64,
    #[serde(default)]
    pub coords: Option<CoordsDto>,
    #[serde(default)]
    pub removed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulletUpdateDto {
    pub id: u64,
    pub shot_by: u64,
    pub coords: CoordsDto,
    pub angle: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoveConfirmedDto {
    pub key: u64,
    pub character: u64,
    pub coords: CoordsDto,
}

/// Parsed inbound message routed to the matching handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Remote(RemoteEvent),
    Local(LocalCommand),
}

fn role_for(entity_type: &str) -> Result<CoordsRole, ProtocolError> {
    match entity_type {
        "player_start" => Ok(CoordsRole::PlayerStart),
        "player" | "player_current" => Ok(CoordsRole::PlayerCurrent),
        "enemy" | "enemy_current" => Ok(CoordsRole::EnemyCurrent),
        other => Err(ProtocolError::UnknownEntityType(other.to_string())),
    }
}

impl TryFrom<EntityUpdateDto> for RemoteEvent {
    type Error = ProtocolError;

    fn try_from(dto: EntityUpdateDto) -> Result<Self, Self::Error> {
        let role = role_for(&dto.entity_type)?;
        if dto.removed {
            return Ok(RemoteEvent::CharacterRemoved { role, key: dto.key });
        }
        let coords = dto.coords.ok_or(ProtocolError::MissingField("coords"))?;
        Ok(RemoteEvent::CharacterPosition {
            role,
            key: dto.key,
            coords: coords.into(),
        })
    }
}

impl TryFrom<InboundMessage> for Inbound {
    type Error = ProtocolError;

    fn try_from(message: InboundMessage) -> Result<Self, Self::Error> {
        let remote = |event| Ok(Inbound::Remote(event));
        let local = |command| Ok(Inbound::Local(command));

        match message {
            InboundMessage::EntityUpdate(dto) => remote(RemoteEvent::try_from(dto)?),
            InboundMessage::BulletUpdate(dto) => remote(RemoteEvent::BulletUpdate {
                id: dto.id,
                shot_by: dto.shot_by,
                coords: dto.coords.into(),
                angle: dto.angle,
            }),
            InboundMessage::BulletRemoved { id } => remote(RemoteEvent::BulletRemoved { id }),
            InboundMessage::MoveConfirmed(dto) => remote(RemoteEvent::MoveConfirmed {
                key: dto.key,
                character: dto.character,
                coords: dto.coords.into(),
            }),
            InboundMessage::Sessions(sessions) => remote(RemoteEvent::SessionsListed(sessions)),
            InboundMessage::Session(session) => remote(RemoteEvent::SessionUpdated(session)),
            InboundMessage::SessionMeta(meta) => remote(RemoteEvent::SessionMetaUpdated(meta)),
            InboundMessage::Cameras(views) => remote(RemoteEvent::CamerasListed(views)),
            InboundMessage::YourTurn(is_your_turn) => {
                remote(RemoteEvent::TurnChanged { is_your_turn })
            }
            InboundMessage::GameStarted { player_number } => {
                remote(RemoteEvent::GameStarted { player_number })
            }
            InboundMessage::Move(target) => local(LocalCommand::Move {
                target: target.into(),
            }),
            InboundMessage::Shoot { angle } => local(LocalCommand::Shoot { angle }),
            InboundMessage::SelectSession { session_id } => {
                local(LocalCommand::SelectSession { session_id })
            }
            InboundMessage::LeaveSession => local(LocalCommand::LeaveSession),
            InboundMessage::SelectCamera { camera_id } => {
                local(LocalCommand::SelectCamera { camera_id })
            }
            InboundMessage::DeselectCamera { camera_id } => {
                local(LocalCommand::DeselectCamera { camera_id })
            }
            InboundMessage::SubmitCamera { camera_id } => {
                local(LocalCommand::SubmitCamera { camera_id })
            }
            InboundMessage::SelectionMode(enabled) => local(LocalCommand::SetSelectionMode(enabled)),
            InboundMessage::SideViewMode(enabled) => local(LocalCommand::SetSideViewMode(enabled)),
            InboundMessage::SimMode(enabled) => local(LocalCommand::SetSimMode(enabled)),
            InboundMessage::StartRecording => local(LocalCommand::StartRecording),
            InboundMessage::FinishRecording => local(LocalCommand::FinishRecording),
        }
    }
}

/// Parses one inbound JSON line.
pub fn parse_line(line: &str) -> Result<Inbound, ProtocolError> {
    let message: InboundMessage = serde_json::from_str(line)?;
    Inbound::try_from(message)
}

/// Actions the client writes for the chain collaborator.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum OutboundMessage {
    Move {
        key: u64,
        character: u64,
        path: Vec<RawCoordsDto>,
    },
    Shoot {
        key: u64,
        character: u64,
        origin: RawCoordsDto,
        angle: f64,
    },
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RawCoordsDto {
    pub x: u32,
    pub y: u32,
}

impl From<RawCoords> for RawCoordsDto {
    fn from(raw: RawCoords) -> Self {
        Self { x: raw.x, y: raw.y }
    }
}

impl From<ChainAction> for OutboundMessage {
    fn from(action: ChainAction) -> Self {
        match action {
            ChainAction::Move {
                key,
                character,
                path,
            } => OutboundMessage::Move {
                key,
                character,
                path: path.into_iter().map(RawCoordsDto::from).collect(),
            },
            ChainAction::Shoot {
                key,
                character,
                origin,
                angle,
            } => OutboundMessage::Shoot {
                key,
                character,
                origin: origin.into(),
                angle,
            },
        }
    }
}
