// Domain-level rejections of local input.

use crate::domain::state::EntityId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("not your turn")]
    NotYourTurn,
    #[error("unknown camera {0}")]
    UnknownCamera(u64),
    #[error("camera {0} must be active before it can be submitted")]
    CameraNotActive(u64),
    #[error("camera {0} was already submitted")]
    CameraAlreadySubmitted(u64),
    #[error("camera selection requires selection mode")]
    SelectionModeRequired,
    #[error("no session selected")]
    NoCurrentSession,
    #[error("character {0} has no known position")]
    NoCharacter(EntityId),
}
