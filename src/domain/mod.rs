// Domain layer: coordinate spaces, entities and tuning.

pub mod coords;
pub mod errors;
pub mod ports;
pub mod state;
pub mod tuning;

pub use coords::{Coords, RawCoords, UnitConverter};
pub use errors::SyncError;
pub use ports::{ActionSink, Clock};
pub use state::{
    BulletCoords, CameraState, CameraView, ChainAction, ConfirmedMove, CoordsMap, CoordsRole,
    CorrelationKey, EntityId, MoveAction, PendingMove, Session, SessionMeta, SessionStatus,
};
pub use tuning::SyncTuning;
