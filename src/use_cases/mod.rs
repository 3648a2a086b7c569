// Use cases layer: stores, reconciliation and the per-session aggregate.

pub mod bullets;
pub mod coords_store;
pub mod observable;
pub mod pending;
pub mod recorder;
pub mod registry;
pub mod sync;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use bullets::{BulletState, BulletTracker, ConfirmOutcome};
pub use coords_store::CoordinateStore;
pub use observable::Observable;
pub use pending::{PendingMoveQueue, ReconcileOutcome};
pub use recorder::MoveRecorder;
pub use registry::{CameraEntry, SessionRegistry, TurnState, ViewFlags};
pub use sync::SyncSession;
pub use types::{LocalCommand, RemoteEvent, TickReport};
