use crate::domain::state::ChainAction;

// Port for retrieving the current time.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

// Port for handing actions to the chain collaborator. Submission is
// fire-and-forget; confirmation comes back later as a remote event.
pub trait ActionSink: Send + Sync {
    fn submit(&self, action: ChainAction);
}
