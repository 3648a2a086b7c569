use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::domain::{ActionSink, ChainAction, Clock};

// Manually advanced time source shared between a test and the code under test.
#[derive(Clone, Default)]
pub(crate) struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
    pub(crate) fn at(now_ms: u64) -> Self {
        Self(Arc::new(AtomicU64::new(now_ms)))
    }

    pub(crate) fn advance(&self, ms: u64) {
        self.0.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

// Sink that keeps every submitted action for later inspection.
#[derive(Clone, Default)]
pub(crate) struct RecordingSink {
    actions: Arc<Mutex<Vec<ChainAction>>>,
}

impl RecordingSink {
    pub(crate) fn submitted(&self) -> Vec<ChainAction> {
        self.actions.lock().expect("actions mutex poisoned").clone()
    }
}

impl ActionSink for RecordingSink {
    fn submit(&self, action: ChainAction) {
        self.actions
            .lock()
            .expect("actions mutex poisoned")
            .push(action);
    }
}
