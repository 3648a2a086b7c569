use crate::domain::CorrelationKey;
use std::time::{SystemTime, UNIX_EPOCH};

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// Issues correlation keys for outbound actions.
///
/// Keys increase in issue order, so the pending queue sees them in the same
/// order as the actions were submitted. Seeding from the wall clock keeps keys
/// from a restarted client apart from ones still in flight.
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    next: u64,
}

impl KeyGenerator {
    pub fn seeded_from_clock() -> Self {
        Self::starting_at(now_nanos())
    }

    pub fn starting_at(first: CorrelationKey) -> Self {
        Self { next: first }
    }

    pub fn next_key(&mut self) -> CorrelationKey {
        let key = self.next;
        self.next = self.next.wrapping_add(1);
        key
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::seeded_from_clock()
    }
}
