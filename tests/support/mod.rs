// Shared helpers for driving the sync client in integration tests.
#![allow(dead_code)]

use chain_sync::domain::{ActionSink, ChainAction, Clock, SyncTuning};
use chain_sync::frameworks::config::RuntimeSettings;
use chain_sync::use_cases::SyncSession;
use std::{
    // Atomics and a mutex let the test and the loop share clock and sink state.
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::sync::Notify;

pub const ME: u64 = 1;

// Settings with a short tick so tests do not wait on frame timing.
pub fn settings() -> RuntimeSettings {
    RuntimeSettings {
        player_id: ME,
        tick_interval: Duration::from_millis(5),
        ..RuntimeSettings::default()
    }
}

// Places the local player at the grid origin and hands it the turn.
pub fn opening_lines() -> Vec<String> {
    vec![
        r#"{"type":"EntityUpdate","data":{"entity_type":"player","key":1,"coords":{"x":50000,"y":50000}}}"#.to_string(),
        r#"{"type":"YourTurn","data":true}"#.to_string(),
    ]
}

// Runs a full client over the given input lines and returns the final session
// together with every action line it wrote.
pub async fn run_script(lines: &[String]) -> (SyncSession, Vec<serde_json::Value>) {
    let mut input = lines.join("\n");
    input.push('\n');
    let reader = std::io::Cursor::new(input.into_bytes());

    let (session, output) = chain_sync::run(
        reader,
        Vec::new(),
        settings(),
        SyncTuning::default(),
        Arc::new(Notify::new()),
    )
    .await
    .expect("client run");

    let written = String::from_utf8(output).expect("utf-8 output");
    let actions = written
        .lines()
        .map(|line| serde_json::from_str(line).expect("action line is json"))
        .collect();
    (session, actions)
}

// Clock the test moves by hand.
#[derive(Clone, Default)]
pub struct TestClock(Arc<AtomicU64>);

impl TestClock {
    pub fn set(&self, now_ms: u64) {
        self.0.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for TestClock {
    fn now_millis(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

// Sink that records actions instead of sending them anywhere.
#[derive(Clone, Default)]
pub struct CollectingSink(Arc<Mutex<Vec<ChainAction>>>);

impl CollectingSink {
    pub fn actions(&self) -> Vec<ChainAction> {
        self.0.lock().expect("sink mutex").clone()
    }
}

impl ActionSink for CollectingSink {
    fn submit(&self, action: ChainAction) {
        self.0.lock().expect("sink mutex").push(action);
    }
}
