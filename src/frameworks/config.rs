use crate::domain::{EntityId, SyncTuning};
use std::{env, path::PathBuf, time::Duration};

// Runtime constants and environment lookups (gameplay tuning lives in
// `SyncTuning` and may be overridden from a TOML file).

pub const EVENT_CHANNEL_CAPACITY: usize = 1024;
pub const ACTION_CHANNEL_CAPACITY: usize = 128;

pub const TICK_INTERVAL: Duration = Duration::from_millis(1000 / 60);

pub fn tick_interval() -> Duration {
    env::var("SYNC_TICK_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|millis| *millis > 0)
        .map(Duration::from_millis)
        .unwrap_or(TICK_INTERVAL)
}

pub fn event_channel_capacity() -> usize {
    env::var("SYNC_EVENT_CHANNEL_CAPACITY")
        .ok()
        .and_then(|value| value.parse().ok())
        .filter(|capacity| *capacity > 0)
        .unwrap_or(EVENT_CHANNEL_CAPACITY)
}

pub fn action_channel_capacity() -> usize {
    env::var("SYNC_ACTION_CHANNEL_CAPACITY")
        .ok()
        .and_then(|value| value.parse().ok())
        .filter(|capacity| *capacity > 0)
        .unwrap_or(ACTION_CHANNEL_CAPACITY)
}

pub fn local_player_id() -> EntityId {
    env::var("SYNC_PLAYER_ID")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(1)
}

pub fn tuning_file() -> Option<PathBuf> {
    env::var_os("SYNC_TUNING_FILE")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read tuning file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid tuning: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Parses tuning overrides; omitted keys keep their defaults.
pub fn parse_tuning(text: &str) -> Result<SyncTuning, ConfigError> {
    Ok(toml::from_str(text)?)
}

/// Loads tuning from `SYNC_TUNING_FILE`, or the defaults when unset.
pub fn load_tuning() -> Result<SyncTuning, ConfigError> {
    let Some(path) = tuning_file() else {
        return Ok(SyncTuning::default());
    };
    let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    parse_tuning(&text)
}

/// Runtime knobs for the line-driven client loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub player_id: EntityId,
    pub tick_interval: Duration,
    pub event_channel_capacity: usize,
    pub action_channel_capacity: usize,
}

impl RuntimeSettings {
    pub fn from_env() -> Self {
        Self {
            player_id: local_player_id(),
            tick_interval: tick_interval(),
            event_channel_capacity: event_channel_capacity(),
            action_channel_capacity: action_channel_capacity(),
        }
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            player_id: 1,
            tick_interval: TICK_INTERVAL,
            event_channel_capacity: EVENT_CHANNEL_CAPACITY,
            action_channel_capacity: ACTION_CHANNEL_CAPACITY,
        }
    }
}
