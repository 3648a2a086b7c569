// Framework bootstrap for the line-driven sync client.
//
// Inbound JSON lines (remote events and local commands) are read on one task,
// applied to the session by a single event loop, and resulting chain actions
// are written as JSON lines by another task.

use crate::domain::{ActionSink, ChainAction, Clock, SyncTuning};
use crate::frameworks::clock::SystemClock;
use crate::frameworks::config::{self, RuntimeSettings};
use crate::interface_adapters::bridge::ReactiveBridge;
use crate::interface_adapters::protocol::{Inbound, OutboundMessage, parse_line};
use crate::use_cases::SyncSession;

use std::{io::Result, sync::Arc, time::Duration};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{Notify, mpsc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // stdout carries the action stream, so logs go to stderr.
    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Hands chain actions to the writer task without blocking the event loop.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    action_tx: mpsc::Sender<ChainAction>,
}

impl ChannelSink {
    pub fn new(action_tx: mpsc::Sender<ChainAction>) -> Self {
        Self { action_tx }
    }
}

impl ActionSink for ChannelSink {
    fn submit(&self, action: ChainAction) {
        let key = action.key();
        match self.action_tx.try_send(action) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                // The pending entry stays queued and will expire.
                warn!(key, "action channel full; dropping action");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(key, "action writer stopped; dropping action");
            }
        }
    }
}

/// Drives the bridge until the inbound stream closes or `shutdown` fires.
/// Returns the bridge so callers can inspect the final state.
pub async fn event_loop<C: Clock, S: ActionSink>(
    mut bridge: ReactiveBridge<C, S>,
    mut inbound_rx: mpsc::Receiver<Inbound>,
    tick_interval: Duration,
    shutdown: Arc<Notify>,
) -> ReactiveBridge<C, S> {
    let mut interval = tokio::time::interval(tick_interval);
    // A late frame should not trigger a burst of catch-up ticks.
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                info!("shutdown requested");
                break;
            }
            inbound = inbound_rx.recv() => {
                let Some(inbound) = inbound else {
                    debug!("inbound stream closed");
                    break;
                };
                bridge.dispatch(inbound);
            }
            _ = interval.tick() => {
                bridge.on_tick();
            }
        }
    }

    bridge
}

async fn read_inbound<R>(input: R, inbound_tx: mpsc::Sender<Inbound>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok(inbound) => {
                if inbound_tx.send(inbound).await.is_err() {
                    debug!("event loop stopped; reader exiting");
                    break;
                }
            }
            Err(e) => error!(error = %e, line, "rejected malformed message"),
        }
    }
    Ok(())
}

async fn write_actions<W>(mut action_rx: mpsc::Receiver<ChainAction>, mut output: W) -> Result<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(action) = action_rx.recv().await {
        let key = action.key();
        let mut text = match serde_json::to_string(&OutboundMessage::from(action)) {
            Ok(text) => text,
            Err(e) => {
                error!(key, error = ?e, "failed to serialize chain action");
                continue;
            }
        };
        text.push('\n');
        output.write_all(text.as_bytes()).await?;
        output.flush().await?;
    }
    Ok(output)
}

/// Runs the client over `input`/`output` until the input ends or `shutdown`
/// fires. Returns the final session and the output sink.
pub async fn run<R, W>(
    input: R,
    output: W,
    settings: RuntimeSettings,
    tuning: SyncTuning,
    shutdown: Arc<Notify>,
) -> Result<(SyncSession, W)>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (inbound_tx, inbound_rx) = mpsc::channel::<Inbound>(settings.event_channel_capacity);
    let (action_tx, action_rx) = mpsc::channel::<ChainAction>(settings.action_channel_capacity);

    let reader = tokio::spawn(read_inbound(input, inbound_tx));
    let writer = tokio::spawn(write_actions(action_rx, output));

    info!(player_id = settings.player_id, "sync client started");
    let bridge = ReactiveBridge::new(
        SyncSession::new(settings.player_id, tuning),
        SystemClock,
        ChannelSink::new(action_tx),
    );
    let session = event_loop(bridge, inbound_rx, settings.tick_interval, shutdown)
        .await
        .into_session();

    // Dropping the bridge closed the action channel; the writer drains and exits.
    if reader.is_finished() {
        reader.await.map_err(std::io::Error::other)??;
    } else {
        reader.abort();
    }
    let output = writer.await.map_err(std::io::Error::other)??;
    Ok((session, output))
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let settings = RuntimeSettings::from_env();
    let tuning = config::load_tuning().map_err(|e| {
        error!(error = %e, "failed to load tuning");
        std::io::Error::other(e)
    })?;
    debug!(?settings, ?tuning, "configuration loaded");

    let shutdown = Arc::new(Notify::new());
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal.notify_one();
        }
    });

    let input = BufReader::new(tokio::io::stdin());
    let (session, _stdout) = run(input, tokio::io::stdout(), settings, tuning, shutdown).await?;
    info!(
        pending = session.pending().len(),
        bullets = session.bullets().len(),
        "sync client stopped"
    );
    Ok(())
}
