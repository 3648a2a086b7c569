// Reactive bridge between the collaborators and the sync session.
//
// Remote events and local commands arrive in one ordered stream; the bridge
// stamps them with the clock, allocates correlation keys and forwards any
// resulting chain action to the sink.

use crate::domain::{
    ActionSink, BulletCoords, Clock, CoordsMap, CoordsRole, CorrelationKey, PendingMove, Session,
    SessionMeta, SyncError,
};
use crate::interface_adapters::protocol::{Inbound, ProtocolError, parse_line};
use crate::interface_adapters::utils::keys::KeyGenerator;
use crate::use_cases::{
    CameraEntry, LocalCommand, RemoteEvent, SyncSession, TickReport, TurnState, ViewFlags,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub struct ReactiveBridge<C, S> {
    session: SyncSession,
    clock: C,
    sink: S,
    keys: KeyGenerator,
}

impl<C: Clock, S: ActionSink> ReactiveBridge<C, S> {
    pub fn new(session: SyncSession, clock: C, sink: S) -> Self {
        Self::with_keys(session, clock, sink, KeyGenerator::seeded_from_clock())
    }

    pub fn with_keys(session: SyncSession, clock: C, sink: S, keys: KeyGenerator) -> Self {
        Self {
            session,
            clock,
            sink,
            keys,
        }
    }

    pub fn session(&self) -> &SyncSession {
        &self.session
    }

    pub fn into_session(self) -> SyncSession {
        self.session
    }

    pub fn on_remote(&mut self, event: RemoteEvent) {
        self.session.handle_remote(event);
    }

    /// Applies a local command and submits the resulting chain action.
    /// Returns the correlation key of the submitted action, if one was sent.
    pub fn on_local(&mut self, command: LocalCommand) -> Result<Option<CorrelationKey>, SyncError> {
        let key = self.keys.next_key();
        let now_ms = self.clock.now_millis();
        match self.session.handle_local(command, key, now_ms)? {
            Some(action) => {
                debug!(key, "submitting chain action");
                self.sink.submit(action);
                Ok(Some(key))
            }
            None => Ok(None),
        }
    }

    /// Routes one parsed inbound message. Rejected local commands are logged
    /// and dropped; the stream keeps going.
    pub fn dispatch(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Remote(event) => self.on_remote(event),
            Inbound::Local(command) => {
                if let Err(e) = self.on_local(command) {
                    info!(error = %e, "local command rejected");
                }
            }
        }
    }

    /// Parses and routes one JSON line. Malformed lines are the only error.
    pub fn on_line(&mut self, line: &str) -> Result<(), ProtocolError> {
        let inbound = parse_line(line)?;
        self.dispatch(inbound);
        Ok(())
    }

    pub fn on_tick(&mut self) -> TickReport {
        let report = self.session.tick(self.clock.now_millis());
        if report.expired_moves > 0 {
            warn!(count = report.expired_moves, "pending moves expired unconfirmed");
        }
        report
    }

    pub fn subscribe_coords(&self, role: CoordsRole) -> watch::Receiver<Arc<CoordsMap>> {
        self.session.coords().subscribe(role)
    }

    pub fn subscribe_bullets(&self) -> watch::Receiver<Arc<Vec<BulletCoords>>> {
        self.session.bullets().subscribe()
    }

    pub fn subscribe_bullet_starts(&self) -> watch::Receiver<Arc<Vec<BulletCoords>>> {
        self.session.bullets().subscribe_starts()
    }

    pub fn subscribe_pending(&self) -> watch::Receiver<Arc<Vec<PendingMove>>> {
        self.session.pending().subscribe()
    }

    pub fn subscribe_available_sessions(&self) -> watch::Receiver<Arc<Vec<Session>>> {
        self.session.registry().subscribe_available()
    }

    pub fn subscribe_my_sessions(&self) -> watch::Receiver<Arc<Vec<Session>>> {
        self.session.registry().subscribe_mine()
    }

    pub fn subscribe_current_session(&self) -> watch::Receiver<Arc<Option<SessionMeta>>> {
        self.session.registry().subscribe_current()
    }

    pub fn subscribe_cameras(&self) -> watch::Receiver<Arc<Vec<CameraEntry>>> {
        self.session.registry().subscribe_cameras()
    }

    pub fn subscribe_flags(&self) -> watch::Receiver<Arc<ViewFlags>> {
        self.session.registry().subscribe_flags()
    }

    pub fn subscribe_turn(&self) -> watch::Receiver<Arc<TurnState>> {
        self.session.registry().subscribe_turn()
    }
}
