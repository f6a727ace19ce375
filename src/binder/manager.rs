//! Port binder
//!
//! Wires the plugin's send/return ports to the peer in one best-effort pass.
//!
//! ## Attempt
//! Opens a transient session, applies the inbound (send) rule, then the
//! outbound (return) rule, and closes the session again no matter what
//! happened in between.  Each port pair is independent: a rejected pair is
//! logged and the remaining pairs are still tried.
//!
//! ## Release
//! [`PortBinder::release`] undoes a given list of pairs, typically the ones
//! an earlier attempt reported in [`FlowOutcome::changed`].  Links made by
//! anyone else are never touched.
//!
//! Nothing here ever fails towards the caller.  The returned
//! [`BindOutcome`] only describes what happened; whether the attempt counts
//! as "bound" is decided by [`BindOutcome::latched`].

use std::sync::Arc;

use super::rules::{Flow, PairingRule};
use crate::config::BinderConfig;
use crate::error::RoutingError;
use crate::routing::{PortPair, RoutingDaemon, RoutingSession};

/// Whether an attempt wires or unwires the pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindMode {
    Connect,
    Disconnect,
}

impl BindMode {
    fn verb(self) -> &'static str {
        match self {
            BindMode::Connect => "connect",
            BindMode::Disconnect => "disconnect",
        }
    }

    fn gerund(self) -> &'static str {
        match self {
            BindMode::Connect => "Connecting",
            BindMode::Disconnect => "Disconnecting",
        }
    }

    fn preposition(self) -> &'static str {
        match self {
            BindMode::Connect => "to",
            BindMode::Disconnect => "from",
        }
    }
}

/// Result of applying one rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowOutcome {
    /// Both sides had enough ports, so pairs were attempted
    pub ports_found: bool,
    pub succeeded: Vec<PortPair>,
    pub failed: Vec<PortPair>,
    /// Pairs this attempt actually (dis)connected; a subset of `succeeded`
    /// without the pairs that were already in the requested state
    pub changed: Vec<PortPair>,
    /// The last pair in wiring order succeeded
    pub last_pair_ok: bool,
}

/// Result of one binding attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindOutcome {
    pub mode: BindMode,
    pub session_opened: bool,
    pub inbound: FlowOutcome,
    pub outbound: FlowOutcome,
}

impl BindOutcome {
    fn new(mode: BindMode) -> Self {
        Self {
            mode,
            session_opened: false,
            inbound: FlowOutcome::default(),
            outbound: FlowOutcome::default(),
        }
    }

    /// Whether this attempt should set the connection latch.
    ///
    /// Only the last outbound pair counts: once the peer's audio reaches
    /// our return ports the insert loop is considered live, regardless of
    /// how the send side fared.
    pub fn latched(&self) -> bool {
        self.mode == BindMode::Connect && self.outbound.last_pair_ok
    }

    /// Every pair in both flows succeeded.
    pub fn fully_bound(&self) -> bool {
        self.inbound.ports_found
            && self.outbound.ports_found
            && self.inbound.failed.is_empty()
            && self.outbound.failed.is_empty()
    }

    /// Pairs linked or unlinked by this attempt, in wiring order.
    pub fn changed(&self) -> impl Iterator<Item = &PortPair> {
        self.inbound.changed.iter().chain(&self.outbound.changed)
    }
}

/// Applies the configured pairing rules against a routing daemon.
pub struct PortBinder {
    daemon: Arc<dyn RoutingDaemon>,
    config: Arc<BinderConfig>,
}

impl PortBinder {
    pub fn new(daemon: Arc<dyn RoutingDaemon>, config: Arc<BinderConfig>) -> Self {
        Self { daemon, config }
    }

    pub fn config(&self) -> &BinderConfig {
        &self.config
    }

    /// Run one (dis)connection pass.  Blocks on daemon I/O, so it must not
    /// be called from the audio thread.
    pub fn attempt_external_binding(&self, mode: BindMode) -> BindOutcome {
        log::info!("{} JACK ports", mode.gerund());

        let mut outcome = BindOutcome::new(mode);

        let Some(session) = self.open_session() else {
            return outcome;
        };
        outcome.session_opened = true;

        outcome.inbound = self.apply_rule(session.as_ref(), Flow::Send, &self.config.inbound, mode);
        outcome.outbound =
            self.apply_rule(session.as_ref(), Flow::Return, &self.config.outbound, mode);

        session.close();
        outcome
    }

    /// Disconnect exactly `pairs`, leaving every other link alone.
    ///
    /// Returns `None` when no session could be opened.
    pub fn release(&self, pairs: &[PortPair]) -> Option<FlowOutcome> {
        log::info!("{} JACK ports", BindMode::Disconnect.gerund());

        let session = self.open_session()?;
        let mut result = FlowOutcome {
            ports_found: true,
            ..FlowOutcome::default()
        };
        for pair in pairs {
            log::info!("  {}", pair);
            let applied = apply_pair(session.as_ref(), pair, BindMode::Disconnect);
            result.record(pair.clone(), applied);
        }

        session.close();
        Some(result)
    }

    fn open_session(&self) -> Option<Box<dyn RoutingSession>> {
        match self.daemon.open_session(&self.config.client_name) {
            Ok(session) => Some(session),
            Err(e) => {
                log::warn!("jack server not running? ({})", e);
                log::warn!("Failed to create JACK client for connections");
                None
            }
        }
    }

    fn apply_rule(
        &self,
        session: &dyn RoutingSession,
        flow: Flow,
        rule: &PairingRule,
        mode: BindMode,
    ) -> FlowOutcome {
        let peer_ports = session.ports(&rule.peer_prefix, flow.peer_direction());
        let own_ports = session.ports(&rule.own_prefix, flow.own_direction());

        let Some(pairs) = rule.pairs(flow, &peer_ports, &own_ports, self.config.channels) else {
            log::warn!(
                "Failed to {} {} {} {} ports",
                mode.verb(),
                mode.preposition(),
                self.config.peer_label,
                flow.peer_label()
            );
            log::debug!(
                "Found {} ports matching {:?} and {} matching {:?}, need {}",
                peer_ports.len(),
                rule.peer_prefix,
                own_ports.len(),
                rule.own_prefix,
                self.config.channels
            );
            return FlowOutcome::default();
        };

        log::info!(
            "{} {} {} {} ports",
            mode.gerund(),
            mode.preposition(),
            self.config.peer_label,
            flow.peer_label()
        );

        let mut result = FlowOutcome {
            ports_found: true,
            ..FlowOutcome::default()
        };

        for pair in pairs {
            log::info!("  {}", pair);
            let applied = apply_pair(session, &pair, mode);
            result.record(pair, applied);
        }

        result
    }
}

impl FlowOutcome {
    fn record(&mut self, pair: PortPair, applied: Result<bool, RoutingError>) {
        match applied {
            Ok(changed) => {
                if changed {
                    self.changed.push(pair.clone());
                }
                self.succeeded.push(pair);
                self.last_pair_ok = true;
            }
            Err(e) => {
                log::warn!("{}", e);
                self.failed.push(pair);
                self.last_pair_ok = false;
            }
        }
    }
}

/// (Dis)connect a single pair.  A pair already in the requested state is
/// left alone and counts as success; `Ok(true)` means the link was changed.
fn apply_pair(
    session: &dyn RoutingSession,
    pair: &PortPair,
    mode: BindMode,
) -> Result<bool, RoutingError> {
    let linked = session.is_connected(&pair.output, &pair.input);
    match mode {
        BindMode::Connect if linked => {
            log::debug!("Already connected: {}", pair);
            Ok(false)
        }
        BindMode::Connect => session.connect(&pair.output, &pair.input).map(|()| true),
        BindMode::Disconnect if !linked => {
            log::debug!("Not connected: {}", pair);
            Ok(false)
        }
        BindMode::Disconnect => session.disconnect(&pair.output, &pair.input).map(|()| true),
    }
}
