//! In-memory routing daemon for tests.
//!
//! Holds a flat port list and a link set, and records every call made
//! against it so tests can assert on what the binder actually did.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use super::types::*;
use crate::error::RoutingError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Open(String),
    Ports(String, PortDirection),
    Connect(PortPair),
    Disconnect(PortPair),
    Close,
}

#[derive(Debug, Default)]
struct MockState {
    ports: Vec<(String, PortDirection)>,
    links: HashSet<PortPair>,
    failing: HashSet<PortPair>,
    fail_open: bool,
    calls: Vec<Call>,
}

#[derive(Debug, Clone, Default)]
pub struct MockDaemon {
    state: Arc<Mutex<MockState>>,
}

impl MockDaemon {
    pub fn new() -> Self {
        Self::default()
    }

    /// A daemon with SooperLooper's common ports and our own send/return
    /// ports registered, nothing connected.
    pub fn with_sooperlooper() -> Self {
        let daemon = Self::new();
        daemon.add_port("system:capture_1", PortDirection::Output);
        daemon.add_port("sooperlooper:common_in_1", PortDirection::Input);
        daemon.add_port("sooperlooper:common_in_2", PortDirection::Input);
        daemon.add_port("sooperlooper:common_out_1", PortDirection::Output);
        daemon.add_port("sooperlooper:common_out_2", PortDirection::Output);
        daemon.add_port("JACKInsert:send_1", PortDirection::Output);
        daemon.add_port("JACKInsert:send_2", PortDirection::Output);
        daemon.add_port("JACKInsert:return_1", PortDirection::Input);
        daemon.add_port("JACKInsert:return_2", PortDirection::Input);
        daemon
    }

    pub fn add_port(&self, name: &str, direction: PortDirection) {
        self.state.lock().ports.push((name.to_string(), direction));
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.state.lock().fail_open = fail;
    }

    /// Make every connect/disconnect of this pair fail.
    pub fn fail_pair(&self, output: &str, input: &str) {
        self.state.lock().failing.insert(PortPair::new(output, input));
    }

    pub fn link(&self, output: &str, input: &str) {
        self.state.lock().links.insert(PortPair::new(output, input));
    }

    pub fn is_linked(&self, output: &str, input: &str) -> bool {
        self.state
            .lock()
            .links
            .contains(&PortPair::new(output, input))
    }

    pub fn links(&self) -> Vec<PortPair> {
        let mut links: Vec<_> = self.state.lock().links.iter().cloned().collect();
        links.sort();
        links
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn open_count(&self) -> usize {
        self.count(|c| matches!(c, Call::Open(_)))
    }

    pub fn close_count(&self) -> usize {
        self.count(|c| matches!(c, Call::Close))
    }

    /// Connect and disconnect calls, in issue order.
    pub fn link_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Connect(_) | Call::Disconnect(_)))
            .collect()
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| pred(c)).count()
    }
}

impl RoutingDaemon for MockDaemon {
    fn open_session(&self, client_name: &str) -> Result<Box<dyn RoutingSession>, RoutingError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Open(client_name.to_string()));
        if state.fail_open {
            return Err(RoutingError::SessionOpen {
                client_name: client_name.to_string(),
                reason: "server not running".to_string(),
            });
        }
        Ok(Box::new(MockSession {
            state: self.state.clone(),
        }))
    }
}

struct MockSession {
    state: Arc<Mutex<MockState>>,
}

impl MockSession {
    fn has_port(state: &MockState, name: &str, direction: PortDirection) -> bool {
        state.ports.iter().any(|(n, d)| n == name && *d == direction)
    }

    fn check_pair(state: &MockState, pair: &PortPair) -> Result<(), String> {
        if state.failing.contains(pair) {
            return Err("rejected by daemon".to_string());
        }
        if !Self::has_port(state, &pair.output, PortDirection::Output)
            || !Self::has_port(state, &pair.input, PortDirection::Input)
        {
            return Err("no such port".to_string());
        }
        Ok(())
    }
}

impl RoutingSession for MockSession {
    fn ports(&self, prefix: &str, direction: PortDirection) -> Vec<String> {
        let mut state = self.state.lock();
        state.calls.push(Call::Ports(prefix.to_string(), direction));
        let names = state
            .ports
            .iter()
            .filter(|(_, d)| *d == direction)
            .map(|(n, _)| n.clone())
            .collect();
        filter_prefix(names, prefix)
    }

    fn is_connected(&self, output: &str, input: &str) -> bool {
        self.state
            .lock()
            .links
            .contains(&PortPair::new(output, input))
    }

    fn connect(&self, output: &str, input: &str) -> Result<(), RoutingError> {
        let mut state = self.state.lock();
        let pair = PortPair::new(output, input);
        state.calls.push(Call::Connect(pair.clone()));
        Self::check_pair(&state, &pair).map_err(|reason| RoutingError::Connect {
            output: output.to_string(),
            input: input.to_string(),
            reason,
        })?;
        state.links.insert(pair);
        Ok(())
    }

    fn disconnect(&self, output: &str, input: &str) -> Result<(), RoutingError> {
        let mut state = self.state.lock();
        let pair = PortPair::new(output, input);
        state.calls.push(Call::Disconnect(pair.clone()));
        Self::check_pair(&state, &pair).map_err(|reason| RoutingError::Disconnect {
            output: output.to_string(),
            input: input.to_string(),
            reason,
        })?;
        state.links.remove(&pair);
        Ok(())
    }

    fn close(self: Box<Self>) {
        self.state.lock().calls.push(Call::Close);
    }
}
