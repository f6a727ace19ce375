//! Port pairing rules
//!
//! A rule describes one direction of the insert loop: which of the peer's
//! ports and which of our ports take part (by name prefix), and in which
//! index order the pairs are wired.
//!
//! ## Direction
//! `Flow::Send` runs from our send ports (outputs) into the peer's inputs.
//! `Flow::Return` runs from the peer's outputs into our return ports
//! (inputs).  The rule itself is direction-agnostic; the flow decides which
//! side is the connection source.
//!
//! ## Order
//! Pairs are wired in `order`, and the last pair in that order is the one
//! whose success counts as "bound" for the return direction.  SooperLooper's
//! defaults wire the send side left-then-right and the return side
//! right-then-left.

use serde::Deserialize;

use crate::routing::{PortDirection, PortPair};

/// One leg of the insert loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flow {
    /// Our send ports → the peer's input ports
    Send,
    /// The peer's output ports → our return ports
    Return,
}

impl Flow {
    /// Direction of the peer's ports taking part in this flow.
    pub fn peer_direction(self) -> PortDirection {
        match self {
            Flow::Send => PortDirection::Input,
            Flow::Return => PortDirection::Output,
        }
    }

    /// Direction of our own ports taking part in this flow.
    pub fn own_direction(self) -> PortDirection {
        match self {
            Flow::Send => PortDirection::Output,
            Flow::Return => PortDirection::Input,
        }
    }

    /// What the peer's side is called in diagnostics ("input ports").
    pub fn peer_label(self) -> &'static str {
        match self {
            Flow::Send => "input",
            Flow::Return => "output",
        }
    }
}

/// Prefixes and pairing order for one flow.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PairingRule {
    /// Name prefix of the peer's ports (e.g. `sooperlooper:common_in_`)
    pub peer_prefix: String,
    /// Name prefix of our own ports (e.g. `JACKInsert:send_`)
    pub own_prefix: String,
    /// Channel indices in the order they are wired
    pub order: Vec<usize>,
}

impl PairingRule {
    pub fn new(
        peer_prefix: impl Into<String>,
        own_prefix: impl Into<String>,
        order: Vec<usize>,
    ) -> Self {
        Self {
            peer_prefix: peer_prefix.into(),
            own_prefix: own_prefix.into(),
            order,
        }
    }

    /// Our send ports into SooperLooper's common inputs, left then right.
    pub fn sooperlooper_send() -> Self {
        Self::new("sooperlooper:common_in_", "JACKInsert:send_", vec![0, 1])
    }

    /// SooperLooper's common outputs into our return ports, right then left.
    pub fn sooperlooper_return() -> Self {
        Self::new("sooperlooper:common_out_", "JACKInsert:return_", vec![1, 0])
    }

    /// Build the port pairs for `flow`, in wiring order.
    ///
    /// Returns `None` when either side has fewer than `channels` ports:
    /// the peer isn't running, or our ports are not registered yet.
    pub fn pairs(
        &self,
        flow: Flow,
        peer_ports: &[String],
        own_ports: &[String],
        channels: usize,
    ) -> Option<Vec<PortPair>> {
        if peer_ports.len() < channels || own_ports.len() < channels {
            return None;
        }

        let pairs = self
            .order
            .iter()
            .filter(|&&index| index < channels)
            .map(|&index| {
                let peer = &peer_ports[index];
                let own = &own_ports[index];
                match flow {
                    Flow::Send => PortPair::new(own.clone(), peer.clone()),
                    Flow::Return => PortPair::new(peer.clone(), own.clone()),
                }
            })
            .collect();

        Some(pairs)
    }

    /// Check the order against the channel count.
    pub fn validate(&self, channels: usize) -> Result<(), String> {
        if self.order.is_empty() {
            return Err(format!("rule for `{}` has an empty order", self.peer_prefix));
        }
        if let Some(&bad) = self.order.iter().find(|&&i| i >= channels) {
            return Err(format!(
                "rule for `{}` references channel {} but only {} channels are configured",
                self.peer_prefix, bad, channels
            ));
        }
        Ok(())
    }
}
