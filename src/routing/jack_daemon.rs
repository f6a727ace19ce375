//! JACK implementation of the routing daemon seam.
//!
//! Each session is a throwaway JACK client that is activated with no-op
//! handlers, used for a handful of port queries and (dis)connections, and
//! then closed.  The client never starts a JACK server on its own.

use jack::{AsyncClient, Client, ClientOptions, PortFlags};

use super::types::*;
use crate::error::RoutingError;

/// The system JACK server (or PipeWire's JACK compatibility layer).
#[derive(Debug, Default, Clone, Copy)]
pub struct JackDaemon;

impl RoutingDaemon for JackDaemon {
    fn open_session(&self, client_name: &str) -> Result<Box<dyn RoutingSession>, RoutingError> {
        let (client, status) = Client::new(client_name, ClientOptions::NO_START_SERVER)
            .map_err(|e| RoutingError::SessionOpen {
                client_name: client_name.to_string(),
                reason: e.to_string(),
            })?;

        log::debug!(
            "JACK client opened: name={:?} status={:?}",
            client.name(),
            status
        );

        let client = client
            .activate_async((), ())
            .map_err(|e| RoutingError::Activate {
                client_name: client_name.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Box::new(JackSession { client }))
    }
}

struct JackSession {
    client: AsyncClient<(), ()>,
}

impl RoutingSession for JackSession {
    fn ports(&self, prefix: &str, direction: PortDirection) -> Vec<String> {
        let flags = match direction {
            PortDirection::Input => PortFlags::IS_INPUT,
            PortDirection::Output => PortFlags::IS_OUTPUT,
        };
        // jack_get_ports() takes an unanchored extended regex
        let pattern = format!("^{}", escape_pattern(prefix));
        let names = self.client.as_client().ports(Some(&pattern), None, flags);
        filter_prefix(names, prefix)
    }

    fn is_connected(&self, output: &str, input: &str) -> bool {
        self.client
            .as_client()
            .port_by_name(output)
            .and_then(|port| port.is_connected_to(input).ok())
            .unwrap_or(false)
    }

    fn connect(&self, output: &str, input: &str) -> Result<(), RoutingError> {
        self.client
            .as_client()
            .connect_ports_by_name(output, input)
            .map_err(|e| RoutingError::Connect {
                output: output.to_string(),
                input: input.to_string(),
                reason: e.to_string(),
            })
    }

    fn disconnect(&self, output: &str, input: &str) -> Result<(), RoutingError> {
        self.client
            .as_client()
            .disconnect_ports_by_name(output, input)
            .map_err(|e| RoutingError::Disconnect {
                output: output.to_string(),
                input: input.to_string(),
                reason: e.to_string(),
            })
    }

    fn close(self: Box<Self>) {
        if let Err(e) = self.client.deactivate() {
            log::warn!("Failed to deactivate JACK client: {}", e);
        }
    }
}

/// Escape POSIX extended regex metacharacters so a port prefix is matched
/// literally.
fn escape_pattern(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len() * 2);
    for c in prefix.chars() {
        if matches!(
            c,
            '\\' | '.' | '[' | ']' | '(' | ')' | '{' | '}' | '*' | '+' | '?' | '^' | '$' | '|'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
