use crate::error::RoutingError;

/// Port direction as seen by the routing daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PortDirection {
    /// The port consumes audio (a connection destination)
    Input,
    /// The port produces audio (a connection source)
    Output,
}

/// A connection between an output port and an input port, by full name
/// (e.g. `JACKInsert:send_1` → `sooperlooper:common_in_1`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortPair {
    pub output: String,
    pub input: String,
}

impl PortPair {
    pub fn new(output: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            input: input.into(),
        }
    }
}

impl std::fmt::Display for PortPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.output, self.input)
    }
}

/// An open, activated client session against the routing daemon.
///
/// Sessions are short-lived: the binder opens one per attempt and closes it
/// before returning.
pub trait RoutingSession {
    /// Full names of the ports starting with `prefix` in the given
    /// direction, in daemon registration order.
    fn ports(&self, prefix: &str, direction: PortDirection) -> Vec<String>;

    /// Whether `output` is currently connected to `input`.
    fn is_connected(&self, output: &str, input: &str) -> bool;

    fn connect(&self, output: &str, input: &str) -> Result<(), RoutingError>;

    fn disconnect(&self, output: &str, input: &str) -> Result<(), RoutingError>;

    /// Deactivate and close the session, releasing daemon-side resources.
    fn close(self: Box<Self>);
}

/// A running routing daemon that sessions can be opened against.
pub trait RoutingDaemon: Send + Sync {
    /// Open and activate a session under `client_name`.  Must never start
    /// the daemon as a side effect.
    fn open_session(&self, client_name: &str) -> Result<Box<dyn RoutingSession>, RoutingError>;
}

/// Keep only names that literally start with `prefix`, preserving order.
pub fn filter_prefix(names: Vec<String>, prefix: &str) -> Vec<String> {
    names
        .into_iter()
        .filter(|name| name.starts_with(prefix))
        .collect()
}
