use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use mongodb::event::sdam::SdamEvent;
use mongodb::ServerType;
use serde::Serialize;

/// Lifecycle of the database handle, numbered like the usual driver ready states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connected,
    Connecting,
    Disconnecting,
    Closed,
}

impl ConnectionState {
    pub fn ready_state(self) -> u8 {
        match self {
            Self::Disconnected => 0,
            Self::Connected => 1,
            Self::Connecting => 2,
            Self::Disconnecting => 3,
            Self::Closed => 99,
        }
    }

    fn from_ready_state(value: u8) -> Self {
        match value {
            1 => Self::Connected,
            2 => Self::Connecting,
            3 => Self::Disconnecting,
            99 => Self::Closed,
            _ => Self::Disconnected,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Connecting => "connecting",
            Self::Disconnecting => "disconnecting",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected { address: String },
    Error { address: String, message: String },
    Disconnected { address: String },
    Closed,
}

/// Sink for connection events.
pub trait ConnectionEventSink: Send + Sync {
    fn emit(&self, event: &ConnectionEvent);
}

/// Channel-based sink that forwards events to a receiver.
pub struct ChannelEventSink {
    tx: tokio::sync::mpsc::UnboundedSender<ConnectionEvent>,
}

impl ChannelEventSink {
    pub fn new() -> (Self, tokio::sync::mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ConnectionEventSink for ChannelEventSink {
    fn emit(&self, event: &ConnectionEvent) {
        let _ = self.tx.send(event.clone());
    }
}

/// Logs every event.
pub struct TracingEventSink;

impl ConnectionEventSink for TracingEventSink {
    fn emit(&self, event: &ConnectionEvent) {
        match event {
            ConnectionEvent::Connected { address } => {
                tracing::info!(%address, "MongoDB connection re-established");
            }
            ConnectionEvent::Error { address, message } => {
                tracing::error!(%address, error = %message, "MongoDB connection error");
            }
            ConnectionEvent::Disconnected { address } => {
                tracing::warn!(%address, "MongoDB disconnected");
            }
            ConnectionEvent::Closed => {
                tracing::info!("MongoDB connection closed");
            }
        }
    }
}

/// Tracks connection state and fans driver events out to sinks.
pub struct ConnectionMonitor {
    state: AtomicU8,
    sinks: Vec<Arc<dyn ConnectionEventSink>>,
}

impl ConnectionMonitor {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Disconnected.ready_state()),
            sinks: Vec::new(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ConnectionEventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_ready_state(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: ConnectionState) {
        self.state.store(state.ready_state(), Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Record an event, update the state and notify every sink.
    pub fn record(&self, event: ConnectionEvent) {
        let closed = self.state() == ConnectionState::Closed;
        match &event {
            ConnectionEvent::Connected { .. } => {
                if !closed {
                    self.set_state(ConnectionState::Connected);
                }
            }
            ConnectionEvent::Error { .. } => {}
            ConnectionEvent::Disconnected { .. } => {
                if !closed {
                    self.set_state(ConnectionState::Disconnected);
                }
            }
            ConnectionEvent::Closed => self.set_state(ConnectionState::Closed),
        }
        for sink in &self.sinks {
            sink.emit(&event);
        }
    }

    /// Translate a driver topology event. Returns `None` for events that are not surfaced.
    ///
    /// A lost server is reported by the driver as a description change to
    /// `Unknown`; `ServerClosed` only fires when the topology itself shuts down
    /// or drops the server.
    pub fn classify(&self, event: &SdamEvent) -> Option<ConnectionEvent> {
        match event {
            SdamEvent::ServerHeartbeatFailed(ev) => Some(ConnectionEvent::Error {
                address: ev.server_address.to_string(),
                message: ev.failure.to_string(),
            }),
            SdamEvent::ServerDescriptionChanged(ev) => server_transition(
                ev.address.to_string(),
                ev.previous_description.server_type(),
                ev.new_description.server_type(),
            ),
            SdamEvent::ServerClosed(ev) => Some(ConnectionEvent::Disconnected {
                address: ev.address.to_string(),
            }),
            _ => None,
        }
    }

    pub fn observe(&self, event: SdamEvent) {
        if let Some(event) = self.classify(&event) {
            self.record(event);
        }
    }
}

fn is_available(server_type: ServerType) -> bool {
    !matches!(server_type, ServerType::Unknown)
}

/// Map a server's type change to a connection event: losing the server is a
/// disconnect, getting it back is a reconnect.
pub fn server_transition(
    address: String,
    previous: ServerType,
    current: ServerType,
) -> Option<ConnectionEvent> {
    match (is_available(previous), is_available(current)) {
        (true, false) => Some(ConnectionEvent::Disconnected { address }),
        (false, true) => Some(ConnectionEvent::Connected { address }),
        _ => None,
    }
}

impl Default for ConnectionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor_with_channel() -> (
        ConnectionMonitor,
        tokio::sync::mpsc::UnboundedReceiver<ConnectionEvent>,
    ) {
        let (sink, rx) = ChannelEventSink::new();
        (ConnectionMonitor::new().with_sink(Arc::new(sink)), rx)
    }

    #[test]
    fn ready_state_codes_round_trip() {
        for state in [
            ConnectionState::Disconnected,
            ConnectionState::Connected,
            ConnectionState::Connecting,
            ConnectionState::Disconnecting,
            ConnectionState::Closed,
        ] {
            assert_eq!(ConnectionState::from_ready_state(state.ready_state()), state);
        }
    }

    #[test]
    fn disconnect_then_recovery_updates_state() {
        let (monitor, mut rx) = monitor_with_channel();
        monitor.set_state(ConnectionState::Connected);

        monitor.record(ConnectionEvent::Error {
            address: "db:27017".into(),
            message: "connection refused".into(),
        });
        assert!(monitor.is_connected());

        monitor.record(ConnectionEvent::Disconnected {
            address: "db:27017".into(),
        });
        assert_eq!(monitor.state(), ConnectionState::Disconnected);

        monitor.record(ConnectionEvent::Connected {
            address: "db:27017".into(),
        });
        assert!(monitor.is_connected());

        assert!(matches!(rx.try_recv(), Ok(ConnectionEvent::Error { .. })));
        assert!(matches!(rx.try_recv(), Ok(ConnectionEvent::Disconnected { .. })));
        assert!(matches!(rx.try_recv(), Ok(ConnectionEvent::Connected { .. })));
    }

    #[test]
    fn server_going_unknown_is_a_disconnect() {
        let event = server_transition(
            "db:27017".into(),
            ServerType::Standalone,
            ServerType::Unknown,
        );
        assert_eq!(
            event,
            Some(ConnectionEvent::Disconnected {
                address: "db:27017".into()
            })
        );

        let event = server_transition(
            "rs0:27017".into(),
            ServerType::RsPrimary,
            ServerType::Unknown,
        );
        assert!(matches!(event, Some(ConnectionEvent::Disconnected { .. })));
    }

    #[test]
    fn server_coming_back_is_a_reconnect() {
        let event = server_transition(
            "db:27017".into(),
            ServerType::Unknown,
            ServerType::Standalone,
        );
        assert_eq!(
            event,
            Some(ConnectionEvent::Connected {
                address: "db:27017".into()
            })
        );
    }

    #[test]
    fn role_changes_between_available_types_are_ignored() {
        assert_eq!(
            server_transition("rs0:27017".into(), ServerType::RsSecondary, ServerType::RsPrimary),
            None
        );
        assert_eq!(
            server_transition("db:27017".into(), ServerType::Unknown, ServerType::Unknown),
            None
        );
    }

    #[test]
    fn outage_flips_state_and_recovery_restores_it() {
        let (monitor, mut rx) = monitor_with_channel();
        monitor.set_state(ConnectionState::Connected);

        let lost = server_transition("db:27017".into(), ServerType::Standalone, ServerType::Unknown);
        monitor.record(lost.unwrap());
        assert_eq!(monitor.state(), ConnectionState::Disconnected);

        let back = server_transition("db:27017".into(), ServerType::Unknown, ServerType::Standalone);
        monitor.record(back.unwrap());
        assert!(monitor.is_connected());

        assert!(matches!(rx.try_recv(), Ok(ConnectionEvent::Disconnected { .. })));
        assert!(matches!(rx.try_recv(), Ok(ConnectionEvent::Connected { .. })));
    }

    #[test]
    fn closed_state_is_sticky() {
        let (monitor, _rx) = monitor_with_channel();
        monitor.record(ConnectionEvent::Closed);
        monitor.record(ConnectionEvent::Disconnected {
            address: "db:27017".into(),
        });
        monitor.record(ConnectionEvent::Connected {
            address: "db:27017".into(),
        });
        assert_eq!(monitor.state(), ConnectionState::Closed);
    }
}
