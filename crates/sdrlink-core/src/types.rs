//! Core types used throughout sdrlink.
//!
//! These types describe everything the Connection Orchestrator reasons
//! about: discovered radios, connectable targets, sessions already active
//! on a radio, persisted default selections, and the connection lifecycle
//! itself.

use std::fmt;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// How a radio was discovered and how a connection to it is brokered.
///
/// Radios reached through the Smartlink relay carry a different identity
/// space than LAN radios, so the source participates in target equality
/// and in default-selection matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RadioSource {
    /// Directly reachable on the local network (discovery broadcasts).
    Local,
    /// Brokered through the Smartlink relay/cloud service.
    Smartlink,
}

impl fmt::Display for RadioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RadioSource::Local => write!(f, "Local"),
            RadioSource::Smartlink => write!(f, "Smartlink"),
        }
    }
}

/// The kind of session a client holds (or wants to hold) on a radio.
///
/// Exclusive and shared sessions have different, non-interchangeable
/// default selections, so this enum doubles as the slot key for the
/// default-selection store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionKind {
    /// The single primary/owning connection to a radio.
    Exclusive,
    /// A secondary connection bound to a named station on a radio that
    /// already has an owning session.
    Shared,
}

/// Connection lifecycle state.
///
/// The orchestrator is the only writer. Transitions follow a strict
/// `Disconnected -> InProcess -> Connected -> InProcess -> Disconnected`
/// cycle; `InProcess` doubles as the UI-facing "busy" signal that rejects
/// re-entrant connect/disconnect intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// No connection exists and none is being attempted.
    #[default]
    Disconnected,
    /// A connect or disconnect attempt is outstanding.
    InProcess,
    /// A protocol session is established.
    Connected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::InProcess => write!(f, "in process"),
            ConnectionStatus::Connected => write!(f, "connected"),
        }
    }
}

/// A session observed as already active on a discovered radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteClient {
    /// Station name the session is bound to.
    pub station: String,
    /// Protocol-level session handle.
    pub handle: u32,
    /// Identity of the owning client program, when reported.
    pub client_id: Option<String>,
}

/// What happened to a [`RemoteClient`] on a known radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAction {
    /// A new session appeared on the radio.
    Added,
    /// A session disappeared from the radio.
    Removed,
    /// A session finished initializing and is now bindable.
    Completed,
}

/// A change to the set of sessions active on a discovered radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientEvent {
    /// The kind of change.
    pub action: ClientAction,
    /// The session the change applies to.
    pub client: RemoteClient,
}

/// A discovered radio, as reported by the discovery gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioInfo {
    /// Radio serial number (the stable identity).
    pub serial: String,
    /// How the radio was discovered.
    pub source: RadioSource,
    /// Radio model name (e.g. "FLEX-6600").
    pub model: String,
    /// User-assigned nickname.
    pub nickname: String,
    /// Network address, when locally reachable.
    ///
    /// Informational only -- a radio keeps its identity across address
    /// changes, so this field never participates in equality.
    pub addr: Option<SocketAddr>,
    /// Sessions already active on this radio's exclusive channel.
    pub remote_clients: Vec<RemoteClient>,
}

/// A change in the set of discovered radios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// A radio appeared on the network or relay.
    Added(RadioInfo),
    /// A known radio's broadcast data changed.
    Updated(RadioInfo),
    /// A radio stopped broadcasting.
    Removed {
        /// Serial number of the radio that disappeared.
        serial: String,
    },
}

/// One connectable endpoint: a radio plus an optional station name.
///
/// The station name is non-empty only when selecting a shared session on
/// a radio that already has an owning session. Compared by the radio's
/// identity (serial + source) and the station name; the rest of the
/// carried [`RadioInfo`] is descriptive payload.
#[derive(Debug, Clone)]
pub struct Pickable {
    /// The radio this target refers to.
    pub radio: RadioInfo,
    /// Station to bind to, for shared sessions.
    pub station: Option<String>,
}

impl PartialEq for Pickable {
    fn eq(&self, other: &Self) -> bool {
        self.radio.serial == other.radio.serial
            && self.radio.source == other.radio.source
            && self.station == other.station
    }
}

impl Eq for Pickable {}

impl fmt::Display for Pickable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.station {
            Some(station) => write!(
                f,
                "{} {} ({}) @ {}",
                self.radio.source, self.radio.nickname, self.radio.serial, station
            ),
            None => write!(
                f,
                "{} {} ({})",
                self.radio.source, self.radio.nickname, self.radio.serial
            ),
        }
    }
}

/// A persisted "preferred target" record.
///
/// One slot exists per [`SessionKind`]. Written as a whole JSON value so
/// a record is either absent or fully valid, never partial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultSelection {
    /// Serial number of the preferred radio.
    pub serial: String,
    /// Discovery source of the preferred radio.
    pub source: RadioSource,
    /// Preferred station, for the shared slot.
    pub station: Option<String>,
}

impl DefaultSelection {
    /// Build a default-selection record from a picked target.
    pub fn from_pickable(pickable: &Pickable) -> Self {
        DefaultSelection {
            serial: pickable.radio.serial.clone(),
            source: pickable.radio.source,
            station: pickable.station.clone(),
        }
    }

    /// Whether a live target matches this record.
    ///
    /// Matching ignores the radio's network address: a default still
    /// applies after a DHCP lease change.
    pub fn matches(&self, pickable: &Pickable) -> bool {
        self.serial == pickable.radio.serial
            && self.source == pickable.radio.source
            && self.station == pickable.station
    }
}

/// The result of a Smartlink reachability test for one radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    /// Serial number of the tested radio.
    pub serial: String,
    /// Whether the radio was reachable through the relay.
    pub success: bool,
}

/// Severity of an entry on the log-alert stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSeverity {
    /// A warning was logged.
    Warning,
    /// An error was logged.
    Error,
}

/// An entry from the process log-alert subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogAlert {
    /// Severity of the logged entry.
    pub severity: LogSeverity,
    /// The logged message.
    pub message: String,
}

/// Kind of a user-facing alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    /// Advisory information (e.g. no discovery mode enabled).
    Info,
    /// Something degraded but recoverable.
    Warning,
    /// A failed operation.
    Error,
}

/// A user-facing alert.
///
/// At most one alert is current at a time; a new alert replaces any
/// alert still on display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// Alert kind, for presentation.
    pub kind: AlertKind,
    /// Human-readable message.
    pub message: String,
}

impl Alert {
    /// Build an informational alert.
    pub fn info(message: impl Into<String>) -> Self {
        Alert {
            kind: AlertKind::Info,
            message: message.into(),
        }
    }

    /// Build a warning alert.
    pub fn warning(message: impl Into<String>) -> Self {
        Alert {
            kind: AlertKind::Warning,
            message: message.into(),
        }
    }

    /// Build an error alert.
    pub fn error(message: impl Into<String>) -> Self {
        Alert {
            kind: AlertKind::Error,
            message: message.into(),
        }
    }
}

/// Transient state held while the user resolves a session conflict.
///
/// Exists only between "a target with existing sessions was selected for
/// an exclusive connection" and "the user picked a session to take over
/// or canceled."
#[derive(Debug, Clone, PartialEq)]
pub struct PendingConflict {
    /// The target the user selected.
    pub target: Pickable,
    /// Sessions already present on the target's exclusive channel.
    pub clients: Vec<RemoteClient>,
}

/// Transient state held while a login prompt is outstanding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    /// Prompt heading.
    pub heading: String,
    /// Prefilled identity (the last known successful one, if any).
    pub user: String,
}

/// An owned handle to a requested audio stream.
///
/// Created on a successful stream request, destroyed on release or on
/// disconnect. The orchestrator is the only owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioHandle {
    /// Stream identifier needed to release the stream.
    pub stream_id: u32,
}

/// The single modal surface the orchestrator may have open.
///
/// The device picker, the client-conflict chooser, and the login prompt
/// are mutually exclusive; modeling them as one variant makes "at most
/// one active" structural rather than conventional.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Modal {
    /// No modal surface is open.
    #[default]
    None,
    /// The device/station picker is open.
    Picker {
        /// Currently connectable targets, refreshed on discovery events.
        pickables: Vec<Pickable>,
        /// The persisted default for the active session kind, if any.
        default: Option<DefaultSelection>,
        /// Most recent Smartlink test result, if a test was requested.
        test_result: Option<bool>,
    },
    /// The client-conflict chooser is open.
    Conflict(PendingConflict),
    /// The login prompt is open.
    Login(LoginRequest),
}

impl Modal {
    /// Whether any modal surface is open.
    pub fn is_open(&self) -> bool {
        !matches!(self, Modal::None)
    }
}
