//! sdrlink-core: Core types, error definitions, and service traits for
//! sdrlink.
//!
//! This crate defines everything shared between the Connection
//! Orchestrator (`sdrlink-orchestrator`) and the external collaborators
//! it drives. Applications and mocks depend on these types without
//! pulling in the orchestrator itself.
//!
//! # Key types
//!
//! - [`Pickable`] -- one connectable endpoint (radio + optional station)
//! - [`ConnectionStatus`] -- the lifecycle state owned by the orchestrator
//! - [`Modal`] -- the single, mutually-exclusive modal surface
//! - [`DiscoveryGateway`] / [`ConnectionService`] / [`LoginService`] /
//!   [`AudioService`] / [`DefaultStore`] -- the service seams
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod services;
pub mod store;
pub mod types;

// Re-export key types at crate root for ergonomic `use sdrlink_core::*`.
pub use error::{Error, Result};
pub use services::{
    AudioService, ConnectionService, DefaultStore, DiscoveryGateway, LoginService,
};
pub use store::JsonDefaultStore;
pub use types::{
    Alert, AlertKind, AudioHandle, ClientAction, ClientEvent, ConnectionStatus, DefaultSelection,
    DiscoveryEvent, LogAlert, LogSeverity, LoginRequest, Modal, PendingConflict, Pickable,
    RadioInfo, RadioSource, RemoteClient, SessionKind, TestResult,
};
