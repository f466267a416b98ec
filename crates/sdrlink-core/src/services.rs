//! Service traits -- the seams between the orchestrator and its external
//! collaborators.
//!
//! The orchestrator never talks to the network directly. Discovery, the
//! radio protocol handshake, the Smartlink credential exchange, audio
//! streaming, and default persistence are all reached through the traits
//! defined here, so the whole connection lifecycle can be exercised
//! against mocks (see `sdrlink-test-harness`).
//!
//! Long-lived event sequences are exposed as [`tokio::sync::broadcast`]
//! receivers: infinite, restartable only by resubscription, and safe for
//! multiple consumers. One-shot operations are plain `async` methods.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::types::{
    ClientEvent, DefaultSelection, DiscoveryEvent, Pickable, SessionKind, TestResult,
};

/// Discovery of radios on the LAN and through the Smartlink relay.
///
/// Snapshot queries (`pickable_*`, `find_default`) are synchronous reads
/// of the gateway's cached discovery state; only the imperative mode
/// controls go to the network.
#[async_trait]
pub trait DiscoveryGateway: Send + Sync {
    /// Subscribe to radio appeared/updated/removed events.
    fn subscribe_discovery(&self) -> broadcast::Receiver<DiscoveryEvent>;

    /// Subscribe to remote-client change events for known radios.
    fn subscribe_clients(&self) -> broadcast::Receiver<ClientEvent>;

    /// Subscribe to Smartlink reachability test results.
    fn subscribe_tests(&self) -> broadcast::Receiver<TestResult>;

    /// Snapshot of radios connectable for an exclusive session.
    fn pickable_radios(&self) -> Vec<Pickable>;

    /// Snapshot of stations connectable for a shared session.
    fn pickable_stations(&self) -> Vec<Pickable>;

    /// Find a live target matching a persisted default selection.
    ///
    /// Returns `None` when the default references a radio not currently
    /// discovered -- a miss, not an error.
    fn find_default(&self, default: &DefaultSelection, kind: SessionKind) -> Option<Pickable>;

    /// Enable or disable local-network discovery.
    async fn set_local_mode(&self, enabled: bool);

    /// Enable or disable Smartlink relay discovery for the given account.
    ///
    /// Returns `false` when the relay channel was requested but could not
    /// be started (network down, stale credential).
    async fn set_relay_mode(&self, enabled: bool, user: &str) -> bool;

    /// Request a Smartlink reachability test for one radio.
    ///
    /// The outcome arrives on the [`subscribe_tests`] stream, not as a
    /// return value.
    ///
    /// [`subscribe_tests`]: DiscoveryGateway::subscribe_tests
    async fn request_test(&self, serial: &str);
}

/// The Smartlink credential exchange.
#[async_trait]
pub trait LoginService: Send + Sync {
    /// Attempt a login; returns `true` on success.
    async fn login(&self, user: &str, password: &str) -> bool;
}

/// The radio protocol handshake, teardown, and session binding.
#[async_trait]
pub trait ConnectionService: Send + Sync {
    /// Attempt to connect to the selected target.
    ///
    /// `preempt_handle` names an existing session on the radio to
    /// disconnect as part of taking over the exclusive channel.
    async fn connect(
        &self,
        target: &Pickable,
        kind: SessionKind,
        preempt_handle: Option<u32>,
        program_name: &str,
    ) -> Result<()>;

    /// Tear down the current connection.
    async fn disconnect(&self);

    /// Bind to an existing session by handle, or unbind with `None`.
    async fn bind(&self, handle: Option<u32>);
}

/// Audio stream acquisition and release for a connected session.
#[async_trait]
pub trait AudioService: Send + Sync {
    /// Request a receive audio stream; returns the stream id.
    async fn request_rx_stream(&self) -> Result<u32>;

    /// Release a previously requested stream.
    async fn release_stream(&self, stream_id: u32);

    /// Request a transmit audio stream; returns the stream id.
    ///
    /// Deployments without TX streaming return
    /// [`Error::Unsupported`](crate::Error::Unsupported); the gating and
    /// ordering contract still applies to them.
    async fn request_tx_stream(&self) -> Result<u32>;
}

/// Persistence of the two preferred-target slots.
///
/// One slot per [`SessionKind`]. A write replaces the slot's whole record
/// (or clears it with `None`); implementations must never leave a slot
/// partially written.
pub trait DefaultStore: Send + Sync {
    /// Read the persisted default for a slot.
    fn read(&self, kind: SessionKind) -> Option<DefaultSelection>;

    /// Write (or clear, with `None`) the persisted default for a slot.
    fn write(&self, kind: SessionKind, value: Option<DefaultSelection>);
}
