//! Mock discovery gateway with injectable snapshots and pushable events.
//!
//! Tests load radios into the gateway, hand it to the orchestrator, and
//! then push discovery/client/test events to exercise the event-folding
//! paths without any network involvement.
//!
//! # Example
//!
//! ```
//! use sdrlink_core::{DiscoveryGateway, RadioInfo, RadioSource};
//! use sdrlink_test_harness::MockDiscoveryGateway;
//!
//! let gateway = MockDiscoveryGateway::new();
//! gateway.add_radio(RadioInfo {
//!     serial: "1234-5678".into(),
//!     source: RadioSource::Local,
//!     model: "FLEX-6600".into(),
//!     nickname: "Shack".into(),
//!     addr: None,
//!     remote_clients: Vec::new(),
//! });
//! assert_eq!(gateway.pickable_radios().len(), 1);
//! ```

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::broadcast;

use sdrlink_core::{
    ClientEvent, DefaultSelection, DiscoveryEvent, DiscoveryGateway, Pickable, RadioInfo,
    SessionKind, TestResult,
};

/// Broadcast capacity for each mock event stream.
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct Inner {
    radios: Vec<RadioInfo>,
    local_enabled: bool,
    relay_enabled: bool,
    relay_starts: bool,
    test_requests: Vec<String>,
}

/// A scripted [`DiscoveryGateway`] for tests.
pub struct MockDiscoveryGateway {
    inner: Mutex<Inner>,
    discovery_tx: broadcast::Sender<DiscoveryEvent>,
    client_tx: broadcast::Sender<ClientEvent>,
    test_tx: broadcast::Sender<TestResult>,
}

impl Default for MockDiscoveryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDiscoveryGateway {
    /// Create an empty gateway whose relay channel starts successfully.
    pub fn new() -> Self {
        let (discovery_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (client_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (test_tx, _) = broadcast::channel(EVENT_CAPACITY);
        MockDiscoveryGateway {
            inner: Mutex::new(Inner {
                relay_starts: true,
                ..Inner::default()
            }),
            discovery_tx,
            client_tx,
            test_tx,
        }
    }

    /// Add a radio to the discovery snapshot.
    pub fn add_radio(&self, radio: RadioInfo) {
        self.inner.lock().unwrap().radios.push(radio);
    }

    /// Remove a radio from the discovery snapshot.
    pub fn remove_radio(&self, serial: &str) {
        self.inner.lock().unwrap().radios.retain(|r| r.serial != serial);
    }

    /// Script whether `set_relay_mode(true, ..)` succeeds.
    pub fn set_relay_starts(&self, starts: bool) {
        self.inner.lock().unwrap().relay_starts = starts;
    }

    /// Serials for which a Smartlink test was requested, in order.
    pub fn test_requests(&self) -> Vec<String> {
        self.inner.lock().unwrap().test_requests.clone()
    }

    /// Current local/relay mode flags, as last configured.
    pub fn modes(&self) -> (bool, bool) {
        let inner = self.inner.lock().unwrap();
        (inner.local_enabled, inner.relay_enabled)
    }

    /// Push a discovery event to all subscribers.
    pub fn push_discovery(&self, event: DiscoveryEvent) {
        let _ = self.discovery_tx.send(event);
    }

    /// Push a client-change event to all subscribers.
    pub fn push_client(&self, event: ClientEvent) {
        let _ = self.client_tx.send(event);
    }

    /// Push a test result to all subscribers.
    pub fn push_test(&self, result: TestResult) {
        let _ = self.test_tx.send(result);
    }
}

#[async_trait]
impl DiscoveryGateway for MockDiscoveryGateway {
    fn subscribe_discovery(&self) -> broadcast::Receiver<DiscoveryEvent> {
        self.discovery_tx.subscribe()
    }

    fn subscribe_clients(&self) -> broadcast::Receiver<ClientEvent> {
        self.client_tx.subscribe()
    }

    fn subscribe_tests(&self) -> broadcast::Receiver<TestResult> {
        self.test_tx.subscribe()
    }

    fn pickable_radios(&self) -> Vec<Pickable> {
        self.inner
            .lock()
            .unwrap()
            .radios
            .iter()
            .map(|radio| Pickable {
                radio: radio.clone(),
                station: None,
            })
            .collect()
    }

    fn pickable_stations(&self) -> Vec<Pickable> {
        let inner = self.inner.lock().unwrap();
        let mut stations = Vec::new();
        for radio in &inner.radios {
            for client in &radio.remote_clients {
                stations.push(Pickable {
                    radio: radio.clone(),
                    station: Some(client.station.clone()),
                });
            }
        }
        stations
    }

    fn find_default(&self, default: &DefaultSelection, kind: SessionKind) -> Option<Pickable> {
        let candidates = match kind {
            SessionKind::Exclusive => self.pickable_radios(),
            SessionKind::Shared => self.pickable_stations(),
        };
        candidates.into_iter().find(|p| default.matches(p))
    }

    async fn set_local_mode(&self, enabled: bool) {
        self.inner.lock().unwrap().local_enabled = enabled;
    }

    async fn set_relay_mode(&self, enabled: bool, _user: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if enabled && !inner.relay_starts {
            inner.relay_enabled = false;
            return false;
        }
        inner.relay_enabled = enabled;
        true
    }

    async fn request_test(&self, serial: &str) {
        self.inner.lock().unwrap().test_requests.push(serial.to_string());
    }
}
