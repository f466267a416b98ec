//! Scripted connection, login, and audio services plus an in-memory
//! default store.
//!
//! Every mock records its calls so tests can assert exact call counts
//! and arguments (e.g. "exactly one `release_stream` with the id the
//! request returned").

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use sdrlink_core::{
    AudioService, ConnectionService, DefaultSelection, DefaultStore, Error, LoginService,
    Pickable, Result, SessionKind,
};

// ---------------------------------------------------------------------------
// MockConnectionService
// ---------------------------------------------------------------------------

/// A recorded call to [`ConnectionService::connect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectCall {
    /// Serial of the target radio.
    pub serial: String,
    /// Station name, for shared sessions.
    pub station: Option<String>,
    /// Requested session kind.
    pub kind: SessionKind,
    /// Handle of the session to preempt, if any.
    pub preempt_handle: Option<u32>,
    /// Client program name.
    pub program_name: String,
}

#[derive(Debug, Default)]
struct ConnectionInner {
    connects: Vec<ConnectCall>,
    disconnects: u32,
    binds: Vec<Option<u32>>,
    fail_next: Option<String>,
}

/// A scripted [`ConnectionService`] that records all calls.
#[derive(Default)]
pub struct MockConnectionService {
    inner: Mutex<ConnectionInner>,
}

impl MockConnectionService {
    /// Create a service whose connect attempts succeed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next connect attempt fail with the given message.
    pub fn fail_next_connect(&self, message: &str) {
        self.inner.lock().unwrap().fail_next = Some(message.to_string());
    }

    /// All connect calls so far, in order.
    pub fn connects(&self) -> Vec<ConnectCall> {
        self.inner.lock().unwrap().connects.clone()
    }

    /// Number of disconnect calls so far.
    pub fn disconnects(&self) -> u32 {
        self.inner.lock().unwrap().disconnects
    }

    /// All bind calls so far, in order.
    pub fn binds(&self) -> Vec<Option<u32>> {
        self.inner.lock().unwrap().binds.clone()
    }
}

#[async_trait]
impl ConnectionService for MockConnectionService {
    async fn connect(
        &self,
        target: &Pickable,
        kind: SessionKind,
        preempt_handle: Option<u32>,
        program_name: &str,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.connects.push(ConnectCall {
            serial: target.radio.serial.clone(),
            station: target.station.clone(),
            kind,
            preempt_handle,
            program_name: program_name.to_string(),
        });
        match inner.fail_next.take() {
            Some(message) => Err(Error::ConnectFailed(message)),
            None => Ok(()),
        }
    }

    async fn disconnect(&self) {
        self.inner.lock().unwrap().disconnects += 1;
    }

    async fn bind(&self, handle: Option<u32>) {
        self.inner.lock().unwrap().binds.push(handle);
    }
}

// ---------------------------------------------------------------------------
// MockLoginService
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct LoginInner {
    accepts: bool,
    attempts: Vec<String>,
}

/// A scripted [`LoginService`] that records attempted identities.
pub struct MockLoginService {
    inner: Mutex<LoginInner>,
}

impl Default for MockLoginService {
    fn default() -> Self {
        Self::new(true)
    }
}

impl MockLoginService {
    /// Create a service that accepts or rejects every attempt.
    pub fn new(accepts: bool) -> Self {
        MockLoginService {
            inner: Mutex::new(LoginInner {
                accepts,
                attempts: Vec::new(),
            }),
        }
    }

    /// Script whether subsequent attempts succeed.
    pub fn set_accepts(&self, accepts: bool) {
        self.inner.lock().unwrap().accepts = accepts;
    }

    /// Identities attempted so far, in order.
    pub fn attempts(&self) -> Vec<String> {
        self.inner.lock().unwrap().attempts.clone()
    }
}

#[async_trait]
impl LoginService for MockLoginService {
    async fn login(&self, user: &str, _password: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        inner.attempts.push(user.to_string());
        inner.accepts
    }
}

// ---------------------------------------------------------------------------
// MockAudioService
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct AudioInner {
    rx_fails: bool,
    tx_supported: bool,
    requests: Vec<u32>,
    releases: Vec<u32>,
}

/// A scripted [`AudioService`] handing out sequential stream ids.
pub struct MockAudioService {
    inner: Mutex<AudioInner>,
    next_id: AtomicU32,
}

impl Default for MockAudioService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAudioService {
    /// Create a service whose RX requests succeed and whose TX requests
    /// are unsupported (matching typical deployments).
    pub fn new() -> Self {
        MockAudioService {
            inner: Mutex::new(AudioInner::default()),
            next_id: AtomicU32::new(0x0400_0001),
        }
    }

    /// Make RX stream requests fail.
    pub fn set_rx_fails(&self, fails: bool) {
        self.inner.lock().unwrap().rx_fails = fails;
    }

    /// Enable TX stream support.
    pub fn set_tx_supported(&self, supported: bool) {
        self.inner.lock().unwrap().tx_supported = supported;
    }

    /// Stream ids handed out so far, in order.
    pub fn requests(&self) -> Vec<u32> {
        self.inner.lock().unwrap().requests.clone()
    }

    /// Stream ids released so far, in order.
    pub fn releases(&self) -> Vec<u32> {
        self.inner.lock().unwrap().releases.clone()
    }
}

#[async_trait]
impl AudioService for MockAudioService {
    async fn request_rx_stream(&self) -> Result<u32> {
        let mut inner = self.inner.lock().unwrap();
        if inner.rx_fails {
            return Err(Error::StreamUnavailable("scripted failure".into()));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        inner.requests.push(id);
        Ok(id)
    }

    async fn release_stream(&self, stream_id: u32) {
        self.inner.lock().unwrap().releases.push(stream_id);
    }

    async fn request_tx_stream(&self) -> Result<u32> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.tx_supported {
            return Err(Error::Unsupported("TX audio streaming".into()));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        inner.requests.push(id);
        Ok(id)
    }
}

// ---------------------------------------------------------------------------
// MemoryDefaultStore
// ---------------------------------------------------------------------------

/// An in-memory [`DefaultStore`] recording every write.
#[derive(Default)]
pub struct MemoryDefaultStore {
    slots: Mutex<HashMap<SessionKind, DefaultSelection>>,
    writes: Mutex<Vec<(SessionKind, Option<DefaultSelection>)>>,
}

impl MemoryDefaultStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// All writes so far, in order.
    pub fn writes(&self) -> Vec<(SessionKind, Option<DefaultSelection>)> {
        self.writes.lock().unwrap().clone()
    }
}

impl DefaultStore for MemoryDefaultStore {
    fn read(&self, kind: SessionKind) -> Option<DefaultSelection> {
        self.slots.lock().unwrap().get(&kind).cloned()
    }

    fn write(&self, kind: SessionKind, value: Option<DefaultSelection>) {
        self.writes.lock().unwrap().push((kind, value.clone()));
        let mut slots = self.slots.lock().unwrap();
        match value {
            Some(v) => {
                slots.insert(kind, v);
            }
            None => {
                slots.remove(&kind);
            }
        }
    }
}
