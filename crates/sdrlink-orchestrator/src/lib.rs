//! sdrlink-orchestrator: the Connection Orchestrator for sdrlink.
//!
//! This crate turns the raw discovery and event streams of
//! [`sdrlink_core`] into a single, consistent connection lifecycle. It
//! owns the [`ConnectionStatus`](sdrlink_core::ConnectionStatus) state
//! machine, arbitrates conflicting sessions, drives the Smartlink login
//! flow, and gates audio streaming on connection state.
//!
//! # Architecture
//!
//! Every inbound signal -- user intents, discovery/client/test/log
//! subscription events, and one-shot service outcomes -- is an
//! [`Action`] on one serialized queue. A single task applies actions in
//! arrival order, so no two lifecycle transitions ever race. Blocking
//! service calls run as spawned tasks that report exactly one completion
//! action back into the queue.
//!
//! # Example
//!
//! ```no_run
//! use sdrlink_orchestrator::{spawn, Services, Settings};
//! # fn services() -> Services { unimplemented!() }
//!
//! # async fn example() {
//! let handle = spawn(services(), Settings::default(), None);
//! handle.connect_toggle();
//! let state = handle.state();
//! println!("status: {}", state.status);
//! # }
//! ```

pub mod action;
pub mod arbitration;
pub mod orchestrator;
pub mod state;

pub use action::Action;
pub use arbitration::{Disposition, arbitrate};
pub use orchestrator::{Orchestrator, OrchestratorHandle, Services, spawn};
pub use state::{Settings, State};
