//! sdrlink-test-harness: Mock collaborators for deterministic testing of
//! the Connection Orchestrator.
//!
//! This crate provides [`MockDiscoveryGateway`] for injecting discovery
//! snapshots and pushing events onto the orchestrator's subscriptions,
//! plus scripted [`MockConnectionService`], [`MockLoginService`],
//! [`MockAudioService`], and [`MemoryDefaultStore`] implementations that
//! record every call for assertion.

pub mod mock_gateway;
pub mod mock_services;

pub use mock_gateway::MockDiscoveryGateway;
pub use mock_services::{
    ConnectCall, MemoryDefaultStore, MockAudioService, MockConnectionService, MockLoginService,
};
