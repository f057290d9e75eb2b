//! scanlib-test-harness: Test utilities for scanlib.
//!
//! This crate provides [`MockTransport`] for scripted, byte-exact testing of
//! the protocol engine, and [`SimulatedScanner`], an in-memory BC246T that
//! answers the full remote-control command set so export and import can be
//! exercised end to end without hardware.

pub mod mock_serial;
pub mod sim;

pub use mock_serial::MockTransport;
pub use sim::SimulatedScanner;
