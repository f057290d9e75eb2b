//! scanlib-core: Core traits, types, and error definitions for scanlib.
//!
//! This crate defines the device-agnostic pieces that the scanner drivers
//! build on. Applications can depend on these types without pulling in a
//! specific driver or the serial port stack.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level communication channel
//! - [`Index`] -- a device memory address, with `-1` decoded to `None`
//! - [`QuickKey`] / [`Frequency`] -- bounded scalar values used on the wire
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod transport;
pub mod types;

// Re-export key types at crate root for ergonomic `use scanlib_core::*`.
pub use error::{Error, Result};
pub use transport::Transport;
pub use types::*;
