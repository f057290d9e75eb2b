//! Uniden BC246T remote-control backend for scanlib.
//!
//! This crate drives a BC246T over its serial remote-control protocol and
//! moves the scanner's memory to and from a portable JSON document. It
//! provides:
//!
//! - **Protocol codec** ([`protocol`]) -- encode comma-separated,
//!   CR-terminated commands and decode responses, recognising the `ERR` and
//!   `NG` failure replies.
//! - **Command builders** ([`commands`]) -- construct every command the
//!   driver uses and parse the corresponding responses.
//! - **Value types** ([`types`]) -- system types, modulations, key codes and
//!   the other enumerations that cross the wire.
//! - **Model definitions** ([`models`]) -- static capacity data for the
//!   BC246T.
//! - **Scanner driver** ([`scanner`]) -- request/response exchange,
//!   Program Mode sessions and typed wrappers for device settings.
//! - **Memory model** ([`memory`]) -- System, Group and Channel records and
//!   the operations that read, write, create and delete them.
//! - **Builder** ([`builder`]) -- fluent builder for [`Scanner`] instances.
//! - **Documents** ([`document`], [`defaults`], [`export`], [`import`]) --
//!   the portable memory document, its schema, default elision and the two
//!   transfer directions.
//!
//! # Example
//!
//! ```
//! use scanlib_uniden::protocol::{decode_response, DecodeResult};
//! use scanlib_uniden::commands::{cmd_read_model, parse_single};
//!
//! assert_eq!(cmd_read_model(), b"MDL\r");
//!
//! if let DecodeResult::Response { fields, .. } = decode_response(b"MDL,BC246T\r") {
//!     assert_eq!(parse_single(&fields).unwrap(), "BC246T");
//! }
//! ```

pub mod builder;
pub mod commands;
pub mod defaults;
pub mod document;
pub mod export;
pub mod import;
pub mod memory;
pub mod models;
pub mod protocol;
pub mod scanner;
pub mod types;

// Re-export the primary types for ergonomic `use scanlib_uniden::*`.
pub use builder::ScannerBuilder;
pub use document::{DeviceInfo, DeviceSettings, Document};
pub use export::{export, ExportOptions};
pub use import::{check_compatibility, import, Compatibility, ImportOptions, ImportReport};
pub use models::ScannerModel;
pub use scanner::Scanner;
