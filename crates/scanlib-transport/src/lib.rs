//! Transport implementations for scanlib.
//!
//! This crate provides [`SerialTransport`], the concrete
//! [`Transport`](scanlib_core::Transport) used to talk to a scanner over its
//! USB virtual COM port or an RS-232 cable.
//!
//! # Example
//!
//! ```no_run
//! use scanlib_transport::SerialTransport;
//! use scanlib_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> scanlib_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyUSB0", 57_600).await?;
//!
//! // Ask for the model name.
//! transport.send(b"MDL\r").await?;
//!
//! let mut buf = [0u8; 64];
//! let n = transport.receive(&mut buf, Duration::from_secs(1)).await?;
//! # Ok(())
//! # }
//! ```

pub mod serial;

pub use serial::{DataBits, FlowControl, Parity, SerialConfig, SerialTransport, StopBits};
