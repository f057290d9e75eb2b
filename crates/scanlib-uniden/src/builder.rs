//! ScannerBuilder -- fluent builder for constructing [`Scanner`] instances.
//!
//! # Example
//!
//! ```no_run
//! use scanlib_uniden::builder::ScannerBuilder;
//! use scanlib_uniden::models::bc246t;
//! use std::time::Duration;
//!
//! # async fn example() -> scanlib_core::Result<()> {
//! let scanner = ScannerBuilder::new(bc246t())
//!     .serial_port("/dev/ttyUSB0")
//!     .command_timeout(Duration::from_millis(800))
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use scanlib_core::error::{Error, Result};
use scanlib_core::transport::Transport;

use crate::models::ScannerModel;
use crate::scanner::Scanner;

/// Default time to wait for each chunk of a reply.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(1);

/// Fluent builder for [`Scanner`].
pub struct ScannerBuilder {
    model: ScannerModel,
    serial_port: Option<String>,
    baud_rate: Option<u32>,
    command_timeout: Duration,
}

impl ScannerBuilder {
    /// Create a new builder for the given model.
    pub fn new(model: ScannerModel) -> Self {
        ScannerBuilder {
            model,
            serial_port: None,
            baud_rate: None,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyUSB0` or `COM3`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the model's default baud rate.
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = Some(baud);
        self
    }

    /// Set the timeout for waiting on a reply (default: 1s).
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Build a [`Scanner`] with a caller-provided transport.
    ///
    /// This is the entry point for tests (pass a `MockTransport` or
    /// `SimulatedScanner` from `scanlib-test-harness`).
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<Scanner> {
        if self.command_timeout.is_zero() {
            return Err(Error::InvalidParameter(
                "command_timeout must be greater than zero".into(),
            ));
        }
        Ok(Scanner::new(transport, self.model, self.command_timeout))
    }

    /// Build a [`Scanner`] on a serial port.
    ///
    /// Requires [`serial_port()`](Self::serial_port). The baud rate defaults
    /// to the model's default if not overridden.
    pub async fn build(self) -> Result<Scanner> {
        let port = self
            .serial_port
            .as_ref()
            .ok_or_else(|| Error::InvalidParameter("serial_port is required for build()".into()))?;
        let baud = self.baud_rate.unwrap_or(self.model.default_baud_rate);

        let transport = scanlib_transport::SerialTransport::open(port, baud).await?;
        self.build_with_transport(Box::new(transport)).await
    }
}
