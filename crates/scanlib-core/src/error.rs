//! Error types for scanlib.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport failures, device-reported
//! failures, protocol decode errors and record-graph corruption are all
//! captured here.

/// The error type for all scanlib operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port could not be opened, etc.).
    #[error("transport error: {0}")]
    Transport(String),

    /// Timed out waiting for a response from the scanner.
    ///
    /// This typically indicates the scanner is powered off or the baud rate
    /// is wrong. The in-flight command is not retried.
    #[error("timeout waiting for response")]
    Timeout,

    /// The scanner answered `ERR`: the command format or one of its values
    /// was not acceptable.
    #[error("command format or value error ({command})")]
    Rejected {
        /// The command that was rejected, or `"?"` if it was not echoed.
        command: String,
    },

    /// The scanner answered `NG`: the command is not valid in the current
    /// mode (e.g. issued outside Program Mode).
    #[error("command invalid in current device mode ({command})")]
    InvalidState {
        /// The command that was refused, or `"?"` if it was not echoed.
        command: String,
    },

    /// The response did not echo the requested command or one of its
    /// fields could not be decoded.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// A create/append command returned the `-1` index: the scanner's
    /// memory is exhausted.
    #[error("out of resources: scanner memory is full")]
    OutOfResources,

    /// A record chain did not terminate within its hop bound or its links
    /// were not symmetric.
    #[error("inconsistent record chain: {0}")]
    InconsistentChain(String),

    /// An invalid parameter was passed to a scanner command. Nothing was
    /// sent to the device.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A portable document could not be decoded or failed schema
    /// validation.
    #[error("document error: {0}")]
    Document(String),

    /// No connection to the scanner has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the scanner was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_timeout() {
        assert_eq!(Error::Timeout.to_string(), "timeout waiting for response");
    }

    #[test]
    fn error_display_rejected() {
        let e = Error::Rejected {
            command: "CSY".into(),
        };
        assert_eq!(e.to_string(), "command format or value error (CSY)");
    }

    #[test]
    fn error_display_invalid_state() {
        let e = Error::InvalidState {
            command: "SIN".into(),
        };
        assert_eq!(e.to_string(), "command invalid in current device mode (SIN)");
    }

    #[test]
    fn error_display_out_of_resources() {
        assert_eq!(
            Error::OutOfResources.to_string(),
            "out of resources: scanner memory is full"
        );
    }

    #[test]
    fn error_display_inconsistent_chain() {
        let e = Error::InconsistentChain("system chain exceeds 3 hops".into());
        assert_eq!(
            e.to_string(),
            "inconsistent record chain: system chain exceeds 3 hops"
        );
    }

    #[test]
    fn error_display_invalid_parameter() {
        let e = Error::InvalidParameter("quick key out of range".into());
        assert_eq!(e.to_string(), "invalid parameter: quick key out of range");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("pipe broken"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
