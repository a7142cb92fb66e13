use std::sync::Arc;

use thiserror::Error;

/// Represents a result type for operations in the delivery core.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum representing possible errors that can occur while talking to the delivery service.
///
/// None of these errors are fatal: the client stays usable after any of them, with session and
/// cache state left consistent.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// No configuration has been received yet.
    #[error("configuration missing")]
    ConfigurationMissing,

    /// Configured client code is missing or empty.
    #[error("client code was empty")]
    ClientCodeEmpty,

    /// Privacy status is not opted in.
    #[error("privacy status is not opted in")]
    OptedOut,

    /// There are no mboxes and no buffered notifications to send.
    #[error("no mboxes or notifications to send")]
    EmptyRequest,

    /// The requested mbox was neither prefetched nor loaded, so there are no tokens to report.
    #[error("no cached mbox found for {0:?}")]
    MboxNotCached(String),

    /// Delivery URL could not be built from the configured host.
    #[error("invalid delivery url")]
    InvalidUrl(#[source] url::ParseError),

    /// Connection, timeout or other transport-level failure.
    #[error("network error: {0}")]
    Network(Arc<dyn std::error::Error + Send + Sync>),

    /// The service answered but reported an error. State updates carried by the response are
    /// still applied.
    #[error("errors returned in response (status {status}): {message}")]
    Application {
        /// HTTP status code of the response.
        status: u16,
        /// Error message reported by the service.
        message: String,
    },

    /// Response body could not be parsed.
    #[error("response parser initialization failed")]
    ResponseParse(#[source] Arc<serde_json::Error>),

    /// Indicates that the intake thread panicked. This should normally never happen.
    #[error("intake thread panicked")]
    IntakeThreadPanicked,

    /// The intake thread is no longer accepting requests.
    #[error("intake thread stopped")]
    IntakeThreadStopped,

    /// OS-level failure, e.g. the intake thread could not be spawned.
    #[error(transparent)]
    Io(Arc<std::io::Error>),
}

/// Coarse classification of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any I/O because of configuration or privacy.
    Configuration,
    /// Rejected before any I/O because there was nothing to send.
    EmptyInput,
    /// The round trip did not complete. No state was mutated.
    Transport,
    /// The service reported an error. Partial state updates were applied.
    Application,
    /// The response body was undecodable. No state was mutated.
    Parse,
}

impl Error {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ConfigurationMissing
            | Error::ClientCodeEmpty
            | Error::OptedOut
            | Error::InvalidUrl(_) => ErrorKind::Configuration,

            Error::EmptyRequest | Error::MboxNotCached(_) => ErrorKind::EmptyInput,

            Error::Network(_)
            | Error::IntakeThreadPanicked
            | Error::IntakeThreadStopped
            | Error::Io(_) => ErrorKind::Transport,

            Error::Application { .. } => ErrorKind::Application,

            Error::ResponseParse(_) => ErrorKind::Parse,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Network(Arc::new(value.without_url()))
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(Arc::new(value))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::ResponseParse(Arc::new(value))
    }
}
