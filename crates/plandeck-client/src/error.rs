// Client Error Types
// Feature: Streaming Chat (031-streaming-chat)

use thiserror::Error;

/// Plandeck client error
#[derive(Error, Debug)]
pub enum ClientError {
    /// Request reached the server but came back non-2xx
    #[error("request failed with status {status}: {body}")]
    Network { status: u16, body: String },

    /// Request never reached the server
    #[error("cannot connect to server: {0}")]
    Connection(String),

    /// Request or stream timed out
    #[error("server response timeout")]
    Timeout,

    /// Stream payload could not be parsed
    #[error("stream payload parse error: {0}")]
    StreamParse(String),

    /// The server reported an error inside the stream
    #[error("stream error: {0}")]
    Api(String),

    /// The caller cancelled the session (not a failure)
    #[error("request cancelled")]
    Cancelled,

    /// Accept/save/delete call failed; pending state is preserved
    #[error("failed to persist change: {0}")]
    Persistence(String),

    /// Invalid caller input
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_connect() {
            ClientError::Connection(err.to_string())
        } else {
            ClientError::Api(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::StreamParse(err.to_string())
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Stable error code for host-application dispatch
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::Network { .. } => "NETWORK_ERROR",
            ClientError::Connection(_) => "CONNECTION_FAILED",
            ClientError::Timeout => "TIMEOUT",
            ClientError::StreamParse(_) => "STREAM_PARSE_ERROR",
            ClientError::Api(_) => "API_ERROR",
            ClientError::Cancelled => "CANCELLED",
            ClientError::Persistence(_) => "PERSISTENCE_ERROR",
            ClientError::InvalidInput(_) => "INVALID_INPUT",
        }
    }

    /// Whether this error represents a user-initiated cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }
}

impl From<ClientError> for String {
    fn from(err: ClientError) -> Self {
        err.to_string()
    }
}
