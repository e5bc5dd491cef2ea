// rzpchat-core/src/errors.rs
use thiserror::Error;

/// Number of body characters kept in [`DispatchError::Parse`] for diagnostics.
pub const BODY_SNIPPET_CHARS: usize = 200;

/// Errors raised while talking to the MCP or documentation-search endpoints.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Credentials or endpoint settings are missing or invalid.
    #[error("Configuration Error: {0}")]
    Config(String),

    /// The request never produced a response (DNS, TLS, refused connection...).
    #[error("Connection to {endpoint} failed: {source}")]
    Connection {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The request did not complete within the configured timeout.
    #[error("Request to {endpoint} timed out after {seconds}s")]
    Timeout { endpoint: String, seconds: u64 },

    /// Non-success HTTP status with a body that is not a JSON-RPC envelope.
    #[error("HTTP {status} from {endpoint}: {snippet}")]
    Http {
        endpoint: String,
        status: u16,
        snippet: String,
    },

    /// The response body could not be understood.
    #[error("Failed to parse response: {source}. Raw response: {snippet}")]
    Parse {
        #[source]
        source: serde_json::Error,
        snippet: String,
    },

    /// A well-formed error reported by the remote service.
    #[error("Remote error{}: {message}", code_suffix(.code))]
    Remote { code: Option<i64>, message: String },
}

impl DispatchError {
    pub fn config(msg: impl Into<String>) -> Self {
        DispatchError::Config(msg.into())
    }

    pub fn parse(source: serde_json::Error, body: &str) -> Self {
        DispatchError::Parse {
            source,
            snippet: snippet(body),
        }
    }
}

fn code_suffix(code: &Option<i64>) -> String {
    code.map(|c| format!(" {}", c)).unwrap_or_default()
}

/// First [`BODY_SNIPPET_CHARS`] characters of a response body.
pub fn snippet(body: &str) -> String {
    body.chars().take(BODY_SNIPPET_CHARS).collect()
}
