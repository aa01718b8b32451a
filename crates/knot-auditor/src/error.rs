use std::time::Duration;

use knot_common::gemini::GeminiClientError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    /// Bad user input, caught before any remote call.
    #[error("{0}")]
    Validation(String),

    #[error("failed to read document {path}: {source}")]
    Document {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("only PDF documents are accepted: {0}")]
    UnsupportedDocument(String),

    /// A session transition was requested from a state that does not allow it.
    #[error("{0}")]
    InvalidState(String),

    #[error("rule not found: {0}")]
    RuleNotFound(String),

    #[error("unknown preset: {0}")]
    UnknownPreset(String),

    #[error("a rule named '{0}' already exists")]
    DuplicateRule(String),

    #[error("analysis service error: {0}")]
    Remote(#[from] GeminiClientError),

    #[error("no response received from the analysis service")]
    EmptyResponse,

    #[error("analysis service blocked the request: {0}")]
    Blocked(String),

    /// The service answered, but not with the documented response shape.
    #[error("analysis response does not match the expected schema: {0}")]
    Schema(String),

    #[error("analysis rate limit exceeded: try again in ~{}s", .retry_after.as_secs().max(1))]
    RateLimited { retry_after: Duration },
}
