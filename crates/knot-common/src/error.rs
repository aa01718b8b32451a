/// Error types shared by the Knot crates.
///
/// These cover infrastructure concerns (configuration of the hosted model client).
/// Binary crates surface `CommonError` from `main` through `anyhow`; their own
/// application errors do not wrap it.

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("config error: {0}")]
    Config(String),
}
