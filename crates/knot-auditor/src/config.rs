use crate::error::AppError;

const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Auditor settings loaded from environment variables.
///
/// Client transport settings (API key, base URL, timeouts) are read separately by
/// `GeminiClientConfig::from_env`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Model id passed to `generateContent`.
    pub model: String,
    /// Sampling temperature, 0.0 to 2.0.
    pub temperature: f32,
    /// When set, MCP is served over TCP on this address instead of stdio.
    pub tcp_listen_addr: Option<String>,
}

impl Config {
    /// Optional:
    /// - `KNOT_MODEL` (default: "gemini-2.5-flash")
    /// - `KNOT_TEMPERATURE` (default: 0.2)
    /// - `MCP_TCP_LISTEN_ADDR`
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let model = lookup("KNOT_MODEL")
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let temperature = match lookup("KNOT_TEMPERATURE") {
            None => DEFAULT_TEMPERATURE,
            Some(raw) => {
                let value = raw.trim().parse::<f32>().map_err(|_| {
                    AppError::Config(format!("KNOT_TEMPERATURE is not a number: {raw}"))
                })?;
                if !(0.0..=2.0).contains(&value) {
                    return Err(AppError::Config(format!(
                        "KNOT_TEMPERATURE must be within 0.0..=2.0, got {value}"
                    )));
                }
                value
            }
        };

        let tcp_listen_addr = lookup("MCP_TCP_LISTEN_ADDR").filter(|a| !a.trim().is_empty());

        Ok(Self {
            model,
            temperature,
            tcp_listen_addr,
        })
    }
}
