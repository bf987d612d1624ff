use thiserror::Error;

/// Engine-level failures surfaced to the tool layer with stable codes.
///
/// Individual source failures never become a `NexusError`; they are folded
/// into the ladder result and the metrics. A request fails outright only for
/// the variants below.
#[derive(Debug, Error)]
pub enum NexusError {
    #[error("bad input: {0}")]
    BadInput(String),

    #[error("no configured site matched: {0}")]
    NoMatch(String),

    #[error("rate limit exceeded for '{domain}', retry in {retry_after_secs}s")]
    RateLimited { domain: String, retry_after_secs: u64 },

    #[error("every source failed for '{0}'")]
    UpstreamUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl NexusError {
    /// Stable machine-readable code, serialized in error payloads.
    pub fn code(&self) -> &'static str {
        match self {
            NexusError::BadInput(_) => "bad_input",
            NexusError::NoMatch(_) => "no_match",
            NexusError::RateLimited { .. } => "rate_limited",
            NexusError::UpstreamUnavailable(_) => "upstream_unavailable",
            NexusError::Internal(_) => "internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, NexusError>;
