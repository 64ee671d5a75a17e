//! Error types shared across Glide crates.

/// Top-level error type for Glide operations.
#[derive(Debug, thiserror::Error)]
pub enum GlideError {
    /// The position source or the clock failed for one tick.
    #[error("Acquisition error: {message}")]
    Acquisition { message: String },

    /// A caller broke the API contract (bad alpha, use after dispose).
    #[error("Contract violation: {message}")]
    ContractViolation { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Platform error: {message}")]
    Platform { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using GlideError.
pub type GlideResult<T> = Result<T, GlideError>;

impl GlideError {
    pub fn acquisition(msg: impl Into<String>) -> Self {
        Self::Acquisition {
            message: msg.into(),
        }
    }

    pub fn contract_violation(msg: impl Into<String>) -> Self {
        Self::ContractViolation {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn platform(msg: impl Into<String>) -> Self {
        Self::Platform {
            message: msg.into(),
        }
    }

    /// Whether this error is recovered by skipping a single tick.
    pub fn is_acquisition(&self) -> bool {
        matches!(self, Self::Acquisition { .. })
    }

    /// Whether this error reports programmer misuse rather than a runtime condition.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::ContractViolation { .. })
    }
}
