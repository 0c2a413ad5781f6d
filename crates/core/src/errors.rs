use thiserror::Error;

/// Unified error type for the entire gold-egg-tracker-core library.
/// Every public fallible function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Storage / File ──────────────────────────────────────────────
    #[error("File I/O error: {0}")]
    FileIO(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ── Remote sources ──────────────────────────────────────────────
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("API error ({provider}): {message}")]
    Api {
        provider: String,
        message: String,
    },

    /// Every attempt (and every fallback date) was used up.
    #[error("{commodity} price not found")]
    PriceNotFound { commodity: String },

    // ── Notification ────────────────────────────────────────────────
    #[error("Mail error: {0}")]
    Mail(String),

    // ── Configuration ───────────────────────────────────────────────
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CoreError {
    /// True for the terminal "nothing usable after all retries" failure.
    pub fn is_price_not_found(&self) -> bool {
        matches!(self, CoreError::PriceNotFound { .. })
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors embed the full URL; the query string carries the
        // requested dates and is noise in the run's error list.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}

impl From<lettre::error::Error> for CoreError {
    fn from(e: lettre::error::Error) -> Self {
        CoreError::Mail(format!("Failed to build message: {e}"))
    }
}

impl From<lettre::address::AddressError> for CoreError {
    fn from(e: lettre::address::AddressError) -> Self {
        CoreError::Config(format!("Invalid mail address: {e}"))
    }
}

impl From<lettre::transport::smtp::Error> for CoreError {
    fn from(e: lettre::transport::smtp::Error) -> Self {
        CoreError::Mail(e.to_string())
    }
}
