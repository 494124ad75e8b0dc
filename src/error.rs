//! Typed errors at the seams where callers branch on the failure.
//!
//! Everything above these seams uses `anyhow::Result` with context chains.

use thiserror::Error;

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Feed errors ─────────────────────────────────────────────────────────────

/// A single failed fetch. Pollers log these and skip the cycle.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("{feed} request failed: {message}")]
    Request { feed: &'static str, message: String },

    #[error("{feed} returned HTTP {status}: {body}")]
    Status {
        feed: &'static str,
        status: u16,
        body: String,
    },

    #[error("{feed} API error {code}: {message}")]
    Api {
        feed: &'static str,
        code: i64,
        message: String,
    },

    #[error("{feed} response malformed: {message}")]
    Decode { feed: &'static str, message: String },
}

// ─── Transport errors ───────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("discord send failed: {0}")]
    Send(String),

    #[error("discord gateway: {0}")]
    Gateway(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_missing_displays_key() {
        let err = ConfigError::Missing("DISCORD_TOKEN");
        assert!(err.to_string().contains("DISCORD_TOKEN"));
    }

    #[test]
    fn feed_api_error_displays_code() {
        let err = FeedError::Api {
            feed: "torn",
            code: 2,
            message: "Incorrect key".into(),
        };
        let text = err.to_string();
        assert!(text.contains("torn API error 2"));
        assert!(text.contains("Incorrect key"));
    }

    #[test]
    fn typed_errors_survive_anyhow_context() {
        let err = anyhow::Error::from(TransportError::Gateway("closed before Hello".into()))
            .context("connect");
        assert!(matches!(
            err.downcast_ref::<TransportError>(),
            Some(TransportError::Gateway(_))
        ));
    }
}
