//! Delivery error taxonomy.
//!
//! Every per-subscriber failure is one of these variants. The dispatcher
//! catches them at the task boundary and folds them into the failed count;
//! only store and configuration failures reach callers (as `anyhow::Error`).

// Rust guideline compliant 2026-02

/// Errors that can occur while preparing or delivering one push message.
#[derive(Debug)]
pub enum PushError {
    /// Malformed base64url or key material of the wrong length.
    Encoding(String),
    /// Key import, key derivation, signing or AEAD failure.
    Crypto(String),
    /// Network or connection failure talking to the push service.
    Transport(String),
    /// Push service answered with a non-2xx status other than 410.
    Rejected {
        /// HTTP status code returned by the push service.
        status: u16,
        /// Response body, if any (diagnostics only).
        body: String,
    },
    /// Push service answered 410: the subscription no longer exists.
    Gone,
}

impl PushError {
    /// HTTP-style status code for this error, as reported in a delivery outcome.
    ///
    /// Failures that never reached the push service report `0`.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Rejected { status, .. } => *status,
            Self::Gone => 410,
            Self::Encoding(_) | Self::Crypto(_) | Self::Transport(_) => 0,
        }
    }
}

impl std::fmt::Display for PushError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encoding(msg) => write!(f, "Encoding error: {msg}"),
            Self::Crypto(msg) => write!(f, "Crypto error: {msg}"),
            Self::Transport(msg) => write!(f, "Transport error: {msg}"),
            Self::Rejected { status, body } if body.is_empty() => {
                write!(f, "Push service rejected message (HTTP {status})")
            }
            Self::Rejected { status, body } => {
                write!(f, "Push service rejected message (HTTP {status}): {body}")
            }
            Self::Gone => write!(f, "Subscription gone (HTTP 410)"),
        }
    }
}

impl std::error::Error for PushError {}

impl From<reqwest::Error> for PushError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
