//! Bus error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus connection to `{url}` failed: {reason}")]
    Connect { url: String, reason: String },

    #[error("publish on `{subject}` failed: {reason}")]
    Publish { subject: String, reason: String },

    #[error("subscribe to `{pattern}` failed: {reason}")]
    Subscribe { pattern: String, reason: String },

    #[error("malformed payload on `{subject}`")]
    Decode {
        subject: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("payload encoding failed")]
    Encode(#[from] serde_json::Error),
}
