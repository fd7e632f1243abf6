use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    /// Blank or missing message text, or an unusable push subscription.
    #[error("{0}")]
    InvalidInput(&'static str),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// One live connection or push endpoint could not be reached.
    #[error("delivery failed: {0}")]
    DeliveryFailure(String),

    #[error("malformed stored record: {0}")]
    MalformedStoredRecord(#[from] serde_json::Error),

    /// The push service reported the subscription as permanently invalid.
    #[error("push subscription is gone")]
    SubscriptionGone,
}

impl From<sqlx::Error> for ChatError {
    fn from(err: sqlx::Error) -> Self {
        Self::StorageUnavailable(err.to_string())
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        Self::DeliveryFailure(err.to_string())
    }
}
