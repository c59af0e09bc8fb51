use thiserror::Error;

/// Transport-level failures reported by an execution client
///
/// These never carry order outcomes; outcomes arrive as events.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Client not connected")]
    NotConnected,
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Failures reported by a data gateway
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Subscription failed: {0}")]
    Subscription(String),

    #[error("Historical request failed: {0}")]
    Request(String),
}

pub type DataResult<T> = std::result::Result<T, DataError>;
