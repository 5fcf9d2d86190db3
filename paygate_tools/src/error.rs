use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GatewayApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("The gateway did not respond in time: {0}")]
    Timeout(String),
    #[error("Could not reach the gateway: {0}")]
    Connection(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Unknown payment channel: {0}")]
    UnknownChannel(String),
    #[error("The gateway returned an empty response")]
    EmptyResponse,
}

impl GatewayApiError {
    /// Whether retrying the same request might succeed. Client errors (4xx) and unparseable responses are final.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Connection(_) => true,
            Self::QueryError { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GatewayApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_decode() {
            Self::JsonError(e.to_string())
        } else {
            Self::Connection(e.to_string())
        }
    }
}
