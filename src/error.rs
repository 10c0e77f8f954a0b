use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("{0}")]
    Transport(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CatalogError::Transport(format!("Request timed out: {}", err))
        } else if err.is_decode() {
            CatalogError::Transport(format!("Malformed response body: {}", err))
        } else {
            CatalogError::Transport(format!("Request failed: {}", err))
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Transport(format!("JSON parse failed: {}", err))
    }
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
