use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("authentication rejected (check the access token)")]
    Auth,
    #[error("entity not found: {0}")]
    NotFound(String),
    #[error("api error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("backend config: {0}")]
    Config(String),
    #[error("simulated failure: {0}")]
    Simulated(String),
}

pub type Result<T> = std::result::Result<T, RemoteError>;
