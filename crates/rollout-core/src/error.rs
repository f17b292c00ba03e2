use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("migration directory not found: {0}")]
    DirectoryNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
