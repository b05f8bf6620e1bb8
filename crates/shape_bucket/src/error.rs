use thiserror::Error;

/// Errors raised while reading style, sprite or transfer input.
///
/// Bucket construction itself never fails; bad geometry is dropped instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid bucket configuration: {0}")]
    Config(String),

    #[error("invalid style: {0}")]
    Style(String),

    #[error("invalid filter: {0}")]
    Filter(String),

    #[error("invalid color {0:?}")]
    Color(String),

    #[error("invalid sprite index: {0}")]
    Sprite(String),

    #[error("invalid bucket transfer data: {0}")]
    Transfer(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
