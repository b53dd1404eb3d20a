use thiserror::Error;

#[derive(Error, Debug)]
pub enum XenonError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("draw error: {0}")]
    Draw(String),

    #[error("terminal state error: {0}")]
    State(String),

    #[error("platform error: {0}")]
    Platform(String),
}

pub type Result<T> = std::result::Result<T, XenonError>;
