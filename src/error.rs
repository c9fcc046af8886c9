use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("invalid composition rule: {0}")]
    InvalidRule(String),

    #[error("failed to encode output image: {0}")]
    Encode(String),
}
