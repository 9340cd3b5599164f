use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to decode source image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode {format}: {message}")]
    Encode {
        format: &'static str,
        message: String,
    },

    #[error("invalid render target: {0}")]
    InvalidTarget(String),
}

impl RenderError {
    pub(crate) fn encode(format: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Encode {
            format,
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;
