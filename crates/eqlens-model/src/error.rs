use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Download failed: {0}")]
    Download(String),

    #[error("Tokenization failed: {0}")]
    Tokenization(String),

    #[error("Invalid model config: {0}")]
    Config(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error(transparent)]
    Candle(#[from] candle_core::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<hf_hub::api::sync::ApiError> for ModelError {
    fn from(value: hf_hub::api::sync::ApiError) -> Self {
        ModelError::Download(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
