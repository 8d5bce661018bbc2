use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShapeError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid font: {0}")]
    Font(String),

    #[error("Empty frame: {width}x{height}")]
    EmptyFrame { width: u32, height: u32 },

    #[error("Invalid detector configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ShapeError>;
