pub mod types;
pub mod normalizer;

pub use types::*;
pub use normalizer::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Invalid image upload: {0}")]
    InvalidInput(String),

    #[error("Invalid compression options: {0}")]
    InvalidOptions(String),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("JPEG encoding failed: {0}")]
    Encode(String),

    #[error("Image worker failed: {0}")]
    Worker(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
