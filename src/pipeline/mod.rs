pub mod imaging; // Upload compression before transmission
pub mod request; // Form validation + payload assembly
pub mod transport; // Inference service client
pub mod response; // Response layouts -> display models

use thiserror::Error;

use imaging::ImageError;
use request::ValidationError;
use transport::TransportError;

/// Anything that can stop a panel submission.
#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("A request is already in progress")]
    Busy,
}
