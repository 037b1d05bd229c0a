use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not authenticated")]
    Unauthorized,

    #[error("Notification not found")]
    NotFound,

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },
}

pub type ClientResult<T> = Result<T, ClientError>;
