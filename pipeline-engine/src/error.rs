use common::api::{ApiContentFormat, ApiResponse};
use common::error::EmError;
use ingest::error::IngestionError;
use log::{error, warn};
use serde::Serialize;
use thiserror::Error;

/// Domain error taxonomy layered on top of [`EmError`]. `?` composes across the two layers via
/// the `From` impls below.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Storage error\n{0}")]
    StorageError(#[from] EmError),
    #[error("Ingestion error\n{0}")]
    IngestionError(#[from] IngestionError),
}

impl From<sqlx::Error> for Error {
    fn from(value: sqlx::Error) -> Self {
        Self::StorageError(value.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Convert into a wire-level [`ApiResponse`], the only place an [`Error`] becomes an HTTP
    /// response body. `BadRequest`/`NotFound`/`Unauthorized`/`Conflict` are surfaced to the caller
    /// verbatim; `StorageError`/`IngestionError` are logged in full and downgraded to an opaque
    /// message, matching the propagation policy in §7.
    pub fn into_response<T: Serialize>(self, format: ApiContentFormat) -> ApiResponse<T> {
        match self {
            Error::BadRequest(message) | Error::NotFound(message) | Error::Unauthorized(message) | Error::Conflict(message) => {
                warn!("{message}");
                ApiResponse::failure(message, format)
            }
            Error::StorageError(_) | Error::IngestionError(_) => {
                error!("{self}");
                ApiResponse::failure(
                    "Could not perform the required action due to an internal error",
                    format,
                )
            }
        }
    }
}
