use thiserror::Error;

/// Infrastructure-level error types shared across the workspace. Domain-specific errors (bad
/// requests, missing records, authorization failures, conflicting task state) are layered on top
/// of this type by `pipeline_engine::error::Error` and `ingest::IngestionError`.
#[derive(Error, Debug)]
pub enum EmError {
    #[error("Generic SQL error\n{0}")]
    Sql(#[from] sqlx::Error),
    #[error("SQL Error during transaction commit\n{0}")]
    CommitError(sqlx::Error),
    #[error("SQL Error during transaction rollback\n{orig}\nOriginal Error\n{new}")]
    RollbackError { orig: sqlx::Error, new: sqlx::Error },
    #[error("MessagePack encode error\n{0}")]
    RmpEncode(#[from] rmp_serde::encode::Error),
    #[error("MessagePack decode error\n{0}")]
    RmpDecode(#[from] rmp_serde::decode::Error),
    #[error("Json serde error\n{0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("Generic error\n{0}")]
    Generic(String),
    #[error("Notification payload parse error\nNotification: `{0}`")]
    PayloadParseError(String),
    #[error("{0}")]
    ParseInt(#[from] std::num::ParseIntError),
    #[error("Environment variable error\n{0}")]
    EnvVar(#[from] std::env::VarError),
    #[error("IO error\n{0}")]
    IO(#[from] std::io::Error),
    #[error("Record cannot be found for `{pk}`")]
    MissingRecord { pk: String },
    #[error("Contents of request '{request}' were not valid.\nReason: {reason}")]
    InvalidRequest { request: String, reason: String },
}

impl From<&str> for EmError {
    fn from(value: &str) -> Self {
        Self::Generic(value.to_owned())
    }
}

impl From<String> for EmError {
    fn from(value: String) -> Self {
        Self::Generic(value)
    }
}

impl<R> From<(&R, String)> for EmError
where
    R: std::fmt::Debug,
{
    fn from(value: (&R, String)) -> Self {
        Self::InvalidRequest {
            request: format!("{:?}", value.0),
            reason: value.1,
        }
    }
}

/// Generic [Result] type where the error is always [EmError]
pub type EmResult<T> = Result<T, EmError>;
