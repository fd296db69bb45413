use thiserror::Error;

/// Failures arising from analyzing or loading a source file. Kept separate from
/// [`common::error::EmError`] since none of these originate from the database layer; callers that
/// sit on top of a database connection fold this into their own error taxonomy at the boundary.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("File not found\n{0}")]
    FileNotFound(String),
    #[error("Path is not a file\n{0}")]
    NotAFile(String),
    #[error("No descriptors provided for file '{0}'")]
    EmptyDescriptorList(String),
    #[error("Unsupported file extension '{0}'")]
    UnsupportedExtension(String),
    #[error("Sub table '{0}' was not found in the source file")]
    MissingSubTable(String),
    #[error("Sub table is required for loader type '{0}'")]
    SubTableRequired(String),
    #[error("CSV error\n{0}")]
    Csv(#[from] csv::Error),
    #[error("Excel workbook error\n{0}")]
    Excel(String),
    #[error("DBF error\n{0}")]
    Dbf(#[from] dbase::Error),
    #[error("ODBC error\n{0}")]
    Odbc(String),
    #[error("IO error\n{0}")]
    IO(#[from] std::io::Error),
    #[error("Database error\n{0}")]
    Sql(#[from] sqlx::Error),
    #[error("{0}")]
    Generic(String),
}

pub type IngestionResult<T> = Result<T, IngestionError>;
