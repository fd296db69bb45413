//! Format-agnostic file-ingestion engine: analyze a source file to learn its columns and record
//! count, then load it into the database through a single streaming COPY abstraction. Dispatch
//! between the four supported formats (Flat, Excel, MDB, DBF) is driven entirely by the source
//! file's extension.

pub mod analyze;
pub mod copy_sink;
pub mod error;
pub mod formats;
pub mod load;
pub mod normalize;

use std::path::Path;

use error::{IngestionError, IngestionResult};

/// Loader backend a [`formats::AnalyzeDescriptor`]/[`load::LoaderDescriptor`] dispatches to,
/// derived from the source file's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "loader_type", rename_all = "UPPERCASE")]
pub enum LoaderType {
    Flat,
    Excel,
    Mdb,
    Dbf,
}

impl LoaderType {
    /// Resolve the loader type from a file name's extension. `.csv`/`.txt` -> Flat,
    /// `.xls`/`.xlsx` -> Excel, `.mdb`/`.accdb` -> Mdb, `.dbf` -> Dbf; anything else is rejected.
    pub fn from_file_name(file_name: &str) -> IngestionResult<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| IngestionError::UnsupportedExtension(file_name.to_owned()))?;
        match extension.as_str() {
            "csv" | "txt" => Ok(Self::Flat),
            "xls" | "xlsx" => Ok(Self::Excel),
            "mdb" | "accdb" => Ok(Self::Mdb),
            "dbf" => Ok(Self::Dbf),
            other => Err(IngestionError::UnsupportedExtension(other.to_owned())),
        }
    }

    /// Whether this loader type requires a `sub_table` to be specified (Excel sheet / MDB table).
    pub fn requires_sub_table(self) -> bool {
        matches!(self, Self::Excel | Self::Mdb)
    }
}

/// Validate that `path` exists, is a regular file, and that `descriptors` is non-empty, before any
/// I/O against the file is attempted. Shared by [`analyze::analyze_file`]-style entry points in
/// the `pipeline-engine` crate and by [`load`] callers.
pub fn validate_descriptors<T>(path: &Path, descriptors: &[T]) -> IngestionResult<()> {
    if !path.exists() {
        return Err(IngestionError::FileNotFound(path.display().to_string()));
    }
    if !path.is_file() {
        return Err(IngestionError::NotAFile(path.display().to_string()));
    }
    if descriptors.is_empty() {
        return Err(IngestionError::EmptyDescriptorList(
            path.display().to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::LoaderType;

    #[test]
    fn from_file_name_maps_known_extensions() {
        assert_eq!(LoaderType::from_file_name("a.csv").unwrap(), LoaderType::Flat);
        assert_eq!(LoaderType::from_file_name("a.txt").unwrap(), LoaderType::Flat);
        assert_eq!(LoaderType::from_file_name("a.xls").unwrap(), LoaderType::Excel);
        assert_eq!(LoaderType::from_file_name("a.xlsx").unwrap(), LoaderType::Excel);
        assert_eq!(LoaderType::from_file_name("a.mdb").unwrap(), LoaderType::Mdb);
        assert_eq!(LoaderType::from_file_name("a.accdb").unwrap(), LoaderType::Mdb);
        assert_eq!(LoaderType::from_file_name("a.dbf").unwrap(), LoaderType::Dbf);
    }

    #[test]
    fn from_file_name_rejects_unsupported_extensions() {
        assert!(LoaderType::from_file_name("a.pdf").is_err());
        assert!(LoaderType::from_file_name("no_extension").is_err());
    }

    #[test]
    fn requires_sub_table_is_true_only_for_excel_and_mdb() {
        assert!(LoaderType::Excel.requires_sub_table());
        assert!(LoaderType::Mdb.requires_sub_table());
        assert!(!LoaderType::Flat.requires_sub_table());
        assert!(!LoaderType::Dbf.requires_sub_table());
    }
}
