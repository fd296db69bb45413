pub mod dbf;
pub mod excel;
pub mod flat;
pub mod mdb;

use crate::error::IngestionResult;

/// A single table (or sub-table, for Excel/MDB) to analyze or load within a source file.
#[derive(Debug, Clone)]
pub struct AnalyzeDescriptor {
    pub table_name: String,
    /// Sheet/table name within the file; required for Excel and MDB, ignored otherwise.
    pub sub_table: Option<String>,
    /// Single-character field delimiter; required for Flat, ignored otherwise.
    pub delimiter: Option<char>,
}

/// One record read from a source file, as positional string cells in column order. Values read
/// directly as text (Flat, DBF) are passed through verbatim; values read as typed cells (Excel)
/// are rendered per the per-format notes before reaching this point.
pub type Record = Vec<String>;

/// Implemented by each file-format reader. `analyze` and `load` both iterate the same underlying
/// decode path; `load` additionally re-encodes each record as it is produced, see
/// [`crate::load`].
pub trait FormatReader {
    /// Column names in file order, resolved once per descriptor before the first chunk is read.
    fn column_names(&mut self, descriptor: &AnalyzeDescriptor) -> IngestionResult<Vec<String>>;

    /// Read up to `chunk_size` records for `descriptor`, appending them to `out`. Returns the
    /// number of records appended; a return of `0` signals end of data for this descriptor.
    fn read_chunk(
        &mut self,
        descriptor: &AnalyzeDescriptor,
        chunk_size: usize,
        out: &mut Vec<Record>,
    ) -> IngestionResult<usize>;

    /// Symbolic type name per column, in the same order as [`FormatReader::column_names`].
    /// Formats with no inherent column typing (Flat, Excel) default every column to `TEXT`;
    /// formats with schema metadata (DBF, MDB) report the mapped type from that metadata.
    fn column_types(&mut self, descriptor: &AnalyzeDescriptor) -> IngestionResult<Vec<String>> {
        Ok(self
            .column_names(descriptor)?
            .iter()
            .map(|_| "TEXT".to_owned())
            .collect())
    }
}
