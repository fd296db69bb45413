use std::fs::File;
use std::path::Path;

use csv::ReaderBuilder;

use crate::error::{IngestionError, IngestionResult};
use crate::formats::{AnalyzeDescriptor, FormatReader, Record};

/// Reader for delimited text files (`.csv`, `.txt`). A Flat source has exactly one descriptor, so
/// this reader ignores `sub_table` and requires `descriptor.delimiter`.
pub struct FlatFileReader {
    reader: csv::Reader<File>,
    headers: Option<Vec<String>>,
}

impl FlatFileReader {
    pub fn open(path: &Path, delimiter: u8) -> IngestionResult<Self> {
        let reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;
        Ok(Self {
            reader,
            headers: None,
        })
    }
}

impl FormatReader for FlatFileReader {
    fn column_names(&mut self, _descriptor: &AnalyzeDescriptor) -> IngestionResult<Vec<String>> {
        if let Some(headers) = &self.headers {
            return Ok(headers.clone());
        }
        let headers: Vec<String> = self
            .reader
            .headers()?
            .iter()
            .map(ToOwned::to_owned)
            .collect();
        self.headers = Some(headers.clone());
        Ok(headers)
    }

    fn read_chunk(
        &mut self,
        descriptor: &AnalyzeDescriptor,
        chunk_size: usize,
        out: &mut Vec<Record>,
    ) -> IngestionResult<usize> {
        if self.headers.is_none() {
            self.column_names(descriptor)?;
        }
        let mut read = 0;
        let mut record = csv::StringRecord::new();
        while read < chunk_size {
            if !self.reader.read_record(&mut record)? {
                break;
            }
            out.push(record.iter().map(ToOwned::to_owned).collect());
            read += 1;
        }
        Ok(read)
    }
}

/// Stream a Flat file's raw bytes, line by line, straight into the COPY sink, preserving the
/// source delimiter/quoting and the header row (`HEADER true`) rather than decoding and
/// re-encoding every cell. This is the fast path `load` takes for Flat sources.
pub fn open_raw(path: &Path) -> IngestionResult<File> {
    if !path.is_file() {
        return Err(IngestionError::NotAFile(path.display().to_string()));
    }
    File::open(path).map_err(IngestionError::from)
}
