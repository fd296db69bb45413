use std::fs::File;
use std::path::Path;

use dbase::{FieldValue, Reader};

use crate::error::IngestionResult;
use crate::formats::{AnalyzeDescriptor, FormatReader, Record};

/// Reader for legacy columnar `.dbf` files. Field metadata comes straight from the DBF header;
/// there is exactly one table per file so `descriptor.sub_table` is ignored. Records are decoded
/// once up front into `records`, since `dbase`'s record iterator borrows the underlying reader for
/// the iterator's lifetime and cannot be resumed across separate [`FormatReader::read_chunk`]
/// calls; `cursor` then drives chunked delivery the same way [`super::excel::ExcelReader`] walks
/// its materialized [`calamine::Range`].
pub struct DbfReader {
    field_names: Vec<String>,
    field_types: Vec<String>,
    records: Vec<Record>,
    cursor: usize,
}

impl DbfReader {
    pub fn open(path: &Path) -> IngestionResult<Self> {
        let mut reader = Reader::from_path(path)?;
        let field_names: Vec<String> = reader
            .fields()
            .iter()
            .filter(|f| !f.name().eq_ignore_ascii_case("DeletionFlag"))
            .map(|f| f.name().to_owned())
            .collect();
        let field_types = reader
            .fields()
            .iter()
            .filter(|f| !f.name().eq_ignore_ascii_case("DeletionFlag"))
            .map(|f| format!("{:?}", f.field_type()).to_ascii_uppercase())
            .collect();

        let mut records = Vec::new();
        for result in reader.iter_records() {
            let record = result?;
            let row = field_names
                .iter()
                .map(|name| record.get(name).map(render_field).unwrap_or_default())
                .collect();
            records.push(row);
        }

        Ok(Self {
            field_names,
            field_types,
            records,
            cursor: 0,
        })
    }
}

impl FormatReader for DbfReader {
    fn column_names(&mut self, _descriptor: &AnalyzeDescriptor) -> IngestionResult<Vec<String>> {
        Ok(self.field_names.clone())
    }

    fn column_types(&mut self, _descriptor: &AnalyzeDescriptor) -> IngestionResult<Vec<String>> {
        Ok(self.field_types.clone())
    }

    fn read_chunk(
        &mut self,
        _descriptor: &AnalyzeDescriptor,
        chunk_size: usize,
        out: &mut Vec<Record>,
    ) -> IngestionResult<usize> {
        let end = (self.cursor + chunk_size).min(self.records.len());
        let read = end - self.cursor;
        out.extend_from_slice(&self.records[self.cursor..end]);
        self.cursor = end;
        Ok(read)
    }
}

/// Render one DBF field value as text for the load/analyze pipeline.
fn render_field(value: &FieldValue) -> String {
    match value {
        FieldValue::Character(Some(s)) => s.clone(),
        FieldValue::Character(None) => String::new(),
        FieldValue::Numeric(Some(n)) if *n == n.floor() => (*n as i64).to_string(),
        FieldValue::Numeric(Some(n)) => n.to_string(),
        FieldValue::Numeric(None) => String::new(),
        FieldValue::Logical(Some(b)) => if *b { "TRUE" } else { "FALSE" }.to_owned(),
        FieldValue::Logical(None) => String::new(),
        FieldValue::Integer(i) => i.to_string(),
        FieldValue::Float(Some(f)) if *f == f.floor() => (*f as i64).to_string(),
        FieldValue::Float(Some(f)) => f.to_string(),
        FieldValue::Float(None) => String::new(),
        FieldValue::Double(d) => d.to_string(),
        FieldValue::Currency(c) => c.to_string(),
        FieldValue::Date(Some(d)) => format!("{d}"),
        FieldValue::Date(None) => String::new(),
        FieldValue::DateTime(dt) => format!("{dt}"),
        FieldValue::Memo(m) => m.clone(),
    }
}
