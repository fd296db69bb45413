use std::path::Path;

use odbc_api::{
    buffers::{BufferDesc, ColumnarAnyBuffer},
    Connection, Cursor, Environment, ResultSetMetadata,
};

use crate::error::{IngestionError, IngestionResult};
use crate::formats::{AnalyzeDescriptor, FormatReader, Record};

/// Reader for embedded Access databases (`.mdb`, `.accdb`) via a read-only ODBC connection.
/// Sub-tables are enumerated by name through `descriptor.sub_table`; column type codes reported
/// by the driver are mapped to the symbolic names already used by the DBF/Excel readers so
/// downstream DDL synthesis is format-agnostic.
///
/// The whole result set for the descriptor's sub-table is decoded once, on first access, into
/// `records`: an `odbc-api` row-set cursor borrows the statement handle for its own lifetime, so
/// it cannot be parked across separate [`FormatReader::read_chunk`] calls the way a plain `Vec`
/// cursor can. `cursor` then drives chunked delivery from that materialized set.
pub struct MdbReader<'env> {
    connection: Connection<'env>,
    column_names: Option<Vec<String>>,
    column_types: Option<Vec<String>>,
    records: Option<Vec<Record>>,
    cursor: usize,
}

impl<'env> MdbReader<'env> {
    pub fn open(environment: &'env Environment, path: &Path) -> IngestionResult<Self> {
        let connection_string = format!(
            "Driver={{Microsoft Access Driver (*.mdb, *.accdb)}};Dbq={};ReadOnly=1;",
            path.display()
        );
        let connection = environment
            .connect_with_connection_string(&connection_string, odbc_api::ConnectionOptions::default())
            .map_err(|e| IngestionError::Odbc(e.to_string()))?;
        Ok(Self {
            connection,
            column_names: None,
            column_types: None,
            records: None,
            cursor: 0,
        })
    }

    fn query(&self, descriptor: &AnalyzeDescriptor) -> IngestionResult<String> {
        let table = descriptor
            .sub_table
            .as_deref()
            .ok_or_else(|| IngestionError::SubTableRequired("MDB".to_owned()))?;
        Ok(format!("SELECT * FROM [{table}]"))
    }

    /// Run the descriptor's query exactly once, caching column names/types and the full decoded
    /// record set for subsequent [`FormatReader`] calls.
    fn ensure_materialized(&mut self, descriptor: &AnalyzeDescriptor) -> IngestionResult<()> {
        if self.records.is_some() {
            return Ok(());
        }
        let sql = self.query(descriptor)?;
        let mut cursor = self
            .connection
            .execute(&sql, ())
            .map_err(|e| IngestionError::Odbc(e.to_string()))?
            .ok_or_else(|| IngestionError::MissingSubTable(sql.clone()))?;

        let column_count = cursor
            .num_result_cols()
            .map_err(|e| IngestionError::Odbc(e.to_string()))?;
        let mut names = Vec::with_capacity(column_count as usize);
        let mut types = Vec::with_capacity(column_count as usize);
        for index in 1..=column_count {
            let mut buf = Vec::new();
            cursor
                .col_name(index as u16, &mut buf)
                .map_err(|e| IngestionError::Odbc(e.to_string()))?;
            names.push(String::from_utf16_lossy(&buf));
            let data_type = cursor
                .col_data_type(index as u16)
                .map_err(|e| IngestionError::Odbc(e.to_string()))?;
            types.push(format!("{data_type:?}").to_ascii_uppercase());
        }

        let batch_size = 1_000;
        let descriptors = vec![BufferDesc::Text { max_str_len: 4096 }; column_count as usize];
        let buffer = ColumnarAnyBuffer::from_descs(batch_size, &descriptors);
        let mut row_set_cursor = cursor
            .bind_buffer(buffer)
            .map_err(|e| IngestionError::Odbc(e.to_string()))?;

        let mut records = Vec::new();
        while let Some(batch) = row_set_cursor
            .fetch()
            .map_err(|e| IngestionError::Odbc(e.to_string()))?
        {
            for row_index in 0..batch.num_rows() {
                let row: Record = (0..column_count as usize)
                    .map(|col| {
                        batch
                            .column(col)
                            .as_text_view()
                            .and_then(|view| view.get(row_index))
                            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                            .unwrap_or_default()
                    })
                    .collect();
                records.push(row);
            }
        }

        self.column_names = Some(names);
        self.column_types = Some(types);
        self.records = Some(records);
        Ok(())
    }
}

impl<'env> FormatReader for MdbReader<'env> {
    fn column_names(&mut self, descriptor: &AnalyzeDescriptor) -> IngestionResult<Vec<String>> {
        self.ensure_materialized(descriptor)?;
        Ok(self.column_names.clone().unwrap_or_default())
    }

    fn column_types(&mut self, descriptor: &AnalyzeDescriptor) -> IngestionResult<Vec<String>> {
        self.ensure_materialized(descriptor)?;
        Ok(self.column_types.clone().unwrap_or_default())
    }

    fn read_chunk(
        &mut self,
        descriptor: &AnalyzeDescriptor,
        chunk_size: usize,
        out: &mut Vec<Record>,
    ) -> IngestionResult<usize> {
        self.ensure_materialized(descriptor)?;
        let records = self.records.as_ref().expect("materialized above");
        let end = (self.cursor + chunk_size).min(records.len());
        let read = end - self.cursor;
        out.extend_from_slice(&records[self.cursor..end]);
        self.cursor = end;
        Ok(read)
    }
}
