use sqlx::{Postgres, Transaction};

use crate::error::IngestionResult;
use crate::formats::Record;

/// Streams records into a table via Postgres's `COPY ... FROM STDIN` facility. One sink is opened
/// per loader descriptor, inside the same transaction that ran the descriptor's `create_statement`,
/// so a failure partway through rolls back the whole descriptor along with the DDL that preceded
/// it.
pub struct CopySink<'c> {
    copy: sqlx::postgres::PgCopyIn<&'c mut sqlx::postgres::PgConnection>,
    buffer: Vec<u8>,
    record_count: u64,
}

/// Bytes are flushed to the server once the buffer crosses this size, bounding memory use while
/// streaming an arbitrarily large file.
const FLUSH_THRESHOLD: usize = 64 * 1024;

impl<'c> CopySink<'c> {
    /// Open a COPY stream for `table` over the given `columns`, shaped per the source delimiter
    /// and quoting rules. `qualified` adds `QUOTE '"'`/`ESCAPE '"'`, matching a CSV-qualified
    /// source; `header` controls whether the first row written is expected to be a header row
    /// (Flat byte-passthrough sends `true`; re-encoded formats send `false` since headers are not
    /// re-emitted).
    pub async fn open(
        transaction: &'c mut Transaction<'_, Postgres>,
        table: &str,
        columns: &[String],
        delimiter: char,
        qualified: bool,
        header: bool,
    ) -> IngestionResult<Self> {
        let column_list = columns.join(", ");
        let mut statement = format!(
            "COPY {table}({column_list}) FROM STDIN WITH (FORMAT csv, DELIMITER '{delimiter}', HEADER {header}"
        );
        if qualified {
            statement.push_str(", QUOTE '\"', ESCAPE '\"'");
        }
        statement.push(')');

        let copy = transaction.copy_in_raw(&statement).await?;
        Ok(Self {
            copy,
            buffer: Vec::with_capacity(FLUSH_THRESHOLD),
            record_count: 0,
        })
    }

    /// Append one already-CSV-encoded line (including its trailing `\n`) to the stream, flushing
    /// to the server once the internal buffer crosses [`FLUSH_THRESHOLD`].
    pub async fn write_line(&mut self, line: &[u8]) -> IngestionResult<()> {
        self.buffer.extend_from_slice(line);
        self.record_count += 1;
        if self.buffer.len() >= FLUSH_THRESHOLD {
            self.flush().await?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> IngestionResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let chunk = std::mem::replace(&mut self.buffer, Vec::with_capacity(FLUSH_THRESHOLD));
        self.copy.send(chunk).await?;
        Ok(())
    }

    /// Finish the COPY stream, returning the number of rows the server reports as copied. The
    /// header row (if any) is not counted towards the caller's `record_count`.
    pub async fn finish(mut self) -> IngestionResult<u64> {
        self.flush().await?;
        let rows = self.copy.finish().await?;
        Ok(rows)
    }
}

/// Re-encode one record as a single CSV line: fields wrapped in `"`, embedded `"` doubled,
/// terminated with `\n`. Used by every format except Flat, which streams source bytes directly.
pub fn encode_csv_line(record: &Record) -> Vec<u8> {
    let mut line = String::new();
    for (index, field) in record.iter().enumerate() {
        if index > 0 {
            line.push(',');
        }
        line.push('"');
        line.push_str(&field.replace('"', "\"\""));
        line.push('"');
    }
    line.push('\n');
    line.into_bytes()
}

#[cfg(test)]
mod test {
    use super::encode_csv_line;

    #[test]
    fn encode_csv_line_quotes_fields_and_doubles_embedded_quotes() {
        let record = vec!["hello".to_owned(), "say \"hi\"".to_owned(), "".to_owned()];
        let line = encode_csv_line(&record);
        assert_eq!(line, b"\"hello\",\"say \"\"hi\"\"\",\"\"\n".to_vec());
    }

    #[test]
    fn encode_csv_line_round_trips_through_an_rfc4180_parser() {
        let record = vec!["a,b".to_owned(), "plain".to_owned(), "with \"quote\"".to_owned()];
        let line = encode_csv_line(&record);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(line.as_slice());
        let parsed: csv::StringRecord = reader.records().next().unwrap().unwrap();
        let parsed: Vec<String> = parsed.iter().map(ToOwned::to_owned).collect();
        assert_eq!(parsed, record);
    }
}
