use std::path::Path;

use calamine::{open_workbook_auto, DataType, Range, Reader};
use chrono::NaiveDate;

use crate::error::{IngestionError, IngestionResult};
use crate::formats::{AnalyzeDescriptor, FormatReader, Record};

/// Reader for spreadsheet workbooks (`.xls`, `.xlsx`). Each sheet is an Excel sub-table; the
/// workbook's cached formula results (not the formula text) are what calamine exposes, so no
/// separate evaluation pass is needed here.
pub struct ExcelReader {
    workbook: Box<dyn Reader<std::io::BufReader<std::fs::File>>>,
    range: Option<Range<DataType>>,
    cursor: usize,
}

impl ExcelReader {
    pub fn open(path: &Path) -> IngestionResult<Self> {
        let workbook = open_workbook_auto(path).map_err(|e| IngestionError::Excel(e.to_string()))?;
        Ok(Self {
            workbook: Box::new(workbook),
            range: None,
            cursor: 0,
        })
    }

    fn range_for(&mut self, descriptor: &AnalyzeDescriptor) -> IngestionResult<&Range<DataType>> {
        if self.range.is_none() {
            let sheet = descriptor
                .sub_table
                .as_deref()
                .ok_or_else(|| IngestionError::SubTableRequired("Excel".to_owned()))?;
            let range = self
                .workbook
                .worksheet_range(sheet)
                .ok_or_else(|| IngestionError::MissingSubTable(sheet.to_owned()))?
                .map_err(|e| IngestionError::Excel(e.to_string()))?;
            self.range = Some(range);
        }
        Ok(self.range.as_ref().expect("seeded above"))
    }
}

impl FormatReader for ExcelReader {
    fn column_names(&mut self, descriptor: &AnalyzeDescriptor) -> IngestionResult<Vec<String>> {
        let range = self.range_for(descriptor)?;
        let Some(header_row) = range.rows().next() else {
            return Ok(Vec::new());
        };
        Ok(header_row.iter().map(render_cell).collect())
    }

    fn read_chunk(
        &mut self,
        descriptor: &AnalyzeDescriptor,
        chunk_size: usize,
        out: &mut Vec<Record>,
    ) -> IngestionResult<usize> {
        if self.cursor == 0 {
            self.range_for(descriptor)?;
            self.cursor = 1; // skip the header row
        }
        let range = self.range.as_ref().expect("seeded by range_for");
        let mut read = 0;
        for row in range.rows().skip(self.cursor).take(chunk_size) {
            out.push(row.iter().map(render_cell).collect());
            read += 1;
        }
        self.cursor += read;
        Ok(read)
    }
}

/// Render one Excel cell per the per-format rendering rules: integral numerics render without a
/// decimal point, date-formatted cells render as an ISO local date, other numerics use their
/// default string form, booleans render `TRUE`/`FALSE`, blanks render empty, and errors fall back
/// to their formatted text.
///
/// calamine 0.20 (pinned, no `dates` feature) reports a date-formatted cell as `DateTime(f64)`,
/// the number of days since the workbook epoch; it is converted to an ISO date by hand here
/// rather than through `DataType::as_date`, which that feature gates.
fn render_cell(cell: &DataType) -> String {
    match cell {
        DataType::Int(i) => i.to_string(),
        DataType::Float(f) if *f == f.floor() => (*f as i64).to_string(),
        DataType::Float(f) => f.to_string(),
        DataType::String(s) => s.clone(),
        DataType::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_owned(),
        DataType::DateTime(serial) => excel_serial_to_iso_date(*serial),
        DataType::Error(e) => e.to_string(),
        DataType::Empty => String::new(),
    }
}

/// Excel's 1900 date system numbers days from 1899-12-30 (the off-by-two that also carries
/// forward Lotus 1-2-3's spurious 1900-02-29). `serial`'s integer part is the day count; any
/// fractional time-of-day component is dropped since only the date is rendered.
fn excel_serial_to_iso_date(serial: f64) -> String {
    let Some(epoch) = NaiveDate::from_ymd_opt(1899, 12, 30) else {
        return String::new();
    };
    epoch
        .checked_add_signed(chrono::Duration::days(serial.trunc() as i64))
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
