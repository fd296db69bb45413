use serde::{Deserialize, Serialize};

use crate::error::IngestionResult;
use crate::formats::{AnalyzeDescriptor, FormatReader};
use crate::normalize::normalize_columns;

/// Number of records analyzed per chunk before statistics are folded into the running result.
/// Chosen to bound peak memory while analyzing an arbitrarily large file.
pub const ANALYZE_CHUNK_SIZE: usize = 10_000;

/// Per-column statistics gathered during an analyze pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnStat {
    pub name: String,
    /// Symbolic type name inferred for the column (`TEXT`, `INTEGER`, `DATE`, …).
    pub r#type: String,
    pub min_length: i32,
    pub max_length: i32,
    pub index: i32,
}

impl ColumnStat {
    fn merge(&mut self, other: &ColumnStat) {
        self.min_length = self.min_length.min(other.min_length);
        self.max_length = self.max_length.max(other.max_length);
    }
}

/// Outcome of analyzing a single table (or sub-table) within a source file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalyzeResult {
    pub table_name: String,
    pub record_count: i64,
    pub columns: Vec<ColumnStat>,
}

impl AnalyzeResult {
    pub fn new(table_name: impl Into<String>, columns: Vec<ColumnStat>) -> Self {
        Self {
            table_name: table_name.into(),
            record_count: 0,
            columns,
        }
    }

    /// Merge another partial result computed over a disjoint partition of the same table's
    /// records into this one. Associative and commutative: record counts sum, lengths take the
    /// element-wise min/max, so merging any partition of a record stream in any order produces
    /// the same final result.
    pub fn merge(&mut self, other: &AnalyzeResult) {
        self.record_count += other.record_count;
        for (mine, theirs) in self.columns.iter_mut().zip(other.columns.iter()) {
            mine.merge(theirs);
        }
    }
}

/// Compute the statistics for one chunk of records read against a fixed column name/type list,
/// suitable for folding into an [`AnalyzeResult`] via [`AnalyzeResult::merge`].
pub fn analyze_chunk(table_name: &str, column_names: &[String], column_types: &[String], records: &[Vec<String>]) -> AnalyzeResult {
    let mut columns: Vec<ColumnStat> = column_names
        .iter()
        .zip(column_types.iter())
        .enumerate()
        .map(|(index, (name, r#type))| ColumnStat {
            name: name.clone(),
            r#type: r#type.clone(),
            min_length: i32::MAX,
            max_length: 0,
            index: index as i32,
        })
        .collect();

    for record in records {
        for (column, value) in columns.iter_mut().zip(record.iter()) {
            let len = value.chars().count() as i32;
            column.min_length = column.min_length.min(len);
            column.max_length = column.max_length.max(len);
        }
    }

    for column in &mut columns {
        if column.min_length == i32::MAX {
            column.min_length = 0;
        }
    }

    AnalyzeResult {
        table_name: table_name.to_owned(),
        record_count: records.len() as i64,
        columns,
    }
}

/// Analyze one descriptor's worth of records through `reader`, in chunks of
/// [`ANALYZE_CHUNK_SIZE`], normalizing and de-duplicating the header row once up front.
pub fn analyze_via_reader(
    reader: &mut dyn FormatReader,
    descriptor: &AnalyzeDescriptor,
) -> IngestionResult<AnalyzeResult> {
    let raw_names = reader.column_names(descriptor)?;
    let column_names = normalize_columns(&raw_names);
    let column_types = reader.column_types(descriptor)?;

    let mut result = AnalyzeResult::new(
        descriptor.table_name.clone(),
        column_names
            .iter()
            .zip(column_types.iter())
            .enumerate()
            .map(|(index, (name, r#type))| ColumnStat {
                name: name.clone(),
                r#type: r#type.clone(),
                min_length: i32::MAX,
                max_length: 0,
                index: index as i32,
            })
            .collect(),
    );

    let mut buffer = Vec::with_capacity(ANALYZE_CHUNK_SIZE);
    loop {
        buffer.clear();
        let read = reader.read_chunk(descriptor, ANALYZE_CHUNK_SIZE, &mut buffer)?;
        if read == 0 {
            break;
        }
        let chunk = analyze_chunk(&descriptor.table_name, &column_names, &column_types, &buffer);
        result.merge(&chunk);
    }

    for column in &mut result.columns {
        if column.min_length == i32::MAX {
            column.min_length = 0;
        }
    }
    Ok(result)
}

#[cfg(test)]
mod test {
    use super::{analyze_chunk, AnalyzeResult, ColumnStat};

    fn names() -> Vec<String> {
        vec!["ID".to_owned(), "NAME".to_owned()]
    }

    fn types() -> Vec<String> {
        vec!["TEXT".to_owned(), "TEXT".to_owned()]
    }

    #[test]
    fn analyze_chunk_computes_min_max_length_and_count() {
        let records = vec![
            vec!["1".to_owned(), "A".to_owned()],
            vec!["22".to_owned(), "BB".to_owned()],
        ];
        let result = analyze_chunk("T", &names(), &types(), &records);
        assert_eq!(result.record_count, 2);
        assert_eq!(result.columns[0].min_length, 1);
        assert_eq!(result.columns[0].max_length, 2);
        assert_eq!(result.columns[1].min_length, 1);
        assert_eq!(result.columns[1].max_length, 2);
    }

    #[test]
    fn merge_is_associative_regardless_of_partition_order() {
        let all = vec![
            vec!["1".to_owned(), "A".to_owned()],
            vec!["22".to_owned(), "BB".to_owned()],
            vec!["333".to_owned(), "C".to_owned()],
        ];

        let whole = analyze_chunk("T", &names(), &types(), &all);

        let mut split_a = analyze_chunk("T", &names(), &types(), &all[0..1]);
        let split_b = analyze_chunk("T", &names(), &types(), &all[1..3]);
        split_a.merge(&split_b);

        let mut split_c = analyze_chunk("T", &names(), &types(), &all[2..3]);
        let split_d = analyze_chunk("T", &names(), &types(), &all[0..2]);
        split_c.merge(&split_d);

        assert_eq!(whole.record_count, split_a.record_count);
        assert_eq!(whole.record_count, split_c.record_count);
        for i in 0..2 {
            assert_eq!(whole.columns[i].min_length, split_a.columns[i].min_length);
            assert_eq!(whole.columns[i].max_length, split_a.columns[i].max_length);
            assert_eq!(whole.columns[i].min_length, split_c.columns[i].min_length);
            assert_eq!(whole.columns[i].max_length, split_c.columns[i].max_length);
        }
    }

    #[test]
    fn merge_sums_record_counts() {
        let mut result = AnalyzeResult::new(
            "T",
            vec![ColumnStat {
                name: "ID".to_owned(),
                r#type: "TEXT".to_owned(),
                min_length: 5,
                max_length: 5,
                index: 0,
            }],
        );
        let other = AnalyzeResult {
            table_name: "T".to_owned(),
            record_count: 3,
            columns: vec![ColumnStat {
                name: "ID".to_owned(),
                r#type: "TEXT".to_owned(),
                min_length: 1,
                max_length: 9,
                index: 0,
            }],
        };
        result.record_count = 2;
        result.merge(&other);
        assert_eq!(result.record_count, 5);
        assert_eq!(result.columns[0].min_length, 1);
        assert_eq!(result.columns[0].max_length, 9);
    }
}
