use std::io::Write;

use ingest::formats::flat::FlatFileReader;
use ingest::formats::{AnalyzeDescriptor, FormatReader};
use ingest::normalize::normalize_columns;

fn write_temp_csv(contents: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("ingest-test-{}.csv", std::process::id()));
    let mut file = std::fs::File::create(&path).expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    path
}

#[test]
fn flat_reader_reads_header_and_chunks_records() {
    let path = write_temp_csv("ID,Name,ID\n1,A,2\n22,BB,3\n");
    let descriptor = AnalyzeDescriptor {
        table_name: "T".to_owned(),
        sub_table: None,
        delimiter: Some(','),
    };

    let mut reader = FlatFileReader::open(&path, b',').expect("open flat reader");
    let headers = reader.column_names(&descriptor).expect("read headers");
    let normalized = normalize_columns(&headers);
    assert_eq!(normalized, vec!["ID_1".to_owned(), "NAME".to_owned(), "ID".to_owned()]);

    let mut records = Vec::new();
    let read = reader
        .read_chunk(&descriptor, 10_000, &mut records)
        .expect("read chunk");
    assert_eq!(read, 2);
    assert_eq!(records[0], vec!["1".to_owned(), "A".to_owned(), "2".to_owned()]);
    assert_eq!(records[1], vec!["22".to_owned(), "BB".to_owned(), "3".to_owned()]);

    std::fs::remove_file(&path).ok();
}

#[test]
fn flat_reader_signals_end_of_data_with_zero_length_chunk() {
    let path = write_temp_csv("A,B\n1,2\n");
    let descriptor = AnalyzeDescriptor {
        table_name: "T".to_owned(),
        sub_table: None,
        delimiter: Some(','),
    };
    let mut reader = FlatFileReader::open(&path, b',').expect("open flat reader");

    let mut records = Vec::new();
    let first = reader
        .read_chunk(&descriptor, 10_000, &mut records)
        .expect("read chunk");
    assert_eq!(first, 1);

    let second = reader
        .read_chunk(&descriptor, 10_000, &mut records)
        .expect("read chunk");
    assert_eq!(second, 0);

    std::fs::remove_file(&path).ok();
}
