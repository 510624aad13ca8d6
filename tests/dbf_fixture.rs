mod common;

use std::io::Cursor;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use common::{DbfBuilder, STATUS_DELETED, STATUS_EOF, STATUS_VALID};
use xbase_reader::{
    ActualColumnType, DbfColumnType, DbfReadOptions, DbfRecord, DbfTable, DbfValue, ErrorKind,
    RecordStatus, XbaseError,
};

const CITIES: [&str; 4] = ["Lisbon", "Oslo", "Kraków", "Québec"];

struct Row {
    name: String,
    city: &'static str,
    amount: String,
    quantity: String,
    active: u8,
    joined: String,
}

/// Fourteen rows with a few NULL-valued fields mixed in.
fn rows() -> Vec<Row> {
    (0..14)
        .map(|i| Row {
            name: format!("Customer {:02}", i),
            city: CITIES[i % CITIES.len()],
            amount: format!("{:>8.2}", i as f64 * 12.5 - 40.0),
            quantity: if i == 9 { String::new() } else { format!("{:>4}", i * 3) },
            active: match i {
                7 => b'?',
                i if i % 2 == 0 => b'T',
                _ => b'n',
            },
            joined: if i == 5 {
                String::new()
            } else {
                format!("202401{:02}", i + 1)
            },
        })
        .collect()
}

fn fixture() -> DbfBuilder {
    let mut builder = DbfBuilder::new(0x03)
        .column("NAME", b'C', 12, 0)
        .column("CITY", b'C', 10, 0)
        .column("AMOUNT", b'N', 8, 2)
        .column("QTY", b'N', 4, 0)
        .column("ACTIVE", b'L', 1, 0)
        .column("JOINED", b'D', 8, 0);
    for row in rows() {
        let (city, _, _) = encoding_rs::WINDOWS_1252.encode(row.city);
        builder = builder.record(
            STATUS_VALID,
            &[
                row.name.as_bytes(),
                &*city,
                row.amount.as_bytes(),
                row.quantity.as_bytes(),
                &[row.active],
                row.joined.as_bytes(),
            ],
        );
    }
    builder
}

fn expected_values(row: &Row) -> Vec<DbfValue> {
    vec![
        DbfValue::Text(row.name.clone()),
        DbfValue::Text(row.city.to_string()),
        DbfValue::Decimal(BigDecimal::from_str(row.amount.trim()).unwrap()),
        match row.quantity.trim() {
            "" => DbfValue::Null,
            text => DbfValue::Decimal(BigDecimal::from_str(text).unwrap()),
        },
        match row.active {
            b'T' => DbfValue::Boolean(true),
            b'n' => DbfValue::Boolean(false),
            _ => DbfValue::Null,
        },
        if row.joined.is_empty() {
            DbfValue::Null
        } else {
            DbfValue::Date(NaiveDate::parse_from_str(&row.joined, "%Y%m%d").unwrap())
        },
    ]
}

fn read_all(table: &DbfTable, options: DbfReadOptions) -> Vec<DbfRecord> {
    let mut reader = table.data_reader(options).unwrap();
    reader.records().collect::<Result<Vec<_>, _>>().unwrap()
}

#[test]
fn fixture_summary_matches_schema() {
    let file = fixture().write();
    let table = DbfTable::open(file.path(), None).unwrap();

    assert_eq!(table.header.version, 0x03);
    assert_eq!(table.record_count(), 14);
    assert_eq!(table.header.record_length, 44);
    assert_eq!(table.header.last_update, NaiveDate::from_ymd_opt(2024, 3, 15));
    assert_eq!(table.encoding(), encoding_rs::WINDOWS_1252);

    let summary: Vec<(&str, DbfColumnType, u8, u8)> = table
        .columns()
        .iter()
        .map(|c| (c.name.as_str(), c.column_type, c.length, c.decimal_count))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("NAME", DbfColumnType::Character, 12, 0),
            ("CITY", DbfColumnType::Character, 10, 0),
            ("AMOUNT", DbfColumnType::Numeric, 8, 2),
            ("QTY", DbfColumnType::Numeric, 4, 0),
            ("ACTIVE", DbfColumnType::Logical, 1, 0),
            ("JOINED", DbfColumnType::Date, 8, 0),
        ]
    );
    assert_eq!(table.columns()[0].actual_type, ActualColumnType::Text);
    assert_eq!(table.columns()[2].actual_type, ActualColumnType::NumberText);
}

#[test]
fn fixture_rows_decode_in_order() {
    let file = fixture().write();
    let table = DbfTable::open(file.path(), None).unwrap();
    let records = read_all(&table, DbfReadOptions::default());

    let rows = rows();
    assert_eq!(records.len(), rows.len());
    for (i, (record, row)) in records.iter().zip(&rows).enumerate() {
        assert_eq!(record.index, i as u64);
        assert_eq!(record.status, RecordStatus::Valid);
        assert_eq!(record.offset, 32 + 6 * 32 + 1 + 44 * i as u64);
        let values: Vec<DbfValue> = record.values.iter().map(|v| v.clone().unwrap()).collect();
        assert_eq!(values, expected_values(row), "row {}", i);
    }
}

#[test]
fn seek_then_read_matches_sequential_read() {
    let file = fixture().write();
    let table = DbfTable::open(file.path(), None).unwrap();
    let sequential = read_all(&table, DbfReadOptions::default());

    let mut reader = table.data_reader(DbfReadOptions::default()).unwrap();
    for i in (0..14u64).rev() {
        assert!(reader.seek(i).unwrap());
        assert!(reader.read().unwrap());
        assert_eq!(reader.current(), Some(&sequential[i as usize]));
    }

    // Record 14 is the EOF marker byte; record 15 lies past the end.
    assert!(reader.seek(14).unwrap());
    assert!(!reader.read().unwrap());
    assert!(!reader.seek(15).unwrap());
    assert!(!reader.read().unwrap());

    // Seeking revives a reader that hit the end.
    assert!(reader.seek(3).unwrap());
    assert!(reader.read().unwrap());
    assert_eq!(reader.current().unwrap().index, 3);
}

#[test]
fn column_subset_decodes_only_selected_columns() {
    let file = fixture().write();
    let table = DbfTable::open(file.path(), None).unwrap();
    let full = read_all(&table, DbfReadOptions::default());

    let mut reader = table
        .data_reader_with_columns(&[4, 2], DbfReadOptions::default())
        .unwrap();
    let subset: Vec<DbfRecord> = reader.records().collect::<Result<_, _>>().unwrap();

    assert_eq!(subset.len(), full.len());
    for (partial, complete) in subset.iter().zip(&full) {
        for column in 0..6 {
            if column == 2 || column == 4 {
                assert_eq!(partial.values[column], complete.values[column]);
            } else {
                assert_eq!(partial.values[column], None);
            }
        }
    }
}

#[test]
fn column_subset_rejects_unknown_columns() {
    let file = fixture().write();
    let table = DbfTable::open(file.path(), None).unwrap();
    let err = table
        .data_reader_with_columns(&[1, 6], DbfReadOptions::default())
        .err()
        .unwrap();
    assert!(matches!(
        err,
        XbaseError::ColumnIndexOutOfRange { index: 6, count: 6 }
    ));
    assert_eq!(err.kind(), ErrorKind::Usage);
}

#[test]
fn column_lookup_ignores_case() {
    let file = DbfBuilder::new(0x03)
        .column("Name", b'C', 4, 0)
        .column("NAME", b'C', 4, 0)
        .column("qty", b'N', 3, 0)
        .write();
    let table = DbfTable::open(file.path(), None).unwrap();

    let named: Vec<usize> = table.columns_named("name").iter().map(|c| c.index).collect();
    assert_eq!(named, vec![0, 1]);
    assert_eq!(table.columns_named("QTY").len(), 1);
    assert!(table.columns_named("missing").is_empty());
}

fn status_table() -> DbfBuilder {
    DbfBuilder::new(0x03)
        .column("ID", b'N', 3, 0)
        .record(STATUS_VALID, &[b"  1"])
        .record(STATUS_DELETED, &[b"  2"])
        .record(b'#', &[b"  3"])
        .record(STATUS_EOF, &[b"  4"])
        .record(STATUS_VALID, &[b"  5"])
}

fn ids(records: &[DbfRecord]) -> Vec<String> {
    records.iter().map(|r| r.get(0).unwrap().to_string()).collect()
}

#[test]
fn default_policy_skips_deleted_and_stops_at_eof_marker() {
    let file = status_table().write();
    let table = DbfTable::open(file.path(), None).unwrap();
    let records = read_all(&table, DbfReadOptions::default());
    assert_eq!(ids(&records), vec!["1"]);
}

#[test]
fn lenient_policy_surfaces_deleted_and_invalid_records() {
    let file = status_table().write();
    let table = DbfTable::open(file.path(), None).unwrap();
    let options = DbfReadOptions {
        ignore_eof_marker: true,
        allow_deleted: true,
        allow_invalid: true,
    };
    let records = read_all(&table, options);
    assert_eq!(ids(&records), vec!["1", "2", "3", "5"]);
    assert!(records[1].is_deleted());
    assert_eq!(records[2].status, RecordStatus::Unknown(b'#'));
    assert_eq!(records[3].index, 4);
}

#[test]
fn ignoring_the_eof_marker_still_stops_at_physical_end() {
    let file = status_table().write();
    let table = DbfTable::open(file.path(), None).unwrap();
    let options = DbfReadOptions {
        ignore_eof_marker: true,
        ..DbfReadOptions::default()
    };
    // The trailing 0x1A marker is skipped like a record and the stream ends.
    assert_eq!(ids(&read_all(&table, options)), vec!["1", "5"]);
}

#[test]
fn truncated_trailing_record_ends_the_stream() {
    let file = DbfBuilder::new(0x03)
        .column("CODE", b'C', 6, 0)
        .record(STATUS_VALID, &[b"ALPHA"])
        .record(STATUS_VALID, &[b"BRAVO"])
        .without_eof_marker()
        .tail(&[STATUS_VALID, b'C', b'H'])
        .write();
    let table = DbfTable::open(file.path(), None).unwrap();
    let records = read_all(&table, DbfReadOptions::default());
    let codes: Vec<String> = records.iter().map(|r| r.get(0).unwrap().to_string()).collect();
    assert_eq!(codes, vec!["ALPHA", "BRAVO"]);
}

#[test]
fn record_length_disagreeing_with_columns_is_fatal() {
    let file = DbfBuilder::new(0x03)
        .column("CODE", b'C', 4, 0)
        .record_length(8)
        .record(STATUS_VALID, &[b"ABCD"])
        .write();
    let table = DbfTable::open(file.path(), None).unwrap();
    let mut reader = table.data_reader(DbfReadOptions::default()).unwrap();
    match reader.read() {
        Err(XbaseError::RecordLengthMismatch {
            expected, actual, ..
        }) => {
            assert_eq!(expected, 7);
            assert_eq!(actual, 4);
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn columns_wider_than_the_record_are_fatal() {
    let file = DbfBuilder::new(0x03)
        .column("CODE", b'C', 8, 0)
        .record_length(5)
        .record(STATUS_VALID, &[b"ABCDEFGH"])
        .write();
    let table = DbfTable::open(file.path(), None).unwrap();

    let mut reader = table.data_reader(DbfReadOptions::default()).unwrap();
    let err = reader.read().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Corruption);
    match err {
        XbaseError::RecordLengthMismatch {
            expected, actual, ..
        } => {
            assert_eq!(expected, 4);
            assert_eq!(actual, 8);
        }
        other => panic!("unexpected error {other:?}"),
    }

    let mut subset = table
        .data_reader_with_columns(&[0], DbfReadOptions::default())
        .unwrap();
    assert!(matches!(
        subset.read(),
        Err(XbaseError::RecordLengthMismatch { expected: 4, actual: 8, .. })
    ));
}

#[test]
fn seek_to_an_unaddressable_record_reports_end_of_data() {
    let file = DbfBuilder::new(0x03)
        .column("CODE", b'C', 4, 0)
        .record(STATUS_VALID, &[b"ABCD"])
        .write();
    let table = DbfTable::open(file.path(), None).unwrap();
    let mut reader = table.data_reader(DbfReadOptions::default()).unwrap();

    assert!(!reader.seek(u64::MAX).unwrap());
    assert!(!reader.read().unwrap());
    assert!(!reader.seek(u64::MAX / 2).unwrap());
    assert!(!reader.read().unwrap());

    assert!(reader.seek(0).unwrap());
    assert!(reader.read().unwrap());
    assert_eq!(reader.current().unwrap().get(0).unwrap().to_string(), "ABCD");
}

#[test]
fn malformed_field_fails_the_read_but_not_the_reader() {
    let file = DbfBuilder::new(0x03)
        .column("FLAG", b'L', 1, 0)
        .record(STATUS_VALID, &[b"X"])
        .record(STATUS_VALID, &[b"Y"])
        .write();
    let table = DbfTable::open(file.path(), None).unwrap();
    let mut reader = table.data_reader(DbfReadOptions::default()).unwrap();

    let err = reader.read().unwrap_err();
    assert!(matches!(err, XbaseError::InvalidBoolean { byte: b'X', .. }));
    assert_eq!(err.kind(), ErrorKind::ValueFormat);
    assert!(reader.current().is_none());

    assert!(reader.read().unwrap());
    assert_eq!(reader.current().unwrap().get(0), Some(&DbfValue::Boolean(true)));
}

#[test]
fn closed_reader_refuses_reads() {
    let file = fixture().write();
    let table = DbfTable::open(file.path(), None).unwrap();
    let mut reader = table.data_reader(DbfReadOptions::default()).unwrap();
    assert!(reader.read().unwrap());
    reader.close();
    assert!(reader.is_closed());
    assert!(reader.current().is_none());
    assert!(matches!(reader.read(), Err(XbaseError::ReaderClosed)));
    assert!(matches!(reader.seek(0), Err(XbaseError::ReaderClosed)));
}

#[test]
fn independent_readers_share_one_table() {
    let file = fixture().write();
    let table = DbfTable::open(file.path(), None).unwrap();
    let mut first = table.data_reader(DbfReadOptions::default()).unwrap();
    let mut second = table.data_reader(DbfReadOptions::default()).unwrap();

    assert!(first.read().unwrap());
    assert!(first.read().unwrap());
    assert!(second.read().unwrap());
    assert_eq!(first.current().unwrap().index, 1);
    assert_eq!(second.current().unwrap().index, 0);
}

#[test]
fn in_memory_tables_read_from_a_supplied_stream() {
    let bytes = fixture().build();
    let table = DbfTable::from_reader(&mut bytes.as_slice(), None).unwrap();
    assert!(matches!(
        table.data_reader(DbfReadOptions::default()),
        Err(XbaseError::Unsupported(_))
    ));

    let mut reader = table.data_reader_from(Cursor::new(&bytes), DbfReadOptions::default());
    assert_eq!(reader.records().count(), 14);
}

#[test]
fn foxpro_binary_columns() {
    let mut days = 2_451_545i32.to_le_bytes().to_vec(); // 2000-01-01
    days.extend((12 * 3_600_000i32).to_le_bytes());
    let file = DbfBuilder::new(0x30)
        .language_driver(0xC9)
        .column("ID", b'I', 4, 0)
        .column("PRICE", b'Y', 8, 4)
        .column("RATIO", b'B', 8, 2)
        .column("STAMP", b'T', 8, 0)
        .column("NOTE", b'C', 6, 0)
        .record(
            STATUS_VALID,
            &[
                &(-7i32).to_le_bytes(),
                &1_234_567i64.to_le_bytes(),
                &0.5f64.to_le_bytes(),
                &days,
                b"\xcf\xf0\xe8",
            ],
        )
        .write();
    let table = DbfTable::open(file.path(), None).unwrap();
    assert!(table.header.is_foxpro());
    assert_eq!(table.encoding(), encoding_rs::WINDOWS_1251);
    assert_eq!(table.columns()[0].actual_type, ActualColumnType::Int32);
    assert_eq!(table.columns()[4].actual_type, ActualColumnType::TextLong);

    let records = read_all(&table, DbfReadOptions::default());
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.get(0), Some(&DbfValue::Int32(-7)));
    assert_eq!(
        record.get(1),
        Some(&DbfValue::Decimal(BigDecimal::from_str("123.4567").unwrap()))
    );
    assert_eq!(record.get(2), Some(&DbfValue::Double(0.5)));
    assert_eq!(
        record.get(3),
        Some(&DbfValue::DateTime(
            NaiveDate::from_ymd_opt(2000, 1, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap()
        ))
    );
    assert_eq!(record.get(4), Some(&DbfValue::Text("При".to_string())));
}

#[test]
fn caller_encoding_overrides_language_driver() {
    let file = DbfBuilder::new(0x03)
        .language_driver(0xC9)
        .column("NOTE", b'C', 4, 0)
        .record(STATUS_VALID, &["né".as_bytes()])
        .write();
    let table = DbfTable::open(file.path(), Some(encoding_rs::UTF_8)).unwrap();
    let records = read_all(&table, DbfReadOptions::default());
    assert_eq!(records[0].get(0), Some(&DbfValue::Text("né".to_string())));
}

#[test]
fn memo_columns_surface_block_pointers() {
    let file = DbfBuilder::new(0x83)
        .column("NOTES", b'M', 10, 0)
        .record(STATUS_VALID, &[b"        12"])
        .record(STATUS_VALID, &[b""])
        .write();
    let table = DbfTable::open(file.path(), None).unwrap();
    assert!(table.header.has_memo());

    let records = read_all(&table, DbfReadOptions::default());
    let pointer = records[0].get(0).unwrap();
    assert_eq!(pointer, &DbfValue::MemoPointer(12));
    assert_eq!(records[1].get(0), Some(&DbfValue::Null));
    assert!(matches!(
        table.read_memo(pointer),
        Err(XbaseError::NotImplemented(_))
    ));
}

#[test]
fn dialect_specific_type_is_rejected_at_open() {
    let file = DbfBuilder::new(0x03).column("PRICE", b'Y', 8, 4).write();
    let err = DbfTable::open(file.path(), None).unwrap_err();
    assert!(matches!(
        err,
        XbaseError::UnsupportedColumnType { declared: b'Y', .. }
    ));
    assert_eq!(err.kind(), ErrorKind::Unsupported);
}

#[test]
fn short_header_is_a_format_error() {
    let file = common::write_temp(&[0x03, 124, 1, 1, 0, 0], ".dbf");
    let err = DbfTable::open(file.path(), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
}
