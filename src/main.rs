use std::env;
use std::path::Path;
use std::process;

use xbase_reader::{parse_encoding, CdxFile, DbfReadOptions, DbfTable, XbaseError};

struct Args {
    path: String,
    encoding: Option<&'static encoding_rs::Encoding>,
    limit: usize,
    deleted: bool,
    columns: Option<Vec<String>>,
}

fn usage(program: &str) -> ! {
    eprintln!(
        "Usage: {} <file.dbf|file.cdx|file.idx> [--encoding <LABEL>] [--limit <N>] [--deleted] [--columns <A,B,...>]",
        program
    );
    process::exit(1);
}

fn flag_value<'a>(args: &'a [String], index: usize, flag: &str) -> &'a str {
    match args.get(index + 1) {
        Some(value) => value,
        None => {
            eprintln!("ERROR: {} flag requires an argument.", flag);
            process::exit(1);
        }
    }
}

fn parse_args() -> Args {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage(&args[0]);
    }

    let mut parsed = Args {
        path: args[1].clone(),
        encoding: None,
        limit: 10,
        deleted: false,
        columns: None,
    };
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--encoding" => {
                let label = flag_value(&args, i, "--encoding");
                parsed.encoding = match parse_encoding(label) {
                    Some(encoding) => Some(encoding),
                    None => {
                        eprintln!("ERROR: Unknown encoding '{}'", label);
                        process::exit(1);
                    }
                };
                i += 2;
            }
            "--limit" => {
                let value = flag_value(&args, i, "--limit");
                parsed.limit = value.parse().unwrap_or_else(|_| {
                    eprintln!("ERROR: --limit expects a number, got '{}'", value);
                    process::exit(1)
                });
                i += 2;
            }
            "--columns" => {
                let value = flag_value(&args, i, "--columns");
                parsed.columns = Some(value.split(',').map(|name| name.trim().to_string()).collect());
                i += 2;
            }
            "--deleted" => {
                parsed.deleted = true;
                i += 1;
            }
            _ => usage(&args[0]),
        }
    }
    parsed
}

fn dump_table(args: &Args) -> Result<(), XbaseError> {
    let table = DbfTable::open(&args.path, args.encoding)?;
    let header = &table.header;

    println!("Table Information:");
    println!("  Version: {:#04x} ({:?})", header.version, header.family);
    if let Some(date) = header.last_update {
        println!("  Last update: {}", date);
    }
    println!("  Records: {}", header.record_count);
    println!("  Record length: {}", header.record_length);
    println!("  Encoding: {}", table.encoding().name());
    println!("  Memo file: {}", header.has_memo());

    println!("\nColumns:");
    for column in table.columns() {
        println!(
            "  {:>3}. {:<11} {:?} len={} dec={} -> {:?}",
            column.index,
            column.name,
            column.column_type,
            column.length,
            column.decimal_count,
            column.actual_type
        );
    }

    let selected: Vec<usize> = match &args.columns {
        Some(names) => {
            let mut indices = Vec::new();
            for name in names {
                let matches = table.columns_named(name);
                if matches.is_empty() {
                    eprintln!("WARNING: no column named '{}'", name);
                }
                indices.extend(matches.iter().map(|column| column.index));
            }
            indices
        }
        None => (0..table.columns().len()).collect(),
    };

    let options = DbfReadOptions {
        allow_deleted: args.deleted,
        ..DbfReadOptions::default()
    };
    let mut reader = table.data_reader_with_columns(&selected, options)?;

    println!("\nRecords (first {}):", args.limit);
    for record in reader.records().take(args.limit) {
        let record = record?;
        let fields: Vec<String> = record
            .values
            .iter()
            .enumerate()
            .filter_map(|(i, value)| {
                value
                    .as_ref()
                    .map(|value| format!("{}={}", table.columns()[i].name, value))
            })
            .collect();
        let marker = if record.is_deleted() { "*" } else { " " };
        println!("  {}{:>6}: {}", marker, record.index, fields.join(" | "));
    }
    Ok(())
}

fn dump_index(args: &Args) -> Result<(), XbaseError> {
    let index = CdxFile::open(&args.path)?;
    let header = index.header();
    let encoding = args.encoding.unwrap_or(encoding_rs::WINDOWS_1252);

    println!("Index Information:");
    println!("  Key expression: {}", header.key_expression);
    if let Some(for_expression) = &header.for_expression {
        println!("  FOR expression: {}", for_expression);
    }
    println!("  Key length: {}", header.key_length);
    println!("  Root node: {:#x}", header.root_pointer);
    println!("  Order: {:?}", header.order);
    println!("  Options: {:?}", header.options);

    println!("\nKeys (first {}):", args.limit);
    for entry in index.searcher().iter_all().take(args.limit) {
        let entry = entry?;
        println!("  {:>8} {:?}", entry.record_number, entry.key_text(encoding));
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let args = parse_args();

    let extension = Path::new(&args.path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    let result = match extension.as_deref() {
        Some("cdx") | Some("idx") => dump_index(&args),
        _ => dump_table(&args),
    };

    if let Err(e) = result {
        eprintln!("\nERROR: Failed to read {}", args.path);
        eprintln!("  {} ({:?})", e, e.kind());
        process::exit(1);
    }
}
