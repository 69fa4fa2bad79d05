use std::io::{self, Write};
use std::panic;
use std::path::PathBuf;
use std::process;

use tracing::{debug, error, info, warn, Level};

use raggedtab::fileio::{self, Delimiter, FileIO, ImportOptions};
use raggedtab::{Config, Document, Result};

/// What to print once the file is loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Data,
    Matrix,
    Ragged,
    Tsv,
}

struct Args {
    file_path: PathBuf,
    delimiter: Option<Delimiter>,
    skip_lines: usize,
    comment: Option<String>,
    output: Output,
    save_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    verbosity: u8,
}

/// Parse command line arguments
fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut file_path: Option<PathBuf> = None;
    let mut parsed = Args {
        file_path: PathBuf::new(),
        delimiter: None,
        skip_lines: 0,
        comment: None,
        output: Output::Data,
        save_path: None,
        config_path: None,
        verbosity: 0,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--import-delim" => {
                let value = option_value(&args, i);
                parsed.delimiter = Some(Delimiter::parse(value).unwrap_or_else(|| {
                    eprintln!("Invalid delimiter: '{}'. Use comma, tab, space, ws, or a single character.", value);
                    process::exit(1);
                }));
                i += 2;
            }
            "--skip" => {
                let value = option_value(&args, i);
                parsed.skip_lines = value.parse().unwrap_or_else(|_| {
                    eprintln!("Error: --skip expects a line count, got '{}'", value);
                    process::exit(1);
                });
                i += 2;
            }
            "--comment" => {
                parsed.comment = Some(option_value(&args, i).to_string());
                i += 2;
            }
            "--export-matrix" => {
                parsed.output = Output::Matrix;
                i += 1;
            }
            "--export-data" => {
                parsed.output = Output::Ragged;
                i += 1;
            }
            "--tsv" => {
                parsed.output = Output::Tsv;
                i += 1;
            }
            "-o" | "--output" => {
                parsed.save_path = Some(PathBuf::from(option_value(&args, i)));
                i += 2;
            }
            "--config" => {
                parsed.config_path = Some(PathBuf::from(option_value(&args, i)));
                i += 2;
            }
            "-h" | "--help" => {
                print_help();
                process::exit(0);
            }
            arg if arg.starts_with("-v") && arg[1..].chars().all(|c| c == 'v') => {
                parsed.verbosity = parsed.verbosity.saturating_add((arg.len() - 1) as u8);
                i += 1;
            }
            arg if arg.starts_with('-') => {
                eprintln!("Unknown option: {}", arg);
                process::exit(1);
            }
            _ => {
                file_path = Some(PathBuf::from(&args[i]));
                i += 1;
            }
        }
    }

    match file_path {
        Some(path) => parsed.file_path = path,
        None => {
            print_help();
            process::exit(1);
        }
    }
    parsed
}

fn option_value(args: &[String], i: usize) -> &str {
    match args.get(i + 1) {
        Some(value) => value,
        None => {
            eprintln!("Error: {} requires an argument", args[i]);
            process::exit(1);
        }
    }
}

/// Log panics through tracing before the default hook prints them
fn install_panic_hook() {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        if let Some(location) = info.location() {
            error!(
                file = location.file(),
                line = location.line(),
                "panic occured"
            );
        } else {
            error!("panic occured");
        }

        if let Some(s) = info.payload().downcast_ref::<&str>() {
            error!(message = %s);
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            error!(message = %s);
        }

        default_hook(info);
    }));
}

fn print_help() {
    eprintln!("raggedtab - Read, convert and export ragged numeric tables");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    raggedtab [OPTIONS] FILE");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    --import-delim <DELIM>   Read FILE as delimited text (comma, tab, space, ws, or char)");
    eprintln!("    --skip <N>               Skip the first N lines when importing");
    eprintln!("    --comment <PREFIX>       Ignore lines starting with PREFIX when importing");
    eprintln!("    --export-matrix          Print the dense matrix, holes as 0");
    eprintln!("    --export-data            Print each column with its own length");
    eprintln!("    --tsv                    Print tab-separated rows");
    eprintln!("    -o, --output <FILE>      Save the table as document data");
    eprintln!("    --config <FILE>          Load settings from a TOML file");
    eprintln!("    -v                       More logging on stderr (repeat for more)");
    eprintln!("    -h, --help               Print this help message");
    eprintln!();
    eprintln!("Files ending in .csv, .tsv, .txt or .dat are imported as delimited text;");
    eprintln!("anything else is read as document data. With no export option the");
    eprintln!("document data is printed.");
}

fn max_level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn main() -> Result<()> {
    let args = parse_args();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(max_level(args.verbosity))
        .init();
    install_panic_hook();
    info!("raggedtab started");

    let config = match &args.config_path {
        Some(path) => Config::from_file(path).map_err(|e| {
            error!(error = %e, "failed to load config");
            e
        })?,
        None => Config::default(),
    };
    debug!(?config, "configuration");

    let mut file_io = FileIO::new(args.file_path.clone());
    if args.delimiter.is_some() || args.skip_lines > 0 || args.comment.is_some() {
        let defaults = ImportOptions::default();
        file_io = file_io.with_import(ImportOptions {
            delimiter: args.delimiter.unwrap_or(defaults.delimiter),
            skip_lines: args.skip_lines,
            comment: args.comment.clone(),
        });
    }

    let loaded = file_io.load(config.table.default_value).map_err(|e| {
        error!(error = %e, path = %file_io.file_name(), "failed to load table");
        e
    })?;
    for warning in &loaded.warnings {
        warn!("{}", warning);
    }

    let doc = Document::with_table(loaded.table, &config);
    let table = doc.table();
    let precision = config.export.precision;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.output {
        Output::Data => fileio::write_data(table, &mut out)?,
        Output::Matrix => writeln!(out, "{}", fileio::export_matrix_text(table, precision))?,
        Output::Ragged => writeln!(out, "{}", fileio::export_data_text(table, precision))?,
        Output::Tsv => fileio::export_tsv(table, precision, &mut out)?,
    }
    out.flush()?;

    if let Some(path) = &args.save_path {
        FileIO::save_to(path, table)?;
    }

    Ok(())
}
