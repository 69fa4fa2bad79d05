use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::error::{Result, TableError};
use crate::table::RaggedTable;
use crate::util::{format_value, letters_from_col, parse_count, parse_value};

/// Newest document data version this build reads and the one it writes
pub const CURRENT_TABLE_VERSION: u32 = 0;

/// How fields are separated in an imported text file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Char(u8),
    Space,
    Tab,
    /// Any run of whitespace; a line ends at its first non-numeric token
    Whitespace,
}

impl Delimiter {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "comma" | "," => Some(Delimiter::Char(b',')),
            "tab" | "\\t" => Some(Delimiter::Tab),
            "space" => Some(Delimiter::Space),
            "ws" | "whitespace" => Some(Delimiter::Whitespace),
            s if s.len() == 1 => Some(Delimiter::Char(s.as_bytes()[0])),
            _ => None,
        }
    }

    fn byte(&self) -> Option<u8> {
        match self {
            Delimiter::Char(c) => Some(*c),
            Delimiter::Space => Some(b' '),
            Delimiter::Tab => Some(b'\t'),
            Delimiter::Whitespace => None,
        }
    }
}

/// Options for reading delimited text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    pub delimiter: Delimiter,
    /// Lines dropped from the top before anything is parsed
    pub skip_lines: usize,
    /// Lines starting with this prefix are ignored
    pub comment: Option<String>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            delimiter: Delimiter::Whitespace,
            skip_lines: 0,
            comment: None,
        }
    }
}

/// Detected file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Versioned column-major document data
    Data,
    Delimited(Delimiter),
}

impl FileFormat {
    /// Detect format from file extension
    fn from_extension(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => FileFormat::Delimited(Delimiter::Char(b',')),
            "tsv" => FileFormat::Delimited(Delimiter::Tab),
            "txt" | "dat" => FileFormat::Delimited(Delimiter::Whitespace),
            _ => FileFormat::Data,
        }
    }
}

// === Document data ===

/// Write `version colCount [label rowCount v1 .. vN]...`, one label token per column.
pub fn write_data<W: Write>(table: &RaggedTable, out: &mut W) -> Result<()> {
    write!(out, "{} {} ", CURRENT_TABLE_VERSION, table.data_col_count())?;
    for (i, column) in table.columns().iter().enumerate() {
        write!(out, "{} {} ", letters_from_col(i + 1), column.len())?;
        for value in column {
            write!(out, "{} ", format_value(*value, None))?;
        }
    }
    writeln!(out)?;
    Ok(())
}

/// Replace the contents of `table` with document data.
///
/// The whole text is parsed before the table is touched; listeners see one `DataReloaded`.
pub fn read_data(table: &mut RaggedTable, text: &str) -> Result<()> {
    let columns = parse_data(text)?;

    let mut table = table.pause_broadcast();
    table.remove_all_cols();
    for column in columns {
        table.append_col(Some(column))?;
    }
    Ok(())
}

fn parse_data(text: &str) -> Result<Vec<Vec<f64>>> {
    let mut tokens = text.split_whitespace();
    let mut next = |what: &str| {
        tokens
            .next()
            .ok_or_else(|| TableError::Parse(format!("table data ends before {}", what)))
    };

    let token = next("version")?;
    let found = token
        .parse::<u32>()
        .map_err(|_| TableError::Parse(format!("expected version but found '{}'", token)))?;
    if found > CURRENT_TABLE_VERSION {
        return Err(TableError::UnsupportedVersion {
            found,
            supported: CURRENT_TABLE_VERSION,
        });
    }

    let col_count = parse_count(next("column count")?, "column count")?;
    let mut columns = Vec::new();
    for _ in 0..col_count {
        let _label = next("column label")?;
        let rows = parse_count(next("row count")?, "row count")?;
        let mut column = Vec::new();
        for _ in 0..rows {
            column.push(parse_value(next("value")?)?);
        }
        columns.push(column);
    }
    Ok(columns)
}

// === Export ===

/// `colCount rowCount` followed by every row of the dense matrix; holes are written as 0
pub fn export_matrix_text(table: &RaggedTable, precision: Option<usize>) -> String {
    let rows = table.max_row_count();
    let mut out = format!("{} {} ", table.data_col_count(), rows);
    for row in 1..=rows {
        for value in table.get_row(row) {
            match value {
                Some(v) => out.push_str(&format_value(v, precision)),
                None => out.push('0'),
            }
            out.push(' ');
        }
    }
    out
}

/// `colCount [rowCount v1 .. vN]...`, keeping each column's length
pub fn export_data_text(table: &RaggedTable, precision: Option<usize>) -> String {
    let mut out = format!("{} ", table.data_col_count());
    for column in table.columns() {
        out.push_str(&column.len().to_string());
        out.push(' ');
        for value in column {
            out.push_str(&format_value(*value, precision));
            out.push(' ');
        }
    }
    out
}

/// Tab-separated rendering, one table row per line, holes left empty
pub fn export_tsv<W: Write>(table: &RaggedTable, precision: Option<usize>, out: W) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_writer(out);

    for row in 1..=table.max_row_count() {
        let record: Vec<String> = table
            .get_row(row)
            .into_iter()
            .map(|v| v.map(|v| format_value(v, precision)).unwrap_or_default())
            .collect();
        writer
            .write_record(&record)
            .map_err(|e| TableError::Io(io::Error::new(io::ErrorKind::Other, e)))?;
    }

    writer.flush()?;
    Ok(())
}

// === Import ===

/// Result of an import, including any warnings
pub struct ImportResult {
    pub table: RaggedTable,
    pub warnings: Vec<String>,
}

/// Build a table from delimited text.
///
/// Each kept line is one row. A field that does not parse as a number leaves its cell empty
/// but still occupies a column; writes past the end of a column pad with `default_value`.
pub fn import_delimited(text: &str, options: &ImportOptions, default_value: f64) -> Result<ImportResult> {
    let mut table = RaggedTable::new(default_value);
    let mut warnings = Vec::new();
    let mut skipped_fields = 0;

    let lines: Vec<&str> = text
        .lines()
        .skip(options.skip_lines)
        .filter(|line| !line.trim().is_empty())
        .filter(|line| match &options.comment {
            Some(prefix) => !line.starts_with(prefix.as_str()),
            None => true,
        })
        .collect();

    let mut row = 0;
    match options.delimiter.byte() {
        None => {
            for line in &lines {
                let values: Vec<f64> = line
                    .split_whitespace()
                    .map_while(|token| token.parse::<f64>().ok())
                    .collect();
                if values.is_empty() {
                    skipped_fields += 1;
                    continue;
                }
                row += 1;
                for (i, value) in values.into_iter().enumerate() {
                    set_imported(&mut table, row, i + 1, value)?;
                }
            }
        }
        Some(delim) => {
            let joined = lines.join("\n");
            let mut reader = csv::ReaderBuilder::new()
                .delimiter(delim)
                .has_headers(false)
                .flexible(true)
                .trim(csv::Trim::Fields)
                .from_reader(joined.as_bytes());

            for record in reader.records() {
                let record = record.map_err(|e| TableError::Parse(e.to_string()))?;
                row += 1;
                for (i, field) in record.iter().enumerate() {
                    match field.parse::<f64>() {
                        Ok(value) => set_imported(&mut table, row, i + 1, value)?,
                        Err(_) => skipped_fields += 1,
                    }
                }
            }
        }
    }

    if skipped_fields > 0 {
        warnings.push(match options.delimiter {
            Delimiter::Whitespace => format!("Skipped {} line(s) with no leading number", skipped_fields),
            _ => format!("Skipped {} non-numeric field(s)", skipped_fields),
        });
    }

    Ok(ImportResult { table, warnings })
}

fn set_imported(table: &mut RaggedTable, row: usize, col: usize, value: f64) -> Result<()> {
    while table.data_col_count() < col {
        table.append_col(None)?;
    }
    table.set_element(row, col, value)
}

// === Files ===

pub struct FileIO {
    pub file_path: PathBuf,
    format: FileFormat,
    import: Option<ImportOptions>,
}

impl FileIO {
    pub fn new(file_path: PathBuf) -> Self {
        let format = FileFormat::from_extension(&file_path);
        Self { file_path, format, import: None }
    }

    /// Read the file as delimited text regardless of its extension
    pub fn with_import(mut self, options: ImportOptions) -> Self {
        self.format = FileFormat::Delimited(options.delimiter);
        self.import = Some(options);
        self
    }

    pub fn file_name(&self) -> String {
        self.file_path.display().to_string()
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Load the file. A missing file yields an empty table and a warning.
    pub fn load(&self, default_value: f64) -> Result<ImportResult> {
        if !self.file_path.exists() {
            warn!(path = %self.file_path.display(), "file does not exist; starting empty");
            return Ok(ImportResult {
                table: RaggedTable::new(default_value),
                warnings: vec![format!("New file: {}", self.file_path.display())],
            });
        }

        let text = std::fs::read_to_string(&self.file_path)?;
        let result = match self.format {
            FileFormat::Data => {
                let mut table = RaggedTable::new(default_value);
                read_data(&mut table, &text)?;
                ImportResult { table, warnings: Vec::new() }
            }
            FileFormat::Delimited(delimiter) => {
                let options = self.import.clone().unwrap_or(ImportOptions {
                    delimiter,
                    ..ImportOptions::default()
                });
                import_delimited(&text, &options, default_value)?
            }
        };

        info!(
            path = %self.file_path.display(),
            cols = result.table.data_col_count(),
            rows = result.table.max_row_count(),
            "loaded table"
        );
        Ok(result)
    }

    /// Write document data to `path` through a temporary file in the same directory, so a
    /// failed write never truncates the existing file
    pub fn save_to(path: &Path, table: &RaggedTable) -> Result<()> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let tmp = NamedTempFile::new_in(&dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            write_data(table, &mut writer)?;
            writer.flush()?;
        }
        tmp.persist(path).map_err(|e| TableError::Io(e.error))?;

        info!(path = %path.display(), cols = table.data_col_count(), "saved table");
        Ok(())
    }

    pub fn save(&self, table: &RaggedTable) -> Result<()> {
        Self::save_to(&self.file_path, table)
    }

    /// Write the tab-separated rendering to a file
    pub fn export_tsv_to(path: &Path, table: &RaggedTable, precision: Option<usize>) -> Result<()> {
        let file = File::create(path)?;
        export_tsv(table, precision, BufWriter::new(file))
    }
}
