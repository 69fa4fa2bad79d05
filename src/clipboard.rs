use tracing::debug;

use crate::error::{Result, TableError};
use crate::selection::{SelectionArea, SelectionType};
use crate::table::RaggedTable;
use crate::util::{format_value, parse_count, parse_value};

/// A copied region that remembers the length of every column it came from.
///
/// The tagged text form is `shapeTag colCount [rowCount v1 .. vN]...`, values separated by
/// whitespace. Unlike a flat grid it keeps short columns short on paste.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipboardPayload {
    pub shape: SelectionType,
    pub columns: Vec<Vec<f64>>,
}

impl ClipboardPayload {
    pub fn new(shape: SelectionType, columns: Vec<Vec<f64>>) -> Self {
        Self { shape, columns }
    }

    /// Copy the part of each column that falls inside `area`.
    pub fn from_table(table: &RaggedTable, shape: SelectionType, area: SelectionArea) -> Result<Self> {
        let mut columns = Vec::with_capacity(area.cols);
        for col in area.start_col..area.start_col + area.cols {
            let column = table.get_col(col)?;
            let first = (area.start_row - 1).min(column.len());
            let count = area.rows.min(column.len() - first);
            columns.push(column[first..first + count].to_vec());
        }
        Ok(Self { shape, columns })
    }

    pub fn col_count(&self) -> usize {
        self.columns.len()
    }

    /// Length of the longest column
    pub fn max_rows(&self) -> usize {
        self.columns.iter().map(|c| c.len()).max().unwrap_or(0)
    }

    pub fn value_count(&self) -> usize {
        self.columns.iter().map(|c| c.len()).sum()
    }

    pub fn row_counts(&self) -> Vec<usize> {
        self.columns.iter().map(|c| c.len()).collect()
    }

    pub fn encode(&self) -> String {
        let mut out = format!("{} {} ", self.shape.tag(), self.columns.len());
        for column in &self.columns {
            out.push_str(&column.len().to_string());
            out.push(' ');
            for value in column {
                out.push_str(&format_value(*value, None));
                out.push(' ');
            }
        }
        out
    }

    pub fn decode(text: &str) -> Result<Self> {
        let mut tokens = text.split_whitespace();
        let mut next = |what: &str| {
            tokens
                .next()
                .ok_or_else(|| TableError::Parse(format!("clipboard data ends before {}", what)))
        };

        let tag = next("shape tag")?;
        let shape = tag
            .parse::<u8>()
            .ok()
            .and_then(SelectionType::from_tag)
            .ok_or_else(|| TableError::Parse(format!("unknown selection tag '{}'", tag)))?;
        let col_count = parse_count(next("column count")?, "column count")?;

        // counts are untrusted, so nothing is reserved from them
        let mut columns = Vec::new();
        for _ in 0..col_count {
            let rows = parse_count(next("row count")?, "row count")?;
            let mut column = Vec::new();
            for _ in 0..rows {
                column.push(parse_value(next("value")?)?);
            }
            columns.push(column);
        }

        Ok(Self { shape, columns })
    }

    /// Tab/newline rendering for plain-text consumers; short columns leave empty fields.
    pub fn to_plain_text(&self, precision: Option<usize>) -> String {
        let mut out = String::new();
        for row in 0..self.max_rows() {
            let line: Vec<String> = self
                .columns
                .iter()
                .map(|c| c.get(row).map(|v| format_value(*v, precision)).unwrap_or_default())
                .collect();
            out.push_str(&line.join("\t"));
            out.push('\n');
        }
        out
    }

    /// Read tab-separated text from another program.
    ///
    /// Each column keeps its values down to the first empty or non-numeric field.
    pub fn from_plain_text(text: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::Fields)
            .from_reader(text.as_bytes());

        let mut columns: Vec<Vec<f64>> = Vec::new();
        let mut open: Vec<bool> = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(|e| TableError::Parse(e.to_string()))?;
            for (col, field) in record.iter().enumerate() {
                if col >= columns.len() {
                    columns.push(Vec::new());
                    // a column that starts below the first row has a hole at the top
                    open.push(row == 0);
                }
                if !open[col] {
                    continue;
                }
                match field.parse::<f64>() {
                    Ok(value) => columns[col].push(value),
                    Err(_) => open[col] = false,
                }
            }
            for still_open in open.iter_mut().skip(record.len()) {
                *still_open = false;
            }
        }

        while columns.last().map(|c| c.is_empty()).unwrap_or(false) {
            columns.pop();
        }
        if columns.is_empty() {
            return Err(TableError::Parse("clipboard text holds no numbers".to_string()));
        }
        Ok(Self::new(SelectionType::Elements, columns))
    }
}

/// The result of a copy: plain text for other programs and the structured payload for us
#[derive(Debug, Clone, PartialEq)]
pub struct CopiedSelection {
    pub text: String,
    pub payload: ClipboardPayload,
}

/// In-process clipboard register, optionally mirrored to the system clipboard as plain text
#[derive(Debug, Default)]
pub struct Clipboard {
    copied: Option<CopiedSelection>,
    use_system: bool,
}

impl Clipboard {
    pub fn new(use_system: bool) -> Self {
        Self { copied: None, use_system }
    }

    /// Keep `copied` in the register. The register is updated even when mirroring to the
    /// system clipboard fails; that failure is still returned.
    pub fn store(&mut self, copied: CopiedSelection) -> Result<()> {
        debug!(
            cols = copied.payload.col_count(),
            values = copied.payload.value_count(),
            "stored clipboard payload"
        );
        let copied = self.copied.insert(copied);
        if self.use_system {
            copy_to_system_clipboard(&copied.text)?;
        }
        Ok(())
    }

    pub fn uses_system(&self) -> bool {
        self.use_system
    }

    pub fn payload(&self) -> Option<&ClipboardPayload> {
        self.copied.as_ref().map(|c| &c.payload)
    }

    pub fn text(&self) -> Option<&str> {
        self.copied.as_ref().map(|c| c.text.as_str())
    }

    pub fn clear(&mut self) {
        self.copied = None;
    }

    /// Replace the register with whatever plain text the system clipboard holds
    pub fn pull_from_system(&mut self) -> Result<&ClipboardPayload> {
        let text = paste_from_system_clipboard()?;
        if text.is_empty() {
            return Err(TableError::Clipboard("system clipboard is empty".to_string()));
        }
        let payload = ClipboardPayload::from_plain_text(&text)?;
        let copied = self.copied.insert(CopiedSelection { text, payload });
        Ok(&copied.payload)
    }
}

/// A command-line clipboard tool: how to feed it text and how to read text back.
#[cfg(target_os = "linux")]
struct ClipTool {
    write: (&'static str, &'static [&'static str]),
    read: (&'static str, &'static [&'static str]),
}

/// Tried in order; these work without a windowing toolkit in the process.
#[cfg(target_os = "linux")]
const CLIP_TOOLS: [ClipTool; 3] = [
    ClipTool {
        write: ("wl-copy", &[]),
        read: ("wl-paste", &["--no-newline"]),
    },
    ClipTool {
        write: ("xclip", &["-selection", "clipboard"]),
        read: ("xclip", &["-selection", "clipboard", "-o"]),
    },
    ClipTool {
        write: ("xsel", &["--clipboard", "--input"]),
        read: ("xsel", &["--clipboard", "--output"]),
    },
];

#[cfg(target_os = "linux")]
fn no_clip_tool() -> TableError {
    TableError::Clipboard("no clipboard tool found (install wl-clipboard, xclip or xsel)".to_string())
}

#[cfg(target_os = "linux")]
fn copy_to_system_clipboard(text: &str) -> Result<()> {
    use std::io::Write;
    use std::process::{Command, Stdio};

    for ClipTool { write: (program, args), .. } in &CLIP_TOOLS {
        let Ok(mut child) = Command::new(program)
            .args(*args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        else {
            continue;
        };
        let written = child
            .stdin
            .take()
            .map(|mut stdin| stdin.write_all(text.as_bytes()).is_ok())
            .unwrap_or(false);
        // stdin is closed by now, so the tool can finish
        if written && child.wait().map(|s| s.success()).unwrap_or(false) {
            debug!(tool = program, "copied to system clipboard");
            return Ok(());
        }
    }
    Err(no_clip_tool())
}

#[cfg(target_os = "linux")]
fn paste_from_system_clipboard() -> Result<String> {
    use std::process::Command;

    for ClipTool { read: (program, args), .. } in &CLIP_TOOLS {
        match Command::new(program).args(*args).output() {
            Ok(output) if output.status.success() => {
                return String::from_utf8(output.stdout)
                    .map_err(|_| TableError::Clipboard("clipboard text is not UTF-8".to_string()));
            }
            _ => continue,
        }
    }
    Err(no_clip_tool())
}

#[cfg(not(target_os = "linux"))]
fn copy_to_system_clipboard(text: &str) -> Result<()> {
    arboard::Clipboard::new()
        .and_then(|mut clipboard| clipboard.set_text(text))
        .map_err(|e| TableError::Clipboard(e.to_string()))
}

#[cfg(not(target_os = "linux"))]
fn paste_from_system_clipboard() -> Result<String> {
    arboard::Clipboard::new()
        .and_then(|mut clipboard| clipboard.get_text())
        .map_err(|e| TableError::Clipboard(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ragged() -> ClipboardPayload {
        ClipboardPayload::new(
            SelectionType::Cols,
            vec![vec![1.0, 2.0, 3.0, 4.0], vec![5.5, 6.0], vec![7.0, 8.0, 9.0, 10.0, 11.25]],
        )
    }

    #[test]
    fn test_encode_layout() {
        let payload = ClipboardPayload::new(SelectionType::Elements, vec![vec![1.5, 2.0], vec![3.0]]);
        assert_eq!(payload.encode(), "3 2 2 1.5 2 1 3 ");
    }

    #[test]
    fn test_decode_preserves_ragged_lengths() {
        let payload = ragged();
        let decoded = ClipboardPayload::decode(&payload.encode()).unwrap();
        assert_eq!(decoded, payload);
        assert_eq!(decoded.row_counts(), vec![4, 2, 5]);
    }

    #[test]
    fn test_decode_truncated_is_parse_error() {
        assert!(matches!(
            ClipboardPayload::decode("2 2 3 1 2 3 2 4"),
            Err(TableError::Parse(_))
        ));
        assert!(matches!(ClipboardPayload::decode("7 1 1 1"), Err(TableError::Parse(_))));
        assert!(matches!(ClipboardPayload::decode(""), Err(TableError::Parse(_))));
    }

    #[test]
    fn test_decode_huge_counts_fail_cleanly() {
        assert!(matches!(
            ClipboardPayload::decode("2 18446744073709551615"),
            Err(TableError::Parse(_))
        ));
        assert!(matches!(
            ClipboardPayload::decode("2 1 18446744073709551615 1"),
            Err(TableError::Parse(_))
        ));
        assert!(matches!(
            ClipboardPayload::decode("2 1 18446744073709551616 1"),
            Err(TableError::Parse(_))
        ));
    }

    #[test]
    fn test_plain_text_leaves_holes_blank() {
        let payload = ClipboardPayload::new(SelectionType::Elements, vec![vec![1.0, 2.0], vec![3.0]]);
        assert_eq!(payload.to_plain_text(None), "1\t3\n2\t\n");
        assert_eq!(payload.to_plain_text(Some(1)), "1.0\t3.0\n2.0\t\n");
    }

    #[test]
    fn test_from_plain_text_stops_columns_at_holes() {
        let payload = ClipboardPayload::from_plain_text("1\t3\n2\t\n4\t5\n").unwrap();
        assert_eq!(payload.shape, SelectionType::Elements);
        assert_eq!(payload.columns, vec![vec![1.0, 2.0, 4.0], vec![3.0]]);
    }

    #[test]
    fn test_from_plain_text_rejects_words() {
        assert!(ClipboardPayload::from_plain_text("hello\tworld\n").is_err());
    }

    #[test]
    fn test_from_table_clips_short_columns() {
        let table = RaggedTable::with_columns(
            vec![vec![1.0, 2.0, 3.0], vec![4.0], vec![5.0, 6.0, 7.0, 8.0]],
            0.0,
        );
        let area = SelectionArea { rows: 3, cols: 3, start_row: 2, start_col: 1 };
        let payload = ClipboardPayload::from_table(&table, SelectionType::Elements, area).unwrap();
        assert_eq!(payload.columns, vec![vec![2.0, 3.0], vec![], vec![6.0, 7.0, 8.0]]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_clip_tools_read_back_what_they_write() {
        for tool in &CLIP_TOOLS {
            let (writer, write_args) = tool.write;
            let (reader, read_args) = tool.read;
            if writer == "wl-copy" {
                assert_eq!(reader, "wl-paste");
                continue;
            }
            // same program, same selection, opposite direction
            assert_eq!(writer, reader);
            assert!(write_args.iter().any(|a| a.contains("clipboard")));
            assert!(read_args.iter().any(|a| a.contains("clipboard")));
            assert_ne!(write_args, read_args);
        }
    }

    #[test]
    fn test_register_keeps_last_copy() {
        let mut clipboard = Clipboard::new(false);
        assert!(clipboard.payload().is_none());

        let payload = ragged();
        let text = payload.to_plain_text(None);
        clipboard.store(CopiedSelection { text: text.clone(), payload: payload.clone() }).unwrap();

        assert_eq!(clipboard.payload(), Some(&payload));
        assert_eq!(clipboard.text(), Some(text.as_str()));
        clipboard.clear();
        assert!(clipboard.payload().is_none());
    }
}
