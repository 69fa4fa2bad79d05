use thiserror::Error;

/// Errors surfaced by the table core.
///
/// Index and shape errors are reported before any column is touched, so a failed call leaves the
/// table as it was.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("{what} index {index} out of range (1..={max})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        max: usize,
    },

    #[error("clipboard data does not match the selection: {0}")]
    ShapeMismatch(String),

    #[error("nothing is selected")]
    NoSelection,

    #[error("select at least {0} column(s)")]
    MustSelectColumns(usize),

    #[error("table data version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("clipboard error: {0}")]
    Clipboard(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TableError>;

impl TableError {
    pub(crate) fn column(index: usize, max: usize) -> Self {
        TableError::IndexOutOfRange { what: "column", index, max }
    }

    pub(crate) fn row(index: usize, max: usize) -> Self {
        TableError::IndexOutOfRange { what: "row", index, max }
    }
}
