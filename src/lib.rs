//! Ragged numeric tables: independently sized float columns with selection classification,
//! linear undo/redo and a clipboard format that keeps each column's length.

pub mod clipboard;
pub mod config;
pub mod document;
pub mod error;
pub mod fileio;
pub mod selection;
pub mod table;
pub mod transaction;
pub mod util;

pub use clipboard::{Clipboard, ClipboardPayload, CopiedSelection};
pub use config::Config;
pub use document::Document;
pub use error::{Result, TableError};
pub use fileio::{Delimiter, FileIO, ImportOptions};
pub use selection::{Selection, SelectionArea, SelectionType};
pub use table::{Cell, ChangeEvent, RaggedTable, TableShape};
pub use transaction::{Axis, UndoCommand, UndoHistory};
