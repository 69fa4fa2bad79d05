pub mod history;
pub mod transaction;

pub use history::{HistoryEntry, UndoHistory, UndoState};
pub use transaction::{Axis, UndoCommand};
