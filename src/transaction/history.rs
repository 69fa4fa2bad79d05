use tracing::debug;

use super::transaction::UndoCommand;
use crate::error::Result;
use crate::table::RaggedTable;

/// What the history is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UndoState {
    #[default]
    Idle,
    ApplyingUndo,
    ApplyingRedo,
}

/// A recorded command, tagged with the direction it will be applied in
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub command: UndoCommand,
    /// True once the entry has been undone and now re-applies the edit
    pub is_redo: bool,
}

/// Linear undo/redo history with a redo cursor.
///
/// Entries before `first_redo_index` (1-based) are done and can be undone; entries at or after
/// it have been undone and can be redone.
#[derive(Debug)]
pub struct UndoHistory {
    entries: Vec<HistoryEntry>,
    first_redo_index: usize,
    state: UndoState,
}

impl UndoHistory {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            first_redo_index: 1,
            state: UndoState::Idle,
        }
    }

    /// Record a command.
    ///
    /// While idle this discards the redo tail and appends. While an undo or redo is being
    /// applied, the command replaces the entry that is being processed.
    pub fn record(&mut self, command: UndoCommand) {
        match self.state {
            UndoState::Idle => {
                self.entries.truncate(self.first_redo_index - 1);
                self.entries.push(HistoryEntry { command, is_redo: false });
                self.first_redo_index += 1;
            }
            UndoState::ApplyingUndo => {
                debug_assert!(self.first_redo_index > 1);
                self.first_redo_index -= 1;
                self.entries[self.first_redo_index - 1] = HistoryEntry { command, is_redo: true };
            }
            UndoState::ApplyingRedo => {
                debug_assert!(self.first_redo_index <= self.entries.len());
                self.entries[self.first_redo_index - 1] = HistoryEntry { command, is_redo: false };
                self.first_redo_index += 1;
            }
        }
    }

    /// Undo the most recent done command. Returns `Ok(false)` if there was nothing to undo.
    ///
    /// # Panics
    ///
    /// Panics if called while an undo or redo is already being applied.
    pub fn undo(&mut self, table: &mut RaggedTable) -> Result<bool> {
        self.assert_idle("undo");
        let command = match self.peek_undo() {
            Some(entry) => entry.command.clone(),
            None => return Ok(false),
        };
        debug!(command = command.label(), index = self.first_redo_index - 1, "undo");
        self.apply(UndoState::ApplyingUndo, &command, table)
    }

    /// Redo the first undone command. Returns `Ok(false)` if there was nothing to redo.
    ///
    /// # Panics
    ///
    /// Panics if called while an undo or redo is already being applied.
    pub fn redo(&mut self, table: &mut RaggedTable) -> Result<bool> {
        self.assert_idle("redo");
        let command = match self.peek_redo() {
            Some(entry) => entry.command.clone(),
            None => return Ok(false),
        };
        debug!(command = command.label(), index = self.first_redo_index, "redo");
        self.apply(UndoState::ApplyingRedo, &command, table)
    }

    fn apply(&mut self, state: UndoState, command: &UndoCommand, table: &mut RaggedTable) -> Result<bool> {
        self.state = state;
        let outcome = command.undo(table).map(|replacement| self.record(replacement));
        self.state = UndoState::Idle;
        outcome.map(|()| true)
    }

    fn assert_idle(&self, action: &str) {
        if self.state != UndoState::Idle {
            panic!("{} called while {:?}", action, self.state);
        }
    }

    pub fn has_undo(&self) -> bool {
        self.first_redo_index > 1
    }

    pub fn has_redo(&self) -> bool {
        self.first_redo_index <= self.entries.len()
    }

    /// Peek at the next undo entry without applying it
    pub fn peek_undo(&self) -> Option<&HistoryEntry> {
        if self.has_undo() {
            self.entries.get(self.first_redo_index - 2)
        } else {
            None
        }
    }

    /// Peek at the next redo entry without applying it
    pub fn peek_redo(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.first_redo_index - 1)
    }

    pub fn first_redo_index(&self) -> usize {
        self.first_redo_index
    }

    pub fn state(&self) -> UndoState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry, e.g. when the document is reverted
    pub fn clear(&mut self) {
        self.assert_idle("clear");
        self.entries.clear();
        self.first_redo_index = 1;
    }
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new()
    }
}
