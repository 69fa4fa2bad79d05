use crate::error::{Result, TableError};
use crate::table::{Cell, RaggedTable};

/// Which part of the table a multi-cell command covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Whole rows across every column
    Rows,
    /// Whole columns
    Cols,
    /// A rectangle of individual elements
    Elements,
}

/// Represents a reversible operation on the table.
///
/// Each variant holds only what it needs to invert itself. Undoing a command returns its
/// replacement: the command that re-applies the original edit.
#[derive(Debug, Clone, PartialEq)]
pub enum UndoCommand {
    /// An existing cell was overwritten; holds the value it had before
    ElementChange { cell: Cell, old_value: f64 },
    /// A cell was appended or inserted; undo removes it
    ElementAppend { cell: Cell },
    /// A cell was removed; undo reinserts `value`
    ElementCut { cell: Cell, value: f64 },
    /// A region was overwritten; `values` holds the prior contents, one entry per column
    ElementsChange {
        start: Cell,
        end: Cell,
        axis: Axis,
        values: Vec<Vec<f64>>,
    },
    /// A region was inserted; undo deletes it
    ElementsInsert { start: Cell, end: Cell, axis: Axis },
    /// A region was deleted; `values` holds what was removed, one entry per column
    ElementsCut {
        start: Cell,
        end: Cell,
        axis: Axis,
        values: Vec<Vec<f64>>,
    },
    /// Row `from` was moved to `to`
    RowMove { from: usize, to: usize },
    /// Column `from` was moved to `to`
    ColMove { from: usize, to: usize },
    /// Several commands applied in order, undone in reverse
    Batch(Vec<UndoCommand>),
}

impl UndoCommand {
    /// Capture a region that is about to be deleted.
    pub fn elements_cut(table: &RaggedTable, start: Cell, end: Cell, axis: Axis) -> Result<Self> {
        let values = capture(table, start, end, axis)?;
        Ok(UndoCommand::ElementsCut { start, end, axis, values })
    }

    /// Capture a region that is about to be overwritten.
    pub fn elements_change(table: &RaggedTable, start: Cell, end: Cell, axis: Axis) -> Result<Self> {
        let values = capture(table, start, end, axis)?;
        Ok(UndoCommand::ElementsChange { start, end, axis, values })
    }

    pub fn label(&self) -> &'static str {
        match self {
            UndoCommand::ElementChange { .. } => "change element",
            UndoCommand::ElementAppend { .. } => "add element",
            UndoCommand::ElementCut { .. } => "cut element",
            UndoCommand::ElementsChange { .. } => "change elements",
            UndoCommand::ElementsInsert { .. } => "insert",
            UndoCommand::ElementsCut { .. } => "cut",
            UndoCommand::RowMove { .. } => "move row",
            UndoCommand::ColMove { .. } => "move column",
            UndoCommand::Batch(_) => "paste",
        }
    }

    /// Number of cells this command carries, for diagnostics
    pub fn estimated_size(&self) -> usize {
        match self {
            UndoCommand::ElementsChange { values, .. } | UndoCommand::ElementsCut { values, .. } => {
                values.iter().map(|c| c.len()).sum()
            }
            UndoCommand::Batch(cmds) => cmds.iter().map(|c| c.estimated_size()).sum(),
            _ => 1,
        }
    }

    /// Apply the inverse of this command and return the command that reverses it again.
    pub fn undo(&self, table: &mut RaggedTable) -> Result<UndoCommand> {
        match self {
            UndoCommand::ElementChange { cell, old_value } => {
                let current = table
                    .get_element(cell.row, cell.col)?
                    .unwrap_or(table.default_value());
                table.set_element(cell.row, cell.col, *old_value)?;
                Ok(UndoCommand::ElementChange { cell: *cell, old_value: current })
            }
            UndoCommand::ElementAppend { cell } => {
                let value = table
                    .get_element(cell.row, cell.col)?
                    .ok_or_else(|| TableError::row(cell.row, table.data_row_count(cell.col).unwrap_or(0)))?;
                table.remove_element(cell.row, cell.col)?;
                Ok(UndoCommand::ElementCut { cell: *cell, value })
            }
            UndoCommand::ElementCut { cell, value } => {
                table.insert_element(cell.row, cell.col, *value)?;
                Ok(UndoCommand::ElementAppend { cell: *cell })
            }
            UndoCommand::ElementsChange { start, end, axis, values } => {
                let current = capture(table, *start, *end, *axis)?;
                replace_region(table, *start, *axis, &current, values)?;
                Ok(UndoCommand::ElementsChange {
                    start: *start,
                    end: *end,
                    axis: *axis,
                    values: current,
                })
            }
            UndoCommand::ElementsInsert { start, end, axis } => {
                let values = capture(table, *start, *end, *axis)?;
                remove_region(table, *start, *end, *axis)?;
                Ok(UndoCommand::ElementsCut {
                    start: *start,
                    end: *end,
                    axis: *axis,
                    values,
                })
            }
            UndoCommand::ElementsCut { start, end, axis, values } => {
                insert_region(table, *start, *axis, values)?;
                Ok(UndoCommand::ElementsInsert {
                    start: *start,
                    end: *end,
                    axis: *axis,
                })
            }
            UndoCommand::RowMove { from, to } => {
                table.move_row(*to, *from)?;
                Ok(UndoCommand::RowMove { from: *to, to: *from })
            }
            UndoCommand::ColMove { from, to } => {
                table.move_col(*to, *from)?;
                Ok(UndoCommand::ColMove { from: *to, to: *from })
            }
            UndoCommand::Batch(cmds) => {
                // the replacements come out last-first, which is the order they must be undone in
                let mut replacements = Vec::with_capacity(cmds.len());
                for cmd in cmds.iter().rev() {
                    replacements.push(cmd.undo(table)?);
                }
                Ok(UndoCommand::Batch(replacements))
            }
        }
    }
}

/// Collect the values of a region, one vector per column.
///
/// Row and element regions hold the part of each column that falls inside the rows; short
/// columns contribute fewer values. Column regions hold whole columns.
fn capture(table: &RaggedTable, start: Cell, end: Cell, axis: Axis) -> Result<Vec<Vec<f64>>> {
    let (first_col, last_col) = match axis {
        Axis::Rows => (1, table.data_col_count()),
        Axis::Cols | Axis::Elements => (start.col, end.col),
    };

    let mut values = Vec::new();
    for col in first_col..=last_col {
        let column = table.get_col(col)?;
        let segment = match axis {
            Axis::Cols => column.to_vec(),
            Axis::Rows | Axis::Elements => {
                let last = end.row.min(column.len());
                if start.row > last {
                    Vec::new()
                } else {
                    column[start.row - 1..last].to_vec()
                }
            }
        };
        values.push(segment);
    }
    Ok(values)
}

fn remove_region(table: &mut RaggedTable, start: Cell, end: Cell, axis: Axis) -> Result<()> {
    match axis {
        Axis::Rows => {
            for _ in start.row..=end.row {
                if start.row > table.max_row_count() {
                    break;
                }
                table.remove_row(start.row)?;
            }
        }
        Axis::Cols => {
            for _ in start.col..=end.col {
                table.remove_col(start.col)?;
            }
        }
        Axis::Elements => {
            for col in start.col..=end.col {
                for _ in start.row..=end.row {
                    if table.cell_valid(start.row, col) {
                        table.remove_element(start.row, col)?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn insert_region(table: &mut RaggedTable, start: Cell, axis: Axis, values: &[Vec<f64>]) -> Result<()> {
    match axis {
        Axis::Cols => {
            for (i, column) in values.iter().enumerate() {
                table.insert_col(start.col + i, Some(column.clone()))?;
            }
        }
        Axis::Rows | Axis::Elements => {
            let first_col = if axis == Axis::Rows { 1 } else { start.col };
            for (i, column) in values.iter().enumerate() {
                for (j, value) in column.iter().enumerate() {
                    table.insert_element(start.row + j, first_col + i, *value)?;
                }
            }
        }
    }
    Ok(())
}

/// Swap the `current` contents of a region for `replacement`, column by column.
fn replace_region(
    table: &mut RaggedTable,
    start: Cell,
    axis: Axis,
    current: &[Vec<f64>],
    replacement: &[Vec<f64>],
) -> Result<()> {
    let (first_col, first_row) = match axis {
        Axis::Rows => (1, start.row),
        Axis::Elements => (start.col, start.row),
        Axis::Cols => (start.col, 1),
    };

    for (i, (now, old)) in current.iter().zip(replacement).enumerate() {
        let col = first_col + i;
        for _ in 0..now.len() {
            table.remove_element(first_row, col)?;
        }
        for (j, value) in old.iter().enumerate() {
            table.insert_element(first_row + j, col, *value)?;
        }
    }
    Ok(())
}
