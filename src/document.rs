use tracing::{debug, warn};

use crate::clipboard::{Clipboard, ClipboardPayload, CopiedSelection};
use crate::config::Config;
use crate::error::{Result, TableError};
use crate::selection::{Selection, SelectionArea, SelectionType};
use crate::table::{Cell, ChangeEvent, RaggedTable, SubscriptionId};
use crate::transaction::{Axis, UndoCommand, UndoHistory};
use crate::util::format_value;


/// One open table: the data, its undo history, the current selection and the clipboard register.
///
/// Every editing command goes through here so that it is paired with an undo command.
#[derive(Debug)]
pub struct Document {
    table: RaggedTable,
    history: UndoHistory,
    selection: Selection,
    clipboard: Clipboard,
    precision: Option<usize>,
}

impl Document {
    pub fn new(config: &Config) -> Self {
        Self::with_table(RaggedTable::new(config.table.default_value), config)
    }

    pub fn with_table(table: RaggedTable, config: &Config) -> Self {
        Self {
            table,
            history: UndoHistory::new(),
            selection: Selection::new(),
            clipboard: Clipboard::new(config.clipboard.system),
            precision: config.export.precision,
        }
    }

    pub fn table(&self) -> &RaggedTable {
        &self.table
    }

    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    /// Swap in freshly loaded data; history and selection start over
    pub fn replace_table(&mut self, table: RaggedTable) -> RaggedTable {
        self.history.clear();
        self.selection.clear();
        std::mem::replace(&mut self.table, table)
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&ChangeEvent) + 'static,
    {
        self.table.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.table.unsubscribe(id)
    }

    pub fn selection_type(&self) -> SelectionType {
        self.selection.classify(self.table.shape())
    }

    pub fn selection_area(&self) -> Option<SelectionArea> {
        self.selection.area()
    }

    fn classified_area(&self) -> Result<(SelectionType, SelectionArea)> {
        match (self.selection_type(), self.selection.area()) {
            (SelectionType::None, _) | (_, None) => Err(TableError::NoSelection),
            (kind, Some(area)) => Ok((kind, area)),
        }
    }

    /// The area without the blank row/column, and never wider than the data
    fn data_area(&self, area: SelectionArea) -> SelectionArea {
        let mut area = area.trimmed(self.table.shape());
        let data_cols = self.table.data_col_count();
        if area.start_col > data_cols {
            area.cols = 0;
        } else {
            area.cols = area.cols.min(data_cols - area.start_col + 1);
        }
        area
    }

    fn record(&mut self, command: UndoCommand) {
        debug!(command = command.label(), size = command.estimated_size(), "recorded");
        self.history.record(command);
    }

    // === Undo ===

    /// Returns `Ok(false)` when there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool> {
        self.history.undo(&mut self.table)
    }

    /// Returns `Ok(false)` when there is nothing to redo.
    pub fn redo(&mut self) -> Result<bool> {
        self.history.redo(&mut self.table)
    }

    pub fn has_undo(&self) -> bool {
        self.history.has_undo()
    }

    pub fn has_redo(&self) -> bool {
        self.history.has_redo()
    }

    // === Editing ===

    /// Write one value as a user edit.
    ///
    /// Writing past the end of the column fills the gap with the default value; undo removes
    /// the whole run again.
    pub fn set_element(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        let len = self.table.data_row_count(col)?;
        if row == 0 {
            return Err(TableError::row(row, len + 1));
        }

        let cell = Cell::new(row, col);
        let command = if row <= len {
            let old_value = self.table.get(cell).unwrap_or(self.table.default_value());
            UndoCommand::ElementChange { cell, old_value }
        } else if row == len + 1 {
            UndoCommand::ElementAppend { cell }
        } else {
            UndoCommand::ElementsInsert {
                start: Cell::new(len + 1, col),
                end: cell,
                axis: Axis::Elements,
            }
        };

        self.table.set_element(row, col, value)?;
        self.record(command);
        Ok(())
    }

    /// Insert one element into a single column and record it
    pub fn insert_element(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        self.table.insert_element(row, col, value)?;
        self.record(UndoCommand::ElementAppend { cell: Cell::new(row, col) });
        Ok(())
    }

    /// Remove one element from a single column and record it
    pub fn remove_element(&mut self, row: usize, col: usize) -> Result<()> {
        let value = self
            .table
            .get_element(row, col)?
            .ok_or_else(|| TableError::row(row, self.table.data_row_count(col).unwrap_or(0)))?;
        self.table.remove_element(row, col)?;
        self.record(UndoCommand::ElementCut { cell: Cell::new(row, col), value });
        Ok(())
    }

    /// Insert blank rows, columns or elements in front of the selection.
    ///
    /// Rows go into every column that reaches the first selected row. Elements go into each
    /// selected column that the first selected row touches or directly follows.
    pub fn insert_selection(&mut self) -> Result<()> {
        let (kind, area) = self.classified_area()?;
        let filler = self.table.default_value();

        match kind {
            SelectionType::Rows => {
                self.table.insert_rows(area.start_row, area.rows, None)?;
                self.record(UndoCommand::ElementsInsert {
                    start: Cell::new(area.start_row, 1),
                    end: Cell::new(area.end_row(), self.table.data_col_count()),
                    axis: Axis::Rows,
                });
            }
            SelectionType::Cols => {
                self.table.insert_cols(area.start_col, area.cols, None)?;
                self.record(UndoCommand::ElementsInsert {
                    start: Cell::new(1, area.start_col),
                    end: Cell::new(1, area.end_col()),
                    axis: Axis::Cols,
                });
            }
            SelectionType::Elements => {
                let last_col = area.end_col().min(self.table.data_col_count());
                if area.rows == 1 && area.cols == 1 {
                    self.insert_element(area.start_row, area.start_col, filler)?;
                    return Ok(());
                }
                if last_col < area.start_col {
                    return Ok(());
                }
                let mut extended = false;
                for col in area.start_col..=last_col {
                    if area.start_row <= self.table.data_row_count(col)? + 1 {
                        for row in area.start_row..=area.end_row() {
                            self.table.insert_element(row, col, filler)?;
                        }
                        extended = true;
                    }
                }
                if !extended {
                    return Ok(());
                }
                self.record(UndoCommand::ElementsInsert {
                    start: Cell::new(area.start_row, area.start_col),
                    end: Cell::new(area.end_row(), last_col),
                    axis: Axis::Elements,
                });
            }
            SelectionType::None => return Err(TableError::NoSelection),
        }
        Ok(())
    }

    /// Insert a copy of the selected rows, columns or elements in front of the originals
    pub fn duplicate_selection(&mut self) -> Result<()> {
        let (kind, area) = self.classified_area()?;
        let area = self.data_area(area);
        if area.cols == 0 || (area.rows == 0 && kind != SelectionType::Cols) {
            return Ok(());
        }

        match kind {
            SelectionType::Rows => {
                self.table.insert_rows(area.start_row, area.rows, None)?;
                for col in 1..=self.table.data_col_count() {
                    for row in area.start_row..=area.end_row() {
                        if let Some(value) = self.table.get_element(row + area.rows, col)? {
                            self.table.set_element(row, col, value)?;
                        }
                    }
                }
                self.record(UndoCommand::ElementsInsert {
                    start: Cell::new(area.start_row, 1),
                    end: Cell::new(area.end_row(), self.table.data_col_count()),
                    axis: Axis::Rows,
                });
            }
            SelectionType::Cols => {
                let copies: Vec<Vec<f64>> = (area.start_col..=area.end_col())
                    .map(|col| self.table.get_col(col).map(|c| c.to_vec()))
                    .collect::<Result<_>>()?;
                for (i, copy) in copies.into_iter().enumerate() {
                    self.table.insert_col(area.start_col + i, Some(copy))?;
                }
                self.record(UndoCommand::ElementsInsert {
                    start: Cell::new(1, area.start_col),
                    end: Cell::new(1, area.end_col()),
                    axis: Axis::Cols,
                });
            }
            SelectionType::Elements => {
                let mut runs = Vec::with_capacity(area.cols);
                for col in area.start_col..=area.end_col() {
                    let column = self.table.get_col(col)?;
                    let first = (area.start_row - 1).min(column.len());
                    let count = area.rows.min(column.len() - first);
                    runs.push(column[first..first + count].to_vec());
                }
                if let Some(command) = self.insert_runs(area.start_row, area.start_col, &runs)? {
                    self.record(command);
                }
            }
            SelectionType::None => return Err(TableError::NoSelection),
        }
        Ok(())
    }

    /// Delete the selected rows, columns or elements and clear the selection
    pub fn delete_selection(&mut self) -> Result<()> {
        let (kind, area) = self.classified_area()?;
        let area = self.data_area(area);

        match kind {
            SelectionType::Rows if area.rows > 0 => {
                let start = Cell::new(area.start_row, 1);
                let end = Cell::new(area.end_row(), self.table.data_col_count());
                let command = UndoCommand::elements_cut(&self.table, start, end, Axis::Rows)?;
                for _ in 0..area.rows {
                    if area.start_row > self.table.max_row_count() {
                        break;
                    }
                    self.table.remove_row(area.start_row)?;
                }
                self.record(command);
            }
            SelectionType::Cols if area.cols > 0 => {
                let start = Cell::new(1, area.start_col);
                let end = Cell::new(self.table.row_count(), area.end_col());
                let command = UndoCommand::elements_cut(&self.table, start, end, Axis::Cols)?;
                for _ in 0..area.cols {
                    self.table.remove_col(area.start_col)?;
                }
                self.record(command);
            }
            SelectionType::Elements if area.rows > 0 && area.cols > 0 => {
                if area.rows == 1 && area.cols == 1 {
                    if self.table.cell_valid(area.start_row, area.start_col) {
                        self.remove_element(area.start_row, area.start_col)?;
                    }
                } else {
                    let start = Cell::new(area.start_row, area.start_col);
                    let end = Cell::new(area.end_row(), area.end_col());
                    let command = UndoCommand::elements_cut(&self.table, start, end, Axis::Elements)?;
                    for col in area.start_col..=area.end_col() {
                        for _ in 0..area.rows {
                            if !self.table.cell_valid(area.start_row, col) {
                                break;
                            }
                            self.table.remove_element(area.start_row, col)?;
                        }
                    }
                    self.record(command);
                }
            }
            _ => {}
        }

        self.selection.clear();
        Ok(())
    }

    pub fn move_row(&mut self, from: usize, to: usize) -> Result<()> {
        self.table.move_row(from, to)?;
        self.record(UndoCommand::RowMove { from, to });
        Ok(())
    }

    pub fn move_col(&mut self, from: usize, to: usize) -> Result<()> {
        self.table.move_col(from, to)?;
        self.record(UndoCommand::ColMove { from, to });
        Ok(())
    }

    // === Clipboard ===

    /// Copy the selection into the clipboard register and return what was copied.
    ///
    /// A failure to reach the system clipboard is logged; the register still holds the copy.
    pub fn copy(&mut self) -> Result<CopiedSelection> {
        let (kind, area) = self.classified_area()?;
        let area = self.data_area(area);
        let payload = ClipboardPayload::from_table(&self.table, kind, area)?;
        let copied = CopiedSelection {
            text: payload.to_plain_text(self.precision),
            payload,
        };
        if let Err(e) = self.clipboard.store(copied.clone()) {
            warn!(error = %e, "could not copy to system clipboard");
        }
        Ok(copied)
    }

    pub fn cut(&mut self) -> Result<CopiedSelection> {
        let copied = self.copy()?;
        self.delete_selection()?;
        Ok(copied)
    }

    /// Paste whatever the clipboard register holds, falling back to the system clipboard
    pub fn paste_clipboard(&mut self) -> Result<()> {
        let payload = match self.clipboard.payload() {
            Some(payload) => payload.clone(),
            None if self.clipboard.uses_system() => self.clipboard.pull_from_system()?.clone(),
            None => return Err(TableError::Clipboard("clipboard is empty".to_string())),
        };
        self.paste(&payload)
    }

    /// Paste a payload at the selection.
    ///
    /// | selection | payload | result |
    /// |---|---|---|
    /// | nothing | any | columns appended after the data |
    /// | one cell | one value | the cell is set |
    /// | one cell | several values | each column inserted as a run from that cell |
    /// | element block | same columns and rows | the block is overwritten |
    /// | columns | same column count | columns inserted in front of the selection |
    /// | rows | one column per data column | each column inserted as a run at the first row |
    ///
    /// Anything else is a `ShapeMismatch`, reported before the table is touched.
    pub fn paste(&mut self, payload: &ClipboardPayload) -> Result<()> {
        let outcome = self.paste_unchecked(payload);
        if let Err(e) = &outcome {
            warn!(error = %e, "paste rejected");
        }
        outcome
    }

    fn paste_unchecked(&mut self, payload: &ClipboardPayload) -> Result<()> {
        let kind = self.selection_type();
        let area = match (kind, self.selection.area()) {
            (SelectionType::None, _) | (_, None) => return self.append_payload_cols(payload),
            (_, Some(area)) => area,
        };

        match kind {
            SelectionType::Elements if area.rows == 1 && area.cols == 1 => {
                if payload.col_count() == 1 && payload.value_count() == 1 {
                    let value = payload.columns[0][0];
                    return self.set_element(area.start_row, area.start_col, value);
                }
                self.paste_runs(area.start_row, area.start_col, payload)
            }
            SelectionType::Elements => {
                let area = self.data_area(area);
                if payload.col_count() != area.cols || payload.max_rows() != area.rows {
                    return Err(mismatch(payload, "an element block", area));
                }
                self.overwrite_block(area, payload)
            }
            SelectionType::Cols => {
                let area = self.data_area(area);
                if payload.col_count() != area.cols {
                    return Err(mismatch(payload, "selected columns", area));
                }
                self.insert_payload_cols(area.start_col, payload)
            }
            SelectionType::Rows => {
                let data_cols = self.table.data_col_count();
                if payload.col_count() != data_cols {
                    return Err(TableError::ShapeMismatch(format!(
                        "{} column(s) cannot fill rows of {} column(s)",
                        payload.col_count(),
                        data_cols
                    )));
                }
                self.paste_runs(area.start_row, 1, payload)
            }
            SelectionType::None => self.append_payload_cols(payload),
        }
    }

    /// Paste that only accepts a payload copied from the same kind of selection with the same
    /// extent, restoring it as inserted data
    pub fn special_paste(&mut self, payload: &ClipboardPayload) -> Result<()> {
        let outcome = self.special_paste_unchecked(payload);
        if let Err(e) = &outcome {
            warn!(error = %e, "special paste rejected");
        }
        outcome
    }

    fn special_paste_unchecked(&mut self, payload: &ClipboardPayload) -> Result<()> {
        let (kind, area) = self.classified_area()?;
        if payload.shape != kind {
            return Err(TableError::ShapeMismatch(format!(
                "copied {} cannot be restored onto selected {}",
                payload.shape.display_name(),
                kind.display_name()
            )));
        }
        let area = self.data_area(area);

        match kind {
            SelectionType::Rows => {
                if payload.col_count() != self.table.data_col_count() || payload.max_rows() != area.rows {
                    return Err(mismatch(payload, "selected rows", area));
                }
                self.paste_runs(area.start_row, 1, payload)
            }
            SelectionType::Elements => {
                if payload.col_count() != area.cols || payload.max_rows() != area.rows {
                    return Err(mismatch(payload, "an element block", area));
                }
                self.paste_runs(area.start_row, area.start_col, payload)
            }
            SelectionType::Cols => {
                if payload.col_count() != area.cols {
                    return Err(mismatch(payload, "selected columns", area));
                }
                self.insert_payload_cols(area.start_col, payload)
            }
            SelectionType::None => Err(TableError::NoSelection),
        }
    }

    fn append_payload_cols(&mut self, payload: &ClipboardPayload) -> Result<()> {
        let at = self.table.data_col_count() + 1;
        self.insert_payload_cols(at, payload)
    }

    fn insert_payload_cols(&mut self, at: usize, payload: &ClipboardPayload) -> Result<()> {
        if payload.col_count() == 0 {
            return Ok(());
        }
        if at > self.table.data_col_count() + 1 {
            return Err(TableError::column(at, self.table.data_col_count() + 1));
        }
        for (i, column) in payload.columns.iter().enumerate() {
            self.table.insert_col(at + i, Some(column.clone()))?;
        }
        self.record(UndoCommand::ElementsInsert {
            start: Cell::new(1, at),
            end: Cell::new(1, at + payload.col_count() - 1),
            axis: Axis::Cols,
        });
        Ok(())
    }

    fn paste_runs(&mut self, start_row: usize, start_col: usize, payload: &ClipboardPayload) -> Result<()> {
        if let Some(command) = self.insert_runs(start_row, start_col, &payload.columns)? {
            self.record(command);
        }
        Ok(())
    }

    /// Insert `runs[i]` into column `start_col + i` from `start_row` down.
    ///
    /// Every target column must exist and reach at least the row above `start_row`; this is
    /// checked for all columns before any is changed. Returns the undo command, if anything
    /// was inserted.
    fn insert_runs(&mut self, start_row: usize, start_col: usize, runs: &[Vec<f64>]) -> Result<Option<UndoCommand>> {
        for (i, run) in runs.iter().enumerate() {
            let col = start_col + i;
            if run.is_empty() {
                continue;
            }
            if !self.table.col_index_valid(col) {
                return Err(TableError::ShapeMismatch(format!(
                    "{} column(s) do not fit after column {}",
                    runs.len(),
                    start_col
                )));
            }
            let len = self.table.data_row_count(col)?;
            if start_row > len + 1 {
                return Err(TableError::ShapeMismatch(format!(
                    "column {} has {} value(s); cannot insert at row {}",
                    col, len, start_row
                )));
            }
        }

        let mut commands = Vec::new();
        for (i, run) in runs.iter().enumerate() {
            if run.is_empty() {
                continue;
            }
            let col = start_col + i;
            for (j, value) in run.iter().enumerate() {
                self.table.insert_element(start_row + j, col, *value)?;
            }
            commands.push(UndoCommand::ElementsInsert {
                start: Cell::new(start_row, col),
                end: Cell::new(start_row + run.len() - 1, col),
                axis: Axis::Elements,
            });
        }

        Ok(match commands.len() {
            0 => None,
            1 => commands.pop(),
            _ => Some(UndoCommand::Batch(commands)),
        })
    }

    fn overwrite_block(&mut self, area: SelectionArea, payload: &ClipboardPayload) -> Result<()> {
        for col in area.start_col..=area.end_col() {
            let len = self.table.data_row_count(col)?;
            if area.start_row > len + 1 {
                return Err(TableError::ShapeMismatch(format!(
                    "column {} has {} value(s); cannot write from row {}",
                    col, len, area.start_row
                )));
            }
        }

        let start = Cell::new(area.start_row, area.start_col);
        let end = Cell::new(area.end_row(), area.end_col());
        let command = UndoCommand::elements_change(&self.table, start, end, Axis::Elements)?;
        for (i, column) in payload.columns.iter().enumerate() {
            for (j, value) in column.iter().enumerate() {
                self.table.set_element(area.start_row + j, area.start_col + i, *value)?;
            }
        }
        self.record(command);
        Ok(())
    }

    // === Generated columns ===

    /// Fill column `dest` with `count` evenly spaced values from `begin` to `end`.
    ///
    /// With `replace` and an existing `dest`, the column's contents are replaced; otherwise a
    /// new column is inserted at `dest`.
    pub fn new_col_by_range(&mut self, dest: usize, begin: f64, end: f64, count: usize, replace: bool) -> Result<()> {
        if count == 0 {
            return Err(TableError::InvalidArgument("count must be at least 1".to_string()));
        }
        let inc = if count == 1 { 0.0 } else { (end - begin) / (count - 1) as f64 };
        self.fill_generated_col(dest, begin, inc, count, replace)
    }

    /// Fill column `dest` with `count` values starting at `begin`, `inc` apart
    pub fn new_col_by_increment(&mut self, dest: usize, begin: f64, inc: f64, count: usize, replace: bool) -> Result<()> {
        if count == 0 {
            return Err(TableError::InvalidArgument("count must be at least 1".to_string()));
        }
        self.fill_generated_col(dest, begin, inc, count, replace)
    }

    fn fill_generated_col(&mut self, dest: usize, begin: f64, inc: f64, count: usize, replace: bool) -> Result<()> {
        let data_cols = self.table.data_col_count();
        if dest == 0 || dest > data_cols + 1 {
            return Err(TableError::column(dest, data_cols + 1));
        }
        let values: Vec<f64> = (0..count).map(|i| begin + inc * i as f64).collect();

        if replace && dest <= data_cols {
            let len = self.table.data_row_count(dest)?;
            let command = UndoCommand::elements_change(
                &self.table,
                Cell::new(1, dest),
                Cell::new(len.max(1), dest),
                Axis::Cols,
            )?;
            self.table.remove_all_elements(dest)?;
            self.table.set_col(dest, &values)?;
            self.record(command);
        } else {
            self.table.insert_col(dest, Some(values))?;
            self.record(UndoCommand::ElementsInsert {
                start: Cell::new(1, dest),
                end: Cell::new(1, dest),
                axis: Axis::Cols,
            });
        }
        Ok(())
    }

    // === Export ===

    /// Tab-separated dump of the selected columns, preceded by the row count.
    ///
    /// Fails with `MustSelectColumns` unless at least `min_cols` whole columns are selected.
    pub fn write_selected_cols(&self, min_cols: usize) -> Result<String> {
        let (kind, area) = self.classified_area().map_err(|_| TableError::MustSelectColumns(min_cols))?;
        if kind != SelectionType::Cols {
            return Err(TableError::MustSelectColumns(min_cols));
        }
        let area = self.data_area(area);
        if min_cols > area.cols {
            return Err(TableError::MustSelectColumns(min_cols));
        }

        let mut out = format!("{}\n", area.rows);
        for row in area.start_row..=area.end_row() {
            let line: Vec<String> = (area.start_col..=area.end_col())
                .map(|col| {
                    self.table
                        .get(Cell::new(row, col))
                        .map(|v| format_value(v, self.precision))
                        .unwrap_or_default()
                })
                .collect();
            out.push_str(&line.join("\t"));
            out.push('\n');
        }
        Ok(out)
    }

    /// Dense row-major copy of the data; holes read as zero
    pub fn export_matrix(&self) -> Vec<Vec<f64>> {
        let rows = self.table.max_row_count();
        (1..=rows)
            .map(|row| {
                self.table
                    .get_row(row)
                    .into_iter()
                    .map(|v| v.unwrap_or(0.0))
                    .collect()
            })
            .collect()
    }
}

fn mismatch(payload: &ClipboardPayload, target: &str, area: SelectionArea) -> TableError {
    TableError::ShapeMismatch(format!(
        "{} column(s) x {} row(s) cannot be pasted onto {} of {} column(s) x {} row(s)",
        payload.col_count(),
        payload.max_rows(),
        target,
        area.cols,
        area.rows
    ))
}
