use std::cmp::Ordering;
use std::ops::{Deref, DerefMut};

use tracing::debug;

use super::event::{Broadcaster, ChangeEvent, SubscriptionId};
use crate::error::{Result, TableError};

/// A `(row, col)` coordinate, both 1-based.
///
/// Cells order column-major (by column, then by row), which is the order selections are walked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.col, self.row).cmp(&(other.col, other.row))
    }
}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The shape a view presents: the nominal row count plus one sentinel blank column past the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableShape {
    /// Nominal row count (longest column + 1)
    pub rows: usize,
    /// Data columns + 1
    pub cols: usize,
    pub data_cols: usize,
}

/// Pure data structure for a table of independently sized float columns
#[derive(Debug)]
pub struct RaggedTable {
    /// Columns in display order; lengths are independent
    cols: Vec<Vec<f64>>,
    /// Nominal row count, always `max column length + 1`
    row_count: usize,
    /// Filler value used when a write lands past the end of a column
    default_value: f64,
    broadcaster: Broadcaster,
}

impl RaggedTable {
    pub fn new(default_value: f64) -> Self {
        Self {
            cols: Vec::new(),
            row_count: 1,
            default_value,
            broadcaster: Broadcaster::new(),
        }
    }

    pub fn with_columns(cols: Vec<Vec<f64>>, default_value: f64) -> Self {
        let mut table = Self::new(default_value);
        table.cols = cols;
        table.row_count = table.max_row_count() + 1;
        table
    }

    pub fn default_value(&self) -> f64 {
        self.default_value
    }

    /// Snapshot of all columns
    pub fn columns(&self) -> &[Vec<f64>] {
        &self.cols
    }

    // === Shape queries ===

    pub fn data_col_count(&self) -> usize {
        self.cols.len()
    }

    /// Column count as a view sees it, including the trailing blank column
    pub fn col_count(&self) -> usize {
        self.cols.len() + 1
    }

    /// Nominal row count: one more than the longest column
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn max_row_count(&self) -> usize {
        self.cols.iter().map(|c| c.len()).max().unwrap_or(0)
    }

    pub fn shape(&self) -> TableShape {
        TableShape {
            rows: self.row_count,
            cols: self.col_count(),
            data_cols: self.cols.len(),
        }
    }

    pub fn col_index_valid(&self, index: usize) -> bool {
        index >= 1 && index <= self.cols.len()
    }

    /// Length of one column, as opposed to the nominal row count
    pub fn data_row_count(&self, col: usize) -> Result<usize> {
        Ok(self.column(col)?.len())
    }

    pub fn cell_valid(&self, row: usize, col: usize) -> bool {
        self.col_index_valid(col) && row >= 1 && row <= self.cols[col - 1].len()
    }

    fn check_col(&self, index: usize) -> Result<()> {
        if self.col_index_valid(index) {
            Ok(())
        } else {
            Err(TableError::column(index, self.cols.len()))
        }
    }

    fn check_col_insert(&self, index: usize) -> Result<()> {
        if index >= 1 && index <= self.cols.len() + 1 {
            Ok(())
        } else {
            Err(TableError::column(index, self.cols.len() + 1))
        }
    }

    fn check_row(&self, index: usize, max: usize) -> Result<()> {
        if index >= 1 && index <= max {
            Ok(())
        } else {
            Err(TableError::row(index, max))
        }
    }

    fn column(&self, col: usize) -> Result<&Vec<f64>> {
        self.check_col(col)?;
        Ok(&self.cols[col - 1])
    }

    // === Element access ===

    /// Returns `Ok(None)` when `row` lies past the end of the column; that is a hole, not an error.
    pub fn get_element(&self, row: usize, col: usize) -> Result<Option<f64>> {
        let column = self.column(col)?;
        if row == 0 {
            return Ok(None);
        }
        Ok(column.get(row - 1).copied())
    }

    /// Lenient lookup: `None` for any cell that holds no data, including invalid columns
    pub fn get(&self, cell: Cell) -> Option<f64> {
        self.get_element(cell.row, cell.col).ok().flatten()
    }

    /// Overwrite a cell, growing the column with the default value first if needed.
    pub fn set_element(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        self.check_col(col)?;
        if row == 0 {
            return Err(TableError::row(row, self.cols[col - 1].len() + 1));
        }
        self.create_cell_if_needed(row, col);
        self.cols[col - 1][row - 1] = value;
        self.broadcaster.emit(ChangeEvent::ElementChanged { row, col });
        Ok(())
    }

    /// Pad `col` up to `row` elements without per-element notifications.
    fn create_cell_if_needed(&mut self, row: usize, col: usize) {
        if row <= self.cols[col - 1].len() {
            return;
        }

        let was_on = self.broadcaster.is_enabled();
        if was_on {
            self.broadcaster.set_enabled(false);
        }

        let filler = self.default_value;
        while self.cols[col - 1].len() < row {
            let next = self.cols[col - 1].len() + 1;
            self.insert_element_unchecked(next, col, filler);
        }

        if was_on {
            self.broadcaster.set_enabled(true);
        }
    }

    // === Rows ===

    pub fn get_row(&self, index: usize) -> Vec<Option<f64>> {
        self.cols
            .iter()
            .map(|c| if index == 0 { None } else { c.get(index - 1).copied() })
            .collect()
    }

    /// Write one value per column at `index`, extending short columns.
    pub fn set_row(&mut self, index: usize, values: &[f64]) -> Result<()> {
        if values.len() != self.cols.len() {
            return Err(TableError::ShapeMismatch(format!(
                "row has {} values, table has {} columns",
                values.len(),
                self.cols.len()
            )));
        }
        for (i, value) in values.iter().enumerate() {
            self.set_element(index, i + 1, *value)?;
        }
        Ok(())
    }

    /// Insert one element at `index` in every column that already reaches `index`.
    pub fn insert_row(&mut self, index: usize, init: Option<&[f64]>) -> Result<()> {
        self.check_row(index, self.max_row_count() + 1)?;
        self.insert_row_unchecked(index, init);
        Ok(())
    }

    pub fn insert_rows(&mut self, index: usize, count: usize, init: Option<&[f64]>) -> Result<()> {
        self.check_row(index, self.max_row_count() + 1)?;
        for i in 0..count {
            self.insert_row_unchecked(index + i, init);
        }
        Ok(())
    }

    fn insert_row_unchecked(&mut self, index: usize, init: Option<&[f64]>) {
        for col in 1..=self.cols.len() {
            if index <= self.cols[col - 1].len() {
                let value = init
                    .and_then(|v| v.get(col - 1))
                    .copied()
                    .unwrap_or(self.default_value);
                self.insert_element_unchecked(index, col, value);
            }
        }
    }

    pub fn prepend_row(&mut self) -> Result<()> {
        self.insert_row(1, None)
    }

    pub fn duplicate_row(&mut self, index: usize) -> Result<()> {
        self.check_row(index, self.max_row_count())?;
        for column in self.cols.iter_mut() {
            if index <= column.len() {
                let value = column[index - 1];
                column.insert(index - 1, value);
            }
        }
        self.row_count = self.max_row_count() + 1;
        self.broadcaster.emit(ChangeEvent::RowDuplicated {
            from: index,
            to: index + 1,
        });
        Ok(())
    }

    /// Remove the element at `index` from every column that reaches it.
    pub fn remove_row(&mut self, index: usize) -> Result<()> {
        self.check_row(index, self.max_row_count())?;
        for col in 1..=self.cols.len() {
            if index <= self.cols[col - 1].len() {
                self.remove_element_unchecked(index, col);
            }
        }
        Ok(())
    }

    pub fn remove_all_rows(&mut self) {
        for column in self.cols.iter_mut() {
            column.clear();
        }
        let count = self.row_count;
        self.row_count = 1;
        debug!(count, "removed all rows");
        self.broadcaster.emit(ChangeEvent::RowsRemoved { first: 1, count });
        self.broadcaster.emit(ChangeEvent::RowsInserted { first: 1, count: 1 });
    }

    /// Move an element in every column long enough to hold both positions.
    pub fn move_row(&mut self, from: usize, to: usize) -> Result<()> {
        let max = self.max_row_count();
        self.check_row(from, max)?;
        self.check_row(to, max)?;
        for column in self.cols.iter_mut() {
            if from <= column.len() && to <= column.len() {
                let value = column.remove(from - 1);
                column.insert(to - 1, value);
            }
        }
        self.broadcaster.emit(ChangeEvent::RowMoved { from, to });
        Ok(())
    }

    // === Columns ===

    pub fn get_col(&self, index: usize) -> Result<&[f64]> {
        Ok(self.column(index)?.as_slice())
    }

    /// Overwrite the leading values of a column, extending it if `values` is longer.
    pub fn set_col(&mut self, index: usize, values: &[f64]) -> Result<()> {
        self.check_col(index)?;
        if values.is_empty() {
            return Ok(());
        }
        self.create_cell_if_needed(values.len(), index);
        for (i, value) in values.iter().enumerate() {
            self.cols[index - 1][i] = *value;
            self.broadcaster.emit(ChangeEvent::ElementChanged { row: i + 1, col: index });
        }
        Ok(())
    }

    pub fn insert_col(&mut self, index: usize, init: Option<Vec<f64>>) -> Result<()> {
        self.check_col_insert(index)?;
        self.cols.insert(index - 1, init.unwrap_or_default());
        self.broadcaster.emit(ChangeEvent::ColsInserted { first: index, count: 1 });
        self.sync_row_count();
        Ok(())
    }

    pub fn insert_cols(&mut self, index: usize, count: usize, init: Option<&[f64]>) -> Result<()> {
        self.check_col_insert(index)?;
        for i in 0..count {
            self.insert_col(index + i, init.map(|v| v.to_vec()))?;
        }
        Ok(())
    }

    pub fn prepend_col(&mut self, init: Option<Vec<f64>>) -> Result<()> {
        self.insert_col(1, init)
    }

    pub fn append_col(&mut self, init: Option<Vec<f64>>) -> Result<()> {
        self.insert_col(self.cols.len() + 1, init)
    }

    /// Copy column `from` and insert the copy at `to` (indices as seen before the insert).
    pub fn duplicate_col(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_col(from)?;
        self.check_col_insert(to)?;
        let copy = self.cols[from - 1].clone();
        self.cols.insert(to - 1, copy);
        self.broadcaster.emit(ChangeEvent::ColDuplicated { from, to });
        Ok(())
    }

    pub fn remove_col(&mut self, index: usize) -> Result<()> {
        self.check_col(index)?;
        self.cols.remove(index - 1);
        self.broadcaster.emit(ChangeEvent::ColsRemoved { first: index, count: 1 });
        self.sync_row_count();
        Ok(())
    }

    pub fn remove_all_cols(&mut self) {
        let count = self.cols.len();
        self.cols.clear();
        debug!(count, "removed all columns");
        if count > 0 {
            self.broadcaster.emit(ChangeEvent::ColsRemoved { first: 1, count });
        }
        self.sync_row_count();
    }

    pub fn move_col(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_col(from)?;
        self.check_col(to)?;
        let column = self.cols.remove(from - 1);
        self.cols.insert(to - 1, column);
        self.broadcaster.emit(ChangeEvent::ColMoved { from, to });
        Ok(())
    }

    // === Single elements ===

    /// Insert into one column only, shifting that column's later elements down.
    pub fn insert_element(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        let len = self.column(col)?.len();
        self.check_row(row, len + 1)?;
        self.insert_element_unchecked(row, col, value);
        Ok(())
    }

    fn insert_element_unchecked(&mut self, row: usize, col: usize, value: f64) {
        self.cols[col - 1].insert(row - 1, value);
        self.broadcaster.emit(ChangeEvent::ElementInserted { row, col });
        self.sync_row_count();
    }

    pub fn prepend_element(&mut self, col: usize, value: f64) -> Result<()> {
        self.insert_element(1, col, value)
    }

    pub fn append_element(&mut self, col: usize, value: f64) -> Result<()> {
        let len = self.column(col)?.len();
        self.insert_element(len + 1, col, value)
    }

    pub fn duplicate_element(&mut self, row: usize, col: usize) -> Result<()> {
        let len = self.column(col)?.len();
        self.check_row(row, len)?;
        let value = self.cols[col - 1][row - 1];
        self.insert_element(row, col, value)
    }

    pub fn remove_element(&mut self, row: usize, col: usize) -> Result<()> {
        let len = self.column(col)?.len();
        self.check_row(row, len)?;
        self.remove_element_unchecked(row, col);
        Ok(())
    }

    fn remove_element_unchecked(&mut self, row: usize, col: usize) {
        self.cols[col - 1].remove(row - 1);
        self.broadcaster.emit(ChangeEvent::ElementRemoved { row, col });
        self.sync_row_count();
    }

    pub fn remove_all_elements(&mut self, col: usize) -> Result<()> {
        let len = self.column(col)?.len();
        for _ in 0..len {
            self.remove_element_unchecked(1, col);
        }
        Ok(())
    }

    /// Take the element out of its column and insert it at the destination.
    ///
    /// The destination row is interpreted against the destination column after the removal.
    pub fn move_element(
        &mut self,
        from_row: usize,
        from_col: usize,
        to_row: usize,
        to_col: usize,
    ) -> Result<()> {
        let from_len = self.column(from_col)?.len();
        self.check_row(from_row, from_len)?;
        let mut to_len = self.column(to_col)?.len();
        if to_col == from_col {
            to_len -= 1;
        }
        self.check_row(to_row, to_len + 1)?;

        let value = self.cols[from_col - 1][from_row - 1];
        self.remove_element_unchecked(from_row, from_col);
        self.insert_element_unchecked(to_row, to_col, value);
        Ok(())
    }

    // === Notifications ===

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&ChangeEvent) + 'static,
    {
        self.broadcaster.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.broadcaster.unsubscribe(id)
    }

    /// Turning broadcasting back on emits a single `DataReloaded`.
    pub fn should_broadcast(&mut self, on: bool) {
        self.broadcaster.set_enabled(on);
    }

    pub fn is_broadcasting(&self) -> bool {
        self.broadcaster.is_enabled()
    }

    /// Suppress notifications until the returned guard is dropped.
    pub fn pause_broadcast(&mut self) -> BroadcastPause<'_> {
        BroadcastPause::new(self)
    }

    /// Recompute the nominal row count and announce trailing rows that appeared or vanished.
    fn sync_row_count(&mut self) {
        let nominal = self.max_row_count() + 1;
        let old = self.row_count;
        self.row_count = nominal;
        if nominal > old {
            self.broadcaster.emit(ChangeEvent::RowsInserted {
                first: old + 1,
                count: nominal - old,
            });
        } else if nominal < old {
            self.broadcaster.emit(ChangeEvent::RowsRemoved {
                first: nominal + 1,
                count: old - nominal,
            });
        }
    }
}

/// Scoped notification suppression for bulk updates such as file loads.
///
/// Restores the previous broadcast state on drop; if broadcasting was on, a single
/// `DataReloaded` is delivered then.
pub struct BroadcastPause<'a> {
    table: &'a mut RaggedTable,
    was_on: bool,
}

impl<'a> BroadcastPause<'a> {
    fn new(table: &'a mut RaggedTable) -> Self {
        let was_on = table.broadcaster.is_enabled();
        table.broadcaster.set_enabled(false);
        Self { table, was_on }
    }
}

impl Deref for BroadcastPause<'_> {
    type Target = RaggedTable;

    fn deref(&self) -> &RaggedTable {
        self.table
    }
}

impl DerefMut for BroadcastPause<'_> {
    fn deref_mut(&mut self) -> &mut RaggedTable {
        self.table
    }
}

impl Drop for BroadcastPause<'_> {
    fn drop(&mut self) {
        if self.was_on {
            self.table.broadcaster.set_enabled(true);
        }
    }
}
