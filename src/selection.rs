use std::collections::BTreeSet;

use crate::table::{Cell, TableShape};

/// What kind of region the current selection forms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionType {
    #[default]
    None,
    Rows,
    Cols,
    Elements,
}

impl SelectionType {
    /// Numeric tag used in the clipboard encoding
    pub fn tag(self) -> u8 {
        match self {
            SelectionType::None => 0,
            SelectionType::Rows => 1,
            SelectionType::Cols => 2,
            SelectionType::Elements => 3,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(SelectionType::None),
            1 => Some(SelectionType::Rows),
            2 => Some(SelectionType::Cols),
            3 => Some(SelectionType::Elements),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SelectionType::None => "nothing",
            SelectionType::Rows => "rows",
            SelectionType::Cols => "columns",
            SelectionType::Elements => "elements",
        }
    }
}

/// Bounding box of a selection: from the first to the last selected cell in iteration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionArea {
    pub rows: usize,
    pub cols: usize,
    pub start_row: usize,
    pub start_col: usize,
}

impl SelectionArea {
    pub fn end_row(&self) -> usize {
        self.start_row + self.rows - 1
    }

    pub fn end_col(&self) -> usize {
        self.start_col + self.cols - 1
    }

    /// Drop the trailing blank row/column from the area when it reaches them.
    pub fn trimmed(mut self, shape: TableShape) -> Self {
        if self.cols > 0 && self.start_col + self.cols == shape.cols + 1 {
            self.cols -= 1;
        }
        if self.rows > 0 && self.start_row + self.rows == shape.rows + 1 {
            self.rows -= 1;
        }
        self
    }
}

/// A set of selected cells plus the anchor/boat pair that produced it.
///
/// The selection never stores its shape; [`Selection::classify`] derives it on demand.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    cells: BTreeSet<Cell>,
    anchor: Option<Cell>,
    boat: Option<Cell>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.anchor = None;
        self.boat = None;
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_selected(&self, row: usize, col: usize) -> bool {
        self.cells.contains(&Cell::new(row, col))
    }

    pub fn anchor(&self) -> Option<Cell> {
        self.anchor
    }

    pub fn boat(&self) -> Option<Cell> {
        self.boat
    }

    /// Selected cells, column by column
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    pub fn first(&self) -> Option<Cell> {
        self.cells.iter().next().copied()
    }

    pub fn last(&self) -> Option<Cell> {
        self.cells.iter().next_back().copied()
    }

    pub fn select_cell(&mut self, cell: Cell) {
        self.clear();
        self.cells.insert(cell);
        self.anchor = Some(cell);
        self.boat = Some(cell);
    }

    /// Add a cell without disturbing the rest; the cell becomes the boat
    pub fn add_cell(&mut self, cell: Cell) {
        self.cells.insert(cell);
        if self.anchor.is_none() {
            self.anchor = Some(cell);
        }
        self.boat = Some(cell);
    }

    /// Select every cell in the rectangle spanned by `anchor` and `boat`.
    pub fn select_rect(&mut self, anchor: Cell, boat: Cell) {
        self.clear();
        let (top, bottom) = (anchor.row.min(boat.row), anchor.row.max(boat.row));
        let (left, right) = (anchor.col.min(boat.col), anchor.col.max(boat.col));
        for col in left..=right {
            for row in top..=bottom {
                self.cells.insert(Cell::new(row, col));
            }
        }
        self.anchor = Some(anchor);
        self.boat = Some(boat);
    }

    /// Move the boat, reselecting the rectangle from the existing anchor
    pub fn extend_to(&mut self, boat: Cell) {
        match self.anchor {
            Some(anchor) => self.select_rect(anchor, boat),
            None => self.select_cell(boat),
        }
    }

    pub fn select_row(&mut self, row: usize, shape: TableShape) {
        self.select_rows(row, row, shape);
    }

    /// Select whole rows across every column the view shows, blank column included
    pub fn select_rows(&mut self, first: usize, last: usize, shape: TableShape) {
        self.select_rect(Cell::new(first, 1), Cell::new(last, shape.cols));
    }

    pub fn select_col(&mut self, col: usize, shape: TableShape) {
        self.select_cols(col, col, shape);
    }

    /// Select whole columns down to the nominal row count, blank row included
    pub fn select_cols(&mut self, first: usize, last: usize, shape: TableShape) {
        self.select_rect(Cell::new(1, first), Cell::new(shape.rows, last));
    }

    /// Classify the selection against the current table shape.
    ///
    /// The first selected cell decides which scans run. A cell in row 1 is tested as the top of
    /// a full column before anything else, so a row-1 cell in column 1 only becomes `Rows` when
    /// its column is not fully selected.
    pub fn classify(&self, shape: TableShape) -> SelectionType {
        let first = match self.first() {
            Some(cell) if cell.col <= shape.data_cols => cell,
            _ => return SelectionType::None,
        };

        if first.row == 1 {
            if self.col_fully_selected(first.col, shape.rows) {
                return SelectionType::Cols;
            }
            if first.col != 1 {
                return SelectionType::Elements;
            }
            self.row_kind(first.row, shape.cols)
        } else if first.col == 1 {
            self.row_kind(first.row, shape.cols)
        } else {
            SelectionType::Elements
        }
    }

    fn row_kind(&self, row: usize, cols: usize) -> SelectionType {
        if (2..=cols).all(|col| self.is_selected(row, col)) {
            SelectionType::Rows
        } else {
            SelectionType::Elements
        }
    }

    fn col_fully_selected(&self, col: usize, rows: usize) -> bool {
        (2..=rows).all(|row| self.is_selected(row, col))
    }

    /// Bounding box from the first to the last selected cell, `None` when nothing is selected
    pub fn area(&self) -> Option<SelectionArea> {
        let first = self.first()?;
        let last = self.last()?;
        Some(SelectionArea {
            rows: last.row.saturating_sub(first.row) + 1,
            cols: last.col - first.col + 1,
            start_row: first.row,
            start_col: first.col,
        })
    }
}
