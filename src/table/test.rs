use super::event::*;
use super::table::*;

use crate::error::TableError;

use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

fn make_table(cols: Vec<Vec<f64>>) -> RaggedTable {
    RaggedTable::with_columns(cols, 0.0)
}

/// Subscribe a recorder and return the shared event log
fn record_events(table: &mut RaggedTable) -> Rc<RefCell<Vec<ChangeEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    table.subscribe(move |e| sink.borrow_mut().push(*e));
    events
}

fn lens(table: &RaggedTable) -> Vec<usize> {
    table.columns().iter().map(|c| c.len()).collect()
}

// === Shape ===

#[test]
fn test_empty_table_shows_one_blank_row() {
    let table = RaggedTable::new(0.0);
    assert_eq!(
        table.shape(),
        TableShape { rows: 1, cols: 1, data_cols: 0 }
    );
    assert_eq!(table.max_row_count(), 0);
}

#[test]
fn test_nominal_row_count_is_longest_plus_one() {
    let table = make_table(vec![vec![1.0, 2.0, 3.0], vec![4.0]]);
    assert_eq!(table.row_count(), 4);
    assert_eq!(table.col_count(), 3);
    assert_eq!(table.data_col_count(), 2);
    assert_eq!(table.data_row_count(2).unwrap(), 1);
    assert!(table.cell_valid(3, 1));
    assert!(!table.cell_valid(2, 2));
    assert!(!table.cell_valid(1, 3));
    assert!(!table.col_index_valid(0));
}

#[test]
fn test_cells_order_by_column_first() {
    let mut cells = vec![Cell::new(1, 2), Cell::new(3, 1), Cell::new(2, 2)];
    cells.sort();
    assert_eq!(cells, vec![Cell::new(3, 1), Cell::new(1, 2), Cell::new(2, 2)]);
}

// === Elements ===

#[test]
fn test_get_element_hole_is_none() {
    let table = make_table(vec![vec![1.0, 2.0, 3.0], vec![4.0]]);
    assert_eq!(table.get_element(1, 2).unwrap(), Some(4.0));
    assert_eq!(table.get_element(3, 2).unwrap(), None);
    assert_eq!(table.get_element(0, 1).unwrap(), None);
    assert!(matches!(
        table.get_element(1, 3),
        Err(TableError::IndexOutOfRange { what: "column", index: 3, max: 2 })
    ));
    assert_eq!(table.get(Cell::new(1, 9)), None);
}

#[test]
fn test_set_element_overwrites_in_place() {
    let mut table = make_table(vec![vec![1.0, 2.0]]);
    let events = record_events(&mut table);
    table.set_element(2, 1, 5.0).unwrap();
    assert_eq!(table.columns(), &[vec![1.0, 5.0]]);
    assert_eq!(*events.borrow(), vec![ChangeEvent::ElementChanged { row: 2, col: 1 }]);
}

#[test]
fn test_set_element_extends_lazily_without_filler_events() {
    let mut table = RaggedTable::with_columns(vec![vec![1.0]], -1.0);
    let events = record_events(&mut table);

    table.set_element(4, 1, 5.0).unwrap();
    assert_eq!(table.columns(), &[vec![1.0, -1.0, -1.0, 5.0]]);
    assert_eq!(table.row_count(), 5);
    assert_eq!(
        *events.borrow(),
        vec![
            ChangeEvent::DataReloaded,
            ChangeEvent::ElementChanged { row: 4, col: 1 },
        ]
    );
    assert!(table.is_broadcasting());
}

#[test]
fn test_set_element_bad_column_leaves_table_alone() {
    let mut table = make_table(vec![vec![1.0]]);
    assert!(table.set_element(1, 2, 5.0).is_err());
    assert!(table.set_element(0, 1, 5.0).is_err());
    assert_eq!(table.columns(), &[vec![1.0]]);
}

#[test]
fn test_insert_element_grows_row_count() {
    let mut table = make_table(vec![vec![1.0, 2.0], vec![3.0]]);
    let events = record_events(&mut table);

    table.insert_element(1, 1, 9.0).unwrap();
    assert_eq!(table.columns(), &[vec![9.0, 1.0, 2.0], vec![3.0]]);
    assert_eq!(
        *events.borrow(),
        vec![
            ChangeEvent::ElementInserted { row: 1, col: 1 },
            ChangeEvent::RowsInserted { first: 4, count: 1 },
        ]
    );

    // shorter column: no new trailing row
    events.borrow_mut().clear();
    table.append_element(2, 4.0).unwrap();
    assert_eq!(*events.borrow(), vec![ChangeEvent::ElementInserted { row: 2, col: 2 }]);
}

#[test]
fn test_insert_element_validates_against_its_column() {
    let mut table = make_table(vec![vec![1.0, 2.0, 3.0], vec![4.0]]);
    assert!(table.insert_element(2, 2, 0.0).is_ok());
    assert!(matches!(
        table.insert_element(4, 2, 0.0),
        Err(TableError::IndexOutOfRange { what: "row", index: 4, max: 3 })
    ));
}

#[test]
fn test_remove_element_shrinks_row_count() {
    let mut table = make_table(vec![vec![1.0, 2.0, 3.0], vec![4.0]]);
    let events = record_events(&mut table);

    table.remove_element(2, 1).unwrap();
    assert_eq!(table.columns(), &[vec![1.0, 3.0], vec![4.0]]);
    assert_eq!(table.row_count(), 3);
    assert_eq!(
        *events.borrow(),
        vec![
            ChangeEvent::ElementRemoved { row: 2, col: 1 },
            ChangeEvent::RowsRemoved { first: 4, count: 1 },
        ]
    );
    assert!(table.remove_element(2, 2).is_err());
}

#[test]
fn test_prepend_and_duplicate_element() {
    let mut table = make_table(vec![vec![1.0, 2.0]]);
    table.prepend_element(1, 0.5).unwrap();
    table.duplicate_element(3, 1).unwrap();
    assert_eq!(table.columns(), &[vec![0.5, 1.0, 2.0, 2.0]]);
    assert!(table.duplicate_element(5, 1).is_err());
}

#[test]
fn test_move_element_within_and_across_columns() {
    let mut table = make_table(vec![vec![1.0, 2.0, 3.0], vec![4.0]]);
    table.move_element(1, 1, 3, 1).unwrap();
    assert_eq!(table.columns(), &[vec![2.0, 3.0, 1.0], vec![4.0]]);

    table.move_element(3, 1, 1, 2).unwrap();
    assert_eq!(table.columns(), &[vec![2.0, 3.0], vec![1.0, 4.0]]);

    // destination checked against the column after removal
    assert!(table.move_element(1, 1, 3, 1).is_err());
}

#[test]
fn test_remove_all_elements_empties_one_column() {
    let mut table = make_table(vec![vec![1.0, 2.0, 3.0], vec![4.0]]);
    table.remove_all_elements(1).unwrap();
    assert_eq!(lens(&table), vec![0, 1]);
    assert_eq!(table.row_count(), 2);
}

// === Rows ===

#[test]
fn test_insert_row_only_lengthens_reaching_columns() {
    let mut table = make_table(vec![vec![1.0, 2.0, 3.0], vec![4.0], vec![5.0, 6.0]]);
    table.insert_row(2, None).unwrap();
    assert_eq!(
        table.columns(),
        &[vec![1.0, 0.0, 2.0, 3.0], vec![4.0], vec![5.0, 0.0, 6.0]]
    );
}

#[test]
fn test_insert_row_uses_init_values() {
    let mut table = make_table(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    table.insert_row(1, Some(&[7.0, 8.0][..])).unwrap();
    table.insert_rows(4, 2, None).unwrap();
    assert_eq!(
        table.columns(),
        &[vec![7.0, 1.0, 2.0], vec![8.0, 3.0, 4.0]]
    );

    table.prepend_row().unwrap();
    assert_eq!(lens(&table), vec![4, 4]);
}

#[test]
fn test_insert_row_out_of_range() {
    let mut table = make_table(vec![vec![1.0, 2.0]]);
    assert!(matches!(
        table.insert_row(4, None),
        Err(TableError::IndexOutOfRange { what: "row", index: 4, max: 3 })
    ));
    assert!(table.insert_row(0, None).is_err());
}

#[test]
fn test_duplicate_row_emits_single_event() {
    let mut table = make_table(vec![vec![1.0, 2.0, 3.0], vec![4.0]]);
    let events = record_events(&mut table);

    table.duplicate_row(1).unwrap();
    assert_eq!(table.columns(), &[vec![1.0, 1.0, 2.0, 3.0], vec![4.0, 4.0]]);
    assert_eq!(table.row_count(), 5);
    assert_eq!(*events.borrow(), vec![ChangeEvent::RowDuplicated { from: 1, to: 2 }]);
}

#[test]
fn test_remove_row_skips_short_columns() {
    let mut table = make_table(vec![vec![1.0, 2.0, 3.0], vec![4.0]]);
    table.remove_row(2).unwrap();
    assert_eq!(table.columns(), &[vec![1.0, 3.0], vec![4.0]]);
    assert!(table.remove_row(3).is_err());
}

#[test]
fn test_remove_all_rows_leaves_blank_row() {
    let mut table = make_table(vec![vec![1.0, 2.0, 3.0], vec![4.0]]);
    let events = record_events(&mut table);

    table.remove_all_rows();
    assert_eq!(lens(&table), vec![0, 0]);
    assert_eq!(table.row_count(), 1);
    assert_eq!(
        *events.borrow(),
        vec![
            ChangeEvent::RowsRemoved { first: 1, count: 4 },
            ChangeEvent::RowsInserted { first: 1, count: 1 },
        ]
    );
}

#[test]
fn test_move_row_skips_columns_not_covering_both() {
    let mut table = make_table(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0]]);
    table.move_row(1, 3).unwrap();
    assert_eq!(table.columns(), &[vec![2.0, 3.0, 1.0], vec![4.0, 5.0]]);
}

#[test]
fn test_get_and_set_row() {
    let mut table = make_table(vec![vec![1.0, 2.0], vec![3.0]]);
    assert_eq!(table.get_row(2), vec![Some(2.0), None]);

    table.set_row(2, &[5.0, 6.0]).unwrap();
    assert_eq!(table.columns(), &[vec![1.0, 5.0], vec![3.0, 6.0]]);
    assert!(matches!(table.set_row(1, &[1.0]), Err(TableError::ShapeMismatch(_))));
}

// === Columns ===

#[test]
fn test_insert_and_append_cols() {
    let mut table = make_table(vec![vec![1.0]]);
    let events = record_events(&mut table);

    table.prepend_col(Some(vec![7.0, 8.0])).unwrap();
    table.append_col(None).unwrap();
    assert_eq!(table.columns(), &[vec![7.0, 8.0], vec![1.0], vec![]]);
    assert_eq!(
        *events.borrow(),
        vec![
            ChangeEvent::ColsInserted { first: 1, count: 1 },
            ChangeEvent::RowsInserted { first: 3, count: 1 },
            ChangeEvent::ColsInserted { first: 3, count: 1 },
        ]
    );
    assert!(table.insert_col(5, None).is_err());
}

#[test]
fn test_insert_cols_with_shared_init() {
    let mut table = RaggedTable::new(0.0);
    table.insert_cols(1, 2, Some(&[1.0, 2.0][..])).unwrap();
    assert_eq!(table.columns(), &[vec![1.0, 2.0], vec![1.0, 2.0]]);
}

#[test]
fn test_duplicate_col_inserts_copy() {
    let mut table = make_table(vec![vec![1.0, 2.0], vec![3.0]]);
    let events = record_events(&mut table);
    table.duplicate_col(1, 3).unwrap();
    assert_eq!(table.columns(), &[vec![1.0, 2.0], vec![3.0], vec![1.0, 2.0]]);
    assert_eq!(*events.borrow(), vec![ChangeEvent::ColDuplicated { from: 1, to: 3 }]);
}

#[test]
fn test_remove_col_updates_row_count() {
    let mut table = make_table(vec![vec![1.0, 2.0, 3.0], vec![4.0]]);
    let events = record_events(&mut table);

    table.remove_col(1).unwrap();
    assert_eq!(table.row_count(), 2);
    assert_eq!(
        *events.borrow(),
        vec![
            ChangeEvent::ColsRemoved { first: 1, count: 1 },
            ChangeEvent::RowsRemoved { first: 3, count: 2 },
        ]
    );
}

#[test]
fn test_remove_all_cols() {
    let mut table = make_table(vec![vec![1.0, 2.0], vec![3.0]]);
    table.remove_all_cols();
    assert_eq!(table.data_col_count(), 0);
    assert_eq!(table.row_count(), 1);
}

#[test]
fn test_move_col_reorders() {
    let mut table = make_table(vec![vec![1.0], vec![2.0], vec![3.0]]);
    table.move_col(1, 3).unwrap();
    assert_eq!(table.columns(), &[vec![2.0], vec![3.0], vec![1.0]]);
    assert!(table.move_col(1, 4).is_err());
}

#[test]
fn test_set_col_overwrites_and_extends() {
    let mut table = make_table(vec![vec![1.0, 2.0, 3.0], vec![4.0]]);
    table.set_col(2, &[7.0, 8.0, 9.0]).unwrap();
    table.set_col(1, &[5.0]).unwrap();
    assert_eq!(table.get_col(1).unwrap(), &[5.0, 2.0, 3.0]);
    assert_eq!(table.get_col(2).unwrap(), &[7.0, 8.0, 9.0]);
    assert!(table.get_col(3).is_err());
}

// === Notifications ===

#[test]
fn test_pause_broadcast_reloads_once() {
    let mut table = make_table(vec![vec![1.0]]);
    let events = record_events(&mut table);

    {
        let mut paused = table.pause_broadcast();
        paused.append_col(Some(vec![2.0, 3.0])).unwrap();
        paused.insert_row(1, None).unwrap();
        assert!(!paused.is_broadcasting());
    }

    assert!(table.is_broadcasting());
    assert_eq!(*events.borrow(), vec![ChangeEvent::DataReloaded]);
}

#[test]
fn test_nested_pause_keeps_outer_state() {
    let mut table = make_table(vec![vec![1.0]]);
    let events = record_events(&mut table);

    table.should_broadcast(false);
    {
        let mut paused = table.pause_broadcast();
        paused.append_element(1, 2.0).unwrap();
    }
    assert!(!table.is_broadcasting());
    assert!(events.borrow().is_empty());

    table.should_broadcast(true);
    assert_eq!(*events.borrow(), vec![ChangeEvent::DataReloaded]);
}

#[test]
fn test_unsubscribe_stops_delivery() {
    let mut table = make_table(vec![vec![1.0]]);
    let count = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&count);
    let id = table.subscribe(move |_| *sink.borrow_mut() += 1);

    table.set_element(1, 1, 2.0).unwrap();
    assert!(table.unsubscribe(id));
    assert!(!table.unsubscribe(id));
    table.set_element(1, 1, 3.0).unwrap();
    assert_eq!(*count.borrow(), 1);
}

#[test]
fn test_broadcaster_delivers_in_order() {
    let mut broadcaster = Broadcaster::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    for tag in ["a", "b"] {
        let sink = Rc::clone(&log);
        broadcaster.subscribe(move |_| sink.borrow_mut().push(tag));
    }
    broadcaster.emit(ChangeEvent::DataReloaded);
    assert_eq!(*log.borrow(), vec!["a", "b"]);
    assert_eq!(broadcaster.listener_count(), 2);
}

// === Properties ===

fn arb_columns() -> impl Strategy<Value = Vec<Vec<f64>>> {
    prop::collection::vec(prop::collection::vec(-1000.0f64..1000.0, 0..8), 1..5)
}

proptest! {
    #[test]
    fn insert_then_remove_row_is_identity(cols in arb_columns(), pick in 0usize..16) {
        let mut table = make_table(cols.clone());
        let max = table.max_row_count();
        let index = pick % (max + 1) + 1;

        table.insert_row(index, None).unwrap();
        for (before, after) in cols.iter().zip(table.columns()) {
            if before.len() < index {
                prop_assert_eq!(after.len(), before.len());
            } else {
                prop_assert_eq!(after.len(), before.len() + 1);
            }
        }

        // past the longest column nothing was inserted
        if index <= max {
            table.remove_row(index).unwrap();
        }
        prop_assert_eq!(table.columns(), cols.as_slice());
        prop_assert_eq!(table.row_count(), table.max_row_count() + 1);
    }

    #[test]
    fn row_count_tracks_longest_column(cols in arb_columns(), col_pick in 0usize..4, value in -5.0f64..5.0) {
        let mut table = make_table(cols);
        let col = col_pick % table.data_col_count() + 1;
        table.append_element(col, value).unwrap();
        prop_assert_eq!(table.row_count(), table.max_row_count() + 1);
        table.remove_element(1, col).unwrap();
        prop_assert_eq!(table.row_count(), table.max_row_count() + 1);
    }
}
