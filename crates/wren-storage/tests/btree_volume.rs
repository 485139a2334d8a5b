//! Volume test for the B+Tree index: bulk build over a large relation,
//! then point lookups through several levels of interior nodes.

use tempfile::TempDir;
use wren_common::types::{ColumnAttribute, DataType, Row, Value};
use wren_storage::btree::BTreeIndex;
use wren_storage::heap::HeapTable;

const BLOCK_SIZE: usize = 4096;

fn row(a: i32, b: i32) -> Row {
    let mut row = Row::new();
    row.insert("a".to_string(), Value::int(a));
    row.insert("b".to_string(), Value::int(b));
    row
}

fn key_row(a: i32) -> Row {
    let mut row = Row::new();
    row.insert("a".to_string(), Value::int(a));
    row
}

#[test]
fn btree_bulk_build_and_point_lookups() {
    let dir = TempDir::new().unwrap();
    let mut table = HeapTable::new(
        dir.path(),
        BLOCK_SIZE,
        "volume",
        vec!["a".to_string(), "b".to_string()],
        vec![
            ColumnAttribute::new(DataType::Int),
            ColumnAttribute::new(DataType::Int),
        ],
    );
    table.create().unwrap();

    table.insert(&row(12, 99)).unwrap();
    table.insert(&row(88, 101)).unwrap();
    for i in 0..50_000 {
        table.insert(&row(100 + i, -i)).unwrap();
    }

    let mut index = BTreeIndex::new(
        dir.path(),
        BLOCK_SIZE,
        &table,
        "a_idx",
        vec!["a".to_string()],
        true,
    )
    .unwrap();
    index.create(&mut table).unwrap();

    // the two seed rows
    let found = index.lookup(&key_row(12)).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(table.project(found[0]).unwrap(), row(12, 99));

    let found = index.lookup(&key_row(88)).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(table.project(found[0]).unwrap(), row(88, 101));

    // a key that was never inserted
    assert!(index.lookup(&key_row(6)).unwrap().is_empty());

    // a slice of the bulk rows
    for i in 0..1000 {
        let found = index.lookup(&key_row(100 + i)).unwrap();
        assert_eq!(found.len(), 1, "lookup of a = {}", 100 + i);
        assert_eq!(table.project(found[0]).unwrap(), row(100 + i, -i));
    }
}
