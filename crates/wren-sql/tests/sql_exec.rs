//! End-to-end statement execution against a scratch database.

use tempfile::TempDir;
use wren_common::config::DatabaseConfig;
use wren_common::error::DbError;
use wren_common::types::{DataType, Value};
use wren_sql::ast::{
    ColumnDef, CreateIndexStatement, CreateTableStatement, DeleteStatement, DropIndexStatement,
    DropTableStatement, IndexMethod, InsertStatement, Literal, SelectStatement,
    ShowColumnsStatement, ShowIndexStatement, Statement,
};
use wren_sql::Database;

fn scratch_db(dir: &TempDir) -> Database {
    Database::new(DatabaseConfig::with_data_dir(dir.path()))
}

fn create_egg() -> Statement {
    Statement::CreateTable(CreateTableStatement {
        table_name: "egg".to_string(),
        columns: vec![
            ColumnDef::new("yolk", DataType::Text),
            ColumnDef::new("white", DataType::Int),
            ColumnDef::new("shell", DataType::Int),
        ],
    })
}

fn create_chicken_index(method: IndexMethod) -> Statement {
    Statement::CreateIndex(CreateIndexStatement {
        index_name: "chicken".to_string(),
        table_name: "egg".to_string(),
        method,
        columns: vec!["yolk".to_string(), "shell".to_string()],
    })
}

fn show_tables() -> Statement {
    Statement::ShowTables
}

fn show_index_from_egg() -> Statement {
    Statement::ShowIndex(ShowIndexStatement {
        table_name: "egg".to_string(),
    })
}

#[test]
fn schema_flow() {
    let dir = TempDir::new().unwrap();
    let mut db = scratch_db(&dir);

    // CREATE TABLE egg(yolk TEXT, white INT, shell INT)
    let result = db.execute(&create_egg()).unwrap();
    assert_eq!(result.message(), "created egg");

    // SHOW TABLES => 1 row (catalog tables hidden)
    let result = db.execute(&show_tables()).unwrap();
    assert_eq!(result.rows().unwrap().len(), 1);
    assert_eq!(result.rows().unwrap()[0]["table_name"], Value::text("egg"));

    // SHOW COLUMNS FROM egg => 3 rows in declaration order
    let result = db
        .execute(&Statement::ShowColumns(ShowColumnsStatement {
            table_name: "egg".to_string(),
        }))
        .unwrap();
    let rows = result.rows().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["column_name"], Value::text("yolk"));
    assert_eq!(rows[1]["column_name"], Value::text("white"));
    assert_eq!(rows[2]["column_name"], Value::text("shell"));
    assert_eq!(rows[0]["data_type"], Value::text("TEXT"));

    // CREATE INDEX chicken ON egg USING HASH (yolk, shell)
    let result = db.execute(&create_chicken_index(IndexMethod::Hash)).unwrap();
    assert_eq!(result.message(), "created index chicken");

    // SHOW INDEX FROM egg => 2 rows, seq_in_index 1 and 2, not unique
    let result = db.execute(&show_index_from_egg()).unwrap();
    let rows = result.rows().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["seq_in_index"], Value::int(1));
    assert_eq!(rows[1]["seq_in_index"], Value::int(2));
    assert_eq!(rows[0]["index_type"], Value::text("HASH"));
    assert_eq!(rows[0]["is_unique"], Value::boolean(false));

    // DROP INDEX chicken FROM egg => SHOW INDEX => 0 rows
    db.execute(&Statement::DropIndex(DropIndexStatement {
        index_name: "chicken".to_string(),
        table_name: "egg".to_string(),
    }))
    .unwrap();
    let result = db.execute(&show_index_from_egg()).unwrap();
    assert_eq!(result.rows().unwrap().len(), 0);

    // DROP TABLE egg => SHOW TABLES => 0 rows
    let result = db
        .execute(&Statement::DropTable(DropTableStatement {
            table_name: "egg".to_string(),
        }))
        .unwrap();
    assert_eq!(result.message(), "dropped egg");
    let result = db.execute(&show_tables()).unwrap();
    assert_eq!(result.rows().unwrap().len(), 0);
}

#[test]
fn insert_through_index() {
    let dir = TempDir::new().unwrap();
    let mut db = scratch_db(&dir);

    db.execute(&create_egg()).unwrap();
    db.execute(&create_chicken_index(IndexMethod::BTree)).unwrap();

    // INSERT INTO egg VALUES ("yellow", 1, 2)
    let result = db
        .execute(&Statement::Insert(InsertStatement {
            table_name: "egg".to_string(),
            columns: None,
            values: vec![
                Literal::Text("yellow".to_string()),
                Literal::Int(1),
                Literal::Int(2),
            ],
        }))
        .unwrap();
    assert_eq!(
        result.message(),
        "successfully inserted 1 row into egg and 1 indices"
    );

    // SELECT yolk,white,shell FROM egg WHERE yolk="yellow" AND shell=2
    let result = db
        .execute(&Statement::Select(SelectStatement {
            columns: Some(vec![
                "yolk".to_string(),
                "white".to_string(),
                "shell".to_string(),
            ]),
            table_name: "egg".to_string(),
            selection: Some(vec![
                ("yolk".to_string(), Literal::Text("yellow".to_string())),
                ("shell".to_string(), Literal::Int(2)),
            ]),
        }))
        .unwrap();
    let rows = result.rows().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["yolk"], Value::text("yellow"));
    assert_eq!(rows[0]["white"], Value::int(1));
    assert_eq!(rows[0]["shell"], Value::int(2));

    // a non-matching conjunction finds nothing
    let result = db
        .execute(&Statement::Select(SelectStatement {
            columns: None,
            table_name: "egg".to_string(),
            selection: Some(vec![("shell".to_string(), Literal::Int(9))]),
        }))
        .unwrap();
    assert_eq!(result.rows().unwrap().len(), 0);
}

#[test]
fn select_star_and_projection() {
    let dir = TempDir::new().unwrap();
    let mut db = scratch_db(&dir);
    db.execute(&create_egg()).unwrap();

    for (yolk, white, shell) in [("a", 1, 10), ("b", 2, 20), ("c", 3, 10)] {
        db.execute(&Statement::Insert(InsertStatement {
            table_name: "egg".to_string(),
            columns: None,
            values: vec![
                Literal::Text(yolk.to_string()),
                Literal::Int(white),
                Literal::Int(shell),
            ],
        }))
        .unwrap();
    }

    // SELECT * FROM egg
    let result = db
        .execute(&Statement::Select(SelectStatement {
            columns: None,
            table_name: "egg".to_string(),
            selection: None,
        }))
        .unwrap();
    assert_eq!(result.rows().unwrap().len(), 3);
    assert_eq!(result.column_names().unwrap().len(), 3);
    assert_eq!(
        result.column_attributes().unwrap()[0].data_type(),
        DataType::Text
    );

    // SELECT yolk FROM egg WHERE shell = 10
    let result = db
        .execute(&Statement::Select(SelectStatement {
            columns: Some(vec!["yolk".to_string()]),
            table_name: "egg".to_string(),
            selection: Some(vec![("shell".to_string(), Literal::Int(10))]),
        }))
        .unwrap();
    let rows = result.rows().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.len() == 1));
    assert_eq!(rows[0]["yolk"], Value::text("a"));
    assert_eq!(rows[1]["yolk"], Value::text("c"));
}

#[test]
fn insert_with_explicit_columns() {
    let dir = TempDir::new().unwrap();
    let mut db = scratch_db(&dir);
    db.execute(&create_egg()).unwrap();

    db.execute(&Statement::Insert(InsertStatement {
        table_name: "egg".to_string(),
        columns: Some(vec![
            "shell".to_string(),
            "yolk".to_string(),
            "white".to_string(),
        ]),
        values: vec![
            Literal::Int(7),
            Literal::Text("gold".to_string()),
            Literal::Int(5),
        ],
    }))
    .unwrap();

    let result = db
        .execute(&Statement::Select(SelectStatement {
            columns: None,
            table_name: "egg".to_string(),
            selection: None,
        }))
        .unwrap();
    let rows = result.rows().unwrap();
    assert_eq!(rows[0]["yolk"], Value::text("gold"));
    assert_eq!(rows[0]["white"], Value::int(5));
    assert_eq!(rows[0]["shell"], Value::int(7));
}

#[test]
fn btree_index_enforces_uniqueness_via_sql() {
    let dir = TempDir::new().unwrap();
    let mut db = scratch_db(&dir);
    db.execute(&create_egg()).unwrap();
    db.execute(&Statement::CreateIndex(CreateIndexStatement {
        index_name: "by_white".to_string(),
        table_name: "egg".to_string(),
        method: IndexMethod::BTree,
        columns: vec!["white".to_string()],
    }))
    .unwrap();

    let insert = |white: i32| {
        Statement::Insert(InsertStatement {
            table_name: "egg".to_string(),
            columns: None,
            values: vec![
                Literal::Text("x".to_string()),
                Literal::Int(white),
                Literal::Int(0),
            ],
        })
    };
    db.execute(&insert(1)).unwrap();
    let err = db.execute(&insert(1)).unwrap_err();
    assert!(matches!(err.db_error(), Some(DbError::DuplicateKey)));
}

#[test]
fn error_surface() {
    let dir = TempDir::new().unwrap();
    let mut db = scratch_db(&dir);

    // unknown table
    let err = db
        .execute(&Statement::Select(SelectStatement {
            columns: None,
            table_name: "missing".to_string(),
            selection: None,
        }))
        .unwrap_err();
    assert!(matches!(err.db_error(), Some(DbError::NoSuchTable(_))));

    // schema tables cannot be dropped
    let err = db
        .execute(&Statement::DropTable(DropTableStatement {
            table_name: "_tables".to_string(),
        }))
        .unwrap_err();
    assert!(matches!(err.db_error(), Some(DbError::SchemaViolation(_))));

    db.execute(&create_egg()).unwrap();

    // duplicate table
    let err = db.execute(&create_egg()).unwrap_err();
    assert!(matches!(err.db_error(), Some(DbError::SchemaViolation(_))));

    // unknown projection column
    let err = db
        .execute(&Statement::Select(SelectStatement {
            columns: Some(vec!["feathers".to_string()]),
            table_name: "egg".to_string(),
            selection: None,
        }))
        .unwrap_err();
    assert!(matches!(err.db_error(), Some(DbError::NoSuchColumn(_))));

    // unknown index column
    let err = db
        .execute(&Statement::CreateIndex(CreateIndexStatement {
            index_name: "bad".to_string(),
            table_name: "egg".to_string(),
            method: IndexMethod::BTree,
            columns: vec!["feathers".to_string()],
        }))
        .unwrap_err();
    assert!(matches!(err.db_error(), Some(DbError::NoSuchColumn(_))));

    // column/value arity mismatch
    let err = db
        .execute(&Statement::Insert(InsertStatement {
            table_name: "egg".to_string(),
            columns: None,
            values: vec![Literal::Int(1)],
        }))
        .unwrap_err();
    assert!(matches!(err.db_error(), Some(DbError::SchemaViolation(_))));

    // DELETE is not implemented at the SQL level
    let err = db
        .execute(&Statement::Delete(DeleteStatement {
            table_name: "egg".to_string(),
            selection: None,
        }))
        .unwrap_err();
    assert!(matches!(err.db_error(), Some(DbError::NotImplemented(_))));
}

#[test]
fn catalog_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let mut db = scratch_db(&dir);
        db.execute(&create_egg()).unwrap();
        db.execute(&Statement::Insert(InsertStatement {
            table_name: "egg".to_string(),
            columns: None,
            values: vec![
                Literal::Text("kept".to_string()),
                Literal::Int(1),
                Literal::Int(2),
            ],
        }))
        .unwrap();
    }

    // a fresh Database value over the same directory sees everything
    let mut db = scratch_db(&dir);
    let result = db.execute(&show_tables()).unwrap();
    assert_eq!(result.rows().unwrap().len(), 1);

    let result = db
        .execute(&Statement::Select(SelectStatement {
            columns: None,
            table_name: "egg".to_string(),
            selection: None,
        }))
        .unwrap();
    let rows = result.rows().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["yolk"], Value::text("kept"));
}
