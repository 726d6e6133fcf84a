// SPDX-License-Identifier: MIT

//! SQL executor boundary and result rendering
//!
//! A fresh connection is opened for every call and dropped before the call
//! returns, on success and on failure alike. No pooling.

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::fmt;
use std::path::{Path, PathBuf};
use tabled::builder::Builder;
use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Style};

use crate::adk::error::ExecutorError;

/// Keyword that marks a statement as a read query
pub const READ_KEYWORD: &str = "SELECT";

/// True when the normalized statement starts with [`READ_KEYWORD`]
pub fn is_read_query(sql: &str) -> bool {
    sql.trim().to_uppercase().starts_with(READ_KEYWORD)
}

/// A single result cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(usize),
}

impl CellValue {
    fn is_numeric(&self) -> bool {
        matches!(self, CellValue::Integer(_) | CellValue::Real(_))
    }
}

impl From<ValueRef<'_>> for CellValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => CellValue::Null,
            ValueRef::Integer(i) => CellValue::Integer(i),
            ValueRef::Real(f) => CellValue::Real(f),
            ValueRef::Text(t) => CellValue::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => CellValue::Blob(b.len()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Real(r) => write!(f, "{}", r),
            CellValue::Text(t) => write!(f, "{}", t),
            CellValue::Blob(n) => write!(f, "<blob {} bytes>", n),
        }
    }
}

/// Columns and rows of a read query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl ResultTable {
    /// Render as a markdown pipe table.
    ///
    /// Columns whose non-null cells are all numbers are right-aligned,
    /// everything else left-aligned.
    pub fn to_markdown(&self) -> String {
        if self.columns.is_empty() {
            return String::new();
        }

        let mut builder = Builder::default();
        builder.push_record(self.columns.iter().map(|name| escape_cell(name)));
        for row in &self.rows {
            builder.push_record(
                (0..self.columns.len())
                    .map(|i| row.get(i).map(|c| escape_cell(&c.to_string())).unwrap_or_default()),
            );
        }

        let mut table = builder.build();
        table.with(Style::markdown());
        for i in (0..self.columns.len()).filter(|i| self.is_numeric_column(*i)) {
            table.modify(Columns::single(i), Alignment::right());
        }
        table.to_string()
    }

    fn is_numeric_column(&self, index: usize) -> bool {
        let mut cells = self
            .rows
            .iter()
            .filter_map(|r| r.get(index))
            .filter(|c| **c != CellValue::Null)
            .peekable();
        cells.peek().is_some() && cells.all(CellValue::is_numeric)
    }
}

/// Keep a cell on one table line
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
        .replace("\r\n", "<br>")
        .replace(['\n', '\r'], "<br>")
}

/// Database boundary used by the execute stage
pub trait SqlExecutor: Send + Sync {
    /// Run a read query and collect its rows
    fn query(&self, sql: &str) -> Result<ResultTable, ExecutorError>;

    /// Run any other statement
    fn execute(&self, sql: &str) -> Result<(), ExecutorError>;
}

/// SQLite file executor
#[derive(Debug, Clone)]
pub struct SqliteExecutor {
    path: PathBuf,
}

impl SqliteExecutor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the existing database file; never creates one
    fn connect(&self) -> Result<Connection, ExecutorError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        log::debug!("Opening database {}", self.path.display());
        Ok(Connection::open_with_flags(&self.path, flags)?)
    }
}

impl SqlExecutor for SqliteExecutor {
    fn query(&self, sql: &str) -> Result<ResultTable, ExecutorError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query([])?;
        let mut collected = Vec::new();
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                cells.push(CellValue::from(row.get_ref(i)?));
            }
            collected.push(cells);
        }

        Ok(ResultTable {
            columns,
            rows: collected,
        })
    }

    fn execute(&self, sql: &str) -> Result<(), ExecutorError> {
        let conn = self.connect()?;
        conn.execute_batch(sql)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> (tempfile::TempDir, SqliteExecutor) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE drivers (driver_id INTEGER, name TEXT, current_rating REAL);
             INSERT INTO drivers VALUES (101, 'Alice', 4.8), (102, 'Bob', NULL);",
        )
        .unwrap();
        (dir, SqliteExecutor::new(path))
    }

    #[test]
    fn test_is_read_query() {
        assert!(is_read_query("SELECT 1;"));
        assert!(is_read_query("  select name from drivers;"));
        assert!(!is_read_query("WITH x AS (SELECT 1) SELECT * FROM x;"));
        assert!(!is_read_query("DELETE FROM drivers;"));
        assert!(!is_read_query(""));
    }

    #[test]
    fn test_query_rows() {
        let (_dir, exec) = temp_db();
        let table = exec
            .query("SELECT name, current_rating FROM drivers ORDER BY driver_id;")
            .unwrap();
        assert_eq!(table.columns, vec!["name", "current_rating"]);
        assert_eq!(
            table.rows,
            vec![
                vec![CellValue::Text("Alice".into()), CellValue::Real(4.8)],
                vec![CellValue::Text("Bob".into()), CellValue::Null],
            ]
        );
    }

    #[test]
    fn test_execute_statement() {
        let (_dir, exec) = temp_db();
        exec.execute("DELETE FROM drivers WHERE driver_id = 102;")
            .unwrap();
        let table = exec.query("SELECT count(*) AS n FROM drivers;").unwrap();
        assert_eq!(table.rows, vec![vec![CellValue::Integer(1)]]);
    }

    #[test]
    fn test_query_error() {
        let (_dir, exec) = temp_db();
        let err = exec.query("SELECT nope FROM drivers;").unwrap_err();
        assert!(err.to_string().contains("no such column"));
    }

    #[test]
    fn test_missing_database_is_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");
        let exec = SqliteExecutor::new(&path);
        assert!(exec.query("SELECT 1;").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_markdown_alignment() {
        let table = ResultTable {
            columns: vec!["name".into(), "current_rating".into()],
            rows: vec![
                vec![CellValue::Text("Alice".into()), CellValue::Real(4.8)],
                vec![CellValue::Text("Dana".into()), CellValue::Real(4.9)],
            ],
        };
        let expected = "\
| name  | current_rating |
|-------|----------------|
| Alice |            4.8 |
| Dana  |            4.9 |";
        assert_eq!(table.to_markdown(), expected);
    }

    #[test]
    fn test_markdown_empty_rows() {
        let table = ResultTable {
            columns: vec!["name".into()],
            rows: vec![],
        };
        let rendered = table.to_markdown();
        assert_eq!(rendered.lines().next(), Some("| name |"));
        assert!(!rendered.contains("\n| "));
    }

    #[test]
    fn test_markdown_cells_stay_on_one_line() {
        let table = ResultTable {
            columns: vec!["note".into()],
            rows: vec![vec![CellValue::Text("late\npickup | a|b\r\nend".into())]],
        };
        let rendered = table.to_markdown();
        assert_eq!(rendered.lines().count(), 3);
        assert_eq!(
            rendered.lines().last(),
            Some("| late<br>pickup \\| a\\|b<br>end |")
        );
    }

    #[test]
    fn test_markdown_mixed_column_left_aligned() {
        let table = ResultTable {
            columns: vec!["value".into()],
            rows: vec![
                vec![CellValue::Integer(7)],
                vec![CellValue::Text("n/a".into())],
            ],
        };
        assert_eq!(
            table.to_markdown(),
            "| value |\n|-------|\n| 7     |\n| n/a   |"
        );
    }

    #[test]
    fn test_markdown_whole_floats_and_nulls() {
        let table = ResultTable {
            columns: vec!["fare".into()],
            rows: vec![vec![CellValue::Real(32.0)], vec![CellValue::Null]],
        };
        assert_eq!(
            table.to_markdown(),
            "| fare |\n|------|\n|   32 |\n|      |"
        );
    }
}
