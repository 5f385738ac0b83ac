//! Single-table employee store backed by rusqlite.
//!
//! Duplicate detection rides on the UNIQUE constraint rather than a
//! read-then-insert race, matching how the registry contract defines the
//! conflict case.

#![allow(missing_docs)]

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use crate::core::errors::Result;

/// One stored employee row. `id` is opaque server-side identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredEmployee {
    pub id: i64,
    #[serde(rename = "employeeNo")]
    pub employee_no: String,
    pub name: String,
}

/// Result of an insert attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Row inserted; the stored record with its assigned id.
    Inserted(StoredEmployee),
    /// An employee with that number already exists; nothing changed.
    Duplicate,
}

/// Thread-safe repository over one SQLite connection.
#[derive(Debug)]
pub struct EmployeeRepository {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS employees (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    employee_no TEXT NOT NULL UNIQUE,
    name        TEXT NOT NULL
);
";

impl EmployeeRepository {
    /// Fresh in-memory store (one per service instance).
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// File-backed store.
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert a new employee; [`InsertOutcome::Duplicate`] when the UNIQUE
    /// constraint rejects the number.
    pub fn insert(&self, employee_no: &str, name: &str) -> Result<InsertOutcome> {
        let conn = self.conn.lock();
        let inserted = conn.execute(
            "INSERT INTO employees (employee_no, name) VALUES (?1, ?2)",
            params![employee_no, name],
        );
        match inserted {
            Ok(_) => {
                let id = conn.last_insert_rowid();
                Ok(InsertOutcome::Inserted(StoredEmployee {
                    id,
                    employee_no: employee_no.to_string(),
                    name: name.to_string(),
                }))
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Ok(InsertOutcome::Duplicate)
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Look one employee up by number.
    pub fn find_by_employee_no(&self, employee_no: &str) -> Result<Option<StoredEmployee>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT id, employee_no, name FROM employees WHERE employee_no = ?1",
                params![employee_no],
                row_to_employee,
            )
            .optional()?;
        Ok(row)
    }

    /// All employees in insertion order.
    pub fn find_all(&self) -> Result<Vec<StoredEmployee>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id, employee_no, name FROM employees ORDER BY id")?;
        let rows = stmt.query_map([], row_to_employee)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Employees whose number starts with `<department>-`.
    ///
    /// The default match is case-insensitive (SQL `LIKE`); the pattern is
    /// escaped so `%`, `_`, and `\` in the query string match literally and
    /// garbage input yields an empty result instead of wildcarding. The
    /// `case_sensitive` path exists only as a seedable quirk.
    pub fn find_by_department(
        &self,
        department: &str,
        case_sensitive: bool,
    ) -> Result<Vec<StoredEmployee>> {
        let conn = self.conn.lock();
        if case_sensitive {
            let prefix = format!("{department}-");
            let prefix_chars = i64::try_from(prefix.chars().count()).unwrap_or(i64::MAX);
            let mut stmt = conn.prepare(
                "SELECT id, employee_no, name FROM employees \
                 WHERE substr(employee_no, 1, ?2) = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![prefix, prefix_chars], row_to_employee)?;
            return rows
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(Into::into);
        }

        let pattern = format!("{}-%", escape_like(department));
        let mut stmt = conn.prepare(
            "SELECT id, employee_no, name FROM employees \
             WHERE employee_no LIKE ?1 ESCAPE '\\' ORDER BY id",
        )?;
        let rows = stmt.query_map(params![pattern], row_to_employee)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    /// Rename one employee; `None` when absent.
    pub fn update_name(&self, employee_no: &str, name: &str) -> Result<Option<StoredEmployee>> {
        {
            let conn = self.conn.lock();
            let changed = conn.execute(
                "UPDATE employees SET name = ?2 WHERE employee_no = ?1",
                params![employee_no, name],
            )?;
            if changed == 0 {
                return Ok(None);
            }
        }
        self.find_by_employee_no(employee_no)
    }
}

fn row_to_employee(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredEmployee> {
    Ok(StoredEmployee {
        id: row.get(0)?,
        employee_no: row.get(1)?,
        name: row.get(2)?,
    })
}

/// Escape SQL LIKE metacharacters so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
