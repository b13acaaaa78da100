//! Prepared-statement binding for `SQLite` with a dynamic value model.
//!
//! [`Statement`] owns one compiled statement and converts between the engine's
//! storage classes and [`Variant`], the host's dynamically typed value. Rows
//! come back as insertion-ordered [`Row`] maps keyed by column name.
//!
//! ```rust
//! use hostsql::{params, Connection, StepResult, Variant};
//!
//! let conn = Connection::open_in_memory()?;
//! conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT);")?;
//!
//! let mut insert = conn.prepare("INSERT INTO t (name) VALUES (?1)")?;
//! insert.bind_all(params!["ada"])?;
//! insert.execute()?;
//!
//! let mut select = conn.prepare("SELECT id, name FROM t")?;
//! assert_eq!(select.step()?, StepResult::Row);
//! assert_eq!(select.row()["name"], Variant::from("ada"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! The raw engine symbols come from `libsqlite3-sys` with its bundled
//! amalgamation. The `ffi` module is the **only** file that contains `unsafe`
//! code or C types.

mod ffi;

mod codec;
mod connection;
pub mod error;
mod lifecycle;
pub mod logger;
mod row;
mod statement;
mod variant;

pub use connection::{Connection, OpenMode};
pub use error::{DbError, ErrorKind, StatementError, StatementResult};
pub use lifecycle::StatementStatus;
pub use row::Row;
pub use statement::{Statement, StepResult};
pub use variant::Variant;

/// Engine result codes returned by [`StepResult::code`] and
/// [`StatementError::code`].
pub mod codes {
    pub use libsqlite3_sys::{
        SQLITE_CANTOPEN, SQLITE_CONSTRAINT, SQLITE_DONE, SQLITE_ERROR, SQLITE_MISMATCH,
        SQLITE_MISUSE, SQLITE_OK, SQLITE_RANGE, SQLITE_READONLY, SQLITE_ROW,
    };
}

#[cfg(test)]
mod tests;
