//! Safe wrapper around a `SQLite` database connection.
//!
//! This file contains **no `unsafe` code**. All FFI interaction is delegated to
//! [`ffi::RawDb`] which encapsulates the raw pointers and C type conversions.

use std::cell::RefCell;
use std::os::raw::c_int;
use std::path::Path;
use std::rc::Rc;

use crate::error::{DbError, DbResult, StatementResult};
use crate::ffi::{self, RawDb};
use crate::statement::{Statement, StatementRef};

/// How a database file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OpenMode {
    /// Read and write, creating the file if it does not exist.
    #[default]
    ReadWrite,
    /// Read only; the file must exist.
    ReadOnly,
}

impl OpenMode {
    const fn flags(self) -> c_int {
        match self {
            Self::ReadWrite => {
                ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE | ffi::SQLITE_OPEN_FULLMUTEX
            }
            Self::ReadOnly => ffi::SQLITE_OPEN_READONLY | ffi::SQLITE_OPEN_FULLMUTEX,
        }
    }
}

/// A `SQLite` database connection.
///
/// Every statement prepared through the connection is tracked weakly. When
/// the connection is closed or dropped it first notifies each statement that
/// is still alive, which releases the statement's handle and leaves it in
/// [`StatementStatus::ConnectionFinalized`](crate::StatementStatus::ConnectionFinalized).
///
/// Not `Send` or `Sync`; all access must happen from a single thread.
pub struct Connection {
    db: Rc<RawDb>,
    statements: RefCell<Vec<StatementRef>>,
}

impl Connection {
    /// Opens (or creates) a database at `path`.
    ///
    /// # Errors
    ///
    /// Returns the engine error if the file cannot be opened.
    pub fn open(path: &Path, mode: OpenMode) -> DbResult<Self> {
        let Some(path_str) = path.to_str() else {
            return Err(DbError::new(
                ffi::SQLITE_CANTOPEN,
                format!("database path is not valid UTF-8: {}", path.display()),
            ));
        };
        let db = RawDb::open(path_str, mode.flags())?;
        log::debug!("hostsql: opened {path_str} ({mode:?})");
        Ok(Self {
            db: Rc::new(db),
            statements: RefCell::new(Vec::new()),
        })
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns the engine error if the database cannot be created.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::open(Path::new(":memory:"), OpenMode::ReadWrite)
    }

    /// Executes one or more SQL statements separated by semicolons.
    ///
    /// No result rows are returned. Suitable for DDL, PRAGMAs, and
    /// multi-statement scripts.
    ///
    /// # Errors
    ///
    /// Returns the engine error of the first failing statement.
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.db.exec(sql)
    }

    /// Compiles a single SQL statement.
    ///
    /// # Errors
    ///
    /// Returns [`StatementError::Engine`](crate::StatementError::Engine) when
    /// the SQL does not compile or contains no statement.
    pub fn prepare(&self, sql: &str) -> StatementResult<Statement> {
        let mut statement = Statement::new();
        self.prepare_into(&mut statement, sql)?;
        Ok(statement)
    }

    /// Compiles `sql` and attaches it to an existing statement, releasing
    /// whatever statement it held before.
    ///
    /// # Errors
    ///
    /// Fails when the SQL does not compile, or when `statement` was already
    /// finalized or orphaned, since those states are final.
    pub fn prepare_into(&self, statement: &mut Statement, sql: &str) -> StatementResult<()> {
        let raw = self.db.prepare(sql)?;
        statement.initialize(&Rc::downgrade(&self.db), raw)?;
        self.register(statement);
        Ok(())
    }

    /// Returns the number of rows changed by the most recent statement.
    #[must_use]
    pub fn changes(&self) -> usize {
        self.db.changes()
    }

    /// Returns the rowid of the most recent successful INSERT.
    #[must_use]
    pub fn last_insert_rowid(&self) -> i64 {
        self.db.last_insert_rowid()
    }

    /// Closes the connection, orphaning every statement prepared on it.
    pub fn close(self) {
        drop(self);
    }

    fn register(&self, statement: &Statement) {
        let entry = statement.downgrade();
        let mut statements = self.statements.borrow_mut();
        statements.retain(StatementRef::is_alive);
        if !statements.iter().any(|known| known.ptr_eq(&entry)) {
            statements.push(entry);
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("statements", &self.statements.borrow().len())
            .finish_non_exhaustive()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let db = Rc::downgrade(&self.db);
        let statements = std::mem::take(self.statements.get_mut());
        for statement in &statements {
            statement.connection_finalized(&db);
        }
        log::debug!(
            "hostsql: connection closed, {} statement(s) notified",
            statements.len()
        );
    }
}
