//! Validity tracking for a statement handle.
//!
//! A handle starts [`StatementStatus::Uninitialized`], becomes
//! [`StatementStatus::Initialized`] once a compiled statement from a live
//! connection is attached, and ends in one of two terminal states: the caller
//! finalized it, or the owning connection was torn down underneath it. Both
//! terminal paths, re-initialization and drop go through [`Handle::release`]
//! or [`Handle::attach`], which are the only places the foreign handle is
//! disposed of.

use std::os::raw::c_int;
use std::rc::Weak;

use crate::error::{DbError, StatementError, StatementResult};
use crate::ffi::{self, RawDb, RawStmt};

/// Lifecycle state of a [`Statement`](crate::Statement).
///
/// Converts to the integers `0..=3` in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize),
    serde(rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum StatementStatus {
    /// No compiled statement was ever attached.
    #[default]
    Uninitialized = 0,
    /// Attached to a compiled statement on a live connection.
    Initialized = 1,
    /// Explicitly finalized by the caller.
    Finalized = 2,
    /// Released because the owning connection was torn down.
    ConnectionFinalized = 3,
}

impl StatementStatus {
    /// Returns `true` for the two states no handle comes back from.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finalized | Self::ConnectionFinalized)
    }
}

impl From<StatementStatus> for i64 {
    fn from(status: StatementStatus) -> Self {
        status as Self
    }
}

/// The terminal state a release moves the handle into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Teardown {
    Finalized,
    ConnectionFinalized,
}

impl From<Teardown> for StatementStatus {
    fn from(teardown: Teardown) -> Self {
        match teardown {
            Teardown::Finalized => Self::Finalized,
            Teardown::ConnectionFinalized => Self::ConnectionFinalized,
        }
    }
}

/// The foreign statement handle plus its validity state.
#[derive(Default)]
pub(crate) struct Handle {
    status: StatementStatus,
    stmt: Option<RawStmt>,
    /// Non-owning reference to the connection the statement was compiled on.
    db: Option<Weak<RawDb>>,
}

impl Handle {
    pub(crate) const fn status(&self) -> StatementStatus {
        self.status
    }

    /// Attaches a compiled statement, disposing of any previous one first.
    ///
    /// The handle only becomes initialized when the connection is still
    /// alive and a statement is supplied; otherwise it is left uninitialized
    /// and the supplied statement, if any, is disposed of. Returns the
    /// disposal error of the previous statement, if there was one.
    pub(crate) fn attach(&mut self, db: &Weak<RawDb>, stmt: Option<RawStmt>) -> Option<DbError> {
        let previous = self.dispose();
        match stmt {
            Some(stmt) if db.strong_count() > 0 => {
                self.stmt = Some(stmt);
                self.db = Some(db.clone());
                self.status = StatementStatus::Initialized;
            }
            _ => {
                self.db = None;
                self.status = StatementStatus::Uninitialized;
            }
        }
        previous
    }

    /// Moves the handle into `target` and disposes of the statement.
    ///
    /// A handle that is already terminal keeps its state, so repeated
    /// releases are no-ops. The connection reference is dropped in every
    /// case and never dereferenced afterwards.
    pub(crate) fn release(&mut self, target: Teardown) -> Option<DbError> {
        if !self.status.is_terminal() {
            self.status = target.into();
        }
        let failure = self.dispose();
        self.db = None;
        failure
    }

    /// Checks the handle is usable and returns the statement.
    pub(crate) fn stmt(&self) -> StatementResult<&RawStmt> {
        match self.status {
            StatementStatus::Finalized => return Err(StatementError::Finalized),
            StatementStatus::ConnectionFinalized => return Err(StatementError::ConnectionGone),
            StatementStatus::Uninitialized => return Err(StatementError::Uninitialized),
            StatementStatus::Initialized => {}
        }
        if !self.connection_alive() {
            return Err(StatementError::ConnectionGone);
        }
        self.stmt.as_ref().ok_or(StatementError::Corrupted)
    }

    /// Like [`Handle::stmt`] without the diagnosis.
    pub(crate) fn raw(&self) -> Option<&RawStmt> {
        self.stmt().ok()
    }

    /// Whether the statement was compiled on the connection behind `db`.
    pub(crate) fn is_attached_to(&self, db: &Weak<RawDb>) -> bool {
        self.db.as_ref().is_some_and(|own| own.ptr_eq(db))
    }

    /// Builds an engine error for `code` using the connection's error text.
    ///
    /// Falls back to the engine's generic description of the code when the
    /// connection is no longer reachable.
    pub(crate) fn engine_error(&self, code: c_int) -> DbError {
        let message = self
            .db
            .as_ref()
            .and_then(Weak::upgrade)
            .map_or_else(|| ffi::errstr(code), |db| db.errmsg());
        DbError::new(code, message)
    }

    fn connection_alive(&self) -> bool {
        self.db.as_ref().is_some_and(|db| db.strong_count() > 0)
    }

    fn dispose(&mut self) -> Option<DbError> {
        let stmt = self.stmt.take()?;
        let rc = stmt.finalize();
        (rc != ffi::SQLITE_OK).then(|| self.engine_error(rc))
    }
}
