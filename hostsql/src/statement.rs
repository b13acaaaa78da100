//! The host-facing prepared statement.
//!
//! This file contains **no `unsafe` code**. All FFI interaction is delegated to
//! [`ffi::RawStmt`] which encapsulates the raw pointers and C type conversions.

use std::cell::RefCell;
use std::fmt;
use std::os::raw::c_int;
use std::rc::{Rc, Weak};

use crate::codec::SqlParam;
use crate::error::{StatementError, StatementResult};
use crate::ffi::{self, RawDb, RawStmt};
use crate::lifecycle::{Handle, StatementStatus, Teardown};
use crate::row::{self, Row};
use crate::variant::Variant;

/// Result of a single successful `sqlite3_step` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepResult {
    /// A result row is available (`SQLITE_ROW`).
    Row,
    /// The statement has finished executing (`SQLITE_DONE`).
    Done,
}

impl StepResult {
    /// Returns the engine code for this outcome.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Row => ffi::SQLITE_ROW,
            Self::Done => ffi::SQLITE_DONE,
        }
    }
}

/// A prepared statement handle.
///
/// Created via [`Connection::prepare`](crate::Connection::prepare), or empty
/// via [`Statement::new`] and attached later with
/// [`Connection::prepare_into`](crate::Connection::prepare_into).
///
/// Every fallible operation returns a [`StatementResult`] and also records
/// the failure as the sticky [`error_message`](Self::error_message), which
/// keeps the text of the last failure until the next one replaces it.
///
/// The underlying handle is released when the statement is finalized, when
/// its connection closes, or when the statement is dropped, whichever comes
/// first. Not `Send`: a statement belongs to the thread that created it.
pub struct Statement {
    state: Rc<RefCell<StatementState>>,
}

impl Statement {
    /// Creates an uninitialized statement; every data operation fails until a
    /// connection attaches a compiled statement to it.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(StatementState::default())),
        }
    }

    pub(crate) fn initialize(&self, db: &Weak<RawDb>, stmt: RawStmt) -> StatementResult<()> {
        self.state.borrow_mut().initialize(db, Some(stmt))
    }

    pub(crate) fn downgrade(&self) -> StatementRef {
        StatementRef(Rc::downgrade(&self.state))
    }

    // ── Binding ─────────────────────────────────────────────────────────

    /// Binds `value` to the 0-based parameter `index`.
    ///
    /// # Errors
    ///
    /// Fails without touching any binding when the handle is not ready, the
    /// index is outside `0..parameter_count`, or the value has no storage
    /// class.
    pub fn bind(&mut self, index: i64, value: &Variant) -> StatementResult<()> {
        self.state.borrow_mut().bind(index, value)
    }

    /// Binds `values` positionally to every parameter.
    ///
    /// Values beyond the parameter count are ignored with a warning.
    ///
    /// # Errors
    ///
    /// Fails before binding anything when fewer values than parameters are
    /// supplied, and stops at the first value that cannot be bound.
    pub fn bind_all(&mut self, values: &[Variant]) -> StatementResult<()> {
        self.state.borrow_mut().bind_all(values)
    }

    /// Binds every named parameter from `values`, keyed by name without the
    /// sigil (`:id`, `@id` and `$id` all look up `"id"`).
    ///
    /// Keys that match no parameter are ignored. A name used by several
    /// placeholders is a single parameter, so its value applies to all of them.
    ///
    /// # Errors
    ///
    /// Fails on the first parameter that is nameless, missing from `values`,
    /// or holds a value that cannot be bound.
    pub fn bind_named(&mut self, values: &Row) -> StatementResult<()> {
        self.state.borrow_mut().bind_named(values)
    }

    /// Resets every parameter binding to NULL. The current row is kept.
    ///
    /// # Errors
    ///
    /// Fails when the handle is not ready.
    pub fn clear_bindings(&mut self) -> StatementResult<()> {
        self.state.borrow_mut().clear_bindings()
    }

    // ── Execution ───────────────────────────────────────────────────────

    /// Rewinds the statement so it can be stepped from the first row again.
    /// Bindings are kept.
    ///
    /// # Errors
    ///
    /// Fails when the handle is not ready or the engine rejects the reset.
    pub fn reset(&mut self) -> StatementResult<()> {
        self.state.borrow_mut().reset()
    }

    /// Advances the statement by one row.
    ///
    /// On [`StepResult::Row`] the row becomes available through
    /// [`row`](Self::row).
    ///
    /// # Errors
    ///
    /// Returns the engine's error (see [`StatementError::code`] for the raw
    /// code), or `SQLITE_MISUSE` when the handle is not ready.
    pub fn step(&mut self) -> StatementResult<StepResult> {
        self.state.borrow_mut().step()
    }

    /// Steps until the statement is done, discarding any rows.
    ///
    /// # Errors
    ///
    /// Fails when the handle is not ready or any step fails.
    pub fn execute(&mut self) -> StatementResult<()> {
        self.state.borrow_mut().execute()
    }

    /// Steps until the statement stops producing rows and returns them.
    ///
    /// Rows collected before a failing step are still returned; check
    /// [`error_message`](Self::error_message) to tell a clean run from a
    /// truncated one.
    pub fn fetch_all(&mut self) -> Vec<Row> {
        self.state.borrow_mut().fetch_all()
    }

    // ── Introspection ───────────────────────────────────────────────────

    /// Returns a copy of the current row, or an empty row when there is none.
    #[must_use]
    pub fn row(&self) -> Row {
        self.state.borrow().current_row.clone().unwrap_or_default()
    }

    /// Returns the result column names, empty if the handle is not ready.
    pub fn column_names(&mut self) -> Vec<String> {
        let mut state = self.state.borrow_mut();
        state.cache_column_names();
        state.column_names.clone().unwrap_or_default()
    }

    /// Number of result columns, 0 if the handle is not ready.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.state
            .borrow()
            .handle
            .raw()
            .map_or(0, |stmt| usize::try_from(stmt.column_count()).unwrap_or(0))
    }

    /// Number of bind parameters, 0 if the handle is not ready.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.state.borrow().parameter_count()
    }

    /// Name of the 0-based parameter `index` including its sigil, or `None`
    /// for a positional `?` parameter or an index out of range.
    #[must_use]
    pub fn parameter_name(&self, index: usize) -> Option<String> {
        self.state.borrow().parameter_name(index)
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Releases the underlying handle. Calling it again is a no-op.
    pub fn finalize(&mut self) {
        self.state.borrow_mut().release("finalize", Teardown::Finalized);
    }

    /// Teardown notification from the owning connection.
    ///
    /// Releases the handle immediately and marks the statement
    /// [`StatementStatus::ConnectionFinalized`]. [`Connection`](crate::Connection)
    /// calls this for every live statement before it closes.
    pub fn connection_finalized(&mut self) {
        self.state
            .borrow_mut()
            .release("connection_finalized", Teardown::ConnectionFinalized);
    }

    /// Returns `true` only while the statement is initialized.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.status() == StatementStatus::Initialized
    }

    /// Returns the lifecycle state; `i64::from` gives its integer form.
    #[must_use]
    pub fn status(&self) -> StatementStatus {
        self.state.borrow().handle.status()
    }

    /// Returns the text of the most recent failure, or an empty string.
    #[must_use]
    pub fn error_message(&self) -> String {
        self.state.borrow().error_message.clone()
    }
}

impl Default for Statement {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Weak reference a connection keeps to the statements it compiled.
#[derive(Clone)]
pub(crate) struct StatementRef(Weak<RefCell<StatementState>>);

impl StatementRef {
    pub(crate) fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        self.0.ptr_eq(&other.0)
    }

    /// Forwards the teardown notification of the connection behind `db`.
    ///
    /// Statements that have since been re-initialized on another connection
    /// are left alone.
    pub(crate) fn connection_finalized(&self, db: &Weak<RawDb>) {
        let Some(state) = self.0.upgrade() else {
            return;
        };
        let Ok(mut state) = state.try_borrow_mut() else {
            log::error!("hostsql: statement is busy during connection teardown; it will be released on drop");
            return;
        };
        if state.handle.is_attached_to(db) {
            state.release("connection_finalized", Teardown::ConnectionFinalized);
        }
    }
}

#[derive(Default)]
struct StatementState {
    handle: Handle,
    /// `None` until first read; an empty list is a valid cached value.
    column_names: Option<Vec<String>>,
    current_row: Option<Row>,
    error_message: String,
}

impl StatementState {
    /// Records `err` as the sticky message and reports it.
    fn fail(&mut self, op: &str, err: StatementError) -> StatementError {
        self.error_message = err.to_string();
        log::error!("hostsql: {op} failed: {err}");
        err
    }

    fn guard(&mut self, op: &str) -> StatementResult<()> {
        let checked = self.handle.stmt().map(|_| ());
        checked.map_err(|err| self.fail(op, err))
    }

    fn initialize(&mut self, db: &Weak<RawDb>, stmt: Option<RawStmt>) -> StatementResult<()> {
        let status = self.handle.status();
        if status.is_terminal() {
            drop(stmt);
            let err = if status == StatementStatus::Finalized {
                StatementError::Finalized
            } else {
                StatementError::ConnectionGone
            };
            return Err(self.fail("initialize", err));
        }
        if let Some(err) = self.handle.attach(db, stmt) {
            self.fail("initialize", err.into());
        }
        self.column_names = None;
        self.current_row = None;
        if self.handle.status() == StatementStatus::Initialized {
            log::debug!("hostsql: statement initialized");
            Ok(())
        } else {
            Err(self.fail("initialize", StatementError::Uninitialized))
        }
    }

    /// The single release routine behind finalize, teardown and drop.
    fn release(&mut self, op: &str, target: Teardown) {
        let was = self.handle.status();
        if let Some(err) = self.handle.release(target) {
            self.fail(op, err.into());
        }
        self.column_names = None;
        self.current_row = None;
        if !was.is_terminal() {
            log::debug!("hostsql: statement moved from {was} to {}", self.handle.status());
        }
    }

    fn parameter_count(&self) -> usize {
        self.handle
            .raw()
            .map_or(0, |stmt| usize::try_from(stmt.parameter_count()).unwrap_or(0))
    }

    fn parameter_name(&self, index: usize) -> Option<String> {
        let stmt = self.handle.raw()?;
        stmt.parameter_name(engine_index(index)?)
    }

    fn cache_column_names(&mut self) {
        if self.column_names.is_none() {
            self.column_names = self.handle.raw().map(row::column_names);
        }
    }

    // ── Binding ─────────────────────────────────────────────────────────

    fn bind(&mut self, index: i64, value: &Variant) -> StatementResult<()> {
        self.guard("bind")?;
        let count = self.parameter_count();
        match usize::try_from(index) {
            Ok(slot) if slot < count => self.bind_slot("bind", slot, value),
            _ => Err(self.fail("bind", StatementError::IndexOutOfRange { index, count })),
        }
    }

    fn bind_all(&mut self, values: &[Variant]) -> StatementResult<()> {
        self.guard("bind_all")?;
        let required = self.parameter_count();
        if values.len() < required {
            let err = StatementError::InsufficientParameters {
                required,
                provided: values.len(),
            };
            return Err(self.fail("bind_all", err));
        }
        for (slot, value) in values.iter().take(required).enumerate() {
            self.bind_slot("bind_all", slot, value)?;
        }
        if values.len() > required {
            log::warn!(
                "hostsql: bind_all got {} values for {required} parameter(s); the rest are ignored",
                values.len()
            );
        }
        Ok(())
    }

    fn bind_named(&mut self, values: &Row) -> StatementResult<()> {
        self.guard("bind_named")?;
        for slot in 0..self.parameter_count() {
            let Some(name) = self.parameter_name(slot) else {
                return Err(self.fail("bind_named", StatementError::NamelessParameter { index: slot }));
            };
            let key = strip_sigil(&name);
            let Some(value) = values.get(key) else {
                let err = StatementError::MissingNamedParameter {
                    name: key.to_string(),
                };
                return Err(self.fail("bind_named", err));
            };
            self.bind_slot("bind_named", slot, value)?;
        }
        Ok(())
    }

    fn bind_slot(&mut self, op: &str, slot: usize, value: &Variant) -> StatementResult<()> {
        let outcome = self.try_bind(slot, value);
        outcome.map_err(|err| self.fail(op, err))
    }

    fn try_bind(&self, slot: usize, value: &Variant) -> StatementResult<()> {
        let stmt = self.handle.stmt()?;
        let param = SqlParam::try_from(value)?;
        let count = self.parameter_count();
        let index = engine_index(slot).ok_or(StatementError::IndexOutOfRange {
            index: i64::try_from(slot).unwrap_or(i64::MAX),
            count,
        })?;
        match param.bind_to(stmt, index) {
            ffi::SQLITE_OK => Ok(()),
            rc => Err(self.handle.engine_error(rc).into()),
        }
    }

    fn clear_bindings(&mut self) -> StatementResult<()> {
        self.guard("clear_bindings")?;
        if let Some(stmt) = self.handle.raw() {
            stmt.clear_bindings();
        }
        Ok(())
    }

    // ── Execution ───────────────────────────────────────────────────────

    fn reset(&mut self) -> StatementResult<()> {
        self.guard("reset")?;
        self.current_row = None;
        let outcome = self.try_reset();
        outcome.map_err(|err| self.fail("reset", err))
    }

    fn try_reset(&self) -> StatementResult<()> {
        let stmt = self.handle.stmt()?;
        match stmt.reset() {
            ffi::SQLITE_OK => Ok(()),
            rc => Err(self.handle.engine_error(rc).into()),
        }
    }

    fn step(&mut self) -> StatementResult<StepResult> {
        self.guard("step")?;
        self.cache_column_names();
        match self.try_step() {
            Ok(StepResult::Row) => {
                let names = self.column_names.as_deref().unwrap_or_default();
                self.current_row = self.handle.raw().map(|stmt| row::marshal_row(stmt, names));
                Ok(StepResult::Row)
            }
            Ok(StepResult::Done) => {
                self.current_row = None;
                Ok(StepResult::Done)
            }
            Err(err) => {
                self.current_row = None;
                Err(self.fail("step", err))
            }
        }
    }

    fn try_step(&self) -> StatementResult<StepResult> {
        let stmt = self.handle.stmt()?;
        match stmt.step() {
            ffi::SQLITE_ROW => Ok(StepResult::Row),
            ffi::SQLITE_DONE => Ok(StepResult::Done),
            rc => Err(self.handle.engine_error(rc).into()),
        }
    }

    fn execute(&mut self) -> StatementResult<()> {
        self.guard("execute")?;
        while self.step()? == StepResult::Row {}
        Ok(())
    }

    fn fetch_all(&mut self) -> Vec<Row> {
        let mut rows = Vec::new();
        if self.guard("fetch_all").is_err() {
            return rows;
        }
        while let Ok(StepResult::Row) = self.step() {
            rows.push(self.current_row.clone().unwrap_or_default());
        }
        rows
    }
}

impl Drop for StatementState {
    fn drop(&mut self) {
        self.release("drop", Teardown::Finalized);
    }
}

/// Maps a 0-based slot to the engine's 1-based parameter index.
fn engine_index(slot: usize) -> Option<c_int> {
    slot.checked_add(1).and_then(|index| c_int::try_from(index).ok())
}

/// Drops the leading sigil (`:`, `@`, `$` or `?`) from a parameter name.
fn strip_sigil(name: &str) -> &str {
    let mut chars = name.chars();
    chars.next();
    chars.as_str()
}
