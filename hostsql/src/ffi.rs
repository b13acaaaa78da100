//! Raw FFI bindings to `SQLite`.
//!
//! The symbols come from `libsqlite3-sys`, which compiles the bundled
//! amalgamation. This is the **only** file in the crate that contains `unsafe`
//! code: the rest of the crate talks to the engine through the two owned
//! handle types defined here, [`RawDb`] and [`RawStmt`].

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_uchar};
use std::ptr::{self, NonNull};

use libsqlite3_sys as sys;

pub(crate) use sys::{
    SQLITE_BLOB, SQLITE_CANTOPEN, SQLITE_DONE, SQLITE_ERROR, SQLITE_FLOAT, SQLITE_INTEGER, SQLITE_MISMATCH,
    SQLITE_MISUSE, SQLITE_OK, SQLITE_OPEN_CREATE, SQLITE_OPEN_FULLMUTEX,
    SQLITE_OPEN_READONLY, SQLITE_OPEN_READWRITE, SQLITE_RANGE, SQLITE_ROW, SQLITE_TEXT,
    SQLITE_TOOBIG,
};

use crate::error::{DbError, DbResult};

/// `SQLITE_UTF8`, typed for the encoding argument of `sqlite3_bind_text64`.
const UTF8_ENCODING: c_uchar = 1;

/// Converts a C string owned by the engine into an owned Rust string.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// for the duration of the call.
unsafe fn owned_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

/// Returns the engine's static English description of a result code.
pub(crate) fn errstr(code: c_int) -> String {
    // SAFETY: sqlite3_errstr returns a pointer to static storage.
    unsafe { owned_string(sys::sqlite3_errstr(code)) }
        .unwrap_or_else(|| format!("unknown error ({code})"))
}

// ── Connection handle ───────────────────────────────────────────────────

/// An open `sqlite3*` connection handle.
///
/// Closed with `sqlite3_close_v2` when dropped, so statements that are still
/// alive at that point keep the connection in a zombie state instead of
/// dangling.
pub(crate) struct RawDb {
    db: NonNull<sys::sqlite3>,
}

impl RawDb {
    /// Opens (or creates, depending on `flags`) the database at `path`.
    pub(crate) fn open(path: &str, flags: c_int) -> DbResult<Self> {
        let c_path = CString::new(path)
            .map_err(|e| DbError::new(SQLITE_ERROR, format!("invalid path: {e}")))?;
        let mut db: *mut sys::sqlite3 = ptr::null_mut();
        // SAFETY: `c_path` outlives the call and `db` is a valid out-pointer.
        let rc = unsafe { sys::sqlite3_open_v2(c_path.as_ptr(), &mut db, flags, ptr::null()) };
        let Some(db) = NonNull::new(db) else {
            return Err(DbError::new(rc, format!("sqlite3_open_v2 returned {rc}")));
        };
        // Wrapping first means the handle is closed on the error path too.
        let raw = Self { db };
        if rc != SQLITE_OK {
            return Err(DbError::new(rc, raw.errmsg()));
        }
        Ok(raw)
    }

    /// Runs one or more semicolon-separated statements, discarding rows.
    pub(crate) fn exec(&self, sql: &str) -> DbResult<()> {
        let c_sql = CString::new(sql)
            .map_err(|e| DbError::new(SQLITE_ERROR, format!("nul in SQL: {e}")))?;
        let mut errmsg: *mut c_char = ptr::null_mut();
        // SAFETY: `self.db` is open, `c_sql` outlives the call, no callback.
        let rc = unsafe {
            sys::sqlite3_exec(
                self.db.as_ptr(),
                c_sql.as_ptr(),
                None,
                ptr::null_mut(),
                &mut errmsg,
            )
        };
        if rc == SQLITE_OK {
            return Ok(());
        }
        // SAFETY: a non-null `errmsg` was allocated by sqlite3_malloc and is
        // released here exactly once.
        let message = unsafe {
            let message = owned_string(errmsg);
            if !errmsg.is_null() {
                sys::sqlite3_free(errmsg.cast());
            }
            message
        };
        Err(DbError::new(rc, message.unwrap_or_else(|| self.errmsg())))
    }

    /// Compiles a single SQL statement.
    pub(crate) fn prepare(&self, sql: &str) -> DbResult<RawStmt> {
        let c_sql = CString::new(sql)
            .map_err(|e| DbError::new(SQLITE_ERROR, format!("nul in SQL: {e}")))?;
        let mut stmt: *mut sys::sqlite3_stmt = ptr::null_mut();
        // SAFETY: `self.db` is open, `c_sql` outlives the call and `stmt` is
        // a valid out-pointer.
        let rc = unsafe {
            sys::sqlite3_prepare_v2(
                self.db.as_ptr(),
                c_sql.as_ptr(),
                -1,
                &mut stmt,
                ptr::null_mut(),
            )
        };
        if rc != SQLITE_OK {
            return Err(DbError::new(rc, self.errmsg()));
        }
        // Empty input (whitespace or comments only) compiles to a null handle.
        NonNull::new(stmt)
            .map(|stmt| RawStmt { stmt })
            .ok_or_else(|| DbError::new(SQLITE_MISUSE, "SQL text contains no statement"))
    }

    /// Returns the most recent error text reported on this connection.
    pub(crate) fn errmsg(&self) -> String {
        // SAFETY: `self.db` is open; the returned string is copied out
        // before any further call on the connection.
        unsafe { owned_string(sys::sqlite3_errmsg(self.db.as_ptr())) }
            .unwrap_or_else(|| "unknown error".to_string())
    }

    /// Number of rows changed by the most recent statement.
    pub(crate) fn changes(&self) -> usize {
        // SAFETY: `self.db` is open.
        let changes = unsafe { sys::sqlite3_changes(self.db.as_ptr()) };
        usize::try_from(changes).unwrap_or(0)
    }

    /// Rowid of the most recent successful INSERT.
    pub(crate) fn last_insert_rowid(&self) -> i64 {
        // SAFETY: `self.db` is open.
        unsafe { sys::sqlite3_last_insert_rowid(self.db.as_ptr()) }
    }
}

impl Drop for RawDb {
    fn drop(&mut self) {
        // SAFETY: the handle is owned by `self` and closed exactly once.
        unsafe {
            sys::sqlite3_close_v2(self.db.as_ptr());
        }
    }
}

// ── Statement handle ────────────────────────────────────────────────────

/// A compiled `sqlite3_stmt*` handle.
///
/// Finalized when dropped unless it was disposed of through
/// [`RawStmt::finalize`], which also reports the disposal code.
pub(crate) struct RawStmt {
    stmt: NonNull<sys::sqlite3_stmt>,
}

impl RawStmt {
    fn as_ptr(&self) -> *mut sys::sqlite3_stmt {
        self.stmt.as_ptr()
    }

    /// Finalizes the statement and returns the engine's result code.
    pub(crate) fn finalize(self) -> c_int {
        let stmt = self.stmt;
        std::mem::forget(self);
        // SAFETY: ownership was taken above, so the handle is finalized once.
        unsafe { sys::sqlite3_finalize(stmt.as_ptr()) }
    }

    pub(crate) fn step(&self) -> c_int {
        // SAFETY: `self.stmt` is a live statement handle.
        unsafe { sys::sqlite3_step(self.as_ptr()) }
    }

    pub(crate) fn reset(&self) -> c_int {
        // SAFETY: `self.stmt` is a live statement handle.
        unsafe { sys::sqlite3_reset(self.as_ptr()) }
    }

    pub(crate) fn clear_bindings(&self) -> c_int {
        // SAFETY: `self.stmt` is a live statement handle.
        unsafe { sys::sqlite3_clear_bindings(self.as_ptr()) }
    }

    // ── Parameter binding (1-based indices) ─────────────────────────────

    pub(crate) fn bind_null(&self, index: c_int) -> c_int {
        // SAFETY: `self.stmt` is a live statement handle.
        unsafe { sys::sqlite3_bind_null(self.as_ptr(), index) }
    }

    pub(crate) fn bind_i64(&self, index: c_int, value: i64) -> c_int {
        // SAFETY: `self.stmt` is a live statement handle.
        unsafe { sys::sqlite3_bind_int64(self.as_ptr(), index, value) }
    }

    pub(crate) fn bind_f64(&self, index: c_int, value: f64) -> c_int {
        // SAFETY: `self.stmt` is a live statement handle.
        unsafe { sys::sqlite3_bind_double(self.as_ptr(), index, value) }
    }

    /// Binds UTF-8 text; the engine copies the bytes before returning.
    pub(crate) fn bind_text(&self, index: c_int, value: &str) -> c_int {
        let Ok(len) = u64::try_from(value.len()) else {
            return SQLITE_TOOBIG;
        };
        // SAFETY: `value` is valid for `len` bytes for the duration of the
        // call and SQLITE_TRANSIENT makes the engine take its own copy.
        unsafe {
            sys::sqlite3_bind_text64(
                self.as_ptr(),
                index,
                value.as_ptr().cast(),
                len,
                sys::SQLITE_TRANSIENT(),
                UTF8_ENCODING,
            )
        }
    }

    /// Binds a blob; the engine copies the bytes before returning.
    pub(crate) fn bind_blob(&self, index: c_int, value: &[u8]) -> c_int {
        let Ok(len) = u64::try_from(value.len()) else {
            return SQLITE_TOOBIG;
        };
        // SAFETY: `value` is valid for `len` bytes for the duration of the
        // call and SQLITE_TRANSIENT makes the engine take its own copy.
        unsafe {
            sys::sqlite3_bind_blob64(
                self.as_ptr(),
                index,
                value.as_ptr().cast(),
                len,
                sys::SQLITE_TRANSIENT(),
            )
        }
    }

    pub(crate) fn parameter_count(&self) -> c_int {
        // SAFETY: `self.stmt` is a live statement handle.
        unsafe { sys::sqlite3_bind_parameter_count(self.as_ptr()) }
    }

    /// Name of the 1-based parameter, sigil included. `None` for `?`.
    pub(crate) fn parameter_name(&self, index: c_int) -> Option<String> {
        // SAFETY: `self.stmt` is live; the name is owned by the statement
        // and copied out immediately.
        unsafe { owned_string(sys::sqlite3_bind_parameter_name(self.as_ptr(), index)) }
    }

    // ── Column reading (0-based indices) ────────────────────────────────

    pub(crate) fn column_count(&self) -> c_int {
        // SAFETY: `self.stmt` is a live statement handle.
        unsafe { sys::sqlite3_column_count(self.as_ptr()) }
    }

    pub(crate) fn column_name(&self, column: c_int) -> String {
        // SAFETY: `self.stmt` is live; the name is copied out immediately.
        unsafe { owned_string(sys::sqlite3_column_name(self.as_ptr(), column)) }
            .unwrap_or_default()
    }

    pub(crate) fn column_type(&self, column: c_int) -> c_int {
        // SAFETY: `self.stmt` is a live statement handle.
        unsafe { sys::sqlite3_column_type(self.as_ptr(), column) }
    }

    pub(crate) fn column_i64(&self, column: c_int) -> i64 {
        // SAFETY: `self.stmt` is a live statement handle.
        unsafe { sys::sqlite3_column_int64(self.as_ptr(), column) }
    }

    pub(crate) fn column_f64(&self, column: c_int) -> f64 {
        // SAFETY: `self.stmt` is a live statement handle.
        unsafe { sys::sqlite3_column_double(self.as_ptr(), column) }
    }

    /// Copies the column's text out of the engine buffer.
    pub(crate) fn column_text(&self, column: c_int) -> String {
        // SAFETY: the pointer is fetched before the length, as the engine
        // requires, and the bytes are copied before the next engine call.
        unsafe {
            let data = sys::sqlite3_column_text(self.as_ptr(), column);
            let len = sys::sqlite3_column_bytes(self.as_ptr(), column);
            if data.is_null() {
                return String::new();
            }
            let bytes = std::slice::from_raw_parts(data, usize::try_from(len).unwrap_or(0));
            String::from_utf8_lossy(bytes).into_owned()
        }
    }

    /// Copies the column's blob out of the engine buffer.
    pub(crate) fn column_blob(&self, column: c_int) -> Vec<u8> {
        // SAFETY: the pointer is fetched before the length, as the engine
        // requires, and the bytes are copied before the next engine call.
        unsafe {
            let data = sys::sqlite3_column_blob(self.as_ptr(), column);
            let len = sys::sqlite3_column_bytes(self.as_ptr(), column);
            if data.is_null() || len <= 0 {
                return Vec::new();
            }
            std::slice::from_raw_parts(data.cast::<u8>(), usize::try_from(len).unwrap_or(0))
                .to_vec()
        }
    }
}

impl Drop for RawStmt {
    fn drop(&mut self) {
        // SAFETY: the handle is owned by `self`; `finalize` forgets `self`,
        // so this only runs for handles that were never disposed explicitly.
        unsafe {
            sys::sqlite3_finalize(self.as_ptr());
        }
    }
}
