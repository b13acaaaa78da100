//! Error types for the statement wrapper.

use std::fmt;

use thiserror::Error;

use crate::ffi;

/// Result code returned by `SQLite` operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DbErrorCode(pub i32);

impl fmt::Display for DbErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error reported by the engine itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("sqlite error {code}: {message}")]
pub struct DbError {
    /// `SQLite` result code.
    pub code: DbErrorCode,
    /// Human-readable error message (from `sqlite3_errmsg` when available).
    pub message: String,
}

impl DbError {
    /// Creates a new database error.
    pub(crate) fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code: DbErrorCode(code),
            message: message.into(),
        }
    }
}

/// Result type for connection-level operations.
pub type DbResult<T> = Result<T, DbError>;

/// Broad classification of a [`StatementError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// The operation was invoked on a handle that is not ready.
    Lifecycle,
    /// The caller supplied unusable parameters.
    Parameter,
    /// The engine returned a non-success code.
    Engine,
}

/// Errors raised by [`Statement`](crate::Statement) operations.
///
/// Every failure is also recorded as the statement's sticky error message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatementError {
    /// The statement was explicitly finalized.
    #[error("statement was explicitly finalized and can no longer be used")]
    Finalized,

    /// The owning connection was closed or dropped.
    #[error("statement is invalid because the associated database connection is no longer available")]
    ConnectionGone,

    /// No compiled statement was ever attached.
    #[error("statement is uninitialized")]
    Uninitialized,

    /// The handle is missing although the state claims it is initialized.
    #[error("statement is in an invalid internal state")]
    Corrupted,

    /// Positional index outside `0..parameter_count`.
    #[error("binding index {index} is out of range for {count} parameter(s)")]
    IndexOutOfRange {
        /// The 0-based index supplied by the caller.
        index: i64,
        /// Number of parameters the statement declares.
        count: usize,
    },

    /// Fewer values than the statement has parameters.
    #[error("insufficient number of values to satisfy required bindings: expected {required}, got {provided}")]
    InsufficientParameters {
        /// Number of parameters the statement declares.
        required: usize,
        /// Number of values supplied.
        provided: usize,
    },

    /// The value's variant has no `SQLite` storage class.
    #[error("binding a value of type `{type_name}` is not supported")]
    UnsupportedType {
        /// Name of the rejected variant.
        type_name: &'static str,
    },

    /// A positional (`?`) parameter cannot be bound by name.
    #[error("named binding failed because parameter {index} in the statement is nameless")]
    NamelessParameter {
        /// 0-based index of the nameless parameter.
        index: usize,
    },

    /// The supplied mapping has no value for a declared name.
    #[error("missing named parameter: {name}")]
    MissingNamedParameter {
        /// Parameter name without its sigil.
        name: String,
    },

    /// The engine failed; the message is the engine's own text.
    #[error("{}", .0.message)]
    Engine(#[from] DbError),
}

impl StatementError {
    /// Returns the broad category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Finalized | Self::ConnectionGone | Self::Uninitialized | Self::Corrupted => {
                ErrorKind::Lifecycle
            }
            Self::IndexOutOfRange { .. }
            | Self::InsufficientParameters { .. }
            | Self::UnsupportedType { .. }
            | Self::NamelessParameter { .. }
            | Self::MissingNamedParameter { .. } => ErrorKind::Parameter,
            Self::Engine(_) => ErrorKind::Engine,
        }
    }

    /// Returns the engine result code that best describes this error.
    ///
    /// Engine errors pass the raw code through; lifecycle violations map to
    /// `SQLITE_MISUSE`, which is also what [`Statement::step`](crate::Statement::step)
    /// reports when called on a handle that is not ready.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::Engine(err) => err.code.0,
            Self::IndexOutOfRange { .. } => ffi::SQLITE_RANGE,
            Self::UnsupportedType { .. } => ffi::SQLITE_MISMATCH,
            Self::Finalized
            | Self::ConnectionGone
            | Self::Uninitialized
            | Self::Corrupted
            | Self::InsufficientParameters { .. }
            | Self::NamelessParameter { .. }
            | Self::MissingNamedParameter { .. } => ffi::SQLITE_MISUSE,
        }
    }
}

/// Result type for statement operations.
pub type StatementResult<T> = Result<T, StatementError>;
