//! Conversion between `SQLite` storage classes and [`Variant`].

use std::os::raw::c_int;

use crate::error::StatementError;
use crate::ffi::{self, RawStmt};
use crate::variant::Variant;

/// Decodes column `column` of the current row.
///
/// Text and blobs are copied out, since the engine may reuse its buffers on
/// the next step. Storage classes outside the five standard ones decode to
/// [`Variant::Nil`].
pub(crate) fn decode_column(stmt: &RawStmt, column: c_int) -> Variant {
    match stmt.column_type(column) {
        ffi::SQLITE_INTEGER => Variant::Int(stmt.column_i64(column)),
        ffi::SQLITE_FLOAT => Variant::Float(stmt.column_f64(column)),
        ffi::SQLITE_TEXT => Variant::String(stmt.column_text(column)),
        ffi::SQLITE_BLOB => Variant::Bytes(stmt.column_blob(column)),
        _ => Variant::Nil,
    }
}

/// A parameter value reduced to one of the engine's storage classes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum SqlParam<'a> {
    Null,
    Integer(i64),
    Real(f64),
    Text(&'a str),
    Blob(&'a [u8]),
}

impl<'a> TryFrom<&'a Variant> for SqlParam<'a> {
    type Error = StatementError;

    fn try_from(value: &'a Variant) -> Result<Self, Self::Error> {
        match value {
            Variant::Nil => Ok(Self::Null),
            Variant::Bool(v) => Ok(Self::Integer(i64::from(*v))),
            Variant::Int(v) => Ok(Self::Integer(*v)),
            Variant::Float(v) => Ok(Self::Real(*v)),
            Variant::String(v) | Variant::StringName(v) => Ok(Self::Text(v)),
            // Zero-length blobs are bound as NULL; older engines treat an
            // empty blob pointer inconsistently.
            Variant::Bytes(v) if v.is_empty() => Ok(Self::Null),
            Variant::Bytes(v) => Ok(Self::Blob(v)),
            Variant::Array(_) | Variant::Dictionary(_) => Err(StatementError::UnsupportedType {
                type_name: value.type_name(),
            }),
        }
    }
}

impl SqlParam<'_> {
    /// Binds the value at the 1-based `index` and returns the engine code.
    pub(crate) fn bind_to(self, stmt: &RawStmt, index: c_int) -> c_int {
        match self {
            Self::Null => stmt.bind_null(index),
            Self::Integer(v) => stmt.bind_i64(index, v),
            Self::Real(v) => stmt.bind_f64(index, v),
            Self::Text(v) => stmt.bind_text(index, v),
            Self::Blob(v) => stmt.bind_blob(index, v),
        }
    }
}
