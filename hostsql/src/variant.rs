//! The host's dynamic value type.

use crate::row::Row;

/// A dynamically typed host value.
///
/// Rows read from a statement are built from the first five storage-class
/// shaped variants; parameters may be any variant, but only those with a
/// `SQLite` storage class can be bound. [`Variant::Array`] and
/// [`Variant::Dictionary`] are rejected by the binder.
#[derive(Debug, Clone, PartialEq, Default, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(untagged))]
pub enum Variant {
    /// The absent value; SQL NULL.
    #[default]
    Nil,
    /// Boolean, stored by the engine as the integer 0 or 1.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// Double-precision float.
    Float(f64),
    /// UTF-8 text.
    String(String),
    /// Interned identifier; bound exactly like [`Variant::String`].
    StringName(String),
    /// Binary blob.
    Bytes(Vec<u8>),
    /// Ordered sequence of values.
    Array(Vec<Variant>),
    /// Insertion-ordered mapping from names to values.
    Dictionary(Row),
}

impl Variant {
    /// Returns the snake-case name of this variant, e.g. `"bytes"`.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.into()
    }

    /// Returns `true` for [`Variant::Nil`].
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }
}

impl From<()> for Variant {
    fn from((): ()) -> Self {
        Self::Nil
    }
}

impl From<bool> for Variant {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Variant {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Variant {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Variant {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Variant {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Variant {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<Vec<u8>> for Variant {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<&[u8]> for Variant {
    fn from(v: &[u8]) -> Self {
        Self::Bytes(v.to_vec())
    }
}

impl From<Vec<Self>> for Variant {
    fn from(v: Vec<Self>) -> Self {
        Self::Array(v)
    }
}

impl From<Row> for Variant {
    fn from(v: Row) -> Self {
        Self::Dictionary(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Variant {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Nil, Into::into)
    }
}

/// Convenience macro for building positional parameter lists.
///
/// Usage: `params![1_i64, blob.as_slice(), "text", ()]`
#[macro_export]
macro_rules! params {
    ($($val:expr),* $(,)?) => {
        &[$($crate::Variant::from($val)),*][..]
    };
}
