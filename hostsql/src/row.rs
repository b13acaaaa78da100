//! Marshaling of the engine's current row into a [`Row`].

use std::os::raw::c_int;

use indexmap::IndexMap;

use crate::codec::decode_column;
use crate::ffi::RawStmt;
use crate::variant::Variant;

/// One result row: column name to value, in column order.
///
/// Columns sharing a name (an unaliased join, say) collapse into a single
/// entry holding the right-most column's value.
pub type Row = IndexMap<String, Variant>;

/// Reads every result column name from the statement metadata.
pub(crate) fn column_names(stmt: &RawStmt) -> Vec<String> {
    (0..stmt.column_count())
        .map(|column| stmt.column_name(column))
        .collect()
}

/// Builds the current row, taking names from `names` where available.
pub(crate) fn marshal_row(stmt: &RawStmt, names: &[String]) -> Row {
    let count = stmt.column_count();
    let mut row = Row::with_capacity(usize::try_from(count).unwrap_or(0));
    for column in 0..count {
        let name = cached_name(names, column).unwrap_or_else(|| stmt.column_name(column));
        row.insert(name, decode_column(stmt, column));
    }
    row
}

fn cached_name(names: &[String], column: c_int) -> Option<String> {
    usize::try_from(column)
        .ok()
        .and_then(|i| names.get(i))
        .cloned()
}
