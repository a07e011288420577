//! Small shared helpers for catalog field decoding

/// Decode a multi-valued catalog field encoded as a delimited string
/// (e.g. a constraint's `COLUMN_LIST` of `"ID, SUB_ID"`), preserving
/// declaration order. Segments are trimmed; empty segments are dropped.
pub fn split_delimited_list(raw: &str, delimiter: char) -> Vec<String> {
    raw.split(delimiter)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}
