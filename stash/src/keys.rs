//! # Key Construction
//!
//! Colon-delimited key names: `prefix:id[:part...]`.
//!
//! The unchecked helpers do plain concatenation. Segments that themselves
//! contain `:` produce ambiguous keys (`("a:b", "c")` and `("a", "b:c")`
//! collide), so callers must either guarantee delimiter-free segments or use
//! [`checked_build_key`].

use crate::error::{StashError, StashResult};

/// Segment delimiter.
pub const DELIMITER: char = ':';

/// Prefix used by [`bucket_key`].
pub const BUCKET_PREFIX: &str = "bucket";

/// Joins `prefix`, `id` and any extra `parts` with `:`.
pub fn build_key(prefix: &str, id: &str, parts: &[&str]) -> String {
    let len = prefix.len() + id.len() + parts.iter().map(|p| p.len() + 1).sum::<usize>() + 1;
    let mut key = String::with_capacity(len);
    key.push_str(prefix);
    key.push(DELIMITER);
    key.push_str(id);
    for part in parts {
        key.push(DELIMITER);
        key.push_str(part);
    }
    key
}

/// Builds a key under the `bucket` prefix.
pub fn bucket_key(bucket_id: &str, parts: &[&str]) -> String {
    build_key(BUCKET_PREFIX, bucket_id, parts)
}

/// Like [`build_key`], but rejects any segment containing the delimiter.
pub fn checked_build_key(prefix: &str, id: &str, parts: &[&str]) -> StashResult<String> {
    let segments = [prefix, id].into_iter().chain(parts.iter().copied());
    for segment in segments {
        if segment.contains(DELIMITER) {
            return Err(StashError::InvalidKey(segment.to_string()));
        }
    }
    Ok(build_key(prefix, id, parts))
}
