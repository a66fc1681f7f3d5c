//! Library path handling.
//!
//! Paths are UTF-8, slash-separated; the first segment is a server's
//! friendly name. A tail of `0/<objectId>` is a synthetic form addressing
//! one object directly: search results cannot be given stable pretty paths
//! (see the traversal engine), so they are handed out in this shape and
//! recognized again on lookup.

/// Conventional ContentDirectory root object id, doubling as the marker
/// that the next path segment is an opaque object id. The choice is
/// arbitrary; any string unlikely to be a top-level container title works.
pub const ROOT_ID: &str = "0";

/// Decode the `0/<objectId>` form: returns the object id, or None when the
/// tail is an ordinary title path.
pub fn after_root_id_segment(uri: &str) -> Option<&str> {
    let rest = uri.strip_prefix(ROOT_ID)?.strip_prefix('/')?;
    if rest.is_empty() {
        None
    } else {
        Some(rest)
    }
}

/// Synthetic library path for an object addressed by id.
pub fn song_path(server_name: &str, object_id: &str) -> String {
    format!("{}/{}/{}", server_name, ROOT_ID, object_id)
}

/// Join two path segments with a single slash.
pub fn build(a: &str, b: &str) -> String {
    if a.is_empty() {
        b.to_string()
    } else if b.is_empty() {
        a.to_string()
    } else {
        format!("{}/{}", a, b)
    }
}

/// Split at the first slash: `"MS/Music/x"` gives `("MS", "Music/x")`.
/// Without a slash the tail is empty.
pub fn split_uri(uri: &str) -> (&str, &str) {
    match uri.split_once('/') {
        Some((head, rest)) => (head, rest),
        None => (uri, ""),
    }
}
