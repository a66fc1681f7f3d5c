//! Compilation of host filters into ContentDirectory search criteria.

use tracing::debug;
use upnpdb_client::{ContentDirectory, DirContent};

use crate::error::DatabaseError;
use crate::filter::SongFilter;
use crate::selection::DatabaseSelection;
use crate::tag::TagType;
use crate::tags::upnp_tag_name;

/// Double-quote a string, adding internal backslash escaping.
fn dquote(out: &mut String, input: &str) {
    out.push('"');
    for c in input.chars() {
        if c == '\\' || c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}

fn operator(fold_case: bool) -> &'static str {
    /* fold_case doubles up as the contains/equals switch. UPnP search is
       supposed to be case-insensitive, but at least some servers have the
       same exact-match convention as the host (e.g. minidlna) */
    if fold_case {
        " contains "
    } else {
        " = "
    }
}

/// Compile the filter into a criteria string, restricted to the server's
/// advertised search capabilities. Items that cannot be expressed are
/// skipped; they get re-applied client-side against the results.
pub fn build_search_criteria(filter: &SongFilter, search_caps: &[String]) -> String {
    let mut cond = String::new();

    for item in filter.items() {
        let Some(t) = item.as_tag_filter() else {
            // TODO: translate other filter item kinds where the search
            // grammar allows it (e.g. URI prefixes)
            continue;
        };

        match t.tag {
            None => {
                // The "any" form: a disjunction over every searchable field.
                if !cond.is_empty() {
                    cond.push_str(" and ");
                }
                cond.push('(');
                let mut first = true;
                for cap in search_caps {
                    if first {
                        first = false;
                    } else {
                        cond.push_str(" or ");
                    }
                    cond.push_str(cap);
                    cond.push_str(operator(t.fold_case));
                    dquote(&mut cond, &t.value);
                }
                cond.push(')');
            }
            Some(mut tag) => {
                if tag == TagType::AlbumArtist {
                    tag = TagType::Artist;
                }

                let Some(name) = upnp_tag_name(tag) else {
                    continue;
                };

                if !cond.is_empty() {
                    cond.push_str(" and ");
                }
                cond.push_str(name);
                cond.push_str(operator(t.fold_case));
                dquote(&mut cond, &t.value);
            }
        }
    }

    cond
}

/// Run a server-side search scoped at `object_id`.
///
/// An absent filter or an empty capability set short-circuits to an empty
/// listing without a network round-trip: many servers answer criteria that
/// mention unsupported fields with an opaque error, so unsupported fields
/// must never reach the wire.
pub fn search_songs<S: ContentDirectory>(
    server: &S,
    object_id: &str,
    selection: &DatabaseSelection,
) -> Result<DirContent, DatabaseError> {
    let Some(filter) = &selection.filter else {
        return Ok(DirContent::default());
    };

    let search_caps = server.search_capabilities()?;
    if search_caps.is_empty() {
        return Ok(DirContent::default());
    }

    let criteria = build_search_criteria(filter, &search_caps);
    debug!(
        server = server.friendly_name(),
        criteria = criteria.as_str(),
        "Compiled search criteria"
    );

    Ok(server.search(object_id, &criteria)?)
}
