//! What one visit request asks for.

use std::ops::Range;

use crate::filter::SongFilter;
use crate::song::LightSong;
use crate::tag::TagType;

/// Scope and shaping of one database request.
#[derive(Clone, Debug, Default)]
pub struct DatabaseSelection {
    /// Library path to visit: empty for the multi-server root, a server
    /// name for its root container, or a deeper path.
    pub uri: String,

    /// Visit the subtree rather than one level.
    pub recursive: bool,

    /// Song predicate; also drives server-side search when recursing.
    pub filter: Option<SongFilter>,

    /// Sort songs by this tag before delivery.
    pub sort: Option<TagType>,
    pub descending: bool,

    /// Deliver only this slice of the (sorted) song stream.
    pub window: Option<Range<usize>>,
}

impl DatabaseSelection {
    pub fn new(uri: impl Into<String>, recursive: bool, filter: Option<SongFilter>) -> Self {
        Self {
            uri: uri.into(),
            recursive,
            filter,
            ..Default::default()
        }
    }

    pub fn matches(&self, song: &LightSong) -> bool {
        self.filter.as_ref().map_or(true, |f| f.matches(song))
    }
}
