//! Song filtering, applied client-side during listings and compiled into
//! search criteria for recursive visits.

use std::fmt::Debug;
use std::sync::Arc;

use crate::song::LightSong;
use crate::tag::TagType;

/// One predicate of a song filter. The vocabulary is open: unknown kinds
/// cannot be pushed down to the server and are only ever evaluated here,
/// against materialized songs.
pub trait FilterItem: Send + Sync + Debug {
    fn matches(&self, song: &LightSong) -> bool;

    /// Hook for the search compiler; only tag-equality items translate to
    /// ContentDirectory criteria.
    fn as_tag_filter(&self) -> Option<&TagSongFilter> {
        None
    }
}

/// Matches songs whose tag carries a value. With `fold_case` the match is
/// a case-folded substring test, otherwise byte equality.
#[derive(Clone, Debug)]
pub struct TagSongFilter {
    /// None matches against every tag value (the "any" form).
    pub tag: Option<TagType>,
    pub value: String,
    pub fold_case: bool,
}

impl TagSongFilter {
    pub fn new(tag: Option<TagType>, value: impl Into<String>, fold_case: bool) -> Self {
        Self {
            tag,
            value: value.into(),
            fold_case,
        }
    }

    fn value_matches(&self, haystack: &str) -> bool {
        if self.fold_case {
            haystack.to_lowercase().contains(&self.value.to_lowercase())
        } else {
            haystack == self.value
        }
    }
}

impl FilterItem for TagSongFilter {
    fn matches(&self, song: &LightSong) -> bool {
        match self.tag {
            None => song.tag.any_values().any(|v| self.value_matches(v)),
            Some(tag) => {
                let mut values = song.tag.values(tag).peekable();
                if values.peek().is_none() && tag == TagType::AlbumArtist {
                    // No explicit album artist recorded; the track artist
                    // stands in.
                    return song
                        .tag
                        .values(TagType::Artist)
                        .any(|v| self.value_matches(v));
                }
                values.any(|v| self.value_matches(v))
            }
        }
    }

    fn as_tag_filter(&self) -> Option<&TagSongFilter> {
        Some(self)
    }
}

/// Conjunction of filter items.
#[derive(Clone, Debug, Default)]
pub struct SongFilter {
    items: Vec<Arc<dyn FilterItem>>,
}

impl SongFilter {
    pub fn new(items: Vec<Arc<dyn FilterItem>>) -> Self {
        Self { items }
    }

    pub fn with_item(item: impl FilterItem + 'static) -> Self {
        Self {
            items: vec![Arc::new(item)],
        }
    }

    pub fn items(&self) -> &[Arc<dyn FilterItem>] {
        &self.items
    }

    pub fn matches(&self, song: &LightSong) -> bool {
        self.items.iter().all(|item| item.matches(song))
    }
}
