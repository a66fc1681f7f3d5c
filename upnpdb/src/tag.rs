//! Tag vocabulary shared with the host.

use std::fmt;

/// Tag categories the host addresses songs by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TagType {
    Artist,
    AlbumArtist,
    Album,
    Title,
    Track,
    Genre,
    Date,
}

impl TagType {
    pub fn name(self) -> &'static str {
        match self {
            TagType::Artist => "Artist",
            TagType::AlbumArtist => "AlbumArtist",
            TagType::Album => "Album",
            TagType::Title => "Title",
            TagType::Track => "Track",
            TagType::Genre => "Genre",
            TagType::Date => "Date",
        }
    }
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered, multi-valued tag set of one song.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tag {
    items: Vec<(TagType, String)>,
}

impl Tag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value; empty values are dropped.
    pub fn add(&mut self, tag_type: TagType, value: &str) {
        if !value.is_empty() {
            self.items.push((tag_type, value.to_string()));
        }
    }

    pub fn values(&self, tag_type: TagType) -> impl Iterator<Item = &str> {
        self.items
            .iter()
            .filter(move |(t, _)| *t == tag_type)
            .map(|(_, v)| v.as_str())
    }

    pub fn first(&self, tag_type: TagType) -> Option<&str> {
        self.values(tag_type).next()
    }

    /// All values regardless of type, in insertion order.
    pub fn any_values(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TagType, &str)> {
        self.items.iter().map(|(t, v)| (*t, v.as_str()))
    }
}
