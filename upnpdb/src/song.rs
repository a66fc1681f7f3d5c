//! Light records handed to the host during traversal and resolution.

use std::time::SystemTime;

use upnpdb_client::DirObject;

use crate::tag::{Tag, TagType};

/// One song as the host sees it: a library path, the real stream URL and
/// its tags. Owned throughout, so the record stays valid for as long as
/// the host keeps it.
#[derive(Clone, Debug)]
pub struct LightSong {
    /// Library path, server name first.
    pub uri: String,
    /// Streamable HTTP(S) URL on the server.
    pub real_uri: String,
    pub tag: Tag,
}

impl LightSong {
    /// Materialize a song record from a directory object under the given
    /// library path.
    pub fn from_object(object: &DirObject, uri: impl Into<String>) -> Self {
        let mut tag = Tag::new();
        tag.add(TagType::Title, &object.name);

        match (&object.artist, &object.creator) {
            (Some(artist), _) => tag.add(TagType::Artist, artist),
            (None, Some(creator)) => tag.add(TagType::Artist, creator),
            (None, None) => {}
        }
        if let Some(album) = &object.album {
            tag.add(TagType::Album, album);
        }
        if let Some(genre) = &object.genre {
            tag.add(TagType::Genre, genre);
        }
        if let Some(date) = &object.date {
            tag.add(TagType::Date, date);
        }
        if let Some(track) = &object.track_number {
            tag.add(TagType::Track, track);
        }

        Self {
            uri: uri.into(),
            real_uri: object.url.clone(),
            tag,
        }
    }
}

/// One directory as the host sees it. UPnP exposes no modification times,
/// so `mtime` is always unknown.
#[derive(Clone, Debug)]
pub struct LightDirectory {
    pub uri: String,
    pub mtime: Option<SystemTime>,
}

impl LightDirectory {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mtime: None,
        }
    }
}

/// Playlist metadata for the playlist visit callback.
#[derive(Clone, Debug)]
pub struct PlaylistInfo {
    pub name: String,
}
