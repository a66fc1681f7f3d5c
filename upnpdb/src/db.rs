//! The host-side database contract.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use crate::config::ConfigBlock;
use crate::error::DatabaseError;
use crate::selection::DatabaseSelection;
use crate::song::{LightDirectory, LightSong, PlaylistInfo};
use crate::tag::TagType;

pub type VisitDirectory<'a> = dyn FnMut(&LightDirectory) -> Result<(), DatabaseError> + 'a;
pub type VisitSong<'a> = dyn FnMut(&LightSong) -> Result<(), DatabaseError> + 'a;
pub type VisitPlaylist<'a> =
    dyn FnMut(&PlaylistInfo, &LightDirectory) -> Result<(), DatabaseError> + 'a;

/// Aggregate library statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DatabaseStats {
    pub song_count: u64,
    pub total_duration: Duration,
    pub artist_count: u64,
    pub album_count: u64,
}

/// Distinct tag values, nested one level per requested tag type. Songs
/// missing a value group under the empty string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UniqueTagMap(pub BTreeMap<String, UniqueTagMap>);

impl UniqueTagMap {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, value: &str) -> Option<&UniqueTagMap> {
        self.0.get(value)
    }

    fn insert_song(&mut self, song: &LightSong, tag_types: &[TagType]) {
        let Some((&first, rest)) = tag_types.split_first() else {
            return;
        };

        let values: Vec<&str> = song.tag.values(first).collect();
        if values.is_empty() {
            self.0
                .entry(String::new())
                .or_default()
                .insert_song(song, rest);
        } else {
            for value in values {
                self.0
                    .entry(value.to_string())
                    .or_default()
                    .insert_song(song, rest);
            }
        }
    }
}

/// Database contract a library adapter implements for the host.
pub trait Database {
    fn open(&mut self) -> Result<(), DatabaseError>;

    /// Idempotent; must also clean up after a failed `open`.
    fn close(&mut self);

    /// Resolve one song by library path. The returned record is owned by
    /// the caller and stays valid until handed back to [`return_song`].
    ///
    /// [`return_song`]: Self::return_song
    fn get_song(&self, uri: &str) -> Result<LightSong, DatabaseError>;

    /// Give back a record obtained from [`get_song`](Self::get_song).
    fn return_song(&self, song: LightSong);

    /// Walk the selection, firing the callbacks that are present. Absent
    /// callbacks mean "do not emit this kind".
    fn visit(
        &self,
        selection: &DatabaseSelection,
        visit_directory: Option<&mut VisitDirectory<'_>>,
        visit_song: Option<&mut VisitSong<'_>>,
        visit_playlist: Option<&mut VisitPlaylist<'_>>,
    ) -> Result<(), DatabaseError>;

    fn collect_unique_tags(
        &self,
        selection: &DatabaseSelection,
        tag_types: &[TagType],
    ) -> Result<UniqueTagMap, DatabaseError>;

    fn stats(&self, selection: &DatabaseSelection) -> Result<DatabaseStats, DatabaseError>;

    /// Time of the last library change, None when unknown.
    fn update_stamp(&self) -> Option<SystemTime> {
        None
    }
}

/// Generic helper: drive [`Database::visit`] over the selection and
/// deduplicate the requested tag values.
pub fn collect_unique_tags<D: Database + ?Sized>(
    db: &D,
    selection: &DatabaseSelection,
    tag_types: &[TagType],
) -> Result<UniqueTagMap, DatabaseError> {
    let mut map = UniqueTagMap::default();
    let mut visit_song = |song: &LightSong| -> Result<(), DatabaseError> {
        map.insert_song(song, tag_types);
        Ok(())
    };

    db.visit(selection, None, Some(&mut visit_song), None)?;
    Ok(map)
}

/// Entry in the host's database plugin table.
pub struct DatabasePlugin {
    pub name: &'static str,
    pub flags: u32,
    pub create: fn(&ConfigBlock) -> Result<Box<dyn Database>, DatabaseError>,
}
