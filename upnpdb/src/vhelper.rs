//! Song-stream shaping between the traversal engine and the host callback.

use crate::db::VisitSong;
use crate::error::DatabaseError;
use crate::selection::DatabaseSelection;
use crate::song::LightSong;

/// Applies the selection's sort and window to visited songs before they
/// reach the host. Built from a selection whose uri and filter have
/// already been stripped (traversal handles those itself); must be
/// finished with [`commit`](Self::commit), which flushes the buffered,
/// sorted stream.
pub struct VisitorHelper<'h, 'c> {
    selection: DatabaseSelection,
    visit_song: Option<&'h mut VisitSong<'c>>,
    buffer: Vec<LightSong>,
    position: usize,
}

impl<'h, 'c> VisitorHelper<'h, 'c> {
    pub fn new(selection: DatabaseSelection, visit_song: Option<&'h mut VisitSong<'c>>) -> Self {
        Self {
            selection,
            visit_song,
            buffer: Vec::new(),
            position: 0,
        }
    }

    /// Whether song records are wanted at all. Traversal uses this to skip
    /// work whose only purpose is producing songs.
    pub fn wants_songs(&self) -> bool {
        self.visit_song.is_some()
    }

    /// Deliver one song, or buffer it when sorting is requested.
    pub fn song(&mut self, song: &LightSong) -> Result<(), DatabaseError> {
        if self.visit_song.is_none() {
            return Ok(());
        }

        if self.selection.sort.is_some() {
            self.buffer.push(song.clone());
            return Ok(());
        }

        let index = self.position;
        self.position += 1;
        if let Some(window) = &self.selection.window {
            if !window.contains(&index) {
                return Ok(());
            }
        }

        match self.visit_song.as_mut() {
            Some(cb) => cb(song),
            None => Ok(()),
        }
    }

    /// Flush the deferred song stream.
    pub fn commit(mut self) -> Result<(), DatabaseError> {
        let Some(sort) = self.selection.sort else {
            return Ok(());
        };

        self.buffer.sort_by(|a, b| {
            let ka = a.tag.first(sort).unwrap_or("").to_lowercase();
            let kb = b.tag.first(sort).unwrap_or("").to_lowercase();
            ka.cmp(&kb)
        });
        if self.selection.descending {
            self.buffer.reverse();
        }

        let Some(cb) = self.visit_song else {
            return Ok(());
        };

        match &self.selection.window {
            Some(window) => {
                let take = window.end.saturating_sub(window.start);
                for song in self.buffer.iter().skip(window.start).take(take) {
                    cb(song)?;
                }
            }
            None => {
                for song in &self.buffer {
                    cb(song)?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::{Tag, TagType};

    fn song(title: &str) -> LightSong {
        let mut tag = Tag::new();
        tag.add(TagType::Title, title);
        LightSong {
            uri: format!("srv/{title}"),
            real_uri: format!("http://srv/{title}"),
            tag,
        }
    }

    fn titles_of(selection: DatabaseSelection, input: &[&str]) -> Vec<String> {
        let mut seen = Vec::new();
        let mut cb = |s: &LightSong| -> Result<(), DatabaseError> {
            seen.push(s.tag.first(TagType::Title).unwrap().to_string());
            Ok(())
        };
        let mut helper = VisitorHelper::new(selection, Some(&mut cb));
        for title in input {
            helper.song(&song(title)).unwrap();
        }
        helper.commit().unwrap();
        seen
    }

    #[test]
    fn passthrough_preserves_order() {
        let got = titles_of(DatabaseSelection::default(), &["b", "a", "c"]);
        assert_eq!(got, ["b", "a", "c"]);
    }

    #[test]
    fn unsorted_window_slices_the_stream() {
        let selection = DatabaseSelection {
            window: Some(1..3),
            ..Default::default()
        };
        let got = titles_of(selection, &["a", "b", "c", "d"]);
        assert_eq!(got, ["b", "c"]);
    }

    #[test]
    fn sort_defers_until_commit() {
        let selection = DatabaseSelection {
            sort: Some(TagType::Title),
            ..Default::default()
        };
        let got = titles_of(selection, &["b", "C", "a"]);
        assert_eq!(got, ["a", "b", "C"]);
    }

    #[test]
    fn sorted_descending_with_window() {
        let selection = DatabaseSelection {
            sort: Some(TagType::Title),
            descending: true,
            window: Some(0..2),
            ..Default::default()
        };
        let got = titles_of(selection, &["b", "c", "a", "d"]);
        assert_eq!(got, ["d", "c"]);
    }

    #[test]
    fn absent_callback_swallows_everything() {
        let mut helper = VisitorHelper::new(DatabaseSelection::default(), None);
        assert!(!helper.wants_songs());
        helper.song(&song("a")).unwrap();
        helper.commit().unwrap();
    }
}
