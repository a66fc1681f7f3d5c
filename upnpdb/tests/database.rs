//! End-to-end adapter tests against scripted, call-recording servers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use upnpdb::{
    Database, DatabaseError, DatabaseSelection, DatabaseStats, LightDirectory, LightSong,
    ServerRegistry, SongFilter, TagSongFilter, TagType, UpnpDatabase,
};
use upnpdb_client::{ContentDirectory, DirContent, DirObject, ItemClass, ObjectType};

fn object(id: &str, parent: &str, name: &str, object_type: ObjectType, item_class: ItemClass) -> DirObject {
    DirObject {
        id: id.to_string(),
        parent_id: parent.to_string(),
        name: name.to_string(),
        object_type,
        item_class,
        url: String::new(),
        artist: None,
        album: None,
        genre: None,
        date: None,
        track_number: None,
        creator: None,
    }
}

fn container(id: &str, parent: &str, name: &str) -> DirObject {
    object(id, parent, name, ObjectType::Container, ItemClass::Unknown)
}

fn music(id: &str, parent: &str, name: &str, url: &str) -> DirObject {
    let mut obj = object(id, parent, name, ObjectType::Item, ItemClass::Music);
    obj.url = url.to_string();
    obj
}

fn music_by(id: &str, parent: &str, name: &str, url: &str, artist: &str) -> DirObject {
    let mut obj = music(id, parent, name, url);
    obj.artist = Some(artist.to_string());
    obj
}

fn unknown_item(id: &str, parent: &str, name: &str) -> DirObject {
    object(id, parent, name, ObjectType::Item, ItemClass::Unknown)
}

fn playlist_item(id: &str, parent: &str, name: &str) -> DirObject {
    object(id, parent, name, ObjectType::Item, ItemClass::Playlist)
}

/// Scripted ContentDirectory. Every SOAP-shaped call is recorded so tests
/// can assert on what went over the (pretend) wire.
#[derive(Clone)]
struct MockServer {
    name: String,
    children: Arc<HashMap<String, Vec<DirObject>>>,
    metadata: Arc<HashMap<String, Vec<DirObject>>>,
    search_caps: Arc<Vec<String>>,
    search_results: Arc<Vec<DirObject>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockServer {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ContentDirectory for MockServer {
    fn friendly_name(&self) -> &str {
        &self.name
    }

    fn read_dir(&self, object_id: &str) -> Result<DirContent> {
        self.record(format!("readDir:{object_id}"));
        self.children
            .get(object_id)
            .map(|objects| DirContent {
                objects: objects.clone(),
            })
            .ok_or_else(|| anyhow!("no such container: {object_id}"))
    }

    fn get_metadata(&self, object_id: &str) -> Result<DirContent> {
        self.record(format!("getMetadata:{object_id}"));
        self.metadata
            .get(object_id)
            .map(|objects| DirContent {
                objects: objects.clone(),
            })
            .ok_or_else(|| anyhow!("no such object: {object_id}"))
    }

    fn search(&self, container_id: &str, criteria: &str) -> Result<DirContent> {
        self.record(format!("search:{container_id}:{criteria}"));
        Ok(DirContent {
            objects: self.search_results.as_ref().clone(),
        })
    }

    fn search_capabilities(&self) -> Result<Vec<String>> {
        self.record("searchCaps".to_string());
        Ok(self.search_caps.as_ref().clone())
    }
}

struct MockServerBuilder {
    name: String,
    children: HashMap<String, Vec<DirObject>>,
    metadata: HashMap<String, Vec<DirObject>>,
    search_caps: Vec<String>,
    search_results: Vec<DirObject>,
}

impl MockServerBuilder {
    fn new(name: &str) -> Self {
        let mut children = HashMap::new();
        children.insert("0".to_string(), Vec::new());
        let mut metadata = HashMap::new();
        metadata.insert("0".to_string(), vec![container("0", "-1", name)]);

        Self {
            name: name.to_string(),
            children,
            metadata,
            search_caps: Vec::new(),
            search_results: Vec::new(),
        }
    }

    fn child(mut self, parent: &str, object: DirObject) -> Self {
        if object.object_type == ObjectType::Container {
            self.children.entry(object.id.clone()).or_default();
        }
        self.metadata
            .insert(object.id.clone(), vec![object.clone()]);
        self.children
            .entry(parent.to_string())
            .or_default()
            .push(object);
        self
    }

    fn metadata_raw(mut self, id: &str, objects: Vec<DirObject>) -> Self {
        self.metadata.insert(id.to_string(), objects);
        self
    }

    fn caps(mut self, caps: &[&str]) -> Self {
        self.search_caps = caps.iter().map(|c| c.to_string()).collect();
        self
    }

    fn found_by_search(mut self, objects: Vec<DirObject>) -> Self {
        self.search_results = objects;
        self
    }

    fn build(self) -> MockServer {
        MockServer {
            name: self.name,
            children: Arc::new(self.children),
            metadata: Arc::new(self.metadata),
            search_caps: Arc::new(self.search_caps),
            search_results: Arc::new(self.search_results),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

struct MockRegistry {
    servers: Vec<MockServer>,
}

impl ServerRegistry for MockRegistry {
    type Server = MockServer;

    fn get_server(&self, name: &str) -> Result<MockServer, DatabaseError> {
        self.servers
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound(format!("No such server: {name}")))
    }

    fn servers(&self) -> Vec<MockServer> {
        self.servers.clone()
    }
}

fn db_with(servers: Vec<MockServer>) -> UpnpDatabase<MockRegistry> {
    UpnpDatabase::with_registry(MockRegistry { servers })
}

/// A server with root children `Music/` (id 1) containing `Song.flac`
/// (id 7) and a stray photo item.
fn music_server() -> MockServer {
    MockServerBuilder::new("MS")
        .child("0", container("1", "0", "Music"))
        .child("0", unknown_item("2", "0", "photo.jpg"))
        .child("1", music_by("7", "1", "Song.flac", "http://10.0.0.2/7.flac", "Band"))
        .build()
}

fn run_visit(
    db: &UpnpDatabase<MockRegistry>,
    selection: &DatabaseSelection,
) -> Result<(Vec<String>, Vec<(String, String)>), DatabaseError> {
    let mut dirs: Vec<String> = Vec::new();
    let mut songs: Vec<(String, String)> = Vec::new();

    let mut on_dir = |d: &LightDirectory| -> Result<(), DatabaseError> {
        dirs.push(d.uri.clone());
        Ok(())
    };
    let mut on_song = |s: &LightSong| -> Result<(), DatabaseError> {
        songs.push((s.uri.clone(), s.real_uri.clone()));
        Ok(())
    };

    db.visit(selection, Some(&mut on_dir), Some(&mut on_song), None)?;
    Ok((dirs, songs))
}

#[test]
fn list_root_emits_one_directory_per_server() {
    let db = db_with(vec![
        MockServerBuilder::new("MS").build(),
        MockServerBuilder::new("NAS").build(),
    ]);

    let selection = DatabaseSelection::new("", false, None);
    let (dirs, songs) = run_visit(&db, &selection).unwrap();

    assert_eq!(dirs, ["MS", "NAS"]);
    assert!(songs.is_empty());
}

#[test]
fn recursive_root_visit_descends_into_each_server() {
    let db = db_with(vec![music_server()]);

    let selection = DatabaseSelection::new("", true, None);
    let (dirs, songs) = run_visit(&db, &selection).unwrap();

    // The server directory itself, then its one-level listing with the
    // server name as the path base.
    assert_eq!(dirs, ["MS", "MS/Music"]);
    assert!(songs.is_empty());
}

#[test]
fn container_listing_suppresses_non_music_items() {
    let db = db_with(vec![music_server()]);

    let selection = DatabaseSelection::new("MS", false, None);
    let (dirs, songs) = run_visit(&db, &selection).unwrap();

    assert_eq!(dirs, ["MS/Music"]);
    assert!(songs.is_empty());
}

#[test]
fn container_listing_mirrors_read_dir() {
    let db = db_with(vec![music_server()]);

    let selection = DatabaseSelection::new("MS/Music", false, None);
    let (dirs, songs) = run_visit(&db, &selection).unwrap();

    assert!(dirs.is_empty());
    assert_eq!(
        songs,
        [("MS/Music/Song.flac".to_string(), "http://10.0.0.2/7.flac".to_string())]
    );
}

#[test]
fn get_song_by_title_path() {
    let server = music_server();
    let db = db_with(vec![server.clone()]);

    let song = db.get_song("MS/Music/Song.flac").unwrap();
    assert_eq!(song.uri, "MS/Music/Song.flac");
    assert_eq!(song.real_uri, "http://10.0.0.2/7.flac");
    assert_eq!(song.tag.first(TagType::Title), Some("Song.flac"));

    // Title resolution walks directories.
    assert_eq!(server.calls(), ["readDir:0", "readDir:1"]);

    db.return_song(song);
}

#[test]
fn get_song_by_id_path() {
    let server = music_server();
    let db = db_with(vec![server.clone()]);

    let song = db.get_song("MS/0/7").unwrap();
    assert_eq!(song.uri, "MS/0/7");
    assert_eq!(song.real_uri, "http://10.0.0.2/7.flac");

    // Id resolution reads the node directly, never a directory.
    assert_eq!(server.calls(), ["getMetadata:7"]);

    db.return_song(song);
}

#[test]
fn visit_id_path_emits_exactly_one_song() {
    let server = music_server();
    let db = db_with(vec![server.clone()]);

    let selection = DatabaseSelection::new("MS/0/7", false, None);
    let (dirs, songs) = run_visit(&db, &selection).unwrap();

    assert!(dirs.is_empty());
    assert_eq!(
        songs,
        [("MS/0/7".to_string(), "http://10.0.0.2/7.flac".to_string())]
    );
    assert_eq!(server.calls(), ["getMetadata:7"]);
}

#[test]
fn id_sentinel_alone_visits_nothing() {
    let server = music_server();
    let db = db_with(vec![server.clone()]);

    let selection = DatabaseSelection::new("MS/0", false, None);
    let (dirs, songs) = run_visit(&db, &selection).unwrap();

    assert!(dirs.is_empty());
    assert!(songs.is_empty());
    // Not a song, and never walked as a title either.
    assert!(server.calls().is_empty());
}

#[test]
fn id_path_to_non_music_object_is_not_found() {
    let server = music_server();
    let db = db_with(vec![server.clone()]);

    let selection = DatabaseSelection::new("MS/0/2", false, None);
    let err = run_visit(&db, &selection).unwrap_err();
    assert!(err.is_not_found());

    let selection = DatabaseSelection::new("MS/0/1", false, None);
    let err = run_visit(&db, &selection).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn search_compiles_criteria_and_hands_out_synthetic_paths() {
    let server = MockServerBuilder::new("MS")
        .caps(&["dc:title", "upnp:artist"])
        .found_by_search(vec![
            music_by("9", "4", "Thunderstruck", "http://10.0.0.2/9.flac", "AC\\DC"),
            container("4", "0", "All Music"),
            unknown_item("5", "4", "cover.jpg"),
        ])
        .build();
    let db = db_with(vec![server.clone()]);

    let filter = SongFilter::with_item(TagSongFilter::new(
        Some(TagType::Artist),
        "AC\\DC",
        true,
    ));
    let selection = DatabaseSelection::new("MS", true, Some(filter));
    let (dirs, songs) = run_visit(&db, &selection).unwrap();

    assert!(dirs.is_empty());
    assert_eq!(
        songs,
        [("MS/0/9".to_string(), "http://10.0.0.2/9.flac".to_string())]
    );

    let calls = server.calls();
    assert_eq!(
        calls,
        [
            "getMetadata:0",
            "searchCaps",
            r#"search:0:upnp:artist contains "AC\\DC""#,
        ]
    );
}

#[test]
fn empty_capabilities_suppress_the_search() {
    let server = MockServerBuilder::new("MS").build();
    let db = db_with(vec![server.clone()]);

    let filter = SongFilter::with_item(TagSongFilter::new(Some(TagType::Artist), "x", true));
    let selection = DatabaseSelection::new("MS", true, Some(filter));
    let (dirs, songs) = run_visit(&db, &selection).unwrap();

    assert!(dirs.is_empty());
    assert!(songs.is_empty());

    let calls = server.calls();
    assert!(calls.contains(&"searchCaps".to_string()));
    assert!(!calls.iter().any(|c| c.starts_with("search:")));
}

#[test]
fn unknown_server_is_not_found() {
    let db = db_with(vec![music_server()]);
    let err = db.get_song("NoSuch/whatever").unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn song_uri_without_tail_is_not_found() {
    let db = db_with(vec![music_server()]);
    assert!(db.get_song("MS").unwrap_err().is_not_found());
    assert!(db.get_song("").unwrap_err().is_not_found());
}

#[test]
fn traversal_through_an_item_is_not_a_container() {
    let db = db_with(vec![music_server()]);
    let err = db.get_song("MS/Music/Song.flac/deeper").unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("Not a container"));
}

#[test]
fn consecutive_slashes_do_not_resolve() {
    let db = db_with(vec![music_server()]);
    assert!(db.get_song("MS//Song.flac").unwrap_err().is_not_found());
}

#[test]
fn metadata_answering_two_objects_is_a_bad_resource() {
    let server = MockServerBuilder::new("MS")
        .metadata_raw(
            "dup",
            vec![
                music("dup", "0", "a", "http://x/a"),
                music("dup", "0", "b", "http://x/b"),
            ],
        )
        .build();
    let db = db_with(vec![server]);

    let err = db.get_song("MS/0/dup").unwrap_err();
    assert!(matches!(err, DatabaseError::BadResource(_)));
}

#[test]
fn playlist_items_are_never_surfaced() {
    let server = MockServerBuilder::new("MS")
        .child("0", playlist_item("3", "0", "party.m3u"))
        .build();
    let db = db_with(vec![server]);

    let mut playlist_seen = false;
    let mut on_playlist = |_: &upnpdb::PlaylistInfo, _: &LightDirectory| {
        playlist_seen = true;
        Ok(())
    };
    let selection = DatabaseSelection::new("MS", false, None);
    db.visit(&selection, None, None, Some(&mut on_playlist))
        .unwrap();

    assert!(!playlist_seen);
}

#[test]
fn filter_applies_to_plain_listings() {
    let server = MockServerBuilder::new("MS")
        .child("0", music_by("10", "0", "one.flac", "http://x/10", "Band"))
        .child("0", music_by("11", "0", "two.flac", "http://x/11", "Other"))
        .build();
    let db = db_with(vec![server]);

    let filter = SongFilter::with_item(TagSongFilter::new(Some(TagType::Artist), "Band", false));
    let mut selection = DatabaseSelection::new("MS", false, None);
    selection.filter = Some(filter);

    let (_, songs) = run_visit(&db, &selection).unwrap();
    assert_eq!(songs.len(), 1);
    assert_eq!(songs[0].0, "MS/one.flac");
}

#[test]
fn sort_and_window_shape_the_song_stream() {
    let server = MockServerBuilder::new("MS")
        .child("0", music("20", "0", "charlie", "http://x/20"))
        .child("0", music("21", "0", "alpha", "http://x/21"))
        .child("0", music("22", "0", "bravo", "http://x/22"))
        .build();
    let db = db_with(vec![server]);

    let mut selection = DatabaseSelection::new("MS", false, None);
    selection.sort = Some(TagType::Title);
    selection.window = Some(0..2);

    let (_, songs) = run_visit(&db, &selection).unwrap();
    let names: Vec<&str> = songs.iter().map(|(uri, _)| uri.as_str()).collect();
    assert_eq!(names, ["MS/alpha", "MS/bravo"]);
}

#[test]
fn collect_unique_tags_deduplicates_values() {
    let server = MockServerBuilder::new("MS")
        .child("0", music_by("10", "0", "one.flac", "http://x/10", "Band"))
        .child("0", music_by("11", "0", "two.flac", "http://x/11", "Band"))
        .child("0", music_by("12", "0", "three.flac", "http://x/12", "Other"))
        .build();
    let db = db_with(vec![server]);

    let selection = DatabaseSelection::new("MS", false, None);
    let map = db
        .collect_unique_tags(&selection, &[TagType::Artist])
        .unwrap();

    assert_eq!(map.0.keys().collect::<Vec<_>>(), ["Band", "Other"]);
}

#[test]
fn stats_are_zero_and_update_stamp_unknown() {
    let db = db_with(vec![music_server()]);
    let selection = DatabaseSelection::new("", false, None);

    assert_eq!(db.stats(&selection).unwrap(), DatabaseStats::default());
    assert!(db.update_stamp().is_none());

    // Invariant across operations.
    let _ = run_visit(&db, &DatabaseSelection::new("MS", false, None)).unwrap();
    assert!(db.update_stamp().is_none());
}

#[test]
fn object_path_reconstructs_a_pretty_path() {
    let server = music_server();
    let db = db_with(vec![server.clone()]);

    let song = server.metadata.get("7").unwrap()[0].clone();
    let path = db.object_path(&server, &song).unwrap();
    assert_eq!(path, "MS/Music/Song.flac");
}

#[test]
fn callback_errors_abort_the_visit() {
    let server = MockServerBuilder::new("MS")
        .child("0", music("10", "0", "one.flac", "http://x/10"))
        .child("0", music("11", "0", "two.flac", "http://x/11"))
        .build();
    let db = db_with(vec![server]);

    let mut seen = 0;
    let mut on_song = |_: &LightSong| -> Result<(), DatabaseError> {
        seen += 1;
        Err(DatabaseError::NotFound("stop".to_string()))
    };

    let selection = DatabaseSelection::new("MS", false, None);
    let err = db
        .visit(&selection, None, Some(&mut on_song), None)
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(seen, 1);
}
