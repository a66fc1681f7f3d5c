//! Directory objects: the control point's view of one ContentDirectory node.

use upnpdb_didl::DidlLite;

/// Coarse node type, from the DIDL element kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectType {
    Container,
    Item,
    Unknown,
}

/// Item classification, from the `upnp:class` property.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemClass {
    Music,
    Playlist,
    Unknown,
}

/// One catalog node returned by Browse or Search.
#[derive(Clone, Debug)]
pub struct DirObject {
    /// Opaque, server-local object id.
    pub id: String,
    pub parent_id: String,
    /// Display title, used as the path segment for this node.
    pub name: String,
    pub object_type: ObjectType,
    pub item_class: ItemClass,
    /// Stream URL of the first usable resource; empty for containers.
    pub url: String,

    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub date: Option<String>,
    pub track_number: Option<String>,
    pub creator: Option<String>,
}

/// Ordered listing of one Browse/Search response.
#[derive(Clone, Debug, Default)]
pub struct DirContent {
    pub objects: Vec<DirObject>,
}

impl DirContent {
    /// First object whose name matches exactly. Servers may return several
    /// children with the same title; the first one wins.
    pub fn find_object(&self, name: &str) -> Option<&DirObject> {
        self.objects.iter().find(|o| o.name == name)
    }

    pub fn from_didl(didl: DidlLite) -> Self {
        let mut objects = Vec::with_capacity(didl.containers.len() + didl.items.len());

        for container in didl.containers {
            objects.push(DirObject {
                id: container.id,
                parent_id: container.parent_id,
                name: container.title,
                object_type: ObjectType::Container,
                item_class: ItemClass::Unknown,
                url: String::new(),
                artist: None,
                album: None,
                genre: None,
                date: None,
                track_number: None,
                creator: None,
            });
        }

        for item in didl.items {
            let url = item.first_url().unwrap_or_default().to_string();
            objects.push(DirObject {
                item_class: classify_item(&item.class),
                id: item.id,
                parent_id: item.parent_id,
                name: item.title,
                object_type: ObjectType::Item,
                url,
                artist: item.artist,
                album: item.album,
                genre: item.genre,
                date: item.date,
                track_number: item.original_track_number,
                creator: item.creator,
            });
        }

        Self { objects }
    }
}

fn classify_item(class: &str) -> ItemClass {
    if class.starts_with("object.item.audioItem") {
        ItemClass::Music
    } else if class.starts_with("object.item.playlistItem") {
        ItemClass::Playlist
    } else {
        ItemClass::Unknown
    }
}
