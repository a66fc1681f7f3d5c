//! DIDL-Lite document model for UPnP/AV ContentDirectory payloads.
//!
//! Browse and Search responses carry their object listings as an escaped
//! DIDL-Lite document inside the SOAP `Result` argument. This crate maps
//! that document onto plain structs via quick-xml's serde support.

use serde::Deserialize;

pub use quick_xml::de::DeError;

/// Root of a DIDL-Lite document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename = "DIDL-Lite")]
pub struct DidlLite {
    #[serde(rename = "container", default)]
    pub containers: Vec<Container>,

    #[serde(rename = "item", default)]
    pub items: Vec<Item>,
}

/// A browsable container (directory-like node).
#[derive(Debug, Clone, Deserialize)]
pub struct Container {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@parentID")]
    pub parent_id: String,

    #[serde(rename = "@childCount")]
    pub child_count: Option<String>,

    #[serde(rename = "dc:title", alias = "title")]
    pub title: String,

    #[serde(rename = "upnp:class", alias = "class")]
    pub class: String,
}

/// A leaf object, usually one audio track.
#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@parentID")]
    pub parent_id: String,

    #[serde(rename = "dc:title", alias = "title")]
    pub title: String,

    #[serde(rename = "upnp:class", alias = "class")]
    pub class: String,

    #[serde(rename = "dc:creator", alias = "creator")]
    pub creator: Option<String>,

    #[serde(rename = "upnp:artist", alias = "artist")]
    pub artist: Option<String>,

    #[serde(rename = "upnp:album", alias = "album")]
    pub album: Option<String>,

    #[serde(rename = "upnp:genre", alias = "genre")]
    pub genre: Option<String>,

    #[serde(rename = "dc:date", alias = "date")]
    pub date: Option<String>,

    #[serde(rename = "upnp:originalTrackNumber", alias = "originalTrackNumber")]
    pub original_track_number: Option<String>,

    #[serde(rename = "res", default)]
    pub resources: Vec<Resource>,
}

/// One `<res>` entry: a stream URI plus transport metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct Resource {
    #[serde(rename = "@protocolInfo", default)]
    pub protocol_info: String,

    #[serde(rename = "@duration")]
    pub duration: Option<String>,

    #[serde(rename = "@size")]
    pub size: Option<String>,

    #[serde(rename = "$text", default)]
    pub url: String,
}

impl Item {
    /// URL of the first resource carrying a non-empty URI.
    pub fn first_url(&self) -> Option<&str> {
        self.resources
            .iter()
            .map(|res| res.url.trim())
            .find(|url| !url.is_empty())
    }
}

/// Parse a DIDL-Lite document. A blank payload is a valid empty listing;
/// some servers return one instead of a document with no children.
pub fn parse_didl(xml: &str) -> Result<DidlLite, DeError> {
    let trimmed = xml.trim();
    if trimmed.is_empty() {
        return Ok(DidlLite::default());
    }
    quick_xml::de::from_str(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BROWSE_PAYLOAD: &str = r#"<DIDL-Lite xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/"
  xmlns:dc="http://purl.org/dc/elements/1.1/"
  xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/">
  <container id="1$7" parentID="1" childCount="3" restricted="1">
    <dc:title>Music</dc:title>
    <upnp:class>object.container.storageFolder</upnp:class>
  </container>
  <item id="1$7$42" parentID="1$7" restricted="1">
    <dc:title>Back In Black</dc:title>
    <dc:creator>AC/DC</dc:creator>
    <upnp:artist>AC/DC</upnp:artist>
    <upnp:album>Back In Black</upnp:album>
    <upnp:genre>Rock</upnp:genre>
    <upnp:originalTrackNumber>6</upnp:originalTrackNumber>
    <upnp:class>object.item.audioItem.musicTrack</upnp:class>
    <res protocolInfo="http-get:*:audio/flac:*" duration="0:04:15.000">http://10.0.0.2:8200/MediaItems/42.flac</res>
  </item>
</DIDL-Lite>"#;

    #[test]
    fn parse_browse_payload() {
        let didl = parse_didl(BROWSE_PAYLOAD).unwrap();
        assert_eq!(didl.containers.len(), 1);
        assert_eq!(didl.items.len(), 1);

        let container = &didl.containers[0];
        assert_eq!(container.id, "1$7");
        assert_eq!(container.parent_id, "1");
        assert_eq!(container.title, "Music");
        assert_eq!(container.class, "object.container.storageFolder");

        let item = &didl.items[0];
        assert_eq!(item.title, "Back In Black");
        assert_eq!(item.artist.as_deref(), Some("AC/DC"));
        assert_eq!(item.original_track_number.as_deref(), Some("6"));
        assert_eq!(
            item.first_url(),
            Some("http://10.0.0.2:8200/MediaItems/42.flac")
        );
        assert_eq!(item.resources[0].duration.as_deref(), Some("0:04:15.000"));
    }

    #[test]
    fn parse_unqualified_names() {
        let xml = r#"<DIDL-Lite>
  <item id="a" parentID="0">
    <title>Untagged</title>
    <class>object.item.audioItem</class>
    <res>http://host/a.mp3</res>
  </item>
</DIDL-Lite>"#;
        let didl = parse_didl(xml).unwrap();
        assert_eq!(didl.items[0].title, "Untagged");
        assert_eq!(didl.items[0].first_url(), Some("http://host/a.mp3"));
    }

    #[test]
    fn parse_unescapes_entities() {
        let xml = r#"<DIDL-Lite>
  <item id="a" parentID="0">
    <dc:title>Crosby, Stills &amp; Nash</dc:title>
    <upnp:class>object.item.audioItem.musicTrack</upnp:class>
  </item>
</DIDL-Lite>"#;
        let didl = parse_didl(xml).unwrap();
        assert_eq!(didl.items[0].title, "Crosby, Stills & Nash");
        assert!(didl.items[0].first_url().is_none());
    }

    #[test]
    fn blank_payload_is_empty_listing() {
        let didl = parse_didl("  \n").unwrap();
        assert!(didl.containers.is_empty());
        assert!(didl.items.is_empty());
    }
}
