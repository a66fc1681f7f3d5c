//! Mapping from host tag types to DIDL-Lite field names.

use crate::tag::TagType;

/// DIDL field name usable in ContentDirectory search criteria, or None for
/// tag types UPnP has no field for. AlbumArtist is intentionally absent:
/// callers normalize it to Artist first.
pub fn upnp_tag_name(tag_type: TagType) -> Option<&'static str> {
    match tag_type {
        TagType::Artist => Some("upnp:artist"),
        TagType::Album => Some("upnp:album"),
        TagType::Track => Some("upnp:originalTrackNumber"),
        TagType::Genre => Some("upnp:genre"),
        TagType::Title => Some("dc:title"),
        TagType::AlbumArtist | TagType::Date => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn searchable_tags_have_didl_names() {
        assert_eq!(upnp_tag_name(TagType::Artist), Some("upnp:artist"));
        assert_eq!(upnp_tag_name(TagType::Title), Some("dc:title"));
        assert_eq!(upnp_tag_name(TagType::Date), None);
        assert_eq!(upnp_tag_name(TagType::AlbumArtist), None);
    }
}
