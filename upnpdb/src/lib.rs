//! Read-only music database adapter over UPnP/AV ContentDirectory servers.
//!
//! MediaServers discovered on the LAN are presented as one hierarchical
//! library: the first path element is a server's friendly name, the rest
//! addresses objects inside it, either by title chain or by the synthetic
//! `0/<objectId>` form used for search results. The adapter implements the
//! host's [`Database`] contract: visiting directories and songs under a
//! path, resolving single songs, collecting distinct tag values and
//! reporting (trivial) statistics.
//!
//! All UPnP traffic goes through [`upnpdb_client`]; network calls block
//! the calling thread.

pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod path;
pub mod registry;
pub mod search;
pub mod selection;
pub mod song;
pub mod tag;
pub mod tags;
pub mod vhelper;

mod database;

pub use config::{ConfigBlock, UpnpDatabaseConfig};
pub use database::{create_upnp_database, UpnpDatabase, UPNP_DB_PLUGIN};
pub use db::{
    collect_unique_tags, Database, DatabasePlugin, DatabaseStats, UniqueTagMap, VisitDirectory,
    VisitPlaylist, VisitSong,
};
pub use error::DatabaseError;
pub use filter::{FilterItem, SongFilter, TagSongFilter};
pub use registry::ServerRegistry;
pub use selection::DatabaseSelection;
pub use song::{LightDirectory, LightSong, PlaylistInfo};
pub use tag::{Tag, TagType};
pub use vhelper::VisitorHelper;
