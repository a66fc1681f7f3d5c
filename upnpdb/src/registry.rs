//! Source of ContentDirectory handles for the adapter.

use upnpdb_client::{ContentDirectory, DeviceDirectory, MediaServer};

use crate::error::DatabaseError;

/// Set of currently known MediaServers, addressed by friendly name.
///
/// The production implementation is [`DeviceDirectory`]; the trait exists
/// so traversal can be driven against scripted servers.
pub trait ServerRegistry {
    type Server: ContentDirectory;

    /// Exact (byte-wise) friendly-name lookup.
    fn get_server(&self, name: &str) -> Result<Self::Server, DatabaseError>;

    /// Snapshot of the known servers. Order is not stable and handles must
    /// not be retained across calls; discovery mutates the set underneath.
    fn servers(&self) -> Vec<Self::Server>;

    /// Bring the registry up. Invoked from the database `open`.
    fn start(&mut self) -> Result<(), DatabaseError> {
        Ok(())
    }

    /// Tear the registry down. Must be safe after a failed `start`.
    fn stop(&mut self) {}
}

impl ServerRegistry for DeviceDirectory {
    type Server = MediaServer;

    fn get_server(&self, name: &str) -> Result<MediaServer, DatabaseError> {
        DeviceDirectory::get_server(self, name)
            .ok_or_else(|| DatabaseError::not_found(format!("No such server: {name}")))
    }

    fn servers(&self) -> Vec<MediaServer> {
        DeviceDirectory::servers(self)
    }

    fn start(&mut self) -> Result<(), DatabaseError> {
        DeviceDirectory::start(self)?;
        Ok(())
    }

    fn stop(&mut self) {
        DeviceDirectory::stop(self)
    }
}
