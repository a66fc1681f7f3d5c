//! Open the adapter, wait for discovery, and list the library roots.
//!
//! ```sh
//! cargo run --example browse -- [server-name]
//! ```

use std::thread;
use std::time::Duration;

use upnpdb::{Database, DatabaseSelection, LightDirectory, LightSong, UpnpDatabase,
             UpnpDatabaseConfig};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut db = UpnpDatabase::new(&UpnpDatabaseConfig::default());
    db.open()?;

    println!("Waiting 10 seconds for MediaServers to answer...");
    thread::sleep(Duration::from_secs(10));

    let uri = std::env::args().nth(1).unwrap_or_default();
    let selection = DatabaseSelection::new(uri, false, None);

    let mut on_directory = |d: &LightDirectory| {
        println!("d {}", d.uri);
        Ok(())
    };
    let mut on_song = |s: &LightSong| {
        println!("s {} -> {}", s.uri, s.real_uri);
        Ok(())
    };

    db.visit(&selection, Some(&mut on_directory), Some(&mut on_song), None)?;

    db.close();
    Ok(())
}
