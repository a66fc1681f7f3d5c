//! Discover MediaServers on the LAN and print what they expose.
//!
//! ```sh
//! cargo run --example discover
//! ```

use std::thread;
use std::time::Duration;

use upnpdb_client::{ContentDirectory, DeviceDirectory};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,upnpdb_client=debug".into()),
        )
        .init();

    let mut directory = DeviceDirectory::new(None);
    directory.start()?;

    println!("Listening for MediaServers for 10 seconds...");
    thread::sleep(Duration::from_secs(10));

    for server in directory.servers() {
        println!("* {} ({})", server.friendly_name(), server.location());
        match server.search_capabilities() {
            Ok(caps) if caps.is_empty() => println!("  search: not supported"),
            Ok(caps) => println!("  search: {}", caps.join(", ")),
            Err(err) => println!("  search: query failed: {err:#}"),
        }
        match server.read_dir("0") {
            Ok(content) => {
                for object in content.objects.iter().take(10) {
                    println!("  - {} [{:?}]", object.name, object.object_type);
                }
            }
            Err(err) => println!("  browse failed: {err:#}"),
        }
    }

    directory.stop();
    Ok(())
}
