//! MediaServer discovery: SSDP events in, a registry of live servers out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Sender};
use tracing::{debug, warn};

use crate::content_directory::{ContentDirectory, MediaServer};
use crate::description::DeviceDescription;
use crate::ssdp::{SsdpClient, SsdpEvent};

/// Search target used for the initial sweep.
pub const MEDIA_SERVER_DEVICE: &str = "urn:schemas-upnp-org:device:MediaServer:1";

const DESCRIPTION_TIMEOUT: Duration = Duration::from_secs(5);
const SOAP_TIMEOUT: Duration = Duration::from_secs(10);
const FETCH_QUEUE_LIMIT: usize = 10;
const FETCH_WORKERS: usize = 3;
const MSEARCH_MX: u32 = 3;

type ServerTable = Arc<RwLock<HashMap<String, MediaServer>>>;

/// Task to fetch a device description off the SSDP thread.
struct FetchTask {
    udn: String,
    location: String,
    server_header: String,
}

struct UdnSeen {
    last_fetch: Instant,
    max_age: u64,
}

/// Remembers which UDNs were fetched recently. SSDP alive messages arrive
/// far more often than descriptions change; a UDN is re-fetched only after
/// half its max-age has elapsed.
#[derive(Default)]
struct UdnTracker {
    seen: HashMap<String, UdnSeen>,
}

impl UdnTracker {
    fn should_fetch(&mut self, udn: &str, max_age: u64) -> bool {
        let now = Instant::now();
        if let Some(seen) = self.seen.get_mut(udn) {
            if now.duration_since(seen.last_fetch).as_secs() > seen.max_age / 2 {
                seen.last_fetch = now;
                seen.max_age = max_age;
                true
            } else {
                false
            }
        } else {
            self.seen.insert(
                udn.to_string(),
                UdnSeen {
                    last_fetch: now,
                    max_age,
                },
            );
            true
        }
    }

    fn forget(&mut self, udn: &str) {
        self.seen.remove(udn);
    }
}

/// Directory of MediaServers currently visible on the LAN.
///
/// `start()` binds the SSDP socket, sends an M-SEARCH sweep and spawns the
/// listener plus a small pool of description-fetch workers. The server
/// table fills asynchronously; readers always get a snapshot.
pub struct DeviceDirectory {
    interface: Option<String>,
    servers: ServerTable,
    seen: Arc<Mutex<UdnTracker>>,
    shutdown: Arc<AtomicBool>,
    fetch_tx: Option<Sender<FetchTask>>,
    listener: Option<JoinHandle<()>>,
}

impl DeviceDirectory {
    pub fn new(interface: Option<String>) -> Self {
        Self {
            interface,
            servers: Arc::new(RwLock::new(HashMap::new())),
            seen: Arc::new(Mutex::new(UdnTracker::default())),
            shutdown: Arc::new(AtomicBool::new(false)),
            fetch_tx: None,
            listener: None,
        }
    }

    /// Start discovery. Fails when the SSDP socket cannot be set up, in
    /// which case nothing keeps running.
    pub fn start(&mut self) -> Result<()> {
        let ssdp = SsdpClient::new(self.interface.as_deref())
            .context("Failed to set up the SSDP client socket")?;
        ssdp.send_msearch(MEDIA_SERVER_DEVICE, MSEARCH_MX)
            .context("Failed to send the initial M-SEARCH")?;

        let (fetch_tx, fetch_rx) = bounded::<FetchTask>(FETCH_QUEUE_LIMIT);

        for _ in 0..FETCH_WORKERS {
            let fetch_rx = fetch_rx.clone();
            let servers = Arc::clone(&self.servers);
            thread::spawn(move || {
                while let Ok(task) = fetch_rx.recv() {
                    match DeviceDescription::fetch(
                        &task.udn,
                        &task.location,
                        &task.server_header,
                        DESCRIPTION_TIMEOUT,
                    ) {
                        Ok(description) => {
                            let udn = description.udn().to_ascii_lowercase();
                            if let Some(server) = description.into_server(SOAP_TIMEOUT) {
                                debug!(
                                    name = server.friendly_name(),
                                    udn = udn.as_str(),
                                    "MediaServer registered"
                                );
                                if let Ok(mut table) = servers.write() {
                                    table.insert(udn, server);
                                }
                            }
                        }
                        Err(err) => {
                            debug!(
                                location = task.location.as_str(),
                                "Description fetch failed: {}", err
                            );
                        }
                    }
                }
            });
        }

        let shutdown = Arc::clone(&self.shutdown);
        let seen = Arc::clone(&self.seen);
        let servers = Arc::clone(&self.servers);
        let tx = fetch_tx.clone();
        let listener = thread::spawn(move || {
            ssdp.run_until_shutdown(shutdown, move |event| {
                handle_event(event, &seen, &servers, &tx);
            });
        });

        self.fetch_tx = Some(fetch_tx);
        self.listener = Some(listener);
        Ok(())
    }

    /// Stop the listener and the worker pool. Safe to call more than once
    /// and after a failed `start`.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.fetch_tx.take();
        if let Some(listener) = self.listener.take() {
            if listener.join().is_err() {
                warn!("SSDP listener thread panicked");
            }
        }
    }

    /// Look up a live server by its exact (byte-wise) friendly name.
    pub fn get_server(&self, name: &str) -> Option<MediaServer> {
        let table = self.servers.read().ok()?;
        table
            .values()
            .find(|server| server.friendly_name() == name)
            .cloned()
    }

    /// Snapshot of the currently known servers, in unspecified order.
    pub fn servers(&self) -> Vec<MediaServer> {
        match self.servers.read() {
            Ok(table) => table.values().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl Drop for DeviceDirectory {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.fetch_tx.take();
    }
}

fn handle_event(
    event: SsdpEvent,
    seen: &Arc<Mutex<UdnTracker>>,
    servers: &ServerTable,
    fetch_tx: &Sender<FetchTask>,
) {
    if !event
        .notification_type()
        .map(is_media_server_notification)
        .unwrap_or(false)
    {
        return;
    }

    match event {
        SsdpEvent::Alive {
            usn,
            location,
            server,
            max_age,
            ..
        }
        | SsdpEvent::SearchResponse {
            usn,
            location,
            server,
            max_age,
            ..
        } => {
            let Some(udn) = extract_udn_from_usn(&usn) else {
                return;
            };

            let should_fetch = match seen.lock() {
                Ok(mut tracker) => tracker.should_fetch(&udn, max_age as u64),
                Err(_) => false,
            };

            if should_fetch {
                // try_send: when the queue is full this fetch is simply
                // skipped; the next alive message retries.
                let _ = fetch_tx.try_send(FetchTask {
                    udn,
                    location,
                    server_header: server,
                });
            }
        }
        SsdpEvent::ByeBye { usn, .. } => {
            let Some(udn) = extract_udn_from_usn(&usn) else {
                return;
            };
            if let Ok(mut tracker) = seen.lock() {
                tracker.forget(&udn);
            }
            if let Ok(mut table) = servers.write() {
                if table.remove(&udn).is_some() {
                    debug!(udn = udn.as_str(), "MediaServer said byebye");
                }
            }
        }
    }
}

fn is_media_server_notification(nt: &str) -> bool {
    let lower = nt.to_ascii_lowercase();
    lower.contains(":device:mediaserver:") || lower.contains(":service:contentdirectory:")
}

fn extract_udn_from_usn(usn: &str) -> Option<String> {
    let lower = usn.trim().to_ascii_lowercase();
    if let Some(idx) = lower.find("uuid:") {
        let sub = &lower[idx..];
        if let Some(end) = sub.find("::") {
            Some(sub[..end].to_string())
        } else {
            Some(sub.to_string())
        }
    } else {
        None
    }
}
