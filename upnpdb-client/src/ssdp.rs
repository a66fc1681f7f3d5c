/*!
SSDP client side of a control point. It must **not** bind to UDP port 1900.

The SSDP *server* role (UPnP device mode) owns 0.0.0.0:1900; a control
point only needs to send M-SEARCH and receive unicast replies, so it binds
an ephemeral port. Binding both roles to 1900 (even with SO_REUSEPORT)
makes the kernel load-balance datagrams between sockets and NOTIFY
messages get lost randomly.

The client still joins the multicast group so it sees NOTIFY alive/byebye
announcements.
*/

use socket2::{Domain, Protocol, Socket, Type};
use std::collections::HashMap;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// SSDP multicast group.
pub const SSDP_MULTICAST_ADDR: &str = "239.255.255.250";

/// SSDP port.
pub const SSDP_PORT: u16 = 1900;

/// Default announcement validity when CACHE-CONTROL is absent or broken.
pub const MAX_AGE: u32 = 1800;

/// SSDP events a control point cares about.
#[derive(Debug, Clone)]
pub enum SsdpEvent {
    Alive {
        usn: String,
        nt: String,
        location: String,
        server: String,
        max_age: u32,
        from: SocketAddr,
    },
    ByeBye {
        usn: String,
        nt: String,
        from: SocketAddr,
    },
    SearchResponse {
        usn: String,
        st: String,
        location: String,
        server: String,
        max_age: u32,
        from: SocketAddr,
    },
}

impl SsdpEvent {
    /// Notification type of the announced resource (NT or ST).
    pub fn notification_type(&self) -> Option<&str> {
        match self {
            SsdpEvent::Alive { nt, .. } | SsdpEvent::ByeBye { nt, .. } => Some(nt),
            SsdpEvent::SearchResponse { st, .. } => Some(st),
        }
    }
}

/// Sends M-SEARCH queries and listens for announcements.
pub struct SsdpClient {
    socket: Arc<UdpSocket>,
}

impl SsdpClient {
    /// Create a client socket, joining the multicast group on every
    /// non-loopback IPv4 interface, or only on `interface` when given.
    pub fn new(interface: Option<&str>) -> std::io::Result<Self> {
        let socket2 = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket2.set_reuse_address(true)?;

        let bind_addr: SocketAddr = "0.0.0.0:0".parse().unwrap();
        socket2.bind(&bind_addr.into())?;

        let socket: UdpSocket = socket2.into();
        socket.set_read_timeout(Some(Duration::from_secs(1)))?;
        socket.set_multicast_loop_v4(true)?;

        let group = SSDP_MULTICAST_ADDR.parse().unwrap();
        let mut joined = 0usize;
        for iface in get_if_addrs::get_if_addrs()? {
            if let Some(wanted) = interface {
                if iface.name != wanted {
                    continue;
                }
            }
            if let std::net::IpAddr::V4(ipv4) = iface.ip() {
                if ipv4.is_loopback() {
                    continue;
                }
                match socket.join_multicast_v4(&group, &ipv4) {
                    Ok(()) => {
                        debug!("SSDP: joined {} on {}", SSDP_MULTICAST_ADDR, ipv4);
                        joined += 1;
                    }
                    Err(e) => {
                        warn!(
                            "SSDP: failed to join {} on {}: {}",
                            SSDP_MULTICAST_ADDR, ipv4, e
                        );
                    }
                }
            }
        }

        if joined == 0 {
            if let Some(wanted) = interface {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no usable IPv4 address on interface {:?}", wanted),
                ));
            }
        }

        info!("SSDP client ready (multicast joined on {} interface(s))", joined);

        Ok(Self {
            socket: Arc::new(socket),
        })
    }

    /// Send one M-SEARCH for the given search target.
    pub fn send_msearch(&self, st: &str, mx: u32) -> std::io::Result<()> {
        let mx = mx.max(1);
        let msg = format!(
            "M-SEARCH * HTTP/1.1\r\n\
             HOST: {}:{}\r\n\
             MAN: \"ssdp:discover\"\r\n\
             MX: {}\r\n\
             ST: {}\r\n\
             USER-AGENT: upnpdb SSDP Client\r\n\
             \r\n",
            SSDP_MULTICAST_ADDR, SSDP_PORT, mx, st
        );

        let addr: SocketAddr = format!("{}:{}", SSDP_MULTICAST_ADDR, SSDP_PORT)
            .parse()
            .unwrap();

        match self.socket.send_to(msg.as_bytes(), addr) {
            Ok(_) => {
                info!("M-SEARCH sent (ST={}, MX={})", st, mx);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to send M-SEARCH: {}", e);
                Err(e)
            }
        }
    }

    /// Receive loop. Returns once `shutdown` becomes true; the read timeout
    /// on the socket bounds the shutdown latency to about one second.
    pub fn run_until_shutdown<F>(&self, shutdown: Arc<AtomicBool>, mut on_event: F)
    where
        F: FnMut(SsdpEvent),
    {
        let socket = Arc::clone(&self.socket);
        let mut buf = [0u8; 8192];
        while !shutdown.load(Ordering::Relaxed) {
            match socket.recv_from(&mut buf) {
                Ok((n, from)) => {
                    let data = String::from_utf8_lossy(&buf[..n]);
                    if let Some(event) = parse_message(&data, from) {
                        trace!("SSDP event from {}: {:?}", from, event);
                        on_event(event);
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    continue;
                }
                Err(e) => {
                    warn!("SSDP client read error: {}", e);
                }
            }
        }
        debug!("SSDP receive loop stopped");
    }
}

fn parse_message(data: &str, from: SocketAddr) -> Option<SsdpEvent> {
    let mut lines = data.lines();
    let first_line = lines.next()?.trim();
    let upper = first_line.to_ascii_uppercase();
    let headers = parse_headers(lines);

    if upper.starts_with("NOTIFY ") {
        handle_notify(&headers, from)
    } else if upper.starts_with("HTTP/") && upper.contains(" 200 ") {
        handle_search_response(&headers, from)
    } else if upper.starts_with("M-SEARCH ") {
        // Another control point querying; we are not a device.
        None
    } else {
        trace!("Unknown SSDP message type from {}: {}", from, first_line);
        None
    }
}

fn handle_notify(headers: &HashMap<String, String>, from: SocketAddr) -> Option<SsdpEvent> {
    let nts = headers.get("NTS")?.to_ascii_lowercase();
    let nt = headers.get("NT")?.to_string();
    let usn = headers.get("USN")?.to_string();

    if nts == "ssdp:alive" {
        let location = match headers.get("LOCATION") {
            Some(loc) => loc.to_string(),
            None => {
                trace!("NOTIFY ssdp:alive from {} missing LOCATION, ignoring", from);
                return None;
            }
        };
        let server = headers
            .get("SERVER")
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string());
        let max_age = parse_max_age(headers.get("CACHE-CONTROL"));

        Some(SsdpEvent::Alive {
            usn,
            nt,
            location,
            server,
            max_age,
            from,
        })
    } else if nts == "ssdp:byebye" {
        Some(SsdpEvent::ByeBye { usn, nt, from })
    } else {
        trace!("Unknown NTS value from {}: {}", from, nts);
        None
    }
}

fn handle_search_response(
    headers: &HashMap<String, String>,
    from: SocketAddr,
) -> Option<SsdpEvent> {
    let st = headers.get("ST")?.to_string();
    let usn = headers.get("USN")?.to_string();
    let location = headers.get("LOCATION")?.to_string();

    let server = headers
        .get("SERVER")
        .cloned()
        .unwrap_or_else(|| "Unknown".to_string());
    let max_age = parse_max_age(headers.get("CACHE-CONTROL"));

    Some(SsdpEvent::SearchResponse {
        usn,
        st,
        location,
        server,
        max_age,
        from,
    })
}

fn parse_headers<'a, I>(lines: I) -> HashMap<String, String>
where
    I: Iterator<Item = &'a str>,
{
    let mut headers = HashMap::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }

        // Split on the first ':' only; values may contain ':'
        if let Some(colon_pos) = line.find(':') {
            let (name, value_with_colon) = line.split_at(colon_pos);
            let value = &value_with_colon[1..];

            let name = name.trim().to_ascii_uppercase();
            let value = value.trim().to_string();

            if !name.is_empty() && !value.is_empty() {
                headers.insert(name, value);
            }
        } else {
            trace!("Skipping SSDP line without colon: '{}'", line);
        }
    }
    headers
}

fn parse_max_age(value: Option<&String>) -> u32 {
    if let Some(v) = value {
        let lower = v.to_ascii_lowercase();
        if let Some(idx) = lower.find("max-age") {
            let after_key = &v[idx + 7..];
            let after_eq = after_key.trim_start().trim_start_matches('=').trim_start();
            let digits: String = after_eq
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if let Ok(age) = digits.parse::<u32>() {
                return age;
            }
        }
        trace!("Could not parse max-age from CACHE-CONTROL: '{}'", v);
    }
    MAX_AGE
}
