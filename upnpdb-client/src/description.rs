//! Fetch and parse UPnP device descriptions.
//!
//! Only the fields a ContentDirectory control point needs are kept: device
//! identity plus the ContentDirectory service endpoint.

use std::io::{BufRead, BufReader};
use std::time::Duration;

use quick_xml::{events::Event, Reader};
use thiserror::Error;
use tracing::debug;
use ureq::Agent;

use crate::content_directory::MediaServer;

#[derive(Debug, Error)]
pub enum DescriptionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] ureq::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Missing required device element: {0}")]
    MissingField(&'static str),
}

/// Parsed device description, reduced to the MediaServer concern.
#[derive(Debug, Default)]
pub struct DeviceDescription {
    udn: String,
    location: String,
    server_header: String,
    device_type: Option<String>,
    friendly_name: Option<String>,
    manufacturer: Option<String>,
    model_name: Option<String>,
    content_directory_service_type: Option<String>,
    content_directory_control_url: Option<String>,
}

impl DeviceDescription {
    /// Fetch and parse the description.xml at `location`.
    pub fn fetch(
        udn: &str,
        location: &str,
        server_header: &str,
        timeout: Duration,
    ) -> Result<Self, DescriptionError> {
        debug!("Fetching description for {} at {}", udn, location);

        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        let agent: Agent = config.into();

        let response = agent.get(location).call()?;
        let (_parts, body) = response.into_parts();

        Self::parse(udn, location, server_header, BufReader::new(body.into_reader()))
    }

    /// Parse a description document from any reader. Split out from
    /// [`fetch`] so the state machine is testable without a server.
    pub fn parse<R: BufRead>(
        udn: &str,
        location: &str,
        server_header: &str,
        reader: R,
    ) -> Result<Self, DescriptionError> {
        let mut reader = Reader::from_reader(reader);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut parsed = DeviceDescription {
            udn: udn.to_string(),
            location: location.to_string(),
            server_header: server_header.to_string(),
            ..DeviceDescription::default()
        };

        let mut in_device = false;
        let mut in_service = false;
        let mut current_tag: Option<String> = None;
        let mut current_service_type: Option<String> = None;
        let mut current_control_url: Option<String> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    match name.as_str() {
                        "device" => {
                            in_device = true;
                            current_tag = None;
                        }
                        "service" => {
                            if in_device {
                                in_service = true;
                                current_tag = None;
                                current_service_type = None;
                                current_control_url = None;
                            }
                        }
                        _ => {
                            if in_device {
                                current_tag = Some(name);
                            }
                        }
                    }
                }
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    match name.as_str() {
                        "device" => {
                            in_device = false;
                        }
                        "service" => {
                            if in_device && in_service {
                                if let (Some(st), Some(ctrl)) =
                                    (&current_service_type, &current_control_url)
                                {
                                    let lower = st.to_ascii_lowercase();
                                    if lower
                                        .contains("urn:schemas-upnp-org:service:contentdirectory:")
                                        && parsed.content_directory_service_type.is_none()
                                    {
                                        // First ContentDirectory service wins.
                                        parsed.content_directory_service_type = Some(st.clone());
                                        parsed.content_directory_control_url = Some(ctrl.clone());
                                        debug!(
                                            "Found ContentDirectory service for {}: type={} controlURL={}",
                                            udn, st, ctrl
                                        );
                                    }
                                }
                                in_service = false;
                                current_service_type = None;
                                current_control_url = None;
                            }
                        }
                        _ => {}
                    }
                    current_tag = None;
                }
                Event::Text(e) => {
                    if in_device {
                        if let Some(tag) = &current_tag {
                            let text = e.unescape()?.into_owned();

                            match tag.as_str() {
                                "UDN" => {
                                    parsed.udn = text;
                                }
                                "deviceType" => {
                                    parsed.device_type = Some(text);
                                }
                                "friendlyName" => {
                                    parsed.friendly_name = Some(text);
                                }
                                "manufacturer" => {
                                    parsed.manufacturer = Some(text);
                                }
                                "modelName" => {
                                    parsed.model_name = Some(text);
                                }
                                "serviceType" if in_service => {
                                    current_service_type = Some(text);
                                }
                                "controlURL" if in_service => {
                                    current_control_url = Some(text);
                                }
                                _ => {}
                            }
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }

            buf.clear();
        }

        parsed.require_fields()
    }

    /// Build a [`MediaServer`] handle, or None when the device is not a
    /// MediaServer exposing a ContentDirectory endpoint.
    pub fn into_server(self, timeout: Duration) -> Option<MediaServer> {
        let device_type = self.device_type.as_ref()?.to_ascii_lowercase();
        if !device_type.contains("urn:schemas-upnp-org:device:mediaserver:") {
            debug!(
                "into_server: ignoring deviceType for {}: {}",
                self.udn, device_type
            );
            return None;
        }

        let service_type = self.content_directory_service_type?;
        let control_url =
            resolve_control_url(&self.location, &self.content_directory_control_url?);

        Some(MediaServer::new(
            self.udn.to_ascii_lowercase(),
            self.friendly_name.unwrap_or_default(),
            self.model_name.unwrap_or_default(),
            self.manufacturer.unwrap_or_default(),
            self.location,
            service_type,
            control_url,
            timeout,
        ))
    }

    fn require_fields(self) -> Result<Self, DescriptionError> {
        if self.device_type.is_none() {
            return Err(DescriptionError::MissingField("deviceType"));
        }
        if self.friendly_name.is_none() {
            return Err(DescriptionError::MissingField("friendlyName"));
        }
        Ok(self)
    }

    pub fn udn(&self) -> &str {
        &self.udn
    }

    pub fn friendly_name(&self) -> Option<&str> {
        self.friendly_name.as_deref()
    }

    pub fn server_header(&self) -> &str {
        &self.server_header
    }
}

/// Resolve a possibly relative controlURL against the description URL.
///
/// - If `control_url` is already absolute (starts with http:// or https://),
///   it is returned as-is.
/// - Otherwise, it is resolved against the scheme://host:port of
///   `description_url`.
pub fn resolve_control_url(description_url: &str, control_url: &str) -> String {
    if control_url.starts_with("http://") || control_url.starts_with("https://") {
        return control_url.to_string();
    }

    if let Some((scheme, rest)) = description_url.split_once("://") {
        if let Some(pos) = rest.find('/') {
            let authority = &rest[..pos];
            let base = format!("{}://{}", scheme, authority);

            if control_url.starts_with('/') {
                return format!("{}{}", base, control_url);
            } else {
                return format!("{}/{}", base, control_url);
            }
        } else {
            // Description URL has no path component at all.
            let base = format!("{}://{}", scheme, rest);
            if control_url.starts_with('/') {
                return format!("{}{}", base, control_url);
            } else {
                return format!("{}/{}", base, control_url);
            }
        }
    }

    control_url.to_string()
}
