//! ContentDirectory service client.

use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::debug;
use upnpdb_didl::parse_didl;
use xmltree::Element;

use crate::object::DirContent;
use crate::soap::{
    find_child_with_suffix, invoke_upnp_action, parse_upnp_error, SoapCallResult, SoapEnvelope,
};

/// Browsing contract of one MediaServer. The adapter core is written
/// against this trait so its traversal logic can be exercised with
/// scripted servers.
pub trait ContentDirectory {
    /// Human-readable server name, unique enough in practice to address
    /// the server by.
    fn friendly_name(&self) -> &str;

    /// All immediate children of a container, in server order.
    fn read_dir(&self, object_id: &str) -> Result<DirContent>;

    /// Metadata of a single object. A well-behaved server returns exactly
    /// one object; callers must check.
    fn get_metadata(&self, object_id: &str) -> Result<DirContent>;

    /// Run a Search scoped at `container_id` with a raw criteria string.
    fn search(&self, container_id: &str, criteria: &str) -> Result<DirContent>;

    /// DIDL field names this server accepts in search criteria. Empty
    /// means the server cannot search at all.
    fn search_capabilities(&self) -> Result<Vec<String>>;
}

/// One discovered UPnP MediaServer with a ContentDirectory endpoint.
#[derive(Clone, Debug)]
pub struct MediaServer {
    udn: String,
    friendly_name: String,
    model_name: String,
    manufacturer: String,
    location: String,
    service_type: String,
    control_url: String,
    timeout: Duration,
}

impl MediaServer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        udn: String,
        friendly_name: String,
        model_name: String,
        manufacturer: String,
        location: String,
        service_type: String,
        control_url: String,
        timeout: Duration,
    ) -> Self {
        Self {
            udn,
            friendly_name,
            model_name,
            manufacturer,
            location,
            service_type,
            control_url,
            timeout,
        }
    }

    pub fn udn(&self) -> &str {
        &self.udn
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn control_url(&self) -> &str {
        &self.control_url
    }

    fn browse_with_flag(&self, object_id: &str, browse_flag: &str) -> Result<DirContent> {
        let args = [
            ("ObjectID", object_id),
            ("BrowseFlag", browse_flag),
            ("Filter", "*"),
            ("StartingIndex", "0"),
            ("RequestedCount", "0"),
            ("SortCriteria", ""),
        ];

        let envelope = self.invoke("Browse", &args)?;
        let didl_xml = extract_result_payload(&envelope, "BrowseResponse")?;
        map_didl(&didl_xml)
    }

    fn invoke(&self, action: &str, args: &[(&str, &str)]) -> Result<SoapEnvelope> {
        let call_result = invoke_upnp_action(
            &self.control_url,
            &self.service_type,
            action,
            args,
            Some(self.timeout),
        )?;

        check_call(action, &call_result)?;

        call_result
            .envelope
            .ok_or_else(|| anyhow!("Missing SOAP envelope in {} response", action))
    }
}

impl ContentDirectory for MediaServer {
    fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    fn read_dir(&self, object_id: &str) -> Result<DirContent> {
        self.browse_with_flag(object_id, "BrowseDirectChildren")
    }

    fn get_metadata(&self, object_id: &str) -> Result<DirContent> {
        self.browse_with_flag(object_id, "BrowseMetadata")
    }

    fn search(&self, container_id: &str, criteria: &str) -> Result<DirContent> {
        debug!(
            server = self.friendly_name.as_str(),
            container = container_id,
            criteria,
            "ContentDirectory search"
        );

        let args = [
            ("ContainerID", container_id),
            ("SearchCriteria", criteria),
            ("Filter", "*"),
            ("StartingIndex", "0"),
            ("RequestedCount", "0"),
            ("SortCriteria", ""),
        ];

        let envelope = self.invoke("Search", &args)?;
        let didl_xml = extract_result_payload(&envelope, "SearchResponse")?;
        map_didl(&didl_xml)
    }

    fn search_capabilities(&self) -> Result<Vec<String>> {
        let envelope = self.invoke("GetSearchCapabilities", &[])?;
        let response = find_child_with_suffix(&envelope.body, "SearchCapabilitiesResponse")
            .ok_or_else(|| anyhow!("Missing GetSearchCapabilitiesResponse element"))?;

        Ok(parse_search_caps(response))
    }
}

fn parse_search_caps(response: &Element) -> Vec<String> {
    let caps = find_child_with_suffix(response, "SearchCaps")
        .and_then(|e| e.get_text().map(|t| t.to_string()))
        .unwrap_or_default();

    caps.split(',')
        .map(str::trim)
        .filter(|cap| !cap.is_empty())
        .map(str::to_string)
        .collect()
}

fn map_didl(xml: &str) -> Result<DirContent> {
    let didl =
        parse_didl(xml).map_err(|err| anyhow!("Failed to parse DIDL-Lite payload: {}", err))?;
    Ok(DirContent::from_didl(didl))
}

fn extract_result_payload(envelope: &SoapEnvelope, response_suffix: &str) -> Result<String> {
    let response = find_child_with_suffix(&envelope.body, response_suffix)
        .ok_or_else(|| anyhow!("Missing {} element in SOAP body", response_suffix))?;
    let result_elem = find_child_with_suffix(response, "Result")
        .ok_or_else(|| anyhow!("Missing Result element in {}", response_suffix))?;

    Ok(result_elem
        .get_text()
        .map(|t| t.to_string())
        .unwrap_or_default())
}

fn check_call(action: &str, call_result: &SoapCallResult) -> Result<()> {
    if let Some(env) = &call_result.envelope {
        if let Some(err) = parse_upnp_error(env) {
            return Err(anyhow!(
                "{} returned UPnP error {}: {}",
                action,
                err.error_code,
                err.error_description
            ));
        }
    }

    if !call_result.status.is_success() {
        return Err(anyhow!(
            "{} failed with HTTP status {} and body: {}",
            action,
            call_result.status,
            call_result.raw_body
        ));
    }

    Ok(())
}
