//! SOAP request building and invocation for UPnP control URLs.

use std::io::BufReader;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, trace, warn};
use ureq::Agent;
use xmltree::{Element, EmitterConfig, XMLNode};

/// Parsed SOAP envelope. Header handling is not needed for ContentDirectory
/// traffic, so only the body is retained.
#[derive(Debug, Clone)]
pub struct SoapEnvelope {
    pub body: Element,
}

#[derive(Debug, thiserror::Error)]
pub enum SoapParseError {
    #[error("XML parse error: {0}")]
    Xml(#[from] xmltree::ParseError),

    #[error("Missing SOAP Envelope")]
    MissingEnvelope,

    #[error("Missing SOAP Body")]
    MissingBody,
}

/// Result of a SOAP call:
/// - HTTP status code
/// - raw XML body (always)
/// - parsed SOAP envelope if parsing succeeded
pub struct SoapCallResult {
    pub status: ureq::http::StatusCode,
    pub raw_body: String,
    pub envelope: Option<SoapEnvelope>,
}

/// UPnP fault detail carried inside a SOAP Fault.
#[derive(Debug, Clone)]
pub struct UpnpError {
    pub error_code: u32,
    pub error_description: String,
}

/// Build the request document for one UPnP action invocation.
pub fn build_soap_request(
    service_type: &str,
    action: &str,
    args: &[(&str, &str)],
) -> Result<String, xmltree::Error> {
    let mut action_elem = Element::new(&format!("u:{}", action));
    action_elem
        .attributes
        .insert("xmlns:u".to_string(), service_type.to_string());

    for (name, value) in args {
        let mut arg = Element::new(name);
        arg.children.push(XMLNode::Text((*value).to_string()));
        action_elem.children.push(XMLNode::Element(arg));
    }

    let mut body = Element::new("s:Body");
    body.children.push(XMLNode::Element(action_elem));

    let mut envelope = Element::new("s:Envelope");
    envelope.attributes.insert(
        "xmlns:s".to_string(),
        "http://schemas.xmlsoap.org/soap/envelope/".to_string(),
    );
    envelope.attributes.insert(
        "s:encodingStyle".to_string(),
        "http://schemas.xmlsoap.org/soap/encoding/".to_string(),
    );
    envelope.children.push(XMLNode::Element(body));

    let mut buf = Vec::new();
    let config = EmitterConfig::new()
        .perform_indent(true)
        .indent_string("  ");
    envelope.write_with_config(&mut buf, config)?;

    Ok(String::from_utf8(buf).unwrap())
}

/// Parse a SOAP envelope, tolerant of namespace prefixes.
pub fn parse_soap_envelope(xml: &[u8]) -> Result<SoapEnvelope, SoapParseError> {
    let reader = BufReader::new(xml);
    let root = Element::parse(reader)?;

    if !root.name.ends_with("Envelope") {
        return Err(SoapParseError::MissingEnvelope);
    }

    let body = root
        .get_child("Body")
        .or_else(|| {
            root.children
                .iter()
                .find_map(|n| n.as_element().filter(|e| e.name.ends_with("Body")))
        })
        .ok_or(SoapParseError::MissingBody)?;

    Ok(SoapEnvelope { body: body.clone() })
}

/// Invoke a UPnP SOAP action on a control URL.
///
/// - `control_url`: full HTTP URL of the service control endpoint
/// - `service_type`: service URN
/// - `action`: action name
/// - `args`: list of (name, value)
pub fn invoke_upnp_action(
    control_url: &str,
    service_type: &str,
    action: &str,
    args: &[(&str, &str)],
    timeout: Option<Duration>,
) -> Result<SoapCallResult> {
    let body_xml = build_soap_request(service_type, action, args)
        .context("Failed to build SOAP request body")?;

    debug!(
        url = control_url,
        action = action,
        service_type = service_type,
        args = ?summarize_args_for_log(args),
        "Sending SOAP request"
    );
    trace!(body = body_xml.as_str(), "SOAP request body");

    let mut builder = Agent::config_builder();
    builder = builder.http_status_as_error(false);
    if let Some(duration) = timeout {
        builder = builder.timeout_global(Some(duration));
    }
    let agent: Agent = builder.build().into();

    let soap_action_header = format!(r#""{}#{}""#, service_type, action);

    let mut response = agent
        .post(control_url)
        .header("Content-Type", r#"text/xml; charset="utf-8""#)
        .header("SOAPAction", &soap_action_header)
        .send(body_xml)
        .with_context(|| format!("HTTP error when sending SOAP request to {}", control_url))?;

    let status = response.status();
    debug!(status = status.as_u16(), "SOAP response received");

    let raw_body = response
        .body_mut()
        .read_to_string()
        .context("Failed to read SOAP response body")?;

    // Non-fatal: a fault body is still useful to the caller.
    let envelope = parse_soap_envelope(raw_body.as_bytes()).ok();

    if !status.is_success() {
        warn!(
            url = control_url,
            action = action,
            status = status.as_u16(),
            body_snippet = %response_snippet(&raw_body),
            "SOAP call returned non-success status"
        );
    }

    Ok(SoapCallResult {
        status,
        raw_body,
        envelope,
    })
}

/// Extract the UPnPError block from a SOAP Fault, if any.
pub fn parse_upnp_error(envelope: &SoapEnvelope) -> Option<UpnpError> {
    let fault = find_child_with_suffix(&envelope.body, "Fault")?;
    let detail = find_child_with_suffix(fault, "detail")?;
    let upnp_error = find_child_with_suffix(detail, "UPnPError")?;

    let error_code = find_child_with_suffix(upnp_error, "errorCode")?
        .get_text()?
        .trim()
        .parse::<u32>()
        .ok()?;

    let error_description = find_child_with_suffix(upnp_error, "errorDescription")
        .and_then(|e| e.get_text().map(|t| t.trim().to_string()))
        .unwrap_or_default();

    Some(UpnpError {
        error_code,
        error_description,
    })
}

pub(crate) fn find_child_with_suffix<'a>(parent: &'a Element, suffix: &str) -> Option<&'a Element> {
    parent.children.iter().find_map(|node| match node {
        XMLNode::Element(elem) if elem.name.ends_with(suffix) => Some(elem),
        _ => None,
    })
}

fn summarize_args_for_log(args: &[(&str, &str)]) -> Vec<String> {
    args.iter()
        .map(|(name, value)| format!("{}:{}B {}", name, value.len(), preview_value(value)))
        .collect()
}

fn preview_value(value: &str) -> String {
    const MAX_PREVIEW: usize = 96;
    if value.len() <= MAX_PREVIEW {
        value.to_string()
    } else {
        format!("{}…", &value[..MAX_PREVIEW])
    }
}

fn response_snippet(body: &str) -> String {
    const MAX_LEN: usize = 256;
    let trimmed = body.trim();
    if trimmed.len() <= MAX_LEN {
        trimmed.to_string()
    } else {
        format!("{}…", &trimmed[..MAX_LEN])
    }
}
