//! UPnP control-point plumbing for the upnpdb workspace: SSDP discovery,
//! device description parsing, SOAP invocation and the ContentDirectory
//! service client.
//!
//! All network calls are blocking; callers own the threading model.

pub mod content_directory;
pub mod description;
pub mod discovery;
pub mod object;
pub mod soap;
pub mod ssdp;

pub use content_directory::{ContentDirectory, MediaServer};
pub use description::{resolve_control_url, DescriptionError, DeviceDescription};
pub use discovery::{DeviceDirectory, MEDIA_SERVER_DEVICE};
pub use object::{DirContent, DirObject, ItemClass, ObjectType};
pub use soap::{build_soap_request, invoke_upnp_action, parse_soap_envelope, SoapEnvelope};
pub use ssdp::{SsdpClient, SsdpEvent};
