//! The segment `service` block.

use crate::constants::attributes::{CONTAINER_IMAGE_TAG, SERVICE_VERSION};
use crate::segment::ServiceData;
use crate::span::Resource;
use crate::value::AttributeValue;

/// Reports the service version, taken from `service.version` or, failing
/// that, the container image tag.
pub fn make_service(resource: &Resource) -> Option<ServiceData> {
    let version = resource
        .attribute(SERVICE_VERSION)
        .or_else(|| resource.attribute(CONTAINER_IMAGE_TAG))
        .and_then(AttributeValue::to_text)?;

    Some(ServiceData {
        version: Some(version),
        ..Default::default()
    })
}
