//! Classification of attributes into X-Ray annotations and metadata.
//!
//! X-Ray indexes annotations for search but only accepts scalar values under
//! restricted keys. Everything else is stored as metadata, which keeps nested
//! structure but is not searchable. The translator decides per attribute:
//!
//! - attributes selected for indexing (explicitly, or because every attribute
//!   is indexed) with a scalar value become annotations under a sanitized key;
//! - everything else that has a JSON representation becomes metadata under
//!   `metadata["default"][key]`, with its original key.
//!
//! Resource attributes take part only for root segments, under the
//! `otel.resource.` prefix. The end-user id is lifted into the segment's
//! `user` field and never stored twice.

use crate::constants::attributes::ENDUSER_ID;
use crate::constants::defaults::{METADATA_NAMESPACE, RESOURCE_ATTRIBUTE_PREFIX};
use crate::segment::{Annotations, Metadata};
use crate::span::Resource;
use crate::value::{AttributeMap, AttributeValue};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashSet};

/// Which attributes are promoted to annotations.
#[derive(Debug, Clone, Copy)]
pub struct IndexPolicy<'a> {
    pub indexed_keys: &'a HashSet<String>,
    pub index_all: bool,
}

impl IndexPolicy<'_> {
    fn is_indexed(&self, key: &str) -> bool {
        self.index_all || self.indexed_keys.contains(key)
    }
}

/// The user, annotations and metadata of a segment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XRayAttributes {
    pub user: Option<String>,
    pub annotations: Annotations,
    pub metadata: Metadata,
}

/// Splits the residual span attributes (and, for root segments, the resource
/// attributes) into user, annotations and metadata.
pub fn make_xray_attributes(
    mut attributes: AttributeMap,
    resource: &Resource,
    store_resource: bool,
    policy: IndexPolicy<'_>,
) -> XRayAttributes {
    let user = attributes
        .shift_remove(ENDUSER_ID)
        .and_then(|value| value.as_non_empty_str().map(str::to_string));

    if attributes.is_empty() && (!store_resource || resource.is_empty()) {
        return XRayAttributes {
            user,
            ..Default::default()
        };
    }

    let mut annotations = Annotations::new();
    let mut default_metadata = BTreeMap::new();

    if store_resource {
        for (key, value) in &resource.attributes {
            let key = format!("{RESOURCE_ATTRIBUTE_PREFIX}{key}");
            classify(key, value, policy, &mut annotations, &mut default_metadata);
        }
    }

    for (key, value) in &attributes {
        classify(key.clone(), value, policy, &mut annotations, &mut default_metadata);
    }

    let mut metadata = Metadata::new();
    if !default_metadata.is_empty() {
        metadata.insert(METADATA_NAMESPACE.to_string(), default_metadata);
    }

    XRayAttributes {
        user,
        annotations,
        metadata,
    }
}

fn classify(
    key: String,
    value: &AttributeValue,
    policy: IndexPolicy<'_>,
    annotations: &mut Annotations,
    metadata: &mut BTreeMap<String, JsonValue>,
) {
    if policy.is_indexed(&key) {
        if let Some(annotation) = value.to_annotation() {
            annotations.insert(fix_annotation_key(&key), annotation);
            return;
        }
    }
    if let Some(meta) = value.to_metadata() {
        metadata.insert(key, meta);
    }
}

/// Replaces every character outside `[0-9A-Za-z]` with `_`.
///
/// See <https://docs.aws.amazon.com/xray/latest/devguide/xray-api-segmentdocuments.html#api-segmentdocuments-annotations>
pub fn fix_annotation_key(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
