//! Vendor-neutral span and resource model consumed by the translator.
//!
//! The translator reads spans through this model rather than any particular
//! wire format. Adapters in [`crate::otlp`] and [`crate::sdk`] convert OTLP
//! protobuf messages and OpenTelemetry SDK span data into it.
//!
//! # Examples
//!
//! ```
//! use xray_segment_translator::{attributes, Span, SpanKind};
//!
//! let span = Span::builder()
//!     .trace_id([0x5f, 0x6e, 0x3a, 0x10, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12])
//!     .span_id([1, 2, 3, 4, 5, 6, 7, 8])
//!     .name("GET /users")
//!     .kind(SpanKind::Server)
//!     .attributes(attributes([("http.method", "GET".into())]))
//!     .build();
//!
//! assert!(!span.has_parent());
//! ```

use crate::value::{AttributeMap, AttributeValue};
use bon::Builder;

/// Role of a span in a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpanKind {
    #[default]
    Unspecified,
    Internal,
    Server,
    Client,
    Producer,
    Consumer,
}

/// Span status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusCode {
    #[default]
    Unset,
    Ok,
    Error,
}

/// Span status: a code plus an optional description.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Status {
    pub code: StatusCode,
    pub message: String,
}

impl Status {
    /// An error status with the given description.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::Error,
            message: message.into(),
        }
    }

    /// An OK status.
    pub fn ok() -> Self {
        Self {
            code: StatusCode::Ok,
            message: String::new(),
        }
    }
}

/// A timestamped event recorded on a span.
#[derive(Debug, Clone, PartialEq, Default, Builder)]
pub struct SpanEvent {
    #[builder(into)]
    pub name: String,
    #[builder(default)]
    pub time_unix_nano: u64,
    #[builder(default)]
    pub attributes: AttributeMap,
}

/// A finished span.
#[derive(Debug, Clone, PartialEq, Default, Builder)]
pub struct Span {
    #[builder(default)]
    pub trace_id: [u8; 16],
    #[builder(default)]
    pub span_id: [u8; 8],
    /// All zeroes when the span has no parent.
    #[builder(default)]
    pub parent_span_id: [u8; 8],
    #[builder(into, default)]
    pub name: String,
    #[builder(default)]
    pub kind: SpanKind,
    #[builder(default)]
    pub start_time_unix_nano: u64,
    #[builder(default)]
    pub end_time_unix_nano: u64,
    #[builder(default)]
    pub status: Status,
    #[builder(default)]
    pub attributes: AttributeMap,
    #[builder(default)]
    pub events: Vec<SpanEvent>,
}

impl Span {
    /// Whether the span carries a (non-zero) parent span id.
    pub fn has_parent(&self) -> bool {
        self.parent_span_id.iter().any(|b| *b != 0)
    }

    /// Looks up a span attribute.
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }
}

/// The entity that produced a span (service, host, cloud platform, ...).
#[derive(Debug, Clone, PartialEq, Default, Builder)]
pub struct Resource {
    #[builder(default)]
    pub attributes: AttributeMap,
}

impl Resource {
    /// Creates a resource from an attribute map.
    pub fn new(attributes: AttributeMap) -> Self {
        Self { attributes }
    }

    /// Looks up a resource attribute.
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// Looks up a string resource attribute.
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attribute(key).and_then(AttributeValue::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}
