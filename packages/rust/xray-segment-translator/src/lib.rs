//! Translates OpenTelemetry spans into AWS X-Ray segment documents.
//!
//! This crate converts finished spans, together with the resource that
//! produced them, into the JSON segment documents accepted by the X-Ray
//! `PutTraceSegments` API. It is part of the
//! [serverless-otlp-forwarder](https://github.com/dev7a/serverless-otlp-forwarder/) project,
//! where forwarders receive OTLP data and need to ship it to X-Ray.
//!
//! # Overview
//!
//! Each span becomes one document:
//!
//! - the 128-bit trace id is rewritten as an X-Ray trace id
//!   (`1-<8 hex epoch>-<24 hex>`); ids whose embedded time is outside the
//!   window X-Ray accepts are rejected with [`TranslatorError::InvalidIdentifier`]
//! - HTTP, error, AWS, service and SQL attributes are lifted into the
//!   corresponding segment blocks
//! - the remaining attributes become annotations (when indexed and scalar)
//!   or metadata
//! - the segment name is chosen from the attributes that identify the
//!   remote or local service, then sanitized
//!
//! Spans can come from the crate's own [`Span`] model, from OTLP protobuf
//! ([`SegmentTranslator::translate_otlp_protobuf`]) or from OpenTelemetry
//! SDK [`SpanData`](opentelemetry_sdk::trace::SpanData).
//!
//! # Example
//!
//! ```
//! use xray_segment_translator::{attributes, Resource, SegmentTranslator, Span, SpanKind, TranslatorConfig};
//!
//! # fn main() -> Result<(), xray_segment_translator::TranslatorError> {
//! let epoch = std::time::SystemTime::now()
//!     .duration_since(std::time::UNIX_EPOCH)
//!     .unwrap()
//!     .as_secs() as u32;
//! let mut trace_id = [0x5a; 16];
//! trace_id[..4].copy_from_slice(&epoch.to_be_bytes());
//!
//! let span = Span::builder()
//!     .trace_id(trace_id)
//!     .span_id([0, 1, 2, 3, 4, 5, 6, 7])
//!     .parent_span_id([7, 6, 5, 4, 3, 2, 1, 0])
//!     .name("HTTP GET")
//!     .kind(SpanKind::Client)
//!     .attributes(attributes([
//!         ("http.method", "GET".into()),
//!         ("http.url", "https://api.example.com/users".into()),
//!         ("http.status_code", 200.into()),
//!         ("peer.service", "users-api".into()),
//!     ]))
//!     .build();
//!
//! let translator = SegmentTranslator::new(
//!     TranslatorConfig::builder()
//!         .indexed_attributes(vec!["peer.service".to_string()])
//!         .build(),
//! );
//! let document = translator.make_segment_document(&span, &Resource::default())?;
//! assert!(document.contains("\"type\":\"subsegment\""));
//! assert!(document.contains("\"name\":\"users-api\""));
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! [`TranslatorConfig::from_env`] reads:
//!
//! - `XRAY_SEGMENT_INDEXED_ATTRIBUTES`: comma-separated attribute keys to index
//! - `XRAY_SEGMENT_INDEX_ALL_ATTRIBUTES`: `true` to index every scalar attribute
//! - `XRAY_SEGMENT_WRITER_POOL_SIZE`: number of pooled encode buffers (default 2048)

use thiserror::Error;

pub mod annotations;
pub mod aws;
pub mod cause;
pub mod config;
pub mod constants;
pub mod http;
pub mod name;
pub mod otlp;
pub mod pool;
pub mod sdk;
pub mod segment;
pub mod service;
pub mod span;
pub mod sql;
pub mod trace_id;
mod translator;
pub mod value;

pub use config::TranslatorConfig;
pub use name::fix_segment_name;
pub use otlp::TranslatedBatch;
pub use pool::{PooledWriter, WriterPool};
pub use segment::{AnnotationValue, Namespace, Segment, SegmentType};
pub use span::{Resource, Span, SpanEvent, SpanKind, Status, StatusCode};
pub use trace_id::convert_to_xray_trace_id;
pub use translator::{make_segment, SegmentTranslator};
pub use value::{attributes, AttributeMap, AttributeValue};

/// Errors that can occur while translating spans
#[derive(Error, Debug)]
pub enum TranslatorError {
    #[error("invalid xray traceid: {0}")]
    InvalidIdentifier(String),

    #[error("invalid span: {0}")]
    InvalidSpan(String),

    #[error("Failed to encode segment document: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Failed to decode OTLP payload: {0}")]
    Decode(#[from] prost::DecodeError),
}

/// Result type for translator operations
pub type Result<T> = std::result::Result<T, TranslatorError>;
