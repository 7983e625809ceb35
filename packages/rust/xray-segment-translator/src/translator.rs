//! Span to segment translation.
//!
//! A span passes through the extractors in a fixed order, each one consuming
//! the attributes it understands and handing the rest to the next:
//!
//! 1. HTTP request/response fields ([`make_http`])
//! 2. error flags and cause ([`make_cause`])
//! 3. AWS metadata ([`make_aws`])
//! 4. service version ([`make_service`], resource only)
//! 5. SQL details ([`make_sql`])
//! 6. user, annotations and metadata from whatever is left
//!    ([`make_xray_attributes`])
//!
//! The name and namespace are resolved from the original span, and the
//! trace id is converted first so an unusable span fails before any work.

use crate::annotations::{make_xray_attributes, IndexPolicy, XRayAttributes};
use crate::aws::{determine_aws_origin, make_aws};
use crate::cause::{make_cause, CauseOutcome};
use crate::config::TranslatorConfig;
use crate::http::make_http;
use crate::name::{resolve_name, ResolvedName};
use crate::pool::WriterPool;
use crate::segment::{Segment, SegmentType};
use crate::service::make_service;
use crate::span::{Resource, Span, SpanKind};
use crate::sql::make_sql;
use crate::trace_id::convert_to_xray_trace_id;
use crate::Result;
use std::collections::HashSet;
use std::sync::Arc;

/// Translates spans into X-Ray segment documents.
///
/// The translator holds only immutable configuration and a handle to a
/// shared [`WriterPool`], so one instance can serve any number of threads.
///
/// # Examples
///
/// ```
/// use xray_segment_translator::{attributes, Resource, SegmentTranslator, Span, SpanKind, TranslatorConfig};
///
/// let now = std::time::SystemTime::now()
///     .duration_since(std::time::UNIX_EPOCH)
///     .unwrap()
///     .as_secs() as u32;
/// let mut trace_id = [7u8; 16];
/// trace_id[..4].copy_from_slice(&now.to_be_bytes());
///
/// let span = Span::builder()
///     .trace_id(trace_id)
///     .span_id([1, 2, 3, 4, 5, 6, 7, 8])
///     .name("GET /orders")
///     .kind(SpanKind::Server)
///     .attributes(attributes([("http.method", "GET".into())]))
///     .build();
/// let resource = Resource::new(attributes([("service.name", "orders".into())]));
///
/// let translator = SegmentTranslator::new(TranslatorConfig::default());
/// let segment = translator.make_segment(&span, &resource).unwrap();
/// assert_eq!(segment.name, "orders");
/// assert_eq!(segment.id, "0102030405060708");
/// ```
#[derive(Debug, Clone)]
pub struct SegmentTranslator {
    config: TranslatorConfig,
    indexed_keys: HashSet<String>,
    writer_pool: Arc<WriterPool>,
}

impl Default for SegmentTranslator {
    fn default() -> Self {
        Self::new(TranslatorConfig::default())
    }
}

impl SegmentTranslator {
    /// Creates a translator with its own writer pool sized from the config.
    pub fn new(config: TranslatorConfig) -> Self {
        let writer_pool = Arc::new(WriterPool::new(config.writer_pool_size));
        Self::with_writer_pool(config, writer_pool)
    }

    /// Creates a translator that encodes through an existing, shared pool.
    pub fn with_writer_pool(config: TranslatorConfig, writer_pool: Arc<WriterPool>) -> Self {
        Self {
            indexed_keys: config.indexed_set(),
            config,
            writer_pool,
        }
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    pub fn writer_pool(&self) -> &Arc<WriterPool> {
        &self.writer_pool
    }

    /// Builds the segment for a span.
    ///
    /// Fails only when the span's trace id cannot be expressed as an X-Ray
    /// trace id.
    pub fn make_segment(&self, span: &Span, resource: &Resource) -> Result<Segment> {
        build_segment(
            span,
            resource,
            IndexPolicy {
                indexed_keys: &self.indexed_keys,
                index_all: self.config.index_all_attributes,
            },
        )
    }

    /// Builds the segment for a span and encodes it as a JSON document.
    pub fn make_segment_document(&self, span: &Span, resource: &Resource) -> Result<String> {
        let segment = self.make_segment(span, resource)?;
        let mut writer = self.writer_pool.borrow();
        serde_json::to_writer(&mut *writer, &segment)?;
        Ok(String::from_utf8_lossy(&writer).into_owned())
    }
}

/// Builds the segment for a span without a long-lived translator.
pub fn make_segment(
    span: &Span,
    resource: &Resource,
    indexed_attributes: &[String],
    index_all_attributes: bool,
) -> Result<Segment> {
    let indexed_keys: HashSet<String> = indexed_attributes.iter().cloned().collect();
    build_segment(
        span,
        resource,
        IndexPolicy {
            indexed_keys: &indexed_keys,
            index_all: index_all_attributes,
        },
    )
}

fn build_segment(span: &Span, resource: &Resource, policy: IndexPolicy<'_>) -> Result<Segment> {
    let trace_id = convert_to_xray_trace_id(&span.trace_id)?;

    let is_subsegment = span.kind != SpanKind::Server && span.has_parent();
    // Resource attributes describe the whole service; only roots carry them.
    let store_resource = !is_subsegment;

    let (attributes, http) = make_http(span);
    let CauseOutcome {
        is_error,
        is_fault,
        is_throttle,
        filtered: attributes,
        cause,
    } = make_cause(span, attributes, resource);
    let origin = determine_aws_origin(resource);
    let (attributes, aws) = make_aws(attributes, resource);
    let service = make_service(resource);
    let (attributes, sql) = make_sql(attributes);
    let XRayAttributes {
        user,
        annotations,
        metadata,
    } = make_xray_attributes(attributes, resource, store_resource, policy);
    let ResolvedName {
        name, namespace, ..
    } = resolve_name(span, resource);

    let segment = Segment {
        name,
        id: hex::encode(span.span_id),
        start_time: nanos_to_seconds(span.start_time_unix_nano),
        trace_id,
        end_time: nanos_to_seconds(span.end_time_unix_nano),
        fault: is_fault,
        error: is_error,
        throttle: is_throttle,
        cause,
        origin: origin.map(str::to_string),
        parent_id: span.has_parent().then(|| hex::encode(span.parent_span_id)),
        user,
        aws,
        service,
        http,
        annotations,
        metadata,
        namespace,
        segment_type: is_subsegment.then_some(SegmentType::Subsegment),
        sql,
    };

    tracing::debug!(
        trace_id = %segment.trace_id,
        segment_id = %segment.id,
        name = %segment.name,
        subsegment = is_subsegment,
        "Built segment"
    );

    Ok(segment)
}

fn nanos_to_seconds(nanos: u64) -> f64 {
    nanos as f64 / 1e9
}
