//! OpenTelemetry SDK input.
//!
//! Lets in-process exporters translate finished [`SpanData`] directly,
//! without going through OTLP.

use crate::span::{Resource, Span, SpanEvent, SpanKind, Status, StatusCode};
use crate::value::{AttributeMap, AttributeValue};
use opentelemetry::trace::{SpanKind as SdkSpanKind, Status as SdkStatus};
use opentelemetry::{Array, KeyValue, Value};
use opentelemetry_sdk::trace::SpanData;
use std::time::{SystemTime, UNIX_EPOCH};

impl From<&Value> for AttributeValue {
    fn from(value: &Value) -> Self {
        #[allow(unreachable_patterns)]
        match value {
            Value::Bool(b) => AttributeValue::Bool(*b),
            Value::I64(i) => AttributeValue::Int(*i),
            Value::F64(f) => AttributeValue::Double(*f),
            Value::String(s) => AttributeValue::String(s.as_str().to_string()),
            Value::Array(array) => AttributeValue::List(array_values(array)),
            _ => AttributeValue::Empty,
        }
    }
}

fn array_values(array: &Array) -> Vec<AttributeValue> {
    #[allow(unreachable_patterns)]
    match array {
        Array::Bool(values) => values.iter().map(|b| AttributeValue::Bool(*b)).collect(),
        Array::I64(values) => values.iter().map(|i| AttributeValue::Int(*i)).collect(),
        Array::F64(values) => values.iter().map(|f| AttributeValue::Double(*f)).collect(),
        Array::String(values) => values
            .iter()
            .map(|s| AttributeValue::String(s.as_str().to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

fn attributes_from_sdk(attributes: &[KeyValue]) -> AttributeMap {
    attributes
        .iter()
        .map(|kv| (kv.key.as_str().to_string(), AttributeValue::from(&kv.value)))
        .collect()
}

fn unix_nanos(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

impl From<&SdkSpanKind> for SpanKind {
    fn from(kind: &SdkSpanKind) -> Self {
        #[allow(unreachable_patterns)]
        match kind {
            SdkSpanKind::Client => SpanKind::Client,
            SdkSpanKind::Server => SpanKind::Server,
            SdkSpanKind::Producer => SpanKind::Producer,
            SdkSpanKind::Consumer => SpanKind::Consumer,
            SdkSpanKind::Internal => SpanKind::Internal,
            _ => SpanKind::Unspecified,
        }
    }
}

impl From<&SdkStatus> for Status {
    fn from(status: &SdkStatus) -> Self {
        #[allow(unreachable_patterns)]
        match status {
            SdkStatus::Unset => Status::default(),
            SdkStatus::Ok => Status::ok(),
            SdkStatus::Error { description } => Status {
                code: StatusCode::Error,
                message: description.to_string(),
            },
            _ => Status::default(),
        }
    }
}

impl From<&SpanData> for Span {
    fn from(data: &SpanData) -> Self {
        Span {
            trace_id: data.span_context.trace_id().to_bytes(),
            span_id: data.span_context.span_id().to_bytes(),
            parent_span_id: data.parent_span_id.to_bytes(),
            name: data.name.to_string(),
            kind: SpanKind::from(&data.span_kind),
            start_time_unix_nano: unix_nanos(data.start_time),
            end_time_unix_nano: unix_nanos(data.end_time),
            status: Status::from(&data.status),
            attributes: attributes_from_sdk(&data.attributes),
            events: data
                .events
                .events
                .iter()
                .map(|event| SpanEvent {
                    name: event.name.to_string(),
                    time_unix_nano: unix_nanos(event.timestamp),
                    attributes: attributes_from_sdk(&event.attributes),
                })
                .collect(),
        }
    }
}

impl From<&opentelemetry_sdk::Resource> for Resource {
    fn from(resource: &opentelemetry_sdk::Resource) -> Self {
        Resource::new(
            resource
                .iter()
                .map(|(key, value)| (key.as_str().to_string(), AttributeValue::from(value)))
                .collect(),
        )
    }
}
