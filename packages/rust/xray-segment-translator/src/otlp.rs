//! OTLP protobuf input.
//!
//! Converts OTLP trace messages into the translator's span model and
//! translates whole export requests, the shape in which collectors and
//! forwarders receive spans.

use crate::span::{Resource, Span, SpanEvent, SpanKind, Status, StatusCode};
use crate::translator::SegmentTranslator;
use crate::value::{AttributeMap, AttributeValue};
use crate::{Result, TranslatorError};
use opentelemetry_proto::tonic::{
    collector::trace::v1::ExportTraceServiceRequest,
    common::v1::{any_value, AnyValue, KeyValue},
    resource::v1::Resource as OtlpResource,
    trace::v1::{
        span::{Event as OtlpEvent, SpanKind as OtlpSpanKind},
        status::StatusCode as OtlpStatusCode,
        Span as OtlpSpan,
    },
};
use prost::Message;

impl From<&AnyValue> for AttributeValue {
    fn from(value: &AnyValue) -> Self {
        match &value.value {
            Some(any_value::Value::StringValue(s)) => AttributeValue::String(s.clone()),
            Some(any_value::Value::BoolValue(b)) => AttributeValue::Bool(*b),
            Some(any_value::Value::IntValue(i)) => AttributeValue::Int(*i),
            Some(any_value::Value::DoubleValue(d)) => AttributeValue::Double(*d),
            Some(any_value::Value::BytesValue(bytes)) => AttributeValue::Bytes(bytes.clone()),
            Some(any_value::Value::ArrayValue(array)) => {
                AttributeValue::List(array.values.iter().map(AttributeValue::from).collect())
            }
            Some(any_value::Value::KvlistValue(list)) => {
                AttributeValue::Map(attributes_from_otlp(&list.values))
            }
            None => AttributeValue::Empty,
        }
    }
}

/// Converts OTLP key-value pairs into an attribute map. Later duplicates win.
pub fn attributes_from_otlp(attributes: &[KeyValue]) -> AttributeMap {
    attributes
        .iter()
        .map(|kv| {
            let value = kv
                .value
                .as_ref()
                .map(AttributeValue::from)
                .unwrap_or_default();
            (kv.key.clone(), value)
        })
        .collect()
}

impl From<&OtlpResource> for Resource {
    fn from(resource: &OtlpResource) -> Self {
        Resource::new(attributes_from_otlp(&resource.attributes))
    }
}

impl From<&OtlpEvent> for SpanEvent {
    fn from(event: &OtlpEvent) -> Self {
        SpanEvent {
            name: event.name.clone(),
            time_unix_nano: event.time_unix_nano,
            attributes: attributes_from_otlp(&event.attributes),
        }
    }
}

impl TryFrom<&OtlpSpan> for Span {
    type Error = TranslatorError;

    fn try_from(span: &OtlpSpan) -> Result<Self> {
        let trace_id: [u8; 16] = span.trace_id.as_slice().try_into().map_err(|_| {
            TranslatorError::InvalidSpan(format!(
                "trace id must be 16 bytes, got {}",
                span.trace_id.len()
            ))
        })?;
        let span_id: [u8; 8] = span.span_id.as_slice().try_into().map_err(|_| {
            TranslatorError::InvalidSpan(format!(
                "span id must be 8 bytes, got {}",
                span.span_id.len()
            ))
        })?;
        let parent_span_id: [u8; 8] = if span.parent_span_id.is_empty() {
            [0; 8]
        } else {
            span.parent_span_id.as_slice().try_into().map_err(|_| {
                TranslatorError::InvalidSpan(format!(
                    "parent span id must be 8 bytes, got {}",
                    span.parent_span_id.len()
                ))
            })?
        };

        let kind = match OtlpSpanKind::try_from(span.kind).unwrap_or(OtlpSpanKind::Unspecified) {
            OtlpSpanKind::Unspecified => SpanKind::Unspecified,
            OtlpSpanKind::Internal => SpanKind::Internal,
            OtlpSpanKind::Server => SpanKind::Server,
            OtlpSpanKind::Client => SpanKind::Client,
            OtlpSpanKind::Producer => SpanKind::Producer,
            OtlpSpanKind::Consumer => SpanKind::Consumer,
        };

        let status = span
            .status
            .as_ref()
            .map(|status| Status {
                code: match OtlpStatusCode::try_from(status.code).unwrap_or(OtlpStatusCode::Unset)
                {
                    OtlpStatusCode::Unset => StatusCode::Unset,
                    OtlpStatusCode::Ok => StatusCode::Ok,
                    OtlpStatusCode::Error => StatusCode::Error,
                },
                message: status.message.clone(),
            })
            .unwrap_or_default();

        Ok(Span {
            trace_id,
            span_id,
            parent_span_id,
            name: span.name.clone(),
            kind,
            start_time_unix_nano: span.start_time_unix_nano,
            end_time_unix_nano: span.end_time_unix_nano,
            status,
            attributes: attributes_from_otlp(&span.attributes),
            events: span.events.iter().map(SpanEvent::from).collect(),
        })
    }
}

/// Segment documents produced from one export request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslatedBatch {
    /// JSON segment documents, in input order.
    pub documents: Vec<String>,
    /// Spans that could not be translated and were dropped.
    pub rejected: usize,
}

impl SegmentTranslator {
    /// Translates every span of an OTLP export request, each with the
    /// resource it was reported under.
    ///
    /// Spans that cannot be translated are logged and counted, never fatal
    /// to the rest of the batch.
    pub fn translate_request(&self, request: &ExportTraceServiceRequest) -> TranslatedBatch {
        let mut batch = TranslatedBatch::default();

        for resource_spans in &request.resource_spans {
            let resource = resource_spans
                .resource
                .as_ref()
                .map(Resource::from)
                .unwrap_or_default();

            for scope_spans in &resource_spans.scope_spans {
                for otlp_span in &scope_spans.spans {
                    let translated = Span::try_from(otlp_span)
                        .and_then(|span| self.make_segment_document(&span, &resource));
                    match translated {
                        Ok(document) => batch.documents.push(document),
                        Err(e) => {
                            tracing::warn!(
                                error = %e,
                                span_id = %hex::encode(&otlp_span.span_id),
                                span_name = %otlp_span.name,
                                "Dropping span that cannot be translated"
                            );
                            batch.rejected += 1;
                        }
                    }
                }
            }
        }

        tracing::debug!(
            translated = batch.documents.len(),
            rejected = batch.rejected,
            "Translated export request"
        );
        batch
    }

    /// Decodes a protobuf-encoded `ExportTraceServiceRequest` and translates it.
    pub fn translate_otlp_protobuf(&self, payload: &[u8]) -> Result<TranslatedBatch> {
        let request = ExportTraceServiceRequest::decode(payload)?;
        Ok(self.translate_request(&request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_proto::tonic::common::v1::{ArrayValue, KeyValueList};
    use opentelemetry_proto::tonic::trace::v1::{ResourceSpans, ScopeSpans, Status as OtlpStatus};
    use serde_json::Value;

    fn string_value(s: &str) -> AnyValue {
        AnyValue {
            value: Some(any_value::Value::StringValue(s.to_string())),
        }
    }

    fn kv(key: &str, value: AnyValue) -> KeyValue {
        KeyValue {
            key: key.to_string(),
            value: Some(value),
        }
    }

    fn fresh_trace_id() -> Vec<u8> {
        let now = chrono::Utc::now().timestamp() as u32;
        let mut id = now.to_be_bytes().to_vec();
        id.extend_from_slice(&[0xab; 12]);
        id
    }

    fn otlp_span(name: &str, kind: OtlpSpanKind) -> OtlpSpan {
        OtlpSpan {
            trace_id: fresh_trace_id(),
            span_id: vec![1, 2, 3, 4, 5, 6, 7, 8],
            name: name.to_string(),
            kind: kind as i32,
            start_time_unix_nano: 1_700_000_000_000_000_000,
            end_time_unix_nano: 1_700_000_000_250_000_000,
            ..Default::default()
        }
    }

    fn request(resource: OtlpResource, spans: Vec<OtlpSpan>) -> ExportTraceServiceRequest {
        ExportTraceServiceRequest {
            resource_spans: vec![ResourceSpans {
                resource: Some(resource),
                scope_spans: vec![ScopeSpans {
                    spans,
                    ..Default::default()
                }],
                ..Default::default()
            }],
        }
    }

    #[test]
    fn test_any_value_conversion() {
        let nested = AnyValue {
            value: Some(any_value::Value::KvlistValue(KeyValueList {
                values: vec![
                    kv("region", string_value("eu-west-1")),
                    kv(
                        "zones",
                        AnyValue {
                            value: Some(any_value::Value::ArrayValue(ArrayValue {
                                values: vec![string_value("a"), string_value("b")],
                            })),
                        },
                    ),
                ],
            })),
        };

        let converted = AttributeValue::from(&nested);
        let AttributeValue::Map(map) = converted else {
            panic!("expected map");
        };
        assert_eq!(map["region"], AttributeValue::from("eu-west-1"));
        assert_eq!(
            map["zones"],
            AttributeValue::List(vec!["a".into(), "b".into()])
        );

        assert_eq!(
            AttributeValue::from(&AnyValue { value: None }),
            AttributeValue::Empty
        );
        assert_eq!(
            AttributeValue::from(&AnyValue {
                value: Some(any_value::Value::IntValue(7))
            }),
            AttributeValue::Int(7)
        );
    }

    #[test]
    fn test_span_conversion() {
        let mut otlp = otlp_span("GET /", OtlpSpanKind::Server);
        otlp.parent_span_id = vec![9; 8];
        otlp.attributes = vec![kv("http.method", string_value("GET"))];
        otlp.status = Some(OtlpStatus {
            message: "boom".to_string(),
            code: OtlpStatusCode::Error as i32,
        });
        otlp.events = vec![OtlpEvent {
            name: "exception".to_string(),
            time_unix_nano: 5,
            attributes: vec![kv("exception.type", string_value("Error"))],
            ..Default::default()
        }];

        let span = Span::try_from(&otlp).unwrap();
        assert_eq!(span.kind, SpanKind::Server);
        assert_eq!(span.span_id, [1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(span.has_parent());
        assert_eq!(span.status, Status::error("boom"));
        assert_eq!(span.attribute("http.method"), Some(&AttributeValue::from("GET")));
        assert_eq!(span.events[0].name, "exception");
        assert_eq!(span.events[0].time_unix_nano, 5);
    }

    #[test]
    fn test_span_without_parent_or_status() {
        let span = Span::try_from(&otlp_span("job", OtlpSpanKind::Internal)).unwrap();
        assert!(!span.has_parent());
        assert_eq!(span.status.code, StatusCode::Unset);
        assert_eq!(span.kind, SpanKind::Internal);
    }

    #[test]
    fn test_malformed_ids_are_rejected() {
        let mut otlp = otlp_span("bad", OtlpSpanKind::Client);
        otlp.span_id = vec![1, 2, 3];
        assert!(matches!(
            Span::try_from(&otlp),
            Err(TranslatorError::InvalidSpan(_))
        ));

        let mut otlp = otlp_span("bad", OtlpSpanKind::Client);
        otlp.trace_id = vec![];
        assert!(matches!(
            Span::try_from(&otlp),
            Err(TranslatorError::InvalidSpan(_))
        ));
    }

    #[test]
    fn test_translate_request() {
        let resource = OtlpResource {
            attributes: vec![kv("service.name", string_value("payments"))],
            ..Default::default()
        };
        let mut stale = otlp_span("stale", OtlpSpanKind::Server);
        stale.trace_id = vec![0; 16];

        let batch = SegmentTranslator::default().translate_request(&request(
            resource,
            vec![
                otlp_span("charge", OtlpSpanKind::Server),
                stale,
                otlp_span("refund", OtlpSpanKind::Internal),
            ],
        ));

        assert_eq!(batch.rejected, 1);
        assert_eq!(batch.documents.len(), 2);
        let first: Value = serde_json::from_str(&batch.documents[0]).unwrap();
        let second: Value = serde_json::from_str(&batch.documents[1]).unwrap();
        assert_eq!(first["name"], "payments");
        assert_eq!(second["name"], "refund");
        assert_eq!(
            first["metadata"]["default"]["otel.resource.service.name"],
            "payments"
        );
    }

    #[test]
    fn test_translate_protobuf_payload() {
        let payload = request(
            OtlpResource::default(),
            vec![otlp_span("encode", OtlpSpanKind::Client)],
        )
        .encode_to_vec();

        let batch = SegmentTranslator::default()
            .translate_otlp_protobuf(&payload)
            .unwrap();
        assert_eq!(batch.rejected, 0);
        let document: Value = serde_json::from_str(&batch.documents[0]).unwrap();
        assert_eq!(document["name"], "encode");
        assert_eq!(document["id"], "0102030405060708");
    }

    #[test]
    fn test_invalid_protobuf_payload() {
        let result = SegmentTranslator::default().translate_otlp_protobuf(&[0xff, 0xff, 0xff]);
        assert!(matches!(result, Err(TranslatorError::Decode(_))));
    }
}
