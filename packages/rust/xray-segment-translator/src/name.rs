//! Segment name and namespace resolution.
//!
//! X-Ray segment names identify services, while OpenTelemetry span names
//! usually describe operations. The name is therefore taken from the first
//! rule in [`NAME_RULES`] that produces a value, falling back to the span
//! name only at the end. Whatever wins is sanitized against the characters
//! X-Ray accepts.

use crate::constants::attributes::*;
use crate::constants::defaults::{MAX_SEGMENT_NAME_LENGTH, SEGMENT_NAME};
use crate::segment::Namespace;
use crate::span::{Resource, Span, SpanKind};
use crate::value::AttributeValue;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Characters X-Ray rejects in segment names.
///
/// Letters are limited to cased and modifier letters; uncased scripts
/// (ideographs and the like, category `Lo`) are stripped.
static INVALID_NAME_CHARACTERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^ 0-9\p{Lu}\p{Ll}\p{Lt}\p{Lm}N_.:/%&#=+,\-@]")
        .expect("Invalid segment name pattern")
});

/// Where a resolved segment name came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameSource {
    PeerService,
    AwsService,
    Database,
    ServiceName,
    RpcService,
    HttpHost,
    NetPeerName,
    SpanName,
}

/// One step of the name cascade.
pub struct NameRule {
    pub source: NameSource,
    pub resolve: fn(&Span, &Resource) -> Option<String>,
}

/// The name cascade, in priority order. The first rule returning a value wins.
pub static NAME_RULES: &[NameRule] = &[
    // peer.service is what the user chose, so it always comes first.
    NameRule {
        source: NameSource::PeerService,
        resolve: |span, _| string_attribute(span, PEER_SERVICE),
    },
    // AWS SDK spans are named "Service.Method"; X-Ray expects just "Service".
    NameRule {
        source: NameSource::AwsService,
        resolve: |span, _| string_attribute(span, AWS_SERVICE),
    },
    NameRule {
        source: NameSource::Database,
        resolve: |span, _| database_name(span),
    },
    // The local service name only describes the span for server spans.
    NameRule {
        source: NameSource::ServiceName,
        resolve: |span, resource| {
            if span.kind != SpanKind::Server {
                return None;
            }
            resource
                .attribute(SERVICE_NAME)
                .and_then(AttributeValue::as_non_empty_str)
                .map(str::to_string)
        },
    },
    NameRule {
        source: NameSource::RpcService,
        resolve: |span, _| string_attribute(span, RPC_SERVICE),
    },
    NameRule {
        source: NameSource::HttpHost,
        resolve: |span, _| string_attribute(span, HTTP_HOST),
    },
    NameRule {
        source: NameSource::NetPeerName,
        resolve: |span, _| string_attribute(span, NET_PEER_NAME),
    },
    NameRule {
        source: NameSource::SpanName,
        resolve: |span, _| Some(span.name.clone()),
    },
];

/// Result of name resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    /// The sanitized segment name; never empty.
    pub name: String,
    pub source: NameSource,
    pub namespace: Option<Namespace>,
}

/// Resolves the segment name and namespace of a span.
pub fn resolve_name(span: &Span, resource: &Resource) -> ResolvedName {
    let (raw, source) = NAME_RULES
        .iter()
        .find_map(|rule| (rule.resolve)(span, resource).map(|name| (name, rule.source)))
        .unwrap_or_else(|| (span.name.clone(), NameSource::SpanName));

    ResolvedName {
        name: fix_segment_name(&raw),
        source,
        namespace: resolve_namespace(span, source),
    }
}

/// `aws` for AWS SDK calls, `remote` for other client spans, none otherwise.
fn resolve_namespace(span: &Span, source: NameSource) -> Option<Namespace> {
    let is_aws_api = span
        .attribute(RPC_SYSTEM)
        .and_then(AttributeValue::as_str)
        .is_some_and(|system| system == RPC_SYSTEM_AWS_API);

    if is_aws_api || source == NameSource::AwsService {
        Some(Namespace::Aws)
    } else if span.kind == SpanKind::Client {
        Some(Namespace::Remote)
    } else {
        None
    }
}

fn string_attribute(span: &Span, key: &str) -> Option<String> {
    span.attribute(key)
        .and_then(AttributeValue::as_non_empty_str)
        .map(str::to_string)
}

/// Database segments are named `<db name>@<db host>`, the host being taken
/// from the connection string when it parses as a URL.
fn database_name(span: &Span) -> Option<String> {
    let mut name = string_attribute(span, DB_NAME)?;
    let host = span
        .attribute(DB_CONNECTION_STRING)
        .and_then(AttributeValue::as_str)
        .and_then(|conn| Url::parse(conn).ok())
        .and_then(|url| url.host_str().map(str::to_string))
        .filter(|host| !host.is_empty());
    if let Some(host) = host {
        name.push('@');
        name.push_str(&host);
    }
    Some(name)
}

/// Removes characters X-Ray does not accept and enforces the length limit.
///
/// Returns `"span"` when nothing valid is left.
pub fn fix_segment_name(name: &str) -> String {
    let cleaned = INVALID_NAME_CHARACTERS.replace_all(name, "");
    let truncated: String = cleaned.chars().take(MAX_SEGMENT_NAME_LENGTH).collect();
    if truncated.is_empty() {
        SEGMENT_NAME.to_string()
    } else {
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{attributes, AttributeMap};

    fn span(kind: SpanKind, name: &str, attrs: AttributeMap) -> Span {
        Span::builder().kind(kind).name(name).attributes(attrs).build()
    }

    fn service_resource() -> Resource {
        Resource::new(attributes([(SERVICE_NAME, "checkout".into())]))
    }

    #[test]
    fn test_peer_service_wins() {
        let span = span(
            SpanKind::Client,
            "call",
            attributes([
                (PEER_SERVICE, "billing".into()),
                (AWS_SERVICE, "DynamoDB".into()),
                (HTTP_HOST, "billing.internal".into()),
            ]),
        );
        let resolved = resolve_name(&span, &service_resource());
        assert_eq!(resolved.name, "billing");
        assert_eq!(resolved.source, NameSource::PeerService);
        assert_eq!(resolved.namespace, Some(Namespace::Remote));
    }

    #[test]
    fn test_aws_service_sets_namespace() {
        let span = span(
            SpanKind::Client,
            "DynamoDB.GetItem",
            attributes([(AWS_SERVICE, "DynamoDB".into())]),
        );
        let resolved = resolve_name(&span, &Resource::default());
        assert_eq!(resolved.name, "DynamoDB");
        assert_eq!(resolved.namespace, Some(Namespace::Aws));
    }

    #[test]
    fn test_rpc_aws_api_sets_namespace_even_with_peer_service() {
        let span = span(
            SpanKind::Client,
            "S3.PutObject",
            attributes([
                (PEER_SERVICE, "uploads".into()),
                (RPC_SYSTEM, "aws-api".into()),
            ]),
        );
        let resolved = resolve_name(&span, &Resource::default());
        assert_eq!(resolved.name, "uploads");
        assert_eq!(resolved.namespace, Some(Namespace::Aws));
    }

    #[test]
    fn test_database_name_with_host() {
        let span = span(
            SpanKind::Client,
            "SELECT",
            attributes([
                (DB_NAME, "customers".into()),
                (
                    DB_CONNECTION_STRING,
                    "postgresql://db.example.com:5432/customers".into(),
                ),
            ]),
        );
        let resolved = resolve_name(&span, &Resource::default());
        assert_eq!(resolved.name, "customers@db.example.com");
        assert_eq!(resolved.source, NameSource::Database);
    }

    #[test]
    fn test_database_name_with_unparseable_connection_string() {
        let span = span(
            SpanKind::Client,
            "SELECT",
            attributes([
                (DB_NAME, "customers".into()),
                (DB_CONNECTION_STRING, "Server=db;Database=customers".into()),
            ]),
        );
        let resolved = resolve_name(&span, &Resource::default());
        assert_eq!(resolved.name, "customers");
    }

    #[test]
    fn test_service_name_only_for_server_spans() {
        let server = span(SpanKind::Server, "GET /", AttributeMap::new());
        let resolved = resolve_name(&server, &service_resource());
        assert_eq!(resolved.name, "checkout");
        assert_eq!(resolved.source, NameSource::ServiceName);
        assert_eq!(resolved.namespace, None);

        let internal = span(SpanKind::Internal, "compute", AttributeMap::new());
        let resolved = resolve_name(&internal, &service_resource());
        assert_eq!(resolved.name, "compute");
        assert_eq!(resolved.source, NameSource::SpanName);
    }

    #[test]
    fn test_remaining_cascade_order() {
        let rpc = span(
            SpanKind::Client,
            "x",
            attributes([
                (RPC_SERVICE, "Greeter".into()),
                (HTTP_HOST, "greeter.local".into()),
                (NET_PEER_NAME, "10.0.0.5".into()),
            ]),
        );
        assert_eq!(resolve_name(&rpc, &Resource::default()).name, "Greeter");

        let host = span(
            SpanKind::Client,
            "x",
            attributes([
                (HTTP_HOST, "greeter.local".into()),
                (NET_PEER_NAME, "10.0.0.5".into()),
            ]),
        );
        assert_eq!(resolve_name(&host, &Resource::default()).name, "greeter.local");

        let peer = span(
            SpanKind::Client,
            "x",
            attributes([(NET_PEER_NAME, "10.0.0.5".into())]),
        );
        let resolved = resolve_name(&peer, &Resource::default());
        assert_eq!(resolved.name, "10.0.0.5");
        assert_eq!(resolved.source, NameSource::NetPeerName);
    }

    #[test]
    fn test_empty_values_fall_through() {
        let span = span(
            SpanKind::Internal,
            "fallback",
            attributes([(PEER_SERVICE, "".into()), (HTTP_HOST, 42.into())]),
        );
        let resolved = resolve_name(&span, &Resource::default());
        assert_eq!(resolved.name, "fallback");
        assert_eq!(resolved.source, NameSource::SpanName);
    }

    #[test]
    fn test_fix_segment_name_strips_invalid_characters() {
        assert_eq!(fix_segment_name("GET /users/{id}"), "GET /users/id");
        assert_eq!(fix_segment_name("a*b?c!"), "abc");
        assert_eq!(fix_segment_name("café-über@host"), "café-über@host");
        assert_eq!(fix_segment_name("k=v&x+y,z#1%:"), "k=v&x+y,z#1%:");
    }

    #[test]
    fn test_fix_segment_name_fallback() {
        assert_eq!(fix_segment_name(""), "span");
        assert_eq!(fix_segment_name("日本語"), "span");
        assert_eq!(fix_segment_name("!!!"), "span");
    }

    #[test]
    fn test_fix_segment_name_truncates() {
        let long = "a".repeat(250);
        assert_eq!(fix_segment_name(&long).chars().count(), MAX_SEGMENT_NAME_LENGTH);

        let wide = "é".repeat(250);
        assert_eq!(fix_segment_name(&wide).chars().count(), MAX_SEGMENT_NAME_LENGTH);
    }

    #[test]
    fn test_fix_segment_name_is_idempotent() {
        for input in [
            "GET /users/{id}",
            "日本語 service",
            "",
            "normal-name",
            &"x?".repeat(300),
        ] {
            let once = fix_segment_name(input);
            assert_eq!(fix_segment_name(&once), once);
        }
    }

    #[test]
    fn test_resolved_name_is_always_valid() {
        let span = span(SpanKind::Server, "<<>>", AttributeMap::new());
        let resolved = resolve_name(&span, &Resource::default());
        assert_eq!(resolved.name, "span");
    }
}
