//! Extraction of the X-Ray `http` block from span attributes.
//!
//! HTTP semantic-convention attributes are pulled out of the span in a single
//! pass. Each attribute lands in exactly one place: the request/response
//! block, a side table of URL fragments, or the residual map handed on to
//! the next stage.
//!
//! When the span does not carry a full `http.url`, the URL is rebuilt from
//! its fragments following the OpenTelemetry HTTP conventions, with separate
//! host and port sources for server and client spans.

use crate::constants::attributes::*;
use crate::segment::{HttpData, RequestData, ResponseData};
use crate::span::{Span, SpanKind};
use crate::value::{AttributeMap, AttributeValue};
use std::collections::HashMap;

/// Splits the span attributes into the X-Ray `http` block and the residue.
///
/// Returns the span's attributes untouched and no block when the span has no
/// HTTP attributes at all.
pub fn make_http(span: &Span) -> (AttributeMap, Option<HttpData>) {
    let mut request = RequestData::default();
    let mut response = ResponseData::default();
    let mut filtered = AttributeMap::with_capacity(span.attributes.len());
    let mut url_parts: HashMap<&'static str, String> = HashMap::new();
    let mut peer_ip = None;

    let mut has_http = false;
    let mut has_url_attributes = false;

    for (key, value) in &span.attributes {
        match key.as_str() {
            HTTP_METHOD => {
                request.method = value.as_str().map(str::to_string);
                has_http = true;
            }
            HTTP_CLIENT_IP => {
                request.client_ip = value.as_str().map(str::to_string);
                request.x_forwarded_for = Some(true);
                has_http = true;
            }
            HTTP_USER_AGENT => {
                request.user_agent = value.as_str().map(str::to_string);
                has_http = true;
            }
            HTTP_STATUS_CODE => {
                response.status = value.as_i64_lenient();
                has_http = true;
            }
            HTTP_URL => {
                insert_part(&mut url_parts, HTTP_URL, value);
                has_http = true;
                has_url_attributes = true;
            }
            HTTP_SCHEME => {
                insert_part(&mut url_parts, HTTP_SCHEME, value);
                has_http = true;
            }
            HTTP_HOST => {
                insert_part(&mut url_parts, HTTP_HOST, value);
                has_http = true;
                has_url_attributes = true;
            }
            HTTP_TARGET => {
                insert_part(&mut url_parts, HTTP_TARGET, value);
                has_http = true;
            }
            HTTP_SERVER_NAME => {
                insert_part(&mut url_parts, HTTP_SERVER_NAME, value);
                has_http = true;
                has_url_attributes = true;
            }
            NET_HOST_PORT => {
                insert_part(&mut url_parts, NET_HOST_PORT, value);
                has_http = true;
            }
            HOST_NAME => {
                insert_part(&mut url_parts, HOST_NAME, value);
                has_url_attributes = true;
            }
            NET_HOST_NAME => {
                insert_part(&mut url_parts, NET_HOST_NAME, value);
                has_url_attributes = true;
            }
            NET_PEER_NAME => {
                insert_part(&mut url_parts, NET_PEER_NAME, value);
                has_url_attributes = true;
            }
            NET_PEER_PORT => {
                insert_part(&mut url_parts, NET_PEER_PORT, value);
            }
            NET_PEER_IP => {
                peer_ip = value.as_str().map(str::to_string);
                insert_part(&mut url_parts, NET_PEER_IP, value);
                has_url_attributes = true;
            }
            _ => {
                filtered.insert(key.clone(), value.clone());
            }
        }
    }

    if !has_http {
        // Network attributes alone do not make an HTTP span.
        return (span.attributes.clone(), None);
    }

    // An explicit client IP (forwarded information) wins over the peer address.
    if request.client_ip.is_none() {
        request.client_ip = peer_ip;
    }

    if has_url_attributes {
        let url = if span.kind == SpanKind::Server {
            construct_server_url(&url_parts)
        } else {
            construct_client_url(&url_parts)
        };
        request.url = Some(url);
    }

    response.content_length = extract_response_size(span);

    (
        filtered,
        Some(HttpData {
            request: Some(request),
            response: Some(response),
        }),
    )
}

fn insert_part(parts: &mut HashMap<&'static str, String>, key: &'static str, value: &AttributeValue) {
    if let Some(text) = value.to_text() {
        parts.insert(key, text);
    }
}

/// Reads the response payload size, preferring the span's own attributes and
/// falling back to the first received-message event that records one.
fn extract_response_size(span: &Span) -> Option<i64> {
    response_size_from_attributes(&span.attributes).or_else(|| {
        span.events
            .iter()
            .find_map(|event| response_size_from_attributes(&event.attributes))
    })
}

fn response_size_from_attributes(attributes: &AttributeMap) -> Option<i64> {
    let is_received = attributes
        .get(MESSAGE_TYPE)
        .and_then(AttributeValue::as_str)
        .is_some_and(|t| t == MESSAGE_TYPE_RECEIVED);
    if !is_received {
        return None;
    }
    attributes
        .get(MESSAGING_PAYLOAD_SIZE)
        .and_then(AttributeValue::as_i64_lenient)
}

/// Builds the request URL of a client span.
///
/// See <https://github.com/open-telemetry/opentelemetry-specification/blob/main/specification/trace/semantic_conventions/http.md#http-client>
fn construct_client_url(parts: &HashMap<&'static str, String>) -> String {
    if let Some(url) = parts.get(HTTP_URL) {
        return url.clone();
    }

    let (host, port) = match parts.get(HTTP_HOST) {
        Some(host) => (host.as_str(), ""),
        None => (
            parts
                .get(NET_PEER_NAME)
                .or_else(|| parts.get(NET_PEER_IP))
                .map(String::as_str)
                .unwrap_or_default(),
            parts.get(NET_PEER_PORT).map(String::as_str).unwrap_or_default(),
        ),
    };
    assemble_url(parts, host, port)
}

/// Builds the request URL of a server span.
///
/// See <https://github.com/open-telemetry/opentelemetry-specification/blob/main/specification/trace/semantic_conventions/http.md#http-server-semantic-conventions>
fn construct_server_url(parts: &HashMap<&'static str, String>) -> String {
    if let Some(url) = parts.get(HTTP_URL) {
        return url.clone();
    }

    let (host, port) = match parts.get(HTTP_HOST) {
        Some(host) => (host.as_str(), ""),
        None => (
            parts
                .get(HTTP_SERVER_NAME)
                .or_else(|| parts.get(NET_HOST_NAME))
                .or_else(|| parts.get(HOST_NAME))
                .map(String::as_str)
                .unwrap_or_default(),
            parts.get(NET_HOST_PORT).map(String::as_str).unwrap_or_default(),
        ),
    };
    assemble_url(parts, host, port)
}

fn assemble_url(parts: &HashMap<&'static str, String>, host: &str, port: &str) -> String {
    let scheme = parts.get(HTTP_SCHEME).map(String::as_str).unwrap_or("http");

    let mut url = format!("{scheme}://{host}");
    if !port.is_empty() && !is_default_port(scheme, port) {
        url.push(':');
        url.push_str(port);
    }
    match parts.get(HTTP_TARGET) {
        Some(target) => url.push_str(target),
        None => url.push('/'),
    }
    url
}

/// Only http/80 and https/443 are treated as defaults.
fn is_default_port(scheme: &str, port: &str) -> bool {
    matches!((scheme, port), ("http", "80") | ("https", "443"))
}
