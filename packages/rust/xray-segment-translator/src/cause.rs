//! Error, fault and throttle flags plus the segment `cause` block.
//!
//! Only spans with an error status carry a cause. Exceptions come from
//! `exception` events when the span recorded any, parsing the stack trace in
//! the format of the producing SDK's language; otherwise the status message
//! (or `http.status_text`) becomes a single exception without a stack.

use crate::constants::attributes::*;
use crate::segment::{non_empty, Cause, CauseObject, Exception, StackFrame};
use crate::span::{Resource, Span, SpanEvent, StatusCode};
use crate::value::{AttributeMap, AttributeValue};

/// What the cause extractor decided for a span.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CauseOutcome {
    pub is_error: bool,
    pub is_fault: bool,
    pub is_throttle: bool,
    /// Attributes left after removing those consumed here.
    pub filtered: AttributeMap,
    pub cause: Option<Cause>,
}

/// Derives the error flags and cause of a span.
pub fn make_cause(span: &Span, mut attributes: AttributeMap, resource: &Resource) -> CauseOutcome {
    if span.status.code != StatusCode::Error {
        return CauseOutcome {
            filtered: attributes,
            ..Default::default()
        };
    }

    let language = resource.attribute_str(TELEMETRY_SDK_LANGUAGE).unwrap_or("");
    let mut exceptions = Vec::new();
    let mut has_exception_events = false;

    for event in span.events.iter().filter(|e| e.name == EXCEPTION_EVENT_NAME) {
        has_exception_events = true;
        exceptions.extend(parse_exception(
            event_text(event, EXCEPTION_TYPE),
            event_text(event, EXCEPTION_MESSAGE),
            event_text(event, EXCEPTION_STACKTRACE),
            language,
        ));
    }

    if !has_exception_events {
        let status_text = attributes
            .shift_remove(HTTP_STATUS_TEXT)
            .and_then(|v| v.as_str().map(str::to_string));
        let message = if span.status.message.is_empty() {
            status_text.unwrap_or_default()
        } else {
            span.status.message.clone()
        };
        if !message.is_empty() {
            exceptions.push(Exception {
                id: Some(new_exception_id()),
                message: Some(message),
                ..Default::default()
            });
        }
    }

    let (is_error, is_fault, is_throttle) = classify_status(span);

    let cause = (!exceptions.is_empty()).then(|| {
        Cause::Object(CauseObject {
            exceptions,
            ..Default::default()
        })
    });

    CauseOutcome {
        is_error,
        is_fault,
        is_throttle,
        filtered: attributes,
        cause,
    }
}

/// 4xx is a client error (429 is also a throttle); anything else is a fault.
fn classify_status(span: &Span) -> (bool, bool, bool) {
    match span
        .attribute(HTTP_STATUS_CODE)
        .and_then(AttributeValue::as_i64_lenient)
    {
        Some(code @ 400..=499) => (true, false, code == 429),
        _ => (false, true, false),
    }
}

fn event_text<'a>(event: &'a SpanEvent, key: &str) -> &'a str {
    event
        .attributes
        .get(key)
        .and_then(AttributeValue::as_str)
        .unwrap_or("")
}

fn new_exception_id() -> String {
    format!("{:016x}", rand::random::<u64>())
}

/// Parses one recorded exception into X-Ray exceptions. Chained causes found
/// in the stack trace are returned after the exception they caused.
pub fn parse_exception(
    exception_type: &str,
    message: &str,
    stacktrace: &str,
    language: &str,
) -> Vec<Exception> {
    let top = Exception {
        id: Some(new_exception_id()),
        exception_type: non_empty(exception_type),
        message: non_empty(message),
        ..Default::default()
    };

    if stacktrace.is_empty() {
        return vec![top];
    }

    match language {
        "java" => parse_java_stacktrace(top, stacktrace),
        "python" => parse_python_stacktrace(top, stacktrace),
        "javascript" | "nodejs" => parse_javascript_stacktrace(top, stacktrace),
        _ => vec![top],
    }
}

/// Splits `Type: message` as printed by Java and Python.
fn split_type_and_message(line: &str) -> (Option<String>, Option<String>) {
    match line.split_once(": ") {
        Some((ty, msg)) => (non_empty(ty.trim()), non_empty(msg.trim())),
        None => (non_empty(line.trim()), None),
    }
}

/// Appends `next` to the chain, linking the previous exception to it.
fn push_cause(exceptions: &mut Vec<Exception>, mut next: Exception) {
    let id = new_exception_id();
    if let Some(previous) = exceptions.last_mut() {
        previous.cause = Some(id.clone());
    }
    next.id = Some(id);
    exceptions.push(next);
}

/// ```text
/// java.lang.IllegalStateException: outer
///     at com.example.Service.run(Service.java:42)
/// Caused by: java.io.IOException: inner
///     at com.example.Io.read(Io.java:7)
///     ... 3 more
/// ```
fn parse_java_stacktrace(top: Exception, stacktrace: &str) -> Vec<Exception> {
    let mut exceptions = vec![top];

    // The first line repeats the exception type and message.
    for line in stacktrace.lines().skip(1) {
        let line = line.trim();
        if let Some(frame) = line.strip_prefix("at ") {
            if let Some(current) = exceptions.last_mut() {
                current.stack.push(parse_java_frame(frame));
            }
        } else if let Some(caused_by) = line.strip_prefix("Caused by: ") {
            let (exception_type, message) = split_type_and_message(caused_by);
            push_cause(
                &mut exceptions,
                Exception {
                    exception_type,
                    message,
                    ..Default::default()
                },
            );
        }
    }

    exceptions
}

/// `label(path:line)`; the location may also be `Native Method` or `Unknown Source`.
fn parse_java_frame(frame: &str) -> StackFrame {
    let Some((label, rest)) = frame.split_once('(') else {
        return StackFrame {
            label: non_empty(frame),
            ..Default::default()
        };
    };
    let location = rest.trim_end_matches(')');
    let (path, line) = match location.rsplit_once(':') {
        Some((path, line)) => match line.parse::<i64>() {
            Ok(line) => (path, Some(line)),
            Err(_) => (location, None),
        },
        None => (location, None),
    };
    StackFrame {
        path: non_empty(path),
        line,
        label: non_empty(label),
    }
}

/// Python prints chained exceptions oldest first, separated by one of these lines.
const PYTHON_CHAIN_SEPARATORS: [&str; 2] = [
    "The above exception was the direct cause of the following exception:",
    "During handling of the above exception, another exception occurred:",
];

/// ```text
/// Traceback (most recent call last):
///   File "app.py", line 10, in handler
///     process()
/// ValueError: bad input
/// ```
fn parse_python_stacktrace(top: Exception, stacktrace: &str) -> Vec<Exception> {
    let mut blocks: Vec<Vec<&str>> = vec![Vec::new()];
    for line in stacktrace.lines() {
        if PYTHON_CHAIN_SEPARATORS.contains(&line.trim()) {
            blocks.push(Vec::new());
        } else if let Some(block) = blocks.last_mut() {
            block.push(line);
        }
    }

    let mut exceptions: Vec<Exception> = Vec::new();
    // Newest block first; it is the exception that was recorded.
    for (index, block) in blocks.iter().rev().enumerate() {
        let mut frames: Vec<StackFrame> = block
            .iter()
            .filter_map(|line| parse_python_frame(line.trim()))
            .collect();
        // Tracebacks list the innermost call last.
        frames.reverse();

        if index == 0 {
            let mut recorded = top.clone();
            recorded.stack = frames;
            exceptions.push(recorded);
            continue;
        }

        let header = block
            .iter()
            .rev()
            .map(|line| line.trim())
            .find(|line| !line.is_empty());
        let (exception_type, message) = header.map(split_type_and_message).unwrap_or_default();
        push_cause(
            &mut exceptions,
            Exception {
                exception_type,
                message,
                stack: frames,
                ..Default::default()
            },
        );
    }

    exceptions
}

/// `File "path", line N, in label`
fn parse_python_frame(line: &str) -> Option<StackFrame> {
    let rest = line.strip_prefix("File \"")?;
    let (path, rest) = rest.split_once('"')?;
    let mut frame = StackFrame {
        path: non_empty(path),
        ..Default::default()
    };
    for part in rest.split(", ").map(str::trim) {
        if let Some(line) = part.strip_prefix("line ") {
            frame.line = line.trim_end_matches(',').parse().ok();
        } else if let Some(label) = part.strip_prefix("in ") {
            frame.label = non_empty(label);
        }
    }
    Some(frame)
}

/// ```text
/// Error: boom
///     at handler (/var/task/index.js:10:15)
///     at /var/task/index.js:20:3
/// ```
fn parse_javascript_stacktrace(mut top: Exception, stacktrace: &str) -> Vec<Exception> {
    top.stack = stacktrace
        .lines()
        .filter_map(|line| line.trim().strip_prefix("at "))
        .map(parse_javascript_frame)
        .collect();
    vec![top]
}

fn parse_javascript_frame(frame: &str) -> StackFrame {
    let (label, location) = match frame.strip_suffix(')').and_then(|f| f.split_once(" (")) {
        Some((label, location)) => (label, location),
        None => ("", frame),
    };

    // path:line:column
    let (path, line) = match location.rsplitn(3, ':').collect::<Vec<_>>().as_slice() {
        [_column, line, path] => match line.parse::<i64>() {
            Ok(line) => (*path, Some(line)),
            Err(_) => (location, None),
        },
        _ => (location, None),
    };

    StackFrame {
        path: non_empty(path),
        line,
        label: non_empty(label),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Status;
    use crate::value::attributes;

    fn error_span(status_code: Option<AttributeValue>, message: &str) -> Span {
        let mut attrs = AttributeMap::new();
        if let Some(code) = status_code {
            attrs.insert(HTTP_STATUS_CODE.to_string(), code);
        }
        Span::builder()
            .status(Status::error(message))
            .attributes(attrs)
            .build()
    }

    fn language(lang: &str) -> Resource {
        Resource::new(attributes([(TELEMETRY_SDK_LANGUAGE, lang.into())]))
    }

    fn exceptions(outcome: &CauseOutcome) -> &[Exception] {
        match &outcome.cause {
            Some(Cause::Object(obj)) => &obj.exceptions,
            other => panic!("expected cause object, got {other:?}"),
        }
    }

    #[test]
    fn test_ok_span_has_no_cause() {
        let span = Span::builder()
            .status(Status::ok())
            .attributes(attributes([(HTTP_STATUS_TEXT, "OK".into())]))
            .build();
        let outcome = make_cause(&span, span.attributes.clone(), &Resource::default());
        assert!(!outcome.is_error && !outcome.is_fault && !outcome.is_throttle);
        assert!(outcome.cause.is_none());
        assert!(outcome.filtered.contains_key(HTTP_STATUS_TEXT));
    }

    #[test]
    fn test_status_code_flags() {
        let cases = [
            (Some(404.into()), (true, false, false)),
            (Some(429.into()), (true, false, true)),
            (Some(503.into()), (false, true, false)),
            (Some("503".into()), (false, true, false)),
            (Some("404".into()), (true, false, false)),
            (Some(302.into()), (false, true, false)),
            (None, (false, true, false)),
        ];
        for (code, expected) in cases {
            let span = error_span(code.clone(), "failed");
            let outcome = make_cause(&span, AttributeMap::new(), &Resource::default());
            assert_eq!(
                (outcome.is_error, outcome.is_fault, outcome.is_throttle),
                expected,
                "status code {code:?}"
            );
        }
    }

    #[test]
    fn test_status_message_becomes_exception() {
        let span = error_span(None, "connection refused");
        let outcome = make_cause(&span, AttributeMap::new(), &Resource::default());
        let exceptions = exceptions(&outcome);
        assert_eq!(exceptions.len(), 1);
        assert_eq!(exceptions[0].message.as_deref(), Some("connection refused"));
        assert_eq!(exceptions[0].id.as_ref().map(String::len), Some(16));
    }

    #[test]
    fn test_status_text_fallback_is_consumed() {
        let span = error_span(Some(500.into()), "");
        let attrs = attributes([
            (HTTP_STATUS_TEXT, "Internal Server Error".into()),
            ("keep", "me".into()),
        ]);
        let outcome = make_cause(&span, attrs, &Resource::default());
        assert_eq!(
            exceptions(&outcome)[0].message.as_deref(),
            Some("Internal Server Error")
        );
        assert!(!outcome.filtered.contains_key(HTTP_STATUS_TEXT));
        assert!(outcome.filtered.contains_key("keep"));
    }

    #[test]
    fn test_error_without_message_has_no_cause() {
        let span = error_span(Some(500.into()), "");
        let outcome = make_cause(&span, AttributeMap::new(), &Resource::default());
        assert!(outcome.is_fault);
        assert!(outcome.cause.is_none());
    }

    fn exception_event(ty: &str, message: &str, stack: &str) -> SpanEvent {
        SpanEvent::builder()
            .name(EXCEPTION_EVENT_NAME)
            .attributes(attributes([
                (EXCEPTION_TYPE, ty.into()),
                (EXCEPTION_MESSAGE, message.into()),
                (EXCEPTION_STACKTRACE, stack.into()),
            ]))
            .build()
    }

    #[test]
    fn test_java_exception_chain() {
        let stack = "java.lang.IllegalStateException: outer\n\
                     \tat com.example.Service.run(Service.java:42)\n\
                     \tat java.base/java.lang.Thread.run(Native Method)\n\
                     Caused by: java.io.IOException: inner\n\
                     \tat com.example.Io.read(Io.java:7)\n\
                     \t... 3 more";
        let span = Span::builder()
            .status(Status::error("outer"))
            .events(vec![exception_event(
                "java.lang.IllegalStateException",
                "outer",
                stack,
            )])
            .build();

        let outcome = make_cause(&span, AttributeMap::new(), &language("java"));
        let exceptions = exceptions(&outcome);
        assert_eq!(exceptions.len(), 2);

        let outer = &exceptions[0];
        assert_eq!(
            outer.exception_type.as_deref(),
            Some("java.lang.IllegalStateException")
        );
        assert_eq!(outer.stack.len(), 2);
        assert_eq!(outer.stack[0].path.as_deref(), Some("Service.java"));
        assert_eq!(outer.stack[0].line, Some(42));
        assert_eq!(
            outer.stack[0].label.as_deref(),
            Some("com.example.Service.run")
        );
        assert_eq!(outer.stack[1].path.as_deref(), Some("Native Method"));
        assert_eq!(outer.stack[1].line, None);

        let inner = &exceptions[1];
        assert_eq!(inner.exception_type.as_deref(), Some("java.io.IOException"));
        assert_eq!(inner.message.as_deref(), Some("inner"));
        assert_eq!(inner.stack.len(), 1);
        assert_eq!(outer.cause, inner.id);
    }

    #[test]
    fn test_python_traceback() {
        let stack = "Traceback (most recent call last):\n  \
                     File \"/var/task/app.py\", line 10, in handler\n    \
                     process()\n  \
                     File \"/var/task/lib.py\", line 3, in process\n    \
                     raise ValueError(\"bad input\")\n\
                     ValueError: bad input";
        let exceptions = parse_exception("ValueError", "bad input", stack, "python");
        assert_eq!(exceptions.len(), 1);
        let frames = &exceptions[0].stack;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].path.as_deref(), Some("/var/task/lib.py"));
        assert_eq!(frames[0].line, Some(3));
        assert_eq!(frames[0].label.as_deref(), Some("process"));
        assert_eq!(frames[1].label.as_deref(), Some("handler"));
    }

    #[test]
    fn test_python_chained_traceback() {
        let stack = "Traceback (most recent call last):\n  \
                     File \"db.py\", line 5, in connect\n\
                     ConnectionError: refused\n\
                     \n\
                     The above exception was the direct cause of the following exception:\n\
                     \n\
                     Traceback (most recent call last):\n  \
                     File \"app.py\", line 9, in handler\n\
                     RuntimeError: startup failed";
        let exceptions = parse_exception("RuntimeError", "startup failed", stack, "python");
        assert_eq!(exceptions.len(), 2);
        assert_eq!(exceptions[0].exception_type.as_deref(), Some("RuntimeError"));
        assert_eq!(exceptions[0].stack[0].path.as_deref(), Some("app.py"));
        assert_eq!(exceptions[1].exception_type.as_deref(), Some("ConnectionError"));
        assert_eq!(exceptions[1].message.as_deref(), Some("refused"));
        assert_eq!(exceptions[1].stack[0].line, Some(5));
        assert_eq!(exceptions[0].cause, exceptions[1].id);
    }

    #[test]
    fn test_javascript_stack() {
        let stack = "Error: boom\n    \
                     at handler (/var/task/index.js:10:15)\n    \
                     at /var/task/index.js:20:3\n    \
                     at Module._compile (node:internal/modules/cjs/loader:1105:14)";
        let exceptions = parse_exception("Error", "boom", stack, "nodejs");
        let frames = &exceptions[0].stack;
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].label.as_deref(), Some("handler"));
        assert_eq!(frames[0].path.as_deref(), Some("/var/task/index.js"));
        assert_eq!(frames[0].line, Some(10));
        assert_eq!(frames[1].label, None);
        assert_eq!(frames[1].line, Some(20));
        assert_eq!(
            frames[2].path.as_deref(),
            Some("node:internal/modules/cjs/loader")
        );
    }

    #[test]
    fn test_unknown_language_keeps_type_and_message() {
        let exceptions = parse_exception("panic", "index out of bounds", "frame 0\nframe 1", "rust");
        assert_eq!(exceptions.len(), 1);
        assert_eq!(exceptions[0].exception_type.as_deref(), Some("panic"));
        assert!(exceptions[0].stack.is_empty());
    }

    #[test]
    fn test_exception_events_take_precedence_over_status_text() {
        let span = Span::builder()
            .status(Status::error("ignored"))
            .events(vec![exception_event("Error", "boom", "")])
            .build();
        let attrs = attributes([(HTTP_STATUS_TEXT, "Bad Gateway".into())]);
        let outcome = make_cause(&span, attrs, &Resource::default());
        let exceptions = exceptions(&outcome);
        assert_eq!(exceptions.len(), 1);
        assert_eq!(exceptions[0].message.as_deref(), Some("boom"));
        assert!(outcome.filtered.contains_key(HTTP_STATUS_TEXT));
    }
}
