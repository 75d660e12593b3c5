//! Distributed trace context and the tracer seam used by both services.
//!
//! The orchestrators only talk to [`Tracer`]: start a span, inject the
//! context into outbound headers, extract it from inbound headers.
//! Production uses [`otel::OtelTracer`]; tests use
//! [`recording::RecordingTracer`] to assert span parentage.

pub mod otel;
pub mod recording;

use http::HeaderMap;
use std::collections::BTreeMap;

/// W3C Trace Context header name
pub const TRACEPARENT: &str = "traceparent";

/// W3C Baggage header name
pub const BAGGAGE: &str = "baggage";

/// 跨服務傳遞的追蹤上下文
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TraceContext {
    /// 32 lowercase hex characters
    pub trace_id: String,
    /// 16 lowercase hex characters
    pub span_id: String,
    pub sampled: bool,
    pub baggage: BTreeMap<String, String>,
}

impl TraceContext {
    /// Child context in the same trace, keeping sampling and baggage.
    pub fn child(&self, span_id: String) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            span_id,
            sampled: self.sampled,
            baggage: self.baggage.clone(),
        }
    }
}

/// Tracing subsystem used by the orchestrators.
pub trait Tracer: Send + Sync {
    /// Opens a span, child of `parent` when given, a new trace otherwise.
    fn start_span(&self, name: &'static str, parent: Option<&TraceContext>) -> ActiveSpan;

    /// Writes `context` into outbound request headers.
    fn inject(&self, context: &TraceContext, headers: &mut HeaderMap);

    /// Reads a remote context from inbound request headers.
    fn extract(&self, headers: &HeaderMap) -> Option<TraceContext>;
}

/// Backend-specific half of an open span.
pub trait SpanHandle: Send + Sync {
    fn record_error(&mut self, _message: &str) {}

    fn end(&mut self);
}

/// 開啟中的 span，離開作用域時一定會結束
///
/// A span dropped before [`ActiveSpan::end`] or [`ActiveSpan::record_error`]
/// was reached belongs to an aborted future and is marked as cancelled.
pub struct ActiveSpan {
    context: TraceContext,
    handle: Option<Box<dyn SpanHandle>>,
    settled: bool,
}

/// Error recorded on spans whose work was dropped mid-flight.
pub const CANCELLED: &str = "cancelled";

impl ActiveSpan {
    pub fn new(context: TraceContext, handle: Box<dyn SpanHandle>) -> Self {
        Self {
            context,
            handle: Some(handle),
            settled: false,
        }
    }

    pub fn context(&self) -> &TraceContext {
        &self.context
    }

    pub fn record_error(&mut self, message: &str) {
        self.settled = true;
        if let Some(handle) = self.handle.as_mut() {
            handle.record_error(message);
        }
    }

    /// Ends the span as finished work.
    pub fn end(mut self) {
        self.settled = true;
        self.finish();
    }

    fn finish(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            if !self.settled {
                handle.record_error(CANCELLED);
            }
            handle.end();
        }
    }
}

impl Drop for ActiveSpan {
    fn drop(&mut self) {
        self.finish();
    }
}

impl std::fmt::Debug for ActiveSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveSpan")
            .field("context", &self.context)
            .field("open", &self.handle.is_some())
            .field("settled", &self.settled)
            .finish()
    }
}

/// Extract traceparent header value from HTTP headers
pub fn get_traceparent(headers: &HeaderMap) -> Option<&str> {
    headers.get(TRACEPARENT)?.to_str().ok()
}

/// Format `00-{trace_id}-{span_id}-{flags}`
pub fn format_traceparent(context: &TraceContext) -> String {
    let flags = if context.sampled { "01" } else { "00" };
    format!("00-{}-{}-{}", context.trace_id, context.span_id, flags)
}

fn is_lower_hex(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Parse a version-00 traceparent. All-zero ids are invalid.
pub fn parse_traceparent(value: &str) -> Option<TraceContext> {
    let parts: Vec<&str> = value.trim().split('-').collect();
    if parts.len() != 4 || parts[0] != "00" {
        return None;
    }

    let (trace_id, span_id, flags) = (parts[1], parts[2], parts[3]);
    if !is_lower_hex(trace_id, 32) || !is_lower_hex(span_id, 16) || !is_lower_hex(flags, 2) {
        return None;
    }
    if trace_id.bytes().all(|b| b == b'0') || span_id.bytes().all(|b| b == b'0') {
        return None;
    }

    let flags = u8::from_str_radix(flags, 16).ok()?;
    Some(TraceContext {
        trace_id: trace_id.to_string(),
        span_id: span_id.to_string(),
        sampled: flags & 0x01 == 0x01,
        baggage: BTreeMap::new(),
    })
}

/// Format baggage as `k1=v1,k2=v2`
pub fn format_baggage(baggage: &BTreeMap<String, String>) -> Option<String> {
    if baggage.is_empty() {
        return None;
    }
    Some(
        baggage
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(","),
    )
}

/// Parse a baggage header, dropping member properties and malformed entries.
pub fn parse_baggage(value: &str) -> BTreeMap<String, String> {
    value
        .split(',')
        .filter_map(|member| {
            let member = member.split(';').next()?.trim();
            let (k, v) = member.split_once('=')?;
            let k = k.trim();
            if k.is_empty() {
                return None;
            }
            Some((k.to_string(), v.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

    #[test]
    fn test_get_traceparent_none() {
        let headers = HeaderMap::new();
        assert!(get_traceparent(&headers).is_none());
    }

    #[test]
    fn test_get_traceparent_ok() {
        let mut headers = HeaderMap::new();
        headers.insert(TRACEPARENT, SAMPLE.parse().unwrap());
        assert_eq!(get_traceparent(&headers), Some(SAMPLE));
    }

    #[test]
    fn test_parse_traceparent_ok() {
        let cx = parse_traceparent(SAMPLE).unwrap();
        assert_eq!(cx.trace_id, "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(cx.span_id, "00f067aa0ba902b7");
        assert!(cx.sampled);
        assert_eq!(format_traceparent(&cx), SAMPLE);
    }

    #[test]
    fn test_parse_traceparent_invalid() {
        assert!(parse_traceparent("").is_none());
        assert!(parse_traceparent("invalid").is_none());
        assert!(parse_traceparent("01-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01").is_none());
        assert!(parse_traceparent("00-00000000000000000000000000000000-00f067aa0ba902b7-01").is_none());
        assert!(parse_traceparent("00-4bf92f3577b34da6a3ce929d0e0e4736-0000000000000000-01").is_none());
        assert!(parse_traceparent("00-4BF92F3577B34DA6A3CE929D0E0E4736-00f067aa0ba902b7-01").is_none());
    }

    #[test]
    fn test_unsampled_flag() {
        let cx = parse_traceparent("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-00").unwrap();
        assert!(!cx.sampled);
    }

    #[test]
    fn test_baggage_round_trip_drops_properties() {
        let parsed = parse_baggage("tenant=acme;ttl=3, region = br ,=broken,novalue");
        assert_eq!(parsed.get("tenant").map(String::as_str), Some("acme"));
        assert_eq!(parsed.get("region").map(String::as_str), Some("br"));
        assert_eq!(parsed.len(), 2);
        assert_eq!(format_baggage(&parsed).unwrap(), "region=br,tenant=acme");
        assert!(format_baggage(&BTreeMap::new()).is_none());
    }

    #[test]
    fn test_child_keeps_trace_and_baggage() {
        let mut parent = parse_traceparent(SAMPLE).unwrap();
        parent.baggage.insert("k".to_string(), "v".to_string());
        let child = parent.child("1111111111111111".to_string());
        assert_eq!(child.trace_id, parent.trace_id);
        assert_eq!(child.span_id, "1111111111111111");
        assert_eq!(child.baggage, parent.baggage);
    }
}
