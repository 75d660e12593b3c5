//! In-memory tracer that records every span it opens.
//!
//! Uses plain W3C headers for inject/extract so two services sharing one
//! `RecordingTracer` can be checked for cross-process parentage.

use super::{
    format_baggage, format_traceparent, get_traceparent, parse_baggage, parse_traceparent,
    ActiveSpan, SpanHandle, TraceContext, Tracer, BAGGAGE, TRACEPARENT,
};
use http::{HeaderMap, HeaderValue};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSpan {
    pub name: &'static str,
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub ended: bool,
    pub error: Option<String>,
}

#[derive(Clone, Default)]
pub struct RecordingTracer {
    spans: Arc<Mutex<Vec<RecordedSpan>>>,
    next_id: Arc<AtomicU64>,
}

impl RecordingTracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spans(&self) -> Vec<RecordedSpan> {
        self.spans.lock().clone()
    }

    /// First recorded span with the given name.
    pub fn span(&self, name: &str) -> Option<RecordedSpan> {
        self.spans.lock().iter().find(|s| s.name == name).cloned()
    }

    fn next(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

struct RecordingSpan {
    spans: Arc<Mutex<Vec<RecordedSpan>>>,
    index: usize,
}

impl SpanHandle for RecordingSpan {
    fn record_error(&mut self, message: &str) {
        if let Some(span) = self.spans.lock().get_mut(self.index) {
            span.error = Some(message.to_string());
        }
    }

    fn end(&mut self) {
        if let Some(span) = self.spans.lock().get_mut(self.index) {
            span.ended = true;
        }
    }
}

impl Tracer for RecordingTracer {
    fn start_span(&self, name: &'static str, parent: Option<&TraceContext>) -> ActiveSpan {
        let span_id = format!("{:016x}", self.next());
        let context = match parent {
            Some(parent) => parent.child(span_id),
            None => TraceContext {
                trace_id: format!("{:032x}", self.next()),
                span_id,
                sampled: true,
                baggage: BTreeMap::new(),
            },
        };

        let index = {
            let mut spans = self.spans.lock();
            spans.push(RecordedSpan {
                name,
                trace_id: context.trace_id.clone(),
                span_id: context.span_id.clone(),
                parent_span_id: parent.map(|p| p.span_id.clone()),
                ended: false,
                error: None,
            });
            spans.len() - 1
        };

        ActiveSpan::new(
            context,
            Box::new(RecordingSpan {
                spans: Arc::clone(&self.spans),
                index,
            }),
        )
    }

    fn inject(&self, context: &TraceContext, headers: &mut HeaderMap) {
        if let Ok(value) = HeaderValue::from_str(&format_traceparent(context)) {
            headers.insert(TRACEPARENT, value);
        }
        if let Some(baggage) = format_baggage(&context.baggage) {
            if let Ok(value) = HeaderValue::from_str(&baggage) {
                headers.insert(BAGGAGE, value);
            }
        }
    }

    fn extract(&self, headers: &HeaderMap) -> Option<TraceContext> {
        let mut context = parse_traceparent(get_traceparent(headers)?)?;
        if let Some(baggage) = headers.get(BAGGAGE).and_then(|v| v.to_str().ok()) {
            context.baggage = parse_baggage(baggage);
        }
        Some(context)
    }
}
