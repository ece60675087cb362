//! W3C Trace Context: the `traceparent`/`tracestate` header pair.
//!
//! `trace_id`/`span_id` are opaque byte sequences validated by regex and
//! compared case-insensitively — never parsed as integers (I6).

use std::fmt;

/// `version-traceId-spanId-flags`, lowercase hex, exactly as the wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    /// Always `0x00` for the version this core understands.
    pub version: u8,
    /// 32 lowercase hex chars, never all zeros.
    pub trace_id: String,
    /// 16 lowercase hex chars, never all zeros. Called `parent_id` when used
    /// to parent a message and `span_id` when identifying the current span —
    /// same field, the name in context tells you which.
    pub span_id: String,
    /// Bit 0 = sampled.
    pub flags: u8,
    /// Opaque, forwarded verbatim when present. Never modified by this crate.
    pub tracestate: Option<String>,
}

impl TraceContext {
    /// Regex-equivalent check without pulling in a regex dependency: fixed
    /// lengths, lowercase hex alphabet, not all zeros.
    pub fn is_valid_trace_id(s: &str) -> bool {
        s.len() == 32 && is_lower_hex(s) && !is_all_zero(s)
    }

    pub fn is_valid_span_id(s: &str) -> bool {
        s.len() == 16 && is_lower_hex(s) && !is_all_zero(s)
    }

    /// Parse a `traceparent` header value. Returns `None` for anything that
    /// doesn't match `^[0-9a-f]{2}-[0-9a-f]{32}-[0-9a-f]{16}-[0-9a-f]{2}$` or
    /// that has an all-zero trace/span id — callers treat that as
    /// `MalformedHeader` (§7), never fatal.
    pub fn parse_traceparent(value: &str) -> Option<Self> {
        let parts: Vec<&str> = value.split('-').collect();
        if parts.len() != 4 {
            return None;
        }
        let [version_s, trace_id, span_id, flags_s] = [parts[0], parts[1], parts[2], parts[3]];
        if version_s.len() != 2 || !is_lower_hex(version_s) {
            return None;
        }
        if !Self::is_valid_trace_id(trace_id) || !Self::is_valid_span_id(span_id) {
            return None;
        }
        if flags_s.len() != 2 || !is_lower_hex(flags_s) {
            return None;
        }
        let version = u8::from_str_radix(version_s, 16).ok()?;
        let flags = u8::from_str_radix(flags_s, 16).ok()?;
        Some(Self {
            version,
            trace_id: trace_id.to_string(),
            span_id: span_id.to_string(),
            flags,
            tracestate: None,
        })
    }

    /// Format as the `traceparent` wire value. Case is always lowercase on
    /// emission, regardless of how the fields were constructed.
    pub fn to_traceparent(&self) -> String {
        format!(
            "{:02x}-{}-{}-{:02x}",
            self.version,
            self.trace_id.to_ascii_lowercase(),
            self.span_id.to_ascii_lowercase(),
            self.flags
        )
    }

    pub fn is_sampled(&self) -> bool {
        self.flags & 0x01 != 0
    }

    /// A fresh root trace context: random trace/span ids, sampled.
    pub fn new_root(trace_id: impl Into<String>, span_id: impl Into<String>) -> Self {
        Self {
            version: 0,
            trace_id: trace_id.into(),
            span_id: span_id.into(),
            flags: 0x01,
            tracestate: None,
        }
    }

    /// Derive a child context for a downstream call: same trace, new span.
    pub fn child(&self, new_span_id: impl Into<String>) -> Self {
        Self {
            version: self.version,
            trace_id: self.trace_id.clone(),
            span_id: new_span_id.into(),
            flags: self.flags,
            tracestate: self.tracestate.clone(),
        }
    }
}

impl fmt::Display for TraceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_traceparent())
    }
}

fn is_lower_hex(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

fn is_all_zero(s: &str) -> bool {
    s.bytes().all(|b| b == b'0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_traceparent() {
        let tp = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";
        let ctx = TraceContext::parse_traceparent(tp).unwrap();
        assert_eq!(ctx.trace_id, "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(ctx.span_id, "00f067aa0ba902b7");
        assert!(ctx.is_sampled());
        assert_eq!(ctx.to_traceparent(), tp);
    }

    #[test]
    fn rejects_all_zero_trace_id() {
        let tp = "00-00000000000000000000000000000000-00f067aa0ba902b7-01";
        assert!(TraceContext::parse_traceparent(tp).is_none());
    }

    #[test]
    fn rejects_all_zero_span_id() {
        let tp = "00-4bf92f3577b34da6a3ce929d0e0e4736-0000000000000000-01";
        assert!(TraceContext::parse_traceparent(tp).is_none());
    }

    #[test]
    fn rejects_wrong_segment_count() {
        assert!(TraceContext::parse_traceparent("00-aabb").is_none());
    }

    #[test]
    fn rejects_uppercase_hex() {
        let tp = "00-4BF92F3577B34DA6A3CE929D0E0E4736-00f067aa0ba902b7-01";
        assert!(TraceContext::parse_traceparent(tp).is_none());
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(TraceContext::parse_traceparent("00-aabb-00f067aa0ba902b7-01").is_none());
    }

    #[test]
    fn child_preserves_trace_id_new_span() {
        let root = TraceContext::new_root("a".repeat(32), "b".repeat(16));
        let child = root.child("c".repeat(16));
        assert_eq!(child.trace_id, root.trace_id);
        assert_ne!(child.span_id, root.span_id);
    }

    #[test]
    fn round_trip_is_byte_identical() {
        let tp = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";
        let ctx = TraceContext::parse_traceparent(tp).unwrap();
        assert_eq!(ctx.to_traceparent(), tp);
    }
}
