//! Request-side data for the line parser.
//!
//! # Responsibilities
//! - Define the parser phases and the per-connection request record
//! - Split the request line and header lines into their fields
//! - Map method tokens onto the methods the server dispatches
//!
//! # Design Decisions
//! - The record keeps raw strings; decoding the target is the dispatcher's job
//! - Only `Content-Length` is interpreted, matched case-sensitively
//! - Header storage is last-occurrence-wins

use std::collections::HashMap;

/// Name of the only header the parser interprets.
pub const CONTENT_LENGTH: &str = "Content-Length";

/// Where the parser is within the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserPhase {
    /// Expecting `METHOD SP TARGET SP VERSION`.
    #[default]
    AwaitingRequestLine,
    /// Expecting `Name: Value` lines or the blank separator.
    AwaitingHeaders,
    /// Counting down the declared body length.
    AwaitingBody,
}

/// Methods with a dispatch path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    /// Case-sensitive lookup; any other token is unsupported.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three fields of a request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine<'a> {
    pub method: &'a str,
    pub target: &'a str,
    pub version: &'a str,
}

impl<'a> RequestLine<'a> {
    /// Split on single spaces. Exactly three fields are required, so a
    /// doubled space or a trailing token is rejected.
    pub fn parse(line: &'a str) -> Option<Self> {
        let mut parts = line.split(' ');
        let method = parts.next()?;
        let target = parts.next()?;
        let version = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            method,
            target,
            version,
        })
    }
}

/// Split a header line once on the first colon. The value is the raw
/// remainder, or `None` when the line has no colon at all.
pub fn split_header(line: &str) -> (&str, Option<&str>) {
    match line.split_once(':') {
        Some((name, value)) => (name, Some(value)),
        None => (line, None),
    }
}

/// Parse a `Content-Length` value. Surrounding whitespace is ignored;
/// anything but a non-negative integer is rejected.
pub fn parse_content_length(value: Option<&str>) -> Option<u64> {
    value?.trim().parse().ok()
}

/// Fields accumulated for the request in flight on a connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestRecord {
    pub method: String,
    pub target: String,
    pub http_version: String,
    pub headers: HashMap<String, Option<String>>,
    /// Present only once a valid `Content-Length` header was seen.
    pub declared_body_length: Option<u64>,
    /// Only meaningful while the phase is `AwaitingBody`.
    pub remaining_body_length: i64,
    pub accumulated_body: String,
    /// Number of body lines appended so far.
    pub body_lines: usize,
}

impl RequestRecord {
    /// Take the fields of a parsed request line.
    pub fn start(&mut self, line: &RequestLine<'_>) {
        self.method = line.method.to_string();
        self.target = line.target.to_string();
        self.http_version = line.version.to_string();
    }

    pub fn insert_header(&mut self, name: &str, value: Option<&str>) {
        self.headers
            .insert(name.to_string(), value.map(str::to_string));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.as_deref())
    }

    /// Append one body line, restoring the newline between lines.
    pub fn push_body_line(&mut self, line: &str) {
        if self.body_lines > 0 {
            self.accumulated_body.push('\n');
        }
        self.accumulated_body.push_str(line);
        self.body_lines += 1;
    }

    /// Clear every field.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_clear(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_line_needs_exactly_three_fields() {
        let line = RequestLine::parse("GET /mcpi/x?a=1 HTTP/1.0").unwrap();
        assert_eq!(line.method, "GET");
        assert_eq!(line.target, "/mcpi/x?a=1");
        assert_eq!(line.version, "HTTP/1.0");

        assert!(RequestLine::parse("").is_none());
        assert!(RequestLine::parse("GET /x").is_none());
        assert!(RequestLine::parse("GET /x HTTP/1.0 extra").is_none());
        assert!(RequestLine::parse("GET  /x HTTP/1.0").is_none());
    }

    #[test]
    fn method_tokens_are_case_sensitive() {
        assert_eq!(Method::from_token("GET"), Some(Method::Get));
        assert_eq!(Method::from_token("POST"), Some(Method::Post));
        assert_eq!(Method::from_token("get"), None);
        assert_eq!(Method::from_token("DELETE"), None);
    }

    #[test]
    fn header_split_keeps_raw_remainder() {
        assert_eq!(split_header("Host: a:b"), ("Host", Some(" a:b")));
        assert_eq!(split_header("Broken"), ("Broken", None));
        assert_eq!(split_header("Empty:"), ("Empty", Some("")));
    }

    #[test]
    fn content_length_values() {
        assert_eq!(parse_content_length(Some(" 42")), Some(42));
        assert_eq!(parse_content_length(Some("0")), Some(0));
        assert_eq!(parse_content_length(Some(" -1")), None);
        assert_eq!(parse_content_length(Some("ten")), None);
        assert_eq!(parse_content_length(None), None);
    }

    #[test]
    fn body_lines_joined_with_newline() {
        let mut record = RequestRecord::default();
        record.push_body_line("");
        record.push_body_line("{}");
        assert_eq!(record.accumulated_body, "\n{}");

        record.clear();
        assert!(record.is_clear());
    }

    #[test]
    fn last_header_wins() {
        let mut record = RequestRecord::default();
        record.insert_header("X-Test", Some("1"));
        record.insert_header("X-Test", Some("2"));
        assert_eq!(record.header("X-Test"), Some("2"));
    }
}
