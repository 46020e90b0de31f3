//! The line-driven request state machine.
//!
//! # Responsibilities
//! - Advance the parser phase for every delivered line
//! - Accumulate method, target, version, headers and body in the record
//! - Decide framing: GET has no body, POST carries `Content-Length` bytes
//! - Dispatch a completed request once, emit the reply, reset
//!
//! # Body accounting
//! Lines arrive with their terminator stripped and decoded, so each body line
//! is charged its raw size on the wire, terminator included: `len + 1` for a
//! `\n`-terminated line of valid text. Entering the body
//! phase subtracts one up front for the separator newline. The body is
//! complete as soon as the counter reaches zero or below. Existing clients
//! depend on this exact arithmetic, including that a body one byte short of
//! the declared length still completes.

use crate::http::dispatch::Dispatch;
use crate::http::request::{
    parse_content_length, split_header, Method, ParserPhase, RequestLine, RequestRecord,
    CONTENT_LENGTH,
};
use crate::http::response::{self, Status, POST_ACK};
use crate::net::Transport;
use crate::observability::metrics;

/// Parser for one connection at a time; reused across connections.
pub struct RequestStateMachine<D> {
    phase: ParserPhase,
    record: RequestRecord,
    dispatch: D,
}

impl<D: Dispatch> RequestStateMachine<D> {
    pub fn new(dispatch: D) -> Self {
        Self {
            phase: ParserPhase::AwaitingRequestLine,
            record: RequestRecord::default(),
            dispatch,
        }
    }

    pub fn phase(&self) -> ParserPhase {
        self.phase
    }

    pub fn record(&self) -> &RequestRecord {
        &self.record
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatch
    }

    pub fn into_dispatcher(self) -> D {
        self.dispatch
    }

    /// Forget any partially received request.
    pub fn reset(&mut self) {
        if self.phase != ParserPhase::AwaitingRequestLine || !self.record.is_clear() {
            tracing::trace!(phase = ?self.phase, "Discarding partial request");
        }
        self.phase = ParserPhase::AwaitingRequestLine;
        self.record.clear();
    }

    /// Feed one received line (terminator already stripped), taken to have
    /// been terminated by a single `\n`.
    pub fn on_line<T: Transport + ?Sized>(&mut self, line: &str, transport: &mut T) {
        self.on_received(line, line.len().saturating_add(1), transport);
    }

    /// Feed one received line that occupied `wire_len` bytes on the wire.
    pub fn on_received<T: Transport + ?Sized>(
        &mut self,
        line: &str,
        wire_len: usize,
        transport: &mut T,
    ) {
        if !transport.is_connected() {
            tracing::trace!("Ignoring line delivered after close");
            return;
        }

        match self.phase {
            ParserPhase::AwaitingRequestLine => self.on_request_line(line, transport),
            ParserPhase::AwaitingHeaders => self.on_header_line(line, transport),
            ParserPhase::AwaitingBody => self.on_body_line(line, wire_len, transport),
        }
    }

    /// The transport refused a line for being too long.
    pub fn on_line_too_long<T: Transport + ?Sized>(&mut self, limit: usize, transport: &mut T) {
        if !transport.is_connected() {
            return;
        }
        tracing::warn!(limit, phase = ?self.phase, "Line too long");
        self.reject(transport);
    }

    fn on_request_line<T: Transport + ?Sized>(&mut self, line: &str, transport: &mut T) {
        let Some(request_line) = RequestLine::parse(line) else {
            tracing::warn!(line, "Malformed request line");
            self.reject(transport);
            return;
        };

        self.record.start(&request_line);
        self.phase = ParserPhase::AwaitingHeaders;
        tracing::trace!(
            method = request_line.method,
            request_target = request_line.target,
            version = request_line.version,
            "Request line parsed"
        );
    }

    fn on_header_line<T: Transport + ?Sized>(&mut self, line: &str, transport: &mut T) {
        if !line.trim().is_empty() {
            let (name, value) = split_header(line);
            self.record.insert_header(name, value);

            if name == CONTENT_LENGTH {
                match parse_content_length(value) {
                    Some(length) => self.record.declared_body_length = Some(length),
                    None => {
                        tracing::warn!(value = ?value, "Invalid Content-Length");
                        self.reject(transport);
                    }
                }
            }
            return;
        }

        match Method::from_token(&self.record.method) {
            Some(Method::Get) => {
                let body = self.dispatch.get(&self.record.target);
                response::emit_get(transport, &self.record.http_version, &body);
                self.finish(Method::Get);
            }
            Some(Method::Post) => match self.record.declared_body_length {
                Some(0) => {
                    self.dispatch.post(&self.record.target, "");
                    response::emit_post(transport, &self.record.http_version, POST_ACK);
                    self.finish(Method::Post);
                }
                Some(declared) => {
                    self.record.remaining_body_length =
                        i64::try_from(declared).unwrap_or(i64::MAX) - 1;
                    self.phase = ParserPhase::AwaitingBody;
                    tracing::trace!(declared, "Awaiting request body");
                }
                None => {
                    tracing::warn!("POST without Content-Length");
                    self.reject(transport);
                }
            },
            None => {
                tracing::warn!(method = %self.record.method, "Unsupported method, hanging up");
                metrics::record_unsupported_method();
                transport.close();
                self.reset();
            }
        }
    }

    fn on_body_line<T: Transport + ?Sized>(&mut self, line: &str, wire_len: usize, transport: &mut T) {
        self.record.push_body_line(line);
        let consumed = i64::try_from(wire_len).unwrap_or(i64::MAX);
        self.record.remaining_body_length =
            self.record.remaining_body_length.saturating_sub(consumed);

        if self.record.remaining_body_length > 0 {
            return;
        }

        tracing::debug!(
            request_target = %self.record.target,
            body_len = self.record.accumulated_body.len(),
            "Request body complete"
        );
        self.dispatch
            .post(&self.record.target, &self.record.accumulated_body);
        response::emit_post(transport, &self.record.http_version, POST_ACK);
        self.finish(Method::Post);
    }

    fn reject<T: Transport + ?Sized>(&mut self, transport: &mut T) {
        response::emit_bad_request(transport);
        metrics::record_request("invalid", Status::BadRequest.code());
        self.reset();
    }

    fn finish(&mut self, method: Method) {
        tracing::debug!(
            method = %method,
            request_target = %self.record.target,
            "Request served"
        );
        metrics::record_request(method.as_str(), Status::Ok.code());
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Transport that records every line and the close.
    #[derive(Debug, Default)]
    struct Recorder {
        lines: Vec<String>,
        closed: bool,
    }

    impl Transport for Recorder {
        fn is_connected(&self) -> bool {
            !self.closed
        }

        fn send_line(&mut self, text: &str) {
            assert!(!self.closed, "wrote '{}' after close", text);
            self.lines.push(text.to_string());
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    /// Dispatcher that remembers what it was asked.
    #[derive(Debug, Default)]
    struct Calls {
        gets: Vec<String>,
        posts: Vec<(String, String)>,
    }

    impl Dispatch for Calls {
        fn get(&mut self, target: &str) -> String {
            self.gets.push(target.to_string());
            format!("resolved {}", target)
        }

        fn post(&mut self, target: &str, body: &str) {
            self.posts.push((target.to_string(), body.to_string()));
        }
    }

    fn feed(machine: &mut RequestStateMachine<Calls>, lines: &[&str]) -> Recorder {
        let mut transport = Recorder::default();
        for line in lines {
            machine.on_line(line, &mut transport);
        }
        transport
    }

    fn post_lines<'a>(length: usize, body: &'a [&'a str]) -> Vec<String> {
        let mut lines = vec![
            "POST /mcpi/commands HTTP/1.0".to_string(),
            format!("Content-Length: {}", length),
            String::new(),
        ];
        lines.extend(body.iter().map(|l| l.to_string()));
        lines
    }

    fn feed_owned(machine: &mut RequestStateMachine<Calls>, lines: &[String]) -> Recorder {
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        feed(machine, &refs)
    }

    fn assert_idle(machine: &RequestStateMachine<Calls>) {
        assert_eq!(machine.phase(), ParserPhase::AwaitingRequestLine);
        assert!(machine.record().is_clear());
    }

    #[test]
    fn get_emits_status_blank_and_body() {
        let mut machine = RequestStateMachine::new(Calls::default());
        let t = feed(
            &mut machine,
            &["GET /mcpi/player_getTilePos HTTP/1.1", "Host: localhost", ""],
        );

        assert_eq!(
            t.lines,
            vec!["HTTP/1.1 200 OK", "", "resolved /mcpi/player_getTilePos"]
        );
        assert!(t.closed);
        assert_eq!(machine.dispatcher().gets, vec!["/mcpi/player_getTilePos"]);
        assert_idle(&machine);
    }

    #[test]
    fn blank_separator_may_contain_whitespace() {
        let mut machine = RequestStateMachine::new(Calls::default());
        let t = feed(&mut machine, &["GET / HTTP/1.0", "   "]);
        assert!(t.closed);
        assert_eq!(t.lines[0], "HTTP/1.0 200 OK");
    }

    #[test]
    fn phases_advance_line_by_line() {
        let mut machine = RequestStateMachine::new(Calls::default());
        let mut t = Recorder::default();

        machine.on_line("POST /x HTTP/1.0", &mut t);
        assert_eq!(machine.phase(), ParserPhase::AwaitingHeaders);
        assert_eq!(machine.record().method, "POST");
        assert_eq!(machine.record().target, "/x");
        assert_eq!(machine.record().http_version, "HTTP/1.0");

        machine.on_line("Content-Length: 10", &mut t);
        assert_eq!(machine.phase(), ParserPhase::AwaitingHeaders);
        assert_eq!(machine.record().declared_body_length, Some(10));

        machine.on_line("", &mut t);
        assert_eq!(machine.phase(), ParserPhase::AwaitingBody);
        assert_eq!(machine.record().remaining_body_length, 9);
        assert!(t.lines.is_empty());

        machine.on_line("abc", &mut t);
        assert_eq!(machine.phase(), ParserPhase::AwaitingBody);
        assert_eq!(machine.record().remaining_body_length, 5);
    }

    #[test]
    fn short_request_line_is_rejected() {
        let mut machine = RequestStateMachine::new(Calls::default());
        let t = feed(&mut machine, &["GET /x"]);
        assert_eq!(t.lines, vec!["HTTP/1.0 400 Request error", ""]);
        assert!(t.closed);
        assert_idle(&machine);
    }

    #[test]
    fn long_request_line_is_rejected() {
        let mut machine = RequestStateMachine::new(Calls::default());
        let t = feed(&mut machine, &["GET /x HTTP/1.0 extra"]);
        assert_eq!(t.lines, vec!["HTTP/1.0 400 Request error", ""]);
        assert!(t.closed);
        assert_idle(&machine);
        assert!(machine.dispatcher().gets.is_empty());
    }

    #[test]
    fn post_with_zero_length_skips_body_phase() {
        let mut machine = RequestStateMachine::new(Calls::default());
        let t = feed(
            &mut machine,
            &["POST /mcpi/commands HTTP/1.0", "Content-Length: 0", ""],
        );

        assert_eq!(
            t.lines,
            vec![
                "HTTP/1.0 200 OK",
                "Content-Type: text/plain",
                "Content-Length: 2",
                "",
                "OK"
            ]
        );
        assert!(t.closed);
        assert_eq!(
            machine.dispatcher().posts,
            vec![("/mcpi/commands".to_string(), String::new())]
        );
        assert_idle(&machine);
    }

    #[test]
    fn body_across_lines_is_joined() {
        let mut machine = RequestStateMachine::new(Calls::default());
        // "{\"a\":\n1}\n" is 9 bytes on the wire.
        let t = feed_owned(&mut machine, &post_lines(9, &["{\"a\":", "1}"]));

        assert!(t.closed);
        assert_eq!(t.lines.last().map(String::as_str), Some("OK"));
        assert_eq!(machine.dispatcher().posts[0].1, "{\"a\":\n1}");
        assert_idle(&machine);
    }

    #[test]
    fn body_exactly_at_declared_length() {
        let mut machine = RequestStateMachine::new(Calls::default());
        // Five characters plus the trailing newline.
        let t = feed_owned(&mut machine, &post_lines(6, &["abcde"]));
        assert!(t.closed);
        assert_eq!(machine.dispatcher().posts[0].1, "abcde");
    }

    #[test]
    fn body_one_byte_under_still_completes() {
        let mut machine = RequestStateMachine::new(Calls::default());
        // Four characters plus newline against a declared six: the up-front
        // subtraction lets this through.
        let t = feed_owned(&mut machine, &post_lines(6, &["abcd"]));
        assert!(t.closed);
        assert_eq!(machine.dispatcher().posts[0].1, "abcd");
    }

    #[test]
    fn body_two_bytes_under_waits_for_more() {
        let mut machine = RequestStateMachine::new(Calls::default());
        let t = feed_owned(&mut machine, &post_lines(6, &["abc"]));
        assert!(!t.closed);
        assert!(t.lines.is_empty());
        assert_eq!(machine.phase(), ParserPhase::AwaitingBody);
        assert_eq!(machine.record().remaining_body_length, 1);
        assert!(machine.dispatcher().posts.is_empty());
    }

    #[test]
    fn body_one_byte_over_completes() {
        let mut machine = RequestStateMachine::new(Calls::default());
        let t = feed_owned(&mut machine, &post_lines(6, &["abcdef"]));
        assert!(t.closed);
        assert_eq!(machine.dispatcher().posts[0].1, "abcdef");
        assert_idle(&machine);
    }

    #[test]
    fn crlf_body_lines_are_charged_both_bytes() {
        let mut machine = RequestStateMachine::new(Calls::default());
        let mut t = Recorder::default();
        for line in ["POST /x HTTP/1.0", "Content-Length: 6", ""] {
            machine.on_line(line, &mut t);
        }

        // "a\r\nb\r\n" is exactly six bytes.
        machine.on_received("a", 3, &mut t);
        assert_eq!(machine.phase(), ParserPhase::AwaitingBody);
        machine.on_received("b", 3, &mut t);

        assert!(t.closed);
        assert_eq!(t.lines.last().map(String::as_str), Some("OK"));
        assert_eq!(machine.dispatcher().posts[0].1, "a\nb");
        assert_idle(&machine);
    }

    #[test]
    fn replaced_bytes_do_not_inflate_the_body() {
        let mut machine = RequestStateMachine::new(Calls::default());
        let mut t = Recorder::default();
        for line in ["POST /x HTTP/1.0", "Content-Length: 8", ""] {
            machine.on_line(line, &mut t);
        }

        // Three undecodable bytes plus '\n', decoded to nine bytes of text.
        machine.on_received("\u{FFFD}\u{FFFD}\u{FFFD}", 4, &mut t);

        assert!(!t.closed);
        assert_eq!(machine.phase(), ParserPhase::AwaitingBody);
        assert_eq!(machine.record().remaining_body_length, 3);
        assert!(machine.dispatcher().posts.is_empty());
    }

    #[test]
    fn over_long_line_is_bad_request() {
        let mut machine = RequestStateMachine::new(Calls::default());
        let mut t = Recorder::default();
        machine.on_line("POST /x HTTP/1.0", &mut t);
        machine.on_line_too_long(8192, &mut t);

        assert_eq!(t.lines, vec!["HTTP/1.0 400 Request error", ""]);
        assert!(t.closed);
        assert_idle(&machine);
    }

    #[test]
    fn unsupported_method_closes_silently() {
        let mut machine = RequestStateMachine::new(Calls::default());
        let t = feed(&mut machine, &["DELETE /x HTTP/1.0", "Host: a", ""]);
        assert!(t.lines.is_empty());
        assert!(t.closed);
        assert!(machine.dispatcher().gets.is_empty());
        assert!(machine.dispatcher().posts.is_empty());
        assert_idle(&machine);
    }

    #[test]
    fn non_numeric_content_length_is_bad_request() {
        let mut machine = RequestStateMachine::new(Calls::default());
        let t = feed(
            &mut machine,
            &["POST /x HTTP/1.0", "Content-Length: lots", "", "body"],
        );
        assert_eq!(t.lines, vec!["HTTP/1.0 400 Request error", ""]);
        assert!(t.closed);
        assert!(machine.dispatcher().posts.is_empty());
        assert_idle(&machine);
    }

    #[test]
    fn post_without_content_length_is_bad_request() {
        let mut machine = RequestStateMachine::new(Calls::default());
        let t = feed(&mut machine, &["POST /x HTTP/1.0", ""]);
        assert_eq!(t.lines, vec!["HTTP/1.0 400 Request error", ""]);
        assert_idle(&machine);
    }

    #[test]
    fn content_length_name_is_case_sensitive() {
        let mut machine = RequestStateMachine::new(Calls::default());
        let mut t = Recorder::default();
        machine.on_line("POST /x HTTP/1.0", &mut t);
        machine.on_line("content-length: 5", &mut t);
        assert_eq!(machine.record().declared_body_length, None);
        assert_eq!(machine.record().header("content-length"), Some(" 5"));
    }

    #[test]
    fn lines_after_close_are_ignored() {
        let mut machine = RequestStateMachine::new(Calls::default());
        let t = feed(
            &mut machine,
            &["GET /a HTTP/1.0", "", "GET /b HTTP/1.0", ""],
        );
        assert_eq!(t.lines.len(), 3);
        assert_eq!(machine.dispatcher().gets, vec!["/a"]);
        assert_idle(&machine);
    }

    #[test]
    fn next_connection_starts_clean() {
        let mut machine = RequestStateMachine::new(Calls::default());
        feed_owned(&mut machine, &post_lines(4, &["xyz"]));

        let t = feed(&mut machine, &["GET /fresh HTTP/1.0", ""]);
        assert_eq!(t.lines[0], "HTTP/1.0 200 OK");
        assert_eq!(machine.dispatcher().gets, vec!["/fresh"]);
        assert_eq!(machine.record().declared_body_length, None);
    }

    #[test]
    fn reset_discards_partial_request() {
        let mut machine = RequestStateMachine::new(Calls::default());
        let mut t = Recorder::default();
        machine.on_line("POST /x HTTP/1.0", &mut t);
        machine.on_line("Content-Length: 100", &mut t);
        machine.reset();
        assert_idle(&machine);
    }
}
