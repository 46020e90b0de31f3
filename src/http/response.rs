//! Response emission.
//!
//! Every response is written line by line through the transport and is
//! followed by a close; there is no keep-alive path.

use crate::net::Transport;

/// Version used when none could be parsed from the request.
pub const DEFAULT_VERSION: &str = "HTTP/1.0";

/// Fixed body acknowledging a POST.
pub const POST_ACK: &str = "OK";

/// Status lines the server can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadRequest => "Request error",
        }
    }

    pub fn line(&self, version: &str) -> String {
        format!("{} {} {}", version, self.code(), self.reason())
    }
}

/// Reply to a GET: status line, an empty header section, the body text.
pub fn emit_get<T: Transport + ?Sized>(transport: &mut T, version: &str, body: &str) {
    transport.send_line(&Status::Ok.line(version));
    transport.send_line("");
    transport.send_line(body);
    transport.close();
}

/// Reply to a POST with a plain-text body and its length.
pub fn emit_post<T: Transport + ?Sized>(transport: &mut T, version: &str, body: &str) {
    transport.send_line(&Status::Ok.line(version));
    transport.send_line("Content-Type: text/plain");
    transport.send_line(&format!("Content-Length: {}", body.len()));
    transport.send_line("");
    transport.send_line(body);
    transport.close();
}

/// Reject a request that could not be framed.
pub fn emit_bad_request<T: Transport + ?Sized>(transport: &mut T) {
    transport.send_line(&Status::BadRequest.line(DEFAULT_VERSION));
    transport.send_line("");
    transport.close();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::Outbox;

    #[test]
    fn get_has_no_headers() {
        let mut out = Outbox::new();
        emit_get(&mut out, "HTTP/1.1", "(1, 2, 3)");
        assert!(out.is_closed());
        assert_eq!(out.take_pending(), "HTTP/1.1 200 OK\r\n\r\n(1, 2, 3)\r\n");
    }

    #[test]
    fn post_declares_type_and_length() {
        let mut out = Outbox::new();
        emit_post(&mut out, "HTTP/1.0", POST_ACK);
        assert!(out.is_closed());
        assert_eq!(
            out.take_pending(),
            "HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\nOK\r\n"
        );
    }

    #[test]
    fn bad_request_uses_default_version() {
        let mut out = Outbox::new();
        emit_bad_request(&mut out);
        assert!(out.is_closed());
        assert_eq!(out.take_pending(), "HTTP/1.0 400 Request error\r\n\r\n");
    }
}
