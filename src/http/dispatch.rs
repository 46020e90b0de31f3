//! The application seam called by the request parser.

/// Application logic behind the HTTP envelope.
///
/// The parser hands over the raw target (and body for POST); decoding both
/// is up to the implementation. Failures are the implementation's concern:
/// `get` reports them in the returned text, `post` has no way to report
/// them at all since the parser always acknowledges with a fixed body.
pub trait Dispatch {
    /// Resolve a GET target to the response body.
    fn get(&mut self, target: &str) -> String;

    /// Act on a POST body.
    fn post(&mut self, target: &str, body: &str);
}
