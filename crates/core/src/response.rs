//! Immutable response snapshots.

use std::borrow::Cow;

use bytes::Bytes;
use url::Url;

/// A fully buffered response.
///
/// The body is read once when the response is captured. After that the value
/// can be cloned freely: `Bytes` shares the buffer, so handing one copy to the
/// caller and another to the cache never consumes either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    /// Final URL after redirects.
    pub url: Url,
    /// HTTP status code.
    pub status: u16,
    /// Response headers in received order.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: Bytes,
}

impl StoredResponse {
    pub fn new(url: Url, status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self { url, status, headers, body: body.into() }
    }

    /// True for 2xx statuses.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup. Returns the first match.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Body decoded as UTF-8, lossy.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
