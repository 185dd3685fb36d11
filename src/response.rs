//! Responses handed over by the transport

use std::fmt;

use bytes::Bytes;
use http::{header::CONTENT_TYPE, HeaderMap, StatusCode, Version};
use mime::Mime;
#[cfg(feature = "json")]
use serde::de::DeserializeOwned;
use url::Url;

use crate::Error;

/// A completed HTTP response handed over by the transport.
///
/// Navigators only borrow a `Response`; terminal routes take it by value,
/// so the body can be consumed at most once per dispatch.
pub struct Response {
    res: http::Response<Bytes>,
    url: Option<Url>,
}

impl Response {
    /// Get the `StatusCode` of this `Response`.
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.res.status()
    }

    /// Get the HTTP `Version` of this `Response`.
    #[inline]
    pub fn version(&self) -> Version {
        self.res.version()
    }

    /// Get the `Headers` of this `Response`.
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        self.res.headers()
    }

    /// Get a mutable reference to the `Headers` of this `Response`.
    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.res.headers_mut()
    }

    /// Get the `Url` the request was sent to, if the transport recorded it.
    #[inline]
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Record the `Url` the request was sent to.
    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    /// Get the parsed `Content-Type` of this `Response`.
    ///
    /// Returns `None` if the header is missing or not a valid media type.
    pub fn content_type(&self) -> Option<Mime> {
        self.headers()
            .get(CONTENT_TYPE)?
            .to_str()
            .ok()?
            .parse()
            .ok()
    }

    /// Get the length of the body.
    #[inline]
    pub fn content_length(&self) -> u64 {
        self.res.body().len() as u64
    }

    /// Returns true if the response carries no body bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.res.body().is_empty()
    }

    // body methods

    /// Get the full response body as `Bytes`.
    pub fn bytes(self) -> crate::Result<Bytes> {
        Ok(self.res.into_body())
    }

    /// Get the full response text.
    ///
    /// The body is decoded as UTF-8; invalid sequences are a decode error.
    pub fn text(self) -> crate::Result<String> {
        let body = self.res.into_body();
        String::from_utf8(body.to_vec()).map_err(Error::decode)
    }

    /// Try to deserialize the response body as JSON.
    ///
    /// # Errors
    ///
    /// An empty body fails with [`Error::is_empty_body`]; a body that is not
    /// valid JSON for `T` fails with [`Error::is_decode`].
    #[cfg(feature = "json")]
    #[cfg_attr(docsrs, doc(cfg(feature = "json")))]
    pub fn json<T: DeserializeOwned>(self) -> crate::Result<T> {
        let full = self.res.into_body();
        if full.is_empty() {
            return Err(Error::empty_body());
        }

        serde_json::from_slice(&full).map_err(Error::decode)
    }

    /// Split the response into its head and its body.
    pub fn into_parts(self) -> (http::response::Parts, Bytes) {
        self.res.into_parts()
    }

    // util methods

    /// Turn a response into an error if the server returned an error.
    ///
    /// The error keeps the status and headers so that a retry
    /// [`Policy`](crate::retry::Policy) can inspect `Retry-After`.
    pub fn error_for_status(self) -> crate::Result<Self> {
        let status = self.status();
        if status.is_client_error() || status.is_server_error() {
            let (parts, _) = self.res.into_parts();
            let err = Error::status(status, parts.headers);
            Err(match self.url {
                Some(url) => err.with_url(url),
                None => err,
            })
        } else {
            Ok(self)
        }
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Response")
            .field("url", &self.url.as_ref().map(Url::as_str))
            .field("status", &self.status())
            .field("headers", self.headers())
            .finish()
    }
}

impl<T: Into<Bytes>> From<http::Response<T>> for Response {
    fn from(r: http::Response<T>) -> Response {
        Response {
            res: r.map(Into::into),
            url: None,
        }
    }
}

impl From<Response> for http::Response<Bytes> {
    fn from(r: Response) -> http::Response<Bytes> {
        r.res
    }
}

/// A converted body together with the status and headers it arrived with.
#[derive(Debug, Clone)]
pub struct Entity<T> {
    status: StatusCode,
    headers: HeaderMap,
    body: T,
}

impl<T> Entity<T> {
    pub(crate) fn new(status: StatusCode, headers: HeaderMap, body: T) -> Self {
        Entity {
            status,
            headers,
            body,
        }
    }

    /// Get the `StatusCode` of the response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the headers of the response.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a reference to the converted body.
    pub fn body(&self) -> &T {
        &self.body
    }

    /// Consume the entity, returning the converted body.
    pub fn into_body(self) -> T {
        self.body
    }
}
