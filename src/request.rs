//! Request arguments
//!
//! What a retry policy needs to know about the request that failed.

use std::convert::TryFrom;

use bytes::Bytes;
use http::{
    header::{HeaderName, HeaderValue},
    HeaderMap, Method,
};
use url::Url;

use crate::Error;

/// An immutable description of an outgoing request.
///
/// Arguments are created once per logical request and may be reused for
/// every retry of it. The `with_*` methods return a modified copy.
#[derive(Debug, Clone)]
pub struct RequestArguments {
    method: Method,
    url: Option<Url>,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl RequestArguments {
    /// Creates arguments for a `GET` request without url, headers or body.
    pub fn new() -> Self {
        RequestArguments {
            method: Method::GET,
            url: None,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Get the HTTP `Method` of the request.
    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get the target `Url`, if known.
    #[inline]
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Get the request headers.
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get the request body, if any.
    #[inline]
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Returns a copy with the given method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Returns a copy with the given target url.
    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    /// Returns a copy with an additional header value.
    ///
    /// Header names are case-insensitive; an invalid name or value is
    /// reported as a builder error.
    pub fn with_header<K, V>(mut self, key: K, value: V) -> crate::Result<Self>
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        let key = HeaderName::try_from(key).map_err(|e| Error::builder::<http::Error>(e.into()))?;
        let value =
            HeaderValue::try_from(value).map_err(|e| Error::builder::<http::Error>(e.into()))?;
        self.headers.append(key, value);
        Ok(self)
    }

    /// Returns a copy whose headers are replaced by `headers`.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Returns a copy with the given body.
    pub fn with_body<B: Into<Bytes>>(mut self, body: B) -> Self {
        self.body = Some(body.into());
        self
    }
}

impl Default for RequestArguments {
    fn default() -> Self {
        RequestArguments::new()
    }
}

impl<T> From<&http::Request<T>> for RequestArguments {
    fn from(req: &http::Request<T>) -> Self {
        RequestArguments {
            method: req.method().clone(),
            url: Url::parse(&req.uri().to_string()).ok(),
            headers: req.headers().clone(),
            body: None,
        }
    }
}
