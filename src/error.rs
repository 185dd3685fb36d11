use std::{error::Error as StdError, fmt, io};

use http::{HeaderMap, StatusCode};
use url::Url;

/// A `Result` alias where the `Err` case is `rebound::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// A boxed error type that can be used for dynamic error handling.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// The Errors that may occur when routing a `Response`.
///
/// Errors raised from a response (a failed status, a `retry` route, a
/// propagated body) keep the response's status and headers, so retry
/// decisions can inspect them afterwards.
pub struct Error {
    inner: Box<Inner>,
}

struct Inner {
    kind: Kind,
    source: Option<BoxError>,
    head: Option<Head>,
    url: Option<Url>,
}

/// The status and headers of the response an error was raised from.
#[derive(Debug, Clone)]
struct Head {
    status: StatusCode,
    headers: HeaderMap,
}

impl Error {
    pub(crate) fn new<E>(kind: Kind, source: Option<E>) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            inner: Box::new(Inner {
                kind,
                source: source.map(Into::into),
                head: None,
                url: None,
            }),
        }
    }

    pub(crate) fn builder<E: Into<BoxError>>(e: E) -> Error {
        Error::new(Kind::Builder, Some(e))
    }

    pub(crate) fn decode<E: Into<BoxError>>(e: E) -> Error {
        Error::new(Kind::Decode, Some(e))
    }

    pub(crate) fn empty_body() -> Error {
        Error::new(Kind::EmptyBody, None::<Error>)
    }

    pub(crate) fn no_route(attribute: Option<String>, declared: Vec<String>) -> Error {
        Error::new(
            Kind::NoRoute {
                attribute,
                declared,
            },
            None::<Error>,
        )
    }

    pub(crate) fn capture<E: Into<BoxError>>(e: E) -> Error {
        Error::new(Kind::Capture, Some(e))
    }

    /// The proximate cause is always an `io::Error`; the payload sits behind it.
    pub(crate) fn propagated(payload: BoxError) -> Error {
        let cause = match payload.downcast::<io::Error>() {
            Ok(io) => *io,
            Err(payload) => io::Error::other(payload),
        };
        Error::new(Kind::Propagated, Some(cause))
    }

    pub(crate) fn retry(status: StatusCode, headers: HeaderMap) -> Error {
        Error::new(Kind::Retry, None::<Error>).with_head(status, headers)
    }

    /// Creates an error for a response that is treated as a failure.
    ///
    /// Transports use this to hand unsuccessful responses to a retry
    /// [`Policy`](crate::retry::Policy).
    pub fn status(status: StatusCode, headers: HeaderMap) -> Error {
        Error::new(Kind::Status, None::<Error>).with_head(status, headers)
    }

    /// Creates an error for a failure that happened before any response
    /// was received, such as a refused connection.
    pub fn request<E: Into<BoxError>>(e: E) -> Error {
        Error::new(Kind::Request, Some(e))
    }

    pub(crate) fn with_head(mut self, status: StatusCode, headers: HeaderMap) -> Error {
        self.inner.head = Some(Head { status, headers });
        self
    }
}

impl Error {
    /// Returns a possible URL related to this error.
    pub fn url(&self) -> Option<&Url> {
        self.inner.url.as_ref()
    }

    /// Add a url related to this error (overwriting any existing)
    pub fn with_url(mut self, url: Url) -> Self {
        self.inner.url = Some(url);
        self
    }

    /// Strip the related url from this error (if, for example, it contains
    /// sensitive information)
    pub fn without_url(mut self) -> Self {
        self.inner.url = None;
        self
    }

    /// Returns true if the error comes from an invalid routing configuration.
    pub fn is_builder(&self) -> bool {
        matches!(self.inner.kind, Kind::Builder)
    }

    /// Returns true if no binding matched the response.
    pub fn is_no_route(&self) -> bool {
        matches!(self.inner.kind, Kind::NoRoute { .. })
    }

    /// Returns true if the error is related to converting the response's body
    pub fn is_decode(&self) -> bool {
        matches!(self.inner.kind, Kind::Decode)
    }

    /// Returns true if a conversion needed a body but the response had none.
    pub fn is_empty_body(&self) -> bool {
        matches!(self.inner.kind, Kind::EmptyBody)
    }

    /// Returns true if the error was raised by a `propagate` route.
    pub fn is_propagated(&self) -> bool {
        matches!(self.inner.kind, Kind::Propagated)
    }

    /// Returns true if the error was raised by a `retry` route.
    pub fn is_retry(&self) -> bool {
        matches!(self.inner.kind, Kind::Retry)
    }

    /// Returns true if the error was created by [`Error::status`].
    pub fn is_status(&self) -> bool {
        matches!(self.inner.kind, Kind::Status)
    }

    /// Returns true if the error happened before a response was received.
    pub fn is_request(&self) -> bool {
        matches!(self.inner.kind, Kind::Request)
    }

    /// Returns true if a captured value could not be retrieved.
    pub fn is_capture(&self) -> bool {
        matches!(self.inner.kind, Kind::Capture)
    }

    /// Returns true if the error is related to a timeout.
    pub fn is_timeout(&self) -> bool {
        let mut source = self.source();

        while let Some(err) = source {
            if let Some(io) = err.downcast_ref::<io::Error>() {
                if io.kind() == io::ErrorKind::TimedOut {
                    return true;
                }
            }

            source = err.source();
        }

        false
    }

    /// Returns the status code, if the error was raised from a response.
    pub fn status_code(&self) -> Option<StatusCode> {
        self.inner.head.as_ref().map(|head| head.status)
    }

    /// Returns the headers of the response the error was raised from.
    ///
    /// Network-level failures carry no response and return `None`.
    pub fn response_headers(&self) -> Option<&HeaderMap> {
        self.inner.head.as_ref().map(|head| &head.headers)
    }

    /// Returns the navigated attribute of a `NoRoute` error, rendered with
    /// `Debug`.
    ///
    /// The outer `Option` is `None` for every other kind of error, the inner
    /// one is `None` when the navigator found no attribute at all.
    pub fn unmatched_attribute(&self) -> Option<Option<&str>> {
        match self.inner.kind {
            Kind::NoRoute { ref attribute, .. } => Some(attribute.as_deref()),
            _ => None,
        }
    }

    /// Returns the declared binding specifiers of a `NoRoute` error, in
    /// declaration order.
    pub fn declared_attributes(&self) -> Option<&[String]> {
        match self.inner.kind {
            Kind::NoRoute { ref declared, .. } => Some(declared),
            _ => None,
        }
    }

    /// Finds the first error of type `T` in the source chain.
    ///
    /// For errors raised by a `propagate` route this yields the structured
    /// body that was converted from the response.
    pub fn payload<T>(&self) -> Option<&T>
    where
        T: StdError + 'static,
    {
        let mut source = self.source();

        while let Some(err) = source {
            if let Some(payload) = err.downcast_ref::<T>() {
                return Some(payload);
            }

            // `io::Error::source` skips the wrapped error itself.
            if let Some(inner) = err
                .downcast_ref::<io::Error>()
                .and_then(|io| io.get_ref())
            {
                if let Some(payload) = inner.downcast_ref::<T>() {
                    return Some(payload);
                }
            }

            source = err.source();
        }

        None
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = f.debug_struct("rebound::Error");

        builder.field("kind", &self.inner.kind);

        if let Some(ref head) = self.inner.head {
            builder.field("status", &head.status);
        }

        if let Some(ref url) = self.inner.url {
            builder.field("url", &url.as_str());
        }

        if let Some(ref source) = self.inner.source {
            builder.field("source", source);
        }

        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.inner.kind {
            Kind::Builder => f.write_str("invalid routing configuration")?,
            Kind::NoRoute {
                ref attribute,
                ref declared,
            } => {
                match attribute {
                    Some(attribute) => write!(f, "no binding matched {attribute}")?,
                    None => f.write_str("no binding matched a response without attribute")?,
                }
                write!(f, " (declared: [{}])", declared.join(", "))?;
            }
            Kind::Decode => f.write_str("error converting response body")?,
            Kind::EmptyBody => f.write_str("response body is empty")?,
            Kind::Propagated => f.write_str("propagated response body")?,
            Kind::Retry => f.write_str("response requested a retry")?,
            Kind::Status => f.write_str("unsuccessful response")?,
            Kind::Request => f.write_str("error sending request")?,
            Kind::Capture => f.write_str("error retrieving captured value")?,
        };

        if let Some(head) = &self.inner.head {
            write!(f, " ({})", head.status)?;
        }

        if let Some(url) = &self.inner.url {
            write!(f, " for url ({url})")?;
        }

        if let Some(e) = &self.inner.source {
            write!(f, ": {e}")?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| &**e as _)
    }
}

#[derive(Debug)]
pub(crate) enum Kind {
    Builder,
    NoRoute {
        attribute: Option<String>,
        declared: Vec<String>,
    },
    Decode,
    EmptyBody,
    Propagated,
    Retry,
    Status,
    Request,
    Capture,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[derive(Debug)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("boom")
        }
    }

    impl StdError for Boom {}

    #[test]
    fn test_source_chain() {
        let root = Error::new(Kind::Request, None::<Error>);
        assert!(root.source().is_none());

        let link = Error::decode(root);
        assert!(link.source().is_some());
        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn propagated_wraps_payload_in_io_error() {
        let err = Error::propagated(Box::new(Boom));

        assert!(err.is_propagated());
        let proximate = err.source().expect("proximate cause");
        assert!(proximate.is::<io::Error>());
        assert!(err.payload::<Boom>().is_some());
    }

    #[test]
    fn propagated_keeps_io_error_as_is() {
        let io = io::Error::new(io::ErrorKind::InvalidData, "bad");
        let err = Error::propagated(Box::new(io));

        let proximate = err.payload::<io::Error>().expect("io error");
        assert_eq!(proximate.kind(), io::ErrorKind::InvalidData);
        assert_eq!(proximate.to_string(), "bad");
    }

    #[test]
    fn no_route_reports_attribute_and_declared() {
        let err = Error::no_route(Some("404".into()), vec!["200".into(), "201".into()]);

        assert!(err.is_no_route());
        assert_eq!(err.unmatched_attribute(), Some(Some("404")));
        assert_eq!(
            err.declared_attributes(),
            Some(&["200".to_owned(), "201".to_owned()][..])
        );
        assert_eq!(
            err.to_string(),
            "no binding matched 404 (declared: [200, 201])"
        );
    }

    #[test]
    fn response_head_only_when_raised_from_response() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::RETRY_AFTER, "1".parse().unwrap());

        let err = Error::retry(StatusCode::SERVICE_UNAVAILABLE, headers);
        assert_eq!(err.status_code(), Some(StatusCode::SERVICE_UNAVAILABLE));
        assert!(err.response_headers().unwrap().contains_key("retry-after"));

        let err = Error::request(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert!(err.response_headers().is_none());
        assert!(err.status_code().is_none());
    }

    #[test]
    fn is_timeout() {
        let err = Error::request(io::Error::from(io::ErrorKind::TimedOut));
        assert!(err.is_timeout());
    }
}
