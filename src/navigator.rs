//! Navigators
//!
//! A [`Navigator`] extracts the attribute a [`RoutingTree`] branches on.
//! Navigators only look at the status line and the headers of a response,
//! never at its body, so the body is still available to the route that is
//! eventually selected.
//!
//! The built-in navigators cover the status code, its [`Series`], the
//! content type, the reason phrase and arbitrary headers. Anything else can
//! be expressed with [`navigator_fn`].
//!
//! [`RoutingTree`]: crate::RoutingTree

use std::{fmt, marker::PhantomData};

use http::{header::HeaderName, StatusCode};
use mime::Mime;

use crate::Response;

/// Extracts a typed attribute from a response.
pub trait Navigator: Send + Sync + 'static {
    /// The attribute bindings are keyed by.
    type Attribute: PartialEq + Clone + fmt::Debug + Send + Sync + 'static;

    /// Returns the attribute of `response`, or `None` if it has none.
    ///
    /// A response without attribute can only be matched by a wildcard.
    fn attribute(&self, response: &Response) -> Option<Self::Attribute>;
}

/// The class of a status code, given by its first digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Series {
    /// `1xx`
    Informational,
    /// `2xx`
    Successful,
    /// `3xx`
    Redirection,
    /// `4xx`
    ClientError,
    /// `5xx`
    ServerError,
}

impl Series {
    /// Returns the series of `status`, or `None` for codes outside `100..=599`.
    pub fn of(status: StatusCode) -> Option<Series> {
        match status.as_u16() / 100 {
            1 => Some(Series::Informational),
            2 => Some(Series::Successful),
            3 => Some(Series::Redirection),
            4 => Some(Series::ClientError),
            5 => Some(Series::ServerError),
            _ => None,
        }
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let digit = match self {
            Series::Informational => 1,
            Series::Successful => 2,
            Series::Redirection => 3,
            Series::ClientError => 4,
            Series::ServerError => 5,
        };
        write!(f, "{digit}xx")
    }
}

/// Navigates to the [`StatusCode`] of a response.
#[derive(Debug, Clone, Copy, Default)]
pub struct Status;

/// Navigates to the raw numeric status code, including non-standard ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusCodeNumber;

/// Navigates to the [`Series`] of the status code.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesOf;

/// Navigates to the canonical reason phrase of the status code.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReasonPhrase;

/// Navigates to the media type of the `Content-Type` header, without
/// parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentType;

/// Navigates to the first value of a header.
#[derive(Debug, Clone)]
pub struct Header {
    name: HeaderName,
}

impl Navigator for Status {
    type Attribute = StatusCode;

    fn attribute(&self, response: &Response) -> Option<StatusCode> {
        Some(response.status())
    }
}

impl Navigator for StatusCodeNumber {
    type Attribute = u16;

    fn attribute(&self, response: &Response) -> Option<u16> {
        Some(response.status().as_u16())
    }
}

impl Navigator for SeriesOf {
    type Attribute = Series;

    fn attribute(&self, response: &Response) -> Option<Series> {
        Series::of(response.status())
    }
}

impl Navigator for ReasonPhrase {
    type Attribute = &'static str;

    fn attribute(&self, response: &Response) -> Option<&'static str> {
        response.status().canonical_reason()
    }
}

impl Navigator for ContentType {
    type Attribute = Mime;

    fn attribute(&self, response: &Response) -> Option<Mime> {
        let mime = response.content_type()?;
        if mime.params().next().is_none() {
            return Some(mime);
        }
        mime.essence_str().parse().ok()
    }
}

impl Navigator for Header {
    type Attribute = String;

    fn attribute(&self, response: &Response) -> Option<String> {
        let value = response.headers().get(&self.name)?;
        value.to_str().ok().map(str::to_owned)
    }
}

/// A navigator backed by a function.
pub struct NavigatorFn<F, A> {
    func: F,
    _attribute: PhantomData<fn() -> A>,
}

impl<F, A> Navigator for NavigatorFn<F, A>
where
    F: Fn(&Response) -> Option<A> + Send + Sync + 'static,
    A: PartialEq + Clone + fmt::Debug + Send + Sync + 'static,
{
    type Attribute = A;

    fn attribute(&self, response: &Response) -> Option<A> {
        (self.func)(response)
    }
}

impl<F, A> fmt::Debug for NavigatorFn<F, A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("NavigatorFn").finish()
    }
}

/// Branch on the exact [`StatusCode`].
pub fn status() -> Status {
    Status
}

/// Branch on the numeric status code.
pub fn status_code() -> StatusCodeNumber {
    StatusCodeNumber
}

/// Branch on the status [`Series`].
pub fn series() -> SeriesOf {
    SeriesOf
}

/// Branch on the canonical reason phrase.
pub fn reason_phrase() -> ReasonPhrase {
    ReasonPhrase
}

/// Branch on the media type of the response.
pub fn content_type() -> ContentType {
    ContentType
}

/// Branch on the first value of the header `name`.
///
/// Values that are not visible ASCII count as absent.
pub fn header(name: HeaderName) -> Header {
    Header { name }
}

/// Branch on an attribute computed by `func`.
///
/// # Example
///
/// ```
/// use rebound::navigator::navigator_fn;
///
/// // branch on whether the server sent a body at all
/// let has_body = navigator_fn(|response| Some(!response.is_empty()));
/// ```
pub fn navigator_fn<F, A>(func: F) -> NavigatorFn<F, A>
where
    F: Fn(&Response) -> Option<A> + Send + Sync + 'static,
{
    NavigatorFn {
        func,
        _attribute: PhantomData,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, content_type: Option<&str>) -> Response {
        let mut builder = http::Response::builder().status(status);
        if let Some(content_type) = content_type {
            builder = builder.header("content-type", content_type);
        }
        Response::from(builder.body(bytes::Bytes::new()).unwrap())
    }

    #[test]
    fn test_series() {
        assert_eq!(
            series().attribute(&response(101, None)),
            Some(Series::Informational)
        );
        assert_eq!(
            series().attribute(&response(204, None)),
            Some(Series::Successful)
        );
        assert_eq!(
            series().attribute(&response(304, None)),
            Some(Series::Redirection)
        );
        assert_eq!(
            series().attribute(&response(422, None)),
            Some(Series::ClientError)
        );
        assert_eq!(
            series().attribute(&response(503, None)),
            Some(Series::ServerError)
        );
        assert_eq!(series().attribute(&response(999, None)), None);
    }

    #[test]
    fn test_status_and_status_code() {
        let res = response(418, None);
        assert_eq!(status().attribute(&res), Some(StatusCode::IM_A_TEAPOT));
        assert_eq!(status_code().attribute(&res), Some(418));
        assert_eq!(reason_phrase().attribute(&res), Some("I'm a teapot"));
    }

    #[test]
    fn test_content_type_strips_parameters() {
        let res = response(200, Some("application/json; charset=utf-8"));
        assert_eq!(
            content_type().attribute(&res),
            Some(mime::APPLICATION_JSON)
        );

        let res = response(200, Some("not a media type"));
        assert_eq!(content_type().attribute(&res), None);

        let res = response(200, None);
        assert_eq!(content_type().attribute(&res), None);
    }

    #[test]
    fn test_header() {
        let res = Response::from(
            http::Response::builder()
                .header("x-mode", "fast")
                .header("x-mode", "slow")
                .body(bytes::Bytes::new())
                .unwrap(),
        );

        let nav = header(HeaderName::from_static("x-mode"));
        assert_eq!(nav.attribute(&res), Some("fast".to_owned()));

        let nav = header(HeaderName::from_static("x-other"));
        assert_eq!(nav.attribute(&res), None);
    }

    #[test]
    fn test_navigator_fn() {
        let nav = navigator_fn(|res: &Response| Some(res.status().is_success()));
        assert_eq!(nav.attribute(&response(200, None)), Some(true));
        assert_eq!(nav.attribute(&response(500, None)), Some(false));
    }

    #[test]
    fn test_series_display() {
        assert_eq!(Series::ClientError.to_string(), "4xx");
    }
}
