//! Routes
//!
//! A [`Route`] is what a binding does with a response once it matched.
//! Routes either consume the body ([`call`], [`call_response`]), keep a value for the caller
//! ([`capture`], [`capture_as`], [`capture_map`]), raise the body as a
//! failure ([`propagate`]), ask for another attempt ([`retry`]), or do
//! nothing at all ([`pass`]).
//!
//! A [`Decorator`] rewrites a response before it reaches a route or a
//! nested tree, e.g. [`resolve_against`] to make `Location` absolute.

use std::{fmt, sync::Arc};

use http::{
    header::{HeaderName, CONTENT_LOCATION, LOCATION},
    HeaderMap, HeaderValue,
};
use log::trace;
use url::Url;

use crate::{
    convert::FromResponse,
    error::{BoxError, Error},
    response::Entity,
    Captured, Response,
};

type Handler = Arc<dyn Fn(Response) -> crate::Result<Captured> + Send + Sync>;

/// A terminal action of a routing tree.
#[derive(Clone)]
pub struct Route {
    inner: RouteKind,
}

#[derive(Clone)]
enum RouteKind {
    Pass,
    Call(Handler),
    Capture(Handler),
    Propagate(Handler),
    Retry,
    Decorated(Decorator, Box<Route>),
}

impl Route {
    fn new(inner: RouteKind) -> Route {
        Route { inner }
    }

    /// Runs this route against `response`.
    pub fn execute(&self, response: Response) -> crate::Result<Captured> {
        match self.inner {
            RouteKind::Pass => Ok(Captured::empty()),
            RouteKind::Call(ref handler)
            | RouteKind::Capture(ref handler)
            | RouteKind::Propagate(ref handler) => handler(response),
            RouteKind::Retry => {
                trace!("response {} asks for a retry", response.status());
                let status = response.status();
                let (parts, _) = response.into_parts();
                Err(Error::retry(status, parts.headers))
            }
            RouteKind::Decorated(ref decorator, ref route) => {
                route.execute(decorator.apply(response)?)
            }
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.inner {
            RouteKind::Pass => f.write_str("Pass"),
            RouteKind::Call(_) => f.write_str("Call"),
            RouteKind::Capture(_) => f.write_str("Capture"),
            RouteKind::Propagate(_) => f.write_str("Propagate"),
            RouteKind::Retry => f.write_str("Retry"),
            RouteKind::Decorated(_, ref route) => f.debug_tuple("Decorated").field(route).finish(),
        }
    }
}

/// A transformation applied to a response before it is routed further.
///
/// The decorated response is a new value; the original is consumed, never
/// shared.
#[derive(Clone)]
pub struct Decorator {
    func: Arc<dyn Fn(Response) -> crate::Result<Response> + Send + Sync>,
}

impl Decorator {
    /// Create a decorator from a function.
    pub fn new<F>(func: F) -> Decorator
    where
        F: Fn(Response) -> crate::Result<Response> + Send + Sync + 'static,
    {
        Decorator {
            func: Arc::new(func),
        }
    }

    /// Apply this decorator to `response`.
    pub fn apply(&self, response: Response) -> crate::Result<Response> {
        (self.func)(response)
    }

    /// Returns a route that decorates the response, then runs `route`.
    pub fn and_then(self, route: Route) -> Route {
        Route::new(RouteKind::Decorated(self, Box::new(route)))
    }
}

impl fmt::Debug for Decorator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Decorator").finish()
    }
}

/// Completes the dispatch without a value.
pub fn pass() -> Route {
    Route::new(RouteKind::Pass)
}

/// Converts the response into `T` and hands it to `consumer`.
///
/// Nothing is captured; use `Response` as `T` to receive the raw response.
pub fn call<T, F>(consumer: F) -> Route
where
    T: FromResponse,
    F: Fn(T) + Send + Sync + 'static,
{
    Route::new(RouteKind::Call(Arc::new(move |response: Response| {
        consumer(T::from_response(response)?);
        Ok(Captured::empty())
    })))
}

/// Hands the raw response to `consumer`.
pub fn call_response<F>(consumer: F) -> Route
where
    F: Fn(Response) + Send + Sync + 'static,
{
    call::<Response, F>(consumer)
}

/// Captures the raw response.
pub fn capture() -> Route {
    capture_as::<Response>()
}

/// Converts the response into `T` and captures it.
pub fn capture_as<T>() -> Route
where
    T: FromResponse,
{
    Route::new(RouteKind::Capture(Arc::new(|response: Response| {
        trace!("capturing {}", std::any::type_name::<T>());
        T::from_response(response).map(Captured::of)
    })))
}

/// Converts the response into `T`, maps it together with the status and
/// headers, and captures the result.
///
/// # Example
///
/// ```
/// use rebound::{response::Entity, route};
///
/// // keep the body together with its ETag
/// let route = route::capture_map(|entity: Entity<String>| {
///     let etag = entity
///         .headers()
///         .get("etag")
///         .and_then(|v| v.to_str().ok())
///         .map(str::to_owned);
///     (etag, entity.into_body())
/// });
/// # drop(route);
/// ```
pub fn capture_map<T, U, F>(mapper: F) -> Route
where
    T: FromResponse,
    U: Send + 'static,
    F: Fn(Entity<T>) -> U + Send + Sync + 'static,
{
    Route::new(RouteKind::Capture(Arc::new(move |response: Response| {
        let status = response.status();
        let headers = response.headers().clone();
        let body = T::from_response(response)?;
        Ok(Captured::of(mapper(Entity::new(status, headers, body))))
    })))
}

/// Captures the response headers as a `HeaderMap`.
pub fn headers() -> Route {
    capture_as::<HeaderMap>()
}

/// Captures the `Location` header as a `Url`.
///
/// Relative values are resolved against the response's url. A missing or
/// unresolvable header is a decode error.
pub fn location() -> Route {
    capture_header_url(LOCATION)
}

/// Captures the `Content-Location` header as a `Url`.
///
/// Follows the same rules as [`location`].
pub fn content_location() -> Route {
    capture_header_url(CONTENT_LOCATION)
}

fn capture_header_url(name: HeaderName) -> Route {
    Route::new(RouteKind::Capture(Arc::new(move |response: Response| {
        let value = response
            .headers()
            .get(&name)
            .ok_or_else(|| Error::decode(format!("missing {name} header")))?;
        let value = value.to_str().map_err(Error::decode)?;

        Url::options()
            .base_url(response.url())
            .parse(value)
            .map(Captured::of)
            .map_err(Error::decode)
    })))
}

/// Converts the response into `T` and fails the dispatch with it.
///
/// The resulting error reports an `io::Error` as its proximate cause and the
/// converted body behind it, retrievable with [`Error::payload`]. If `T` is
/// itself an `io::Error` it becomes the proximate cause as is. The error
/// keeps the response's status and headers. A body that cannot be converted
/// fails with the conversion error instead.
pub fn propagate<T>() -> Route
where
    T: FromResponse + Into<BoxError>,
{
    Route::new(RouteKind::Propagate(Arc::new(|response: Response| {
        let status = response.status();
        let headers = response.headers().clone();
        let payload = T::from_response(response)?;
        Err(Error::propagated(payload.into()).with_head(status, headers))
    })))
}

/// Fails the dispatch with a retry request carrying the response's status
/// and headers.
///
/// The body is released without being read.
pub fn retry() -> Route {
    Route::new(RouteKind::Retry)
}

/// Resolves relative `Location` and `Content-Location` headers against
/// `base`.
///
/// Responses without such headers pass through unchanged.
pub fn resolve_against(base: Url) -> Decorator {
    Decorator::new(move |mut response| {
        for name in [LOCATION, CONTENT_LOCATION] {
            resolve_header(response.headers_mut(), &name, &base)?;
        }
        Ok(response)
    })
}

fn resolve_header(headers: &mut HeaderMap, name: &HeaderName, base: &Url) -> crate::Result<()> {
    let mut resolved = Vec::new();
    for value in headers.get_all(name) {
        let value = value.to_str().map_err(Error::decode)?;
        let url = base.join(value).map_err(Error::decode)?;
        resolved.push(HeaderValue::from_str(url.as_str()).map_err(Error::decode)?);
    }

    if resolved.is_empty() {
        return Ok(());
    }

    trace!("resolved {name} against {base}");
    headers.remove(name);
    for value in resolved {
        headers.append(name.clone(), value);
    }
    Ok(())
}
