#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # rebound
//!
//! The `rebound` crate decides what happens to an HTTP [`Response`] once it
//! arrived, and whether a failed request is worth sending again.
//!
//! - Declarative [routing trees](#routing) over status, series, content type
//!   or any other attribute of a response
//! - [Nested dispatch](#nested-dispatch), with decorators rewriting the
//!   response on the way down
//! - Typed [captures](#capturing-values) and [JSON](#json) bodies
//! - [Retry decisions](#retries): idempotency detection and `Retry-After`
//!
//! Sending requests is not part of this crate. Hand it the response your
//! client of choice received, converted into an `http::Response`.
//!
//! ## Routing
//!
//! A [`RoutingTree`] asks its [`Navigator`](navigator::Navigator) for one
//! attribute of the response and runs the binding declared for it. If none
//! was declared, the wildcard binding runs. If there is no wildcard either,
//! dispatch fails with an error naming the attribute and every declared one.
//!
//! ```rust
//! use rebound::{any_status, navigator::status, on, route, Response, RoutingTree, StatusCode};
//!
//! let tree = RoutingTree::new(status(), vec![
//!     on(StatusCode::CREATED).call(route::location()),
//!     on(StatusCode::NO_CONTENT).call(route::pass()),
//!     any_status().call(route::retry()),
//! ])?;
//!
//! let response = http::Response::builder()
//!     .status(201)
//!     .header("location", "https://example.com/accounts/456")
//!     .body("")?;
//!
//! let url = tree.dispatch(Response::from(response))?.to::<rebound::Url>()?;
//! assert_eq!(url.path(), "/accounts/456");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Nested dispatch
//!
//! A binding may hand the response to another tree, typically navigating by
//! [`Series`] first and by exact status second. Use
//! [`dispatch_with`](binding::PartialBinding::dispatch_with) to decorate the
//! response before the nested tree sees it.
//!
//! ## Capturing values
//!
//! Routes such as [`route::capture_as`] keep a value; [`RoutingTree::dispatch`]
//! returns it as a [`Captured`] to be taken out with [`Captured::to`].
//!
//! ## JSON
//!
//! With the `json` feature (on by default), [`convert::Json`] deserializes
//! bodies, and [`convert::Problem`] turns `application/problem+json` bodies
//! into errors that [`route::propagate`] raises.
//!
//! ## Retries
//!
//! The [`retry`] module does not retry anything by itself. Its
//! [`Policy`](retry::Policy) tells the executor around the client whether a
//! failure is transient, whether the request is [idempotent](idempotency),
//! and how long to wait.
//!
//! ## Optional Features
//!
//! - **json** *(enabled by default)*: Provides JSON bodies, `Json<T>` and
//!   `Problem`.

pub use http::header;
pub use http::Method;
pub use http::{StatusCode, Version};
pub use url::Url;

mod error;

pub mod binding;
pub mod capture;
pub mod convert;
pub mod idempotency;
pub mod navigator;
pub mod request;
pub mod response;
pub mod retry;
pub mod route;
pub mod tree;

pub use self::binding::{
    any, any_content_type, any_series, any_status, any_status_code, on, Binding,
};
pub use self::capture::Captured;
pub use self::error::{BoxError, Error, Result};
pub use self::navigator::Series;
pub use self::request::RequestArguments;
pub use self::response::Response;
pub use self::tree::RoutingTree;

fn _assert_impls() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    fn assert_clone<T: Clone>() {}

    assert_send::<RoutingTree<navigator::Status>>();
    assert_sync::<RoutingTree<navigator::Status>>();
    assert_clone::<RoutingTree<navigator::Status>>();

    assert_send::<Response>();
    assert_send::<Captured>();

    assert_send::<retry::Policy>();
    assert_sync::<retry::Policy>();

    assert_send::<Error>();
    assert_sync::<Error>();
}
