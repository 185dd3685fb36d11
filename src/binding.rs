//! Bindings
//!
//! A [`Binding`] pairs an attribute, or the wildcard, with what to do when a
//! response has that attribute: run a [`Route`] or descend into a nested
//! [`RoutingTree`].
//!
//! ```
//! use rebound::{any_series, navigator::{series, status}, on, route, RoutingTree, Series, StatusCode};
//!
//! let tree = RoutingTree::new(series(), vec![
//!     on(Series::Successful).call(route::pass()),
//!     any_series().dispatch(RoutingTree::new(status(), vec![
//!         on(StatusCode::SERVICE_UNAVAILABLE).call(route::retry()),
//!     ])?),
//! ])?;
//! # drop(tree);
//! # Ok::<(), rebound::Error>(())
//! ```

use std::{fmt, sync::Arc};

use http::StatusCode;
use mime::Mime;

use crate::{
    navigator::{Navigator, Series},
    route::{Decorator, Route},
    tree::Dispatch,
    Captured, Response, RoutingTree,
};

/// A rule of a routing tree.
pub struct Binding<A> {
    attribute: Option<A>,
    action: Action,
}

#[derive(Clone)]
enum Action {
    Route(Route),
    Dispatch {
        decorator: Option<Decorator>,
        tree: Arc<dyn Dispatch>,
    },
}

/// A binding that still needs an action.
///
/// Created by [`on`] and [`any`].
#[must_use]
#[derive(Debug)]
pub struct PartialBinding<A> {
    attribute: Option<A>,
}

impl<A> PartialBinding<A> {
    /// Run `route` when this binding matches.
    pub fn call(self, route: Route) -> Binding<A> {
        self.bind(Action::Route(route))
    }

    /// Dispatch the response to a nested tree when this binding matches.
    pub fn dispatch<N: Navigator>(self, tree: RoutingTree<N>) -> Binding<A> {
        self.bind(Action::Dispatch {
            decorator: None,
            tree: Arc::new(tree),
        })
    }

    /// Decorate the response, then dispatch it to a nested tree.
    pub fn dispatch_with<N: Navigator>(
        self,
        decorator: Decorator,
        tree: RoutingTree<N>,
    ) -> Binding<A> {
        self.bind(Action::Dispatch {
            decorator: Some(decorator),
            tree: Arc::new(tree),
        })
    }

    fn bind(self, action: Action) -> Binding<A> {
        Binding {
            attribute: self.attribute,
            action,
        }
    }
}

impl<A> Binding<A> {
    /// The attribute this binding matches, `None` for the wildcard.
    pub fn attribute(&self) -> Option<&A> {
        self.attribute.as_ref()
    }

    /// Returns true if this binding matches any attribute.
    pub fn is_wildcard(&self) -> bool {
        self.attribute.is_none()
    }

    pub(crate) fn execute(&self, response: Response) -> crate::Result<Captured> {
        match self.action {
            Action::Route(ref route) => route.execute(response),
            Action::Dispatch {
                ref decorator,
                ref tree,
            } => {
                let response = match decorator {
                    Some(decorator) => decorator.apply(response)?,
                    None => response,
                };
                tree.dispatch(response)
            }
        }
    }
}

impl<A: Clone> Clone for Binding<A> {
    fn clone(&self) -> Self {
        Binding {
            attribute: self.attribute.clone(),
            action: self.action.clone(),
        }
    }
}

impl<A: fmt::Debug> fmt::Debug for Binding<A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = f.debug_struct("Binding");
        match self.attribute {
            Some(ref attribute) => builder.field("attribute", attribute),
            None => builder.field("attribute", &format_args!("*")),
        };
        match self.action {
            Action::Route(ref route) => builder.field("route", route),
            Action::Dispatch { .. } => builder.field("route", &format_args!("Dispatch")),
        };
        builder.finish()
    }
}

/// Bind `attribute`.
pub fn on<A>(attribute: A) -> PartialBinding<A> {
    PartialBinding {
        attribute: Some(attribute),
    }
}

/// Bind every attribute no other binding of the tree matches.
pub fn any<A>() -> PartialBinding<A> {
    PartialBinding { attribute: None }
}

/// Wildcard for trees built on [`status`](crate::navigator::status).
pub fn any_status() -> PartialBinding<StatusCode> {
    any()
}

/// Wildcard for trees built on [`status_code`](crate::navigator::status_code).
pub fn any_status_code() -> PartialBinding<u16> {
    any()
}

/// Wildcard for trees built on [`series`](crate::navigator::series).
pub fn any_series() -> PartialBinding<Series> {
    any()
}

/// Wildcard for trees built on [`content_type`](crate::navigator::content_type).
pub fn any_content_type() -> PartialBinding<Mime> {
    any()
}
