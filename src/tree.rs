//! Routing trees
//!
//! A [`RoutingTree`] navigates a response once, then runs the first binding
//! whose attribute equals the navigated one. When no attribute matches, the
//! wildcard binding runs; without a wildcard the dispatch fails with an
//! error reporting the attribute and every declared binding.
//!
//! Trees are validated when they are built and immutable afterwards, so a
//! single tree can serve any number of concurrent dispatches.

use std::{fmt, sync::Arc};

use log::{debug, trace};

use crate::{binding::Binding, error::Error, navigator::Navigator, Captured, Response};

/// Dispatches a response to exactly one route.
///
/// Implemented by every [`RoutingTree`]; nested trees are stored behind this
/// trait so that each level can branch on a different attribute type.
pub trait Dispatch: Send + Sync {
    /// Route `response` and return what the selected route captured.
    fn dispatch(&self, response: Response) -> crate::Result<Captured>;
}

/// An ordered set of bindings sharing one navigator.
pub struct RoutingTree<N: Navigator> {
    navigator: Arc<N>,
    bindings: Vec<Binding<N::Attribute>>,
    wildcard: Option<Binding<N::Attribute>>,
}

impl<N: Navigator> RoutingTree<N> {
    /// Create a tree from `bindings`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::is_builder`] if `bindings` is empty or contains
    /// more than one wildcard.
    pub fn new(navigator: N, bindings: Vec<Binding<N::Attribute>>) -> crate::Result<Self> {
        let mut tree = RoutingTree {
            navigator: Arc::new(navigator),
            bindings: Vec::with_capacity(bindings.len()),
            wildcard: None,
        };

        for binding in bindings {
            tree.insert(binding, false)?;
        }

        if tree.bindings.is_empty() && tree.wildcard.is_none() {
            return Err(Error::builder("routing tree needs at least one binding"));
        }

        Ok(tree)
    }

    /// Start building a tree on `navigator`.
    pub fn builder(navigator: N) -> Builder<N> {
        Builder {
            navigator,
            bindings: Vec::new(),
        }
    }

    /// The navigator this tree branches on.
    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    /// The bindings of this tree in evaluation order, wildcard last.
    pub fn bindings(&self) -> impl Iterator<Item = &Binding<N::Attribute>> {
        self.bindings.iter().chain(self.wildcard.iter())
    }

    /// Returns a new tree with `bindings` merged into this one.
    ///
    /// A binding replaces the existing binding for the same attribute in
    /// place, or the existing wildcard; all others are appended. `self` is
    /// left untouched.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::is_builder`] if `bindings` itself contains more
    /// than one wildcard.
    pub fn merge(&self, bindings: Vec<Binding<N::Attribute>>) -> crate::Result<Self> {
        let mut tree = self.clone();
        let mut merged_wildcard = false;

        for binding in bindings {
            if binding.is_wildcard() {
                if merged_wildcard {
                    return Err(Error::builder("multiple wildcard bindings"));
                }
                merged_wildcard = true;
            }
            tree.insert(binding, true)?;
        }

        Ok(tree)
    }

    fn insert(&mut self, binding: Binding<N::Attribute>, replace: bool) -> crate::Result<()> {
        if binding.is_wildcard() {
            if self.wildcard.is_some() && !replace {
                return Err(Error::builder("multiple wildcard bindings"));
            }
            self.wildcard = Some(binding);
            return Ok(());
        }

        if replace {
            let existing = self
                .bindings
                .iter_mut()
                .find(|existing| existing.attribute() == binding.attribute());
            if let Some(existing) = existing {
                *existing = binding;
                return Ok(());
            }
        }

        self.bindings.push(binding);
        Ok(())
    }

    /// Route `response` and return what the selected route captured.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::is_no_route`] if neither a binding nor a wildcard
    /// matches, and with whatever error the selected route or a nested tree
    /// produced.
    pub fn dispatch(&self, response: Response) -> crate::Result<Captured> {
        let attribute = self.navigator.attribute(&response);
        trace!("navigated to {attribute:?}");

        let binding = attribute
            .as_ref()
            .and_then(|attribute| {
                self.bindings
                    .iter()
                    .find(|binding| binding.attribute() == Some(attribute))
            })
            .or(self.wildcard.as_ref());

        match binding {
            Some(binding) => {
                trace!("selected {binding:?}");
                binding.execute(response)
            }
            None => {
                let declared = self
                    .bindings
                    .iter()
                    .filter_map(Binding::attribute)
                    .map(|attribute| format!("{attribute:?}"))
                    .collect::<Vec<_>>();
                debug!("no binding for {attribute:?} among {declared:?}");
                Err(Error::no_route(
                    attribute.map(|attribute| format!("{attribute:?}")),
                    declared,
                ))
            }
        }
    }
}

impl<N: Navigator> Dispatch for RoutingTree<N> {
    fn dispatch(&self, response: Response) -> crate::Result<Captured> {
        RoutingTree::dispatch(self, response)
    }
}

impl<N: Navigator> Clone for RoutingTree<N> {
    fn clone(&self) -> Self {
        RoutingTree {
            navigator: self.navigator.clone(),
            bindings: self.bindings.clone(),
            wildcard: self.wildcard.clone(),
        }
    }
}

impl<N: Navigator> fmt::Debug for RoutingTree<N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RoutingTree")
            .field("navigator", &std::any::type_name::<N>())
            .field("bindings", &self.bindings().collect::<Vec<_>>())
            .finish()
    }
}

/// A builder to construct a [`RoutingTree`] one binding at a time.
#[must_use]
pub struct Builder<N: Navigator> {
    navigator: N,
    bindings: Vec<Binding<N::Attribute>>,
}

impl<N: Navigator> Builder<N> {
    /// Add a binding.
    pub fn bind(mut self, binding: Binding<N::Attribute>) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Validate the bindings and build the tree.
    ///
    /// Fails under the same conditions as [`RoutingTree::new`].
    pub fn build(self) -> crate::Result<RoutingTree<N>> {
        RoutingTree::new(self.navigator, self.bindings)
    }
}

impl<N: Navigator> fmt::Debug for Builder<N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Builder")
            .field("bindings", &self.bindings)
            .finish()
    }
}
