use std::{fmt, sync::Arc};

use crate::Error;

/// Decides whether a failure may be retried.
pub trait Classify: Send + Sync + 'static {
    /// Classifies `error`.
    fn classify(&self, error: &Error) -> Action;
}

// For Future Whoever: a blanket impl for closures causes inference issues
// at the call site, every closure would need `: &Error` in its arguments.
/// A classifier backed by a function.
pub struct ClassifyFn<F>(pub(crate) F);

impl<F> Classify for ClassifyFn<F>
where
    F: Fn(&Error) -> Action + Send + Sync + 'static,
{
    fn classify(&self, error: &Error) -> Action {
        (self.0)(error)
    }
}

impl<F> fmt::Debug for ClassifyFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ClassifyFn").finish()
    }
}

/// The outcome of classifying a failure.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// The failure is transient; another attempt may succeed.
    Retryable,
    /// The failure is final.
    Fatal,
}

#[derive(Clone)]
pub(crate) enum Classifier {
    /// Never retry.
    Never,
    /// Retry routes, server errors and transport failures.
    Transient,
    /// Custom classification logic.
    Dyn(Arc<dyn Classify>),
}

impl Classifier {
    pub(super) fn classify(&self, error: &Error) -> Action {
        match self {
            Classifier::Never => Action::Fatal,
            Classifier::Transient => {
                if is_transient(error) {
                    Action::Retryable
                } else {
                    Action::Fatal
                }
            }
            Classifier::Dyn(c) => c.classify(error),
        }
    }
}

fn is_transient(error: &Error) -> bool {
    if error.is_retry() || error.is_request() {
        return true;
    }

    error.is_status()
        && error
            .status_code()
            .map_or(false, |status| status.is_server_error())
}
