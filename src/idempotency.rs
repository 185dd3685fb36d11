//! Idempotency
//!
//! A request that failed may only be sent again if doing so cannot change
//! the server's state beyond what the first attempt did. A
//! [`MethodDetector`] makes that call for a [`RequestArguments`].
//!
//! [`is_idempotent`] combines the two detectors that are always safe to
//! apply: methods that are idempotent by definition, and requests guarded
//! by a precondition (`If-Match`, `If-None-Match`, `If-Unmodified-Since`),
//! which the server rejects instead of applying twice.

use std::{fmt, sync::Arc};

use http::{
    header::{HeaderName, IF_MATCH, IF_NONE_MATCH, IF_UNMODIFIED_SINCE},
    Method,
};

use crate::RequestArguments;

/// Decides whether a request is idempotent.
pub trait MethodDetector: Send + Sync + 'static {
    /// Returns true if `arguments` describe an idempotent request.
    fn test(&self, arguments: &RequestArguments) -> bool;
}

// For Future Whoever: a blanket impl for closures would clash with the
// detectors below, so closures go through `MethodDetectorFn`.
/// A detector backed by a function.
pub struct MethodDetectorFn<F>(F);

impl<F> MethodDetector for MethodDetectorFn<F>
where
    F: Fn(&RequestArguments) -> bool + Send + Sync + 'static,
{
    fn test(&self, arguments: &RequestArguments) -> bool {
        (self.0)(arguments)
    }
}

impl<F> fmt::Debug for MethodDetectorFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MethodDetectorFn").finish()
    }
}

/// Create a detector from a function.
pub fn method_detector_fn<F>(func: F) -> MethodDetectorFn<F>
where
    F: Fn(&RequestArguments) -> bool + Send + Sync + 'static,
{
    MethodDetectorFn(func)
}

/// Methods that are idempotent by definition: `GET`, `HEAD`, `PUT`,
/// `DELETE`, `OPTIONS` and `TRACE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultIdempotentMethodDetector;

impl MethodDetector for DefaultIdempotentMethodDetector {
    fn test(&self, arguments: &RequestArguments) -> bool {
        arguments.method().is_idempotent()
    }
}

/// Requests carrying `If-Match`, `If-None-Match` or `If-Unmodified-Since`,
/// whatever their value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionalIdempotentMethodDetector;

impl MethodDetector for ConditionalIdempotentMethodDetector {
    fn test(&self, arguments: &RequestArguments) -> bool {
        let headers = arguments.headers();
        headers.contains_key(IF_MATCH)
            || headers.contains_key(IF_NONE_MATCH)
            || headers.contains_key(IF_UNMODIFIED_SINCE)
    }
}

/// `POST` requests tunneling an idempotent method through
/// `X-HTTP-Method-Override`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverrideIdempotentMethodDetector;

const X_HTTP_METHOD_OVERRIDE: HeaderName = HeaderName::from_static("x-http-method-override");

impl MethodDetector for OverrideIdempotentMethodDetector {
    fn test(&self, arguments: &RequestArguments) -> bool {
        if arguments.method() != Method::POST {
            return false;
        }

        arguments
            .headers()
            .get(X_HTTP_METHOD_OVERRIDE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Method::from_bytes(value.trim().as_bytes()).ok())
            .map_or(false, |method| method.is_idempotent())
    }
}

/// Idempotent if any of its detectors says so.
#[derive(Clone, Default)]
pub struct CompoundMethodDetector {
    detectors: Vec<Arc<dyn MethodDetector>>,
}

impl CompoundMethodDetector {
    /// Create a detector that never reports idempotency until detectors are
    /// added.
    pub fn new() -> Self {
        CompoundMethodDetector::default()
    }

    /// Add a detector.
    pub fn with<D: MethodDetector>(mut self, detector: D) -> Self {
        self.detectors.push(Arc::new(detector));
        self
    }
}

impl MethodDetector for CompoundMethodDetector {
    fn test(&self, arguments: &RequestArguments) -> bool {
        self.detectors
            .iter()
            .any(|detector| detector.test(arguments))
    }
}

impl fmt::Debug for CompoundMethodDetector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CompoundMethodDetector")
            .field("detectors", &self.detectors.len())
            .finish()
    }
}

/// The detector used by [`is_idempotent`] and the default retry
/// [`Policy`](crate::retry::Policy).
pub fn default_detector() -> CompoundMethodDetector {
    CompoundMethodDetector::new()
        .with(DefaultIdempotentMethodDetector)
        .with(ConditionalIdempotentMethodDetector)
}

/// Returns true if the request may be sent again after a failure.
pub fn is_idempotent(arguments: &RequestArguments) -> bool {
    DefaultIdempotentMethodDetector.test(arguments)
        || ConditionalIdempotentMethodDetector.test(arguments)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATE: &str = "Sat, 29 Oct 1994 19:43:31 GMT";

    fn arguments(method: Method, name: &str, value: &str) -> RequestArguments {
        RequestArguments::new()
            .with_method(method)
            .with_header(name, value)
            .unwrap()
    }

    #[test]
    fn test_conditional_detector() {
        let idempotent = [
            ("If-Match", "xyzzy"),
            ("if-match", "xyzzy"),
            ("If-None-Match", "*"),
            ("if-none-match", "*"),
            ("If-None-Match", "xyzzy"),
            ("If-Unmodified-Since", DATE),
            ("if-unmodified-since", DATE),
        ];
        for (name, value) in idempotent {
            let args = arguments(Method::POST, name, value);
            assert!(
                ConditionalIdempotentMethodDetector.test(&args),
                "{name}: {value}"
            );
        }

        let not_idempotent = [("If-Modified-Since", DATE), ("Date", DATE)];
        for (name, value) in not_idempotent {
            let args = arguments(Method::POST, name, value);
            assert!(
                !ConditionalIdempotentMethodDetector.test(&args),
                "{name}: {value}"
            );
        }
    }

    #[test]
    fn test_idempotent_methods_regardless_of_headers() {
        for method in [Method::GET, Method::HEAD, Method::PUT, Method::DELETE] {
            assert!(is_idempotent(
                &RequestArguments::new().with_method(method.clone())
            ));
            assert!(is_idempotent(&arguments(method, "Date", DATE)));
        }
        assert!(is_idempotent(
            &RequestArguments::new().with_method(Method::OPTIONS)
        ));
        assert!(is_idempotent(
            &RequestArguments::new().with_method(Method::TRACE)
        ));
    }

    #[test]
    fn test_post_and_patch_need_preconditions() {
        for method in [Method::POST, Method::PATCH] {
            assert!(!is_idempotent(
                &RequestArguments::new().with_method(method.clone())
            ));
            assert!(!is_idempotent(&arguments(
                method.clone(),
                "If-Modified-Since",
                DATE
            )));
            assert!(is_idempotent(&arguments(method.clone(), "if-match", "xyzzy")));
            assert!(is_idempotent(&arguments(method, "If-None-Match", "*")));
        }
    }

    #[test]
    fn test_override_detector() {
        let detector = OverrideIdempotentMethodDetector;
        assert!(detector.test(&arguments(Method::POST, "X-HTTP-Method-Override", "GET")));
        assert!(!detector.test(&arguments(
            Method::POST,
            "X-HTTP-Method-Override",
            "PATCH"
        )));
        assert!(!detector.test(&arguments(Method::PUT, "X-HTTP-Method-Override", "GET")));
        assert!(!detector.test(&RequestArguments::new().with_method(Method::POST)));
    }

    #[test]
    fn test_compound_detector() {
        let post = RequestArguments::new().with_method(Method::POST);
        assert!(!CompoundMethodDetector::new().test(&post));
        assert!(!default_detector().test(&post));

        let detector = default_detector().with(method_detector_fn(|args: &RequestArguments| {
            args.headers().contains_key("idempotency-key")
        }));
        let keyed = arguments(Method::POST, "Idempotency-Key", "8e03978e");
        assert!(detector.test(&keyed));
        assert!(!is_idempotent(&keyed));
    }
}
