//! Retry decisions
//!
//! Routing turns responses into failures: a [`retry`](crate::route::retry)
//! route, an unsuccessful status, a transport error. Whether such a failure
//! is worth another attempt, and how long to wait before it, is answered
//! here. The executor that actually waits and sends again lives outside of
//! this crate and consults a [`Policy`] after every failed attempt.
//!
//! # Defaults
//!
//! The default policy retries up to 2 times, only for idempotent requests
//! (see [`is_idempotent`](crate::idempotency::is_idempotent)), and only for
//! transient failures: `retry` routes, 5xx statuses and transport errors.
//! It honors `Retry-After` and otherwise waits a fixed delay.
//!
//! # Retry-After
//!
//! [`RetryAfterDelayFunction`] reads the delay from the failed response,
//! either as seconds or as an HTTP date relative to an injected [`Clock`].
//!
//! ```
//! use std::time::{Duration, SystemTime};
//!
//! use rebound::{
//!     retry::{DelayFunction, FixedClock, RetryAfterDelayFunction},
//!     Error, StatusCode,
//! };
//!
//! let mut headers = rebound::header::HeaderMap::new();
//! headers.insert("retry-after", "Wed, 11 Apr 2018 22:34:28 GMT".parse()?);
//! let error = Error::status(StatusCode::SERVICE_UNAVAILABLE, headers);
//!
//! let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_523_486_067);
//! let delay = RetryAfterDelayFunction::with_clock(FixedClock::new(now)).delay_for(&error);
//! assert_eq!(delay, Some(Duration::from_secs(1)));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod circuit;
mod classify;
mod delay;

use std::{fmt, sync::Arc, time::Duration};

use log::{debug, trace};

pub use self::{
    circuit::CircuitBreaker,
    classify::{Action, Classify, ClassifyFn},
    delay::{
        retry_after_delay, Clock, DelayFunction, FixedClock, RetryAfter, RetryAfterDelayFunction,
        SystemClock,
    },
};
use self::classify::Classifier;
use crate::{
    idempotency::{default_detector, MethodDetector},
    Error, RequestArguments,
};

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Send the request again after waiting this long.
    Retry(Duration),
    /// Report the failure to the caller.
    GiveUp,
}

impl Decision {
    /// Returns true if another attempt should be made.
    pub fn is_retry(&self) -> bool {
        matches!(self, Decision::Retry(_))
    }
}

/// A retry policy.
#[derive(Clone)]
pub struct Policy {
    classifier: Classifier,
    max_retries: u32,
    delay: Duration,
    backoff: Option<Backoff>,
    delay_fn: Option<Arc<dyn DelayFunction>>,
    detector: Arc<dyn MethodDetector>,
    breaker: Option<Arc<dyn CircuitBreaker>>,
}

#[derive(Debug, Clone, Copy)]
struct Backoff {
    factor: f64,
    max: Duration,
}

impl Policy {
    /// Create a retry policy that will never retry any request.
    pub fn never() -> Policy {
        Policy {
            classifier: Classifier::Never,
            max_retries: 0,
            ..Policy::default()
        }
    }

    /// Set the max retries allowed per request.
    ///
    /// The initial attempt is not counted. Default is currently 2 retries.
    pub fn max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// Set the delay between attempts when no delay function applies.
    ///
    /// Default is 100 milliseconds.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Multiply the delay by `factor` for every retry already made, never
    /// waiting longer than `max`.
    ///
    /// # Panics
    ///
    /// This method will panic if `factor` is less than `1.0` or not finite.
    pub fn backoff(mut self, factor: f64, max: Duration) -> Self {
        assert!(factor.is_finite());
        assert!(factor >= 1.0);
        self.backoff = Some(Backoff { factor, max });
        self
    }

    /// Provide the function computing a delay from the failure.
    ///
    /// When it returns `None` the static delay applies. Default is a
    /// [`RetryAfterDelayFunction`] reading the wall clock.
    pub fn delay_fn<D: DelayFunction>(mut self, delay_fn: D) -> Self {
        self.delay_fn = Some(Arc::new(delay_fn));
        self
    }

    /// Ignore failures when computing delays, only the static delay applies.
    pub fn no_delay_fn(mut self) -> Self {
        self.delay_fn = None;
        self
    }

    /// Provide the detector deciding which requests are safe to send again.
    pub fn method_detector<D: MethodDetector>(mut self, detector: D) -> Self {
        self.detector = Arc::new(detector);
        self
    }

    /// Provide the detector as a function.
    pub fn method_detector_fn<F>(self, func: F) -> Self
    where
        F: Fn(&RequestArguments) -> bool + Send + Sync + 'static,
    {
        self.method_detector(crate::idempotency::method_detector_fn(func))
    }

    /// Gate every retry on a circuit breaker.
    pub fn circuit_breaker<B: CircuitBreaker>(mut self, breaker: B) -> Self {
        self.breaker = Some(Arc::new(breaker));
        self
    }

    /// Provide a classifier to determine if a failure should be retried.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rebound::{retry::{Action, Policy}, StatusCode};
    ///
    /// // retry nothing but 503 and 429
    /// let policy = Policy::default().classify_fn(|error| {
    ///     match error.status_code() {
    ///         Some(StatusCode::SERVICE_UNAVAILABLE | StatusCode::TOO_MANY_REQUESTS) => {
    ///             Action::Retryable
    ///         }
    ///         _ => Action::Fatal,
    ///     }
    /// });
    /// # drop(policy);
    /// ```
    pub fn classify_fn<F>(mut self, func: F) -> Self
    where
        F: Fn(&Error) -> Action + Send + Sync + 'static,
    {
        self.classifier = Classifier::Dyn(Arc::new(ClassifyFn(func)));
        self
    }

    /// Returns the max retries allowed per request.
    pub fn get_max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the circuit breaker, if any.
    pub fn get_circuit_breaker(&self) -> Option<&dyn CircuitBreaker> {
        self.breaker.as_deref()
    }

    /// Returns true if `error` is a transient failure.
    pub fn is_retryable(&self, error: &Error) -> bool {
        self.classifier.classify(error) == Action::Retryable
    }

    /// Returns true if `arguments` may be sent again.
    pub fn is_idempotent(&self, arguments: &RequestArguments) -> bool {
        self.detector.test(arguments)
    }

    /// How long to wait before the retry following `retries` earlier ones.
    pub fn delay_for(&self, error: &Error, retries: u32) -> Duration {
        if let Some(delay) = self.delay_fn.as_ref().and_then(|f| f.delay_for(error)) {
            trace!("delay of {delay:?} derived from the failure");
            return delay;
        }

        match self.backoff {
            Some(Backoff { factor, max }) => {
                let exp = i32::try_from(retries).unwrap_or(i32::MAX);
                let secs = self.delay.as_secs_f64() * factor.powi(exp);
                if secs.is_finite() && secs < max.as_secs_f64() {
                    Duration::from_secs_f64(secs)
                } else {
                    max
                }
            }
            None => self.delay,
        }
    }

    /// Decides what to do after an attempt of `arguments` failed with
    /// `error`.
    ///
    /// `retries` is the number of retries already made for this request, `0`
    /// after the initial attempt failed.
    pub fn decide(&self, arguments: &RequestArguments, error: &Error, retries: u32) -> Decision {
        if !self.is_retryable(error) {
            trace!("not retrying: {error}");
            return Decision::GiveUp;
        }

        if !self.is_idempotent(arguments) {
            debug!(
                "not retrying non-idempotent {} request: {error}",
                arguments.method()
            );
            return Decision::GiveUp;
        }

        if retries >= self.max_retries {
            debug!("max retries hit ({}): {error}", self.max_retries);
            return Decision::GiveUp;
        }

        if let Some(ref breaker) = self.breaker {
            if !breaker.allows_attempt() {
                debug!("circuit open, not retrying: {error}");
                return Decision::GiveUp;
            }
        }

        let delay = self.delay_for(error, retries);
        trace!(
            "retrying {} request ({}/{}) in {delay:?}",
            arguments.method(),
            retries + 1,
            self.max_retries
        );
        Decision::Retry(delay)
    }
}

impl Default for Policy {
    fn default() -> Self {
        Policy {
            classifier: Classifier::Transient,
            max_retries: 2,
            delay: Duration::from_millis(100),
            backoff: None,
            delay_fn: Some(Arc::new(RetryAfterDelayFunction::new())),
            detector: Arc::new(default_detector()),
            breaker: None,
        }
    }
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Policy")
            .field("max_retries", &self.max_retries)
            .field("delay", &self.delay)
            .field("backoff", &self.backoff)
            .field("delay_fn", &self.delay_fn.is_some())
            .field("circuit_breaker", &self.breaker.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::atomic::{AtomicBool, AtomicUsize, Ordering},
        time::SystemTime,
    };

    use http::{header::RETRY_AFTER, HeaderMap, HeaderValue, Method, StatusCode};

    use super::*;

    fn unavailable(retry_after: Option<&'static str>) -> Error {
        let mut headers = HeaderMap::new();
        if let Some(value) = retry_after {
            headers.insert(RETRY_AFTER, HeaderValue::from_static(value));
        }
        Error::retry(StatusCode::SERVICE_UNAVAILABLE, headers)
    }

    fn get() -> RequestArguments {
        RequestArguments::new()
    }

    #[test]
    fn test_default_policy() {
        let policy = Policy::default();

        assert_eq!(
            policy.decide(&get(), &unavailable(None), 0),
            Decision::Retry(Duration::from_millis(100))
        );
        assert_eq!(
            policy.decide(&get(), &unavailable(Some("3")), 1),
            Decision::Retry(Duration::from_secs(3))
        );
        assert_eq!(
            policy.decide(&get(), &unavailable(None), 2),
            Decision::GiveUp
        );
    }

    #[test]
    fn test_never() {
        assert_eq!(
            Policy::never().decide(&get(), &unavailable(None), 0),
            Decision::GiveUp
        );
    }

    #[test]
    fn test_non_idempotent_is_not_retried() {
        let policy = Policy::default();
        let post = RequestArguments::new().with_method(Method::POST);
        assert_eq!(
            policy.decide(&post, &unavailable(None), 0),
            Decision::GiveUp
        );

        let conditional = post.with_header("if-match", "\"1\"").unwrap();
        assert!(policy.decide(&conditional, &unavailable(None), 0).is_retry());
    }

    #[test]
    fn test_custom_method_detector() {
        let policy = Policy::default().method_detector_fn(|_: &RequestArguments| false);
        assert_eq!(
            policy.decide(&get(), &unavailable(None), 0),
            Decision::GiveUp
        );
    }

    #[test]
    fn test_fatal_errors_are_not_retried() {
        let policy = Policy::default();
        let not_found = Error::status(StatusCode::NOT_FOUND, HeaderMap::new());
        assert!(!policy.is_retryable(&not_found));
        assert_eq!(policy.decide(&get(), &not_found, 0), Decision::GiveUp);

        let reset = Error::request(io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(policy.is_retryable(&reset));
    }

    #[test]
    fn test_classify_fn() {
        let policy = Policy::default().classify_fn(|error| match error.status_code() {
            Some(StatusCode::TOO_MANY_REQUESTS) => Action::Retryable,
            _ => Action::Fatal,
        });

        let throttled = Error::status(StatusCode::TOO_MANY_REQUESTS, HeaderMap::new());
        assert!(policy.decide(&get(), &throttled, 0).is_retry());
        assert_eq!(
            policy.decide(&get(), &unavailable(None), 0),
            Decision::GiveUp
        );
    }

    #[test]
    fn test_backoff() {
        let policy = Policy::default()
            .no_delay_fn()
            .delay(Duration::from_millis(100))
            .backoff(2.0, Duration::from_millis(500))
            .max_retries(10);
        let error = unavailable(Some("60"));

        assert_eq!(policy.delay_for(&error, 0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(&error, 1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(&error, 2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(&error, 3), Duration::from_millis(500));
        assert_eq!(policy.delay_for(&error, u32::MAX), Duration::from_millis(500));
    }

    #[test]
    fn test_delay_fn_with_clock() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_523_486_067);
        let policy =
            Policy::default().delay_fn(RetryAfterDelayFunction::with_clock(FixedClock::new(now)));

        assert_eq!(
            policy.decide(&get(), &unavailable(Some("Wed, 11 Apr 2018 22:34:28 GMT")), 0),
            Decision::Retry(Duration::from_secs(1))
        );
        // malformed falls back to the static delay
        assert_eq!(
            policy.decide(&get(), &unavailable(Some("later")), 0),
            Decision::Retry(Duration::from_millis(100))
        );
    }

    #[derive(Default)]
    struct Switch {
        open: AtomicBool,
        failures: AtomicUsize,
    }

    impl CircuitBreaker for Arc<Switch> {
        fn allows_attempt(&self) -> bool {
            !self.open.load(Ordering::SeqCst)
        }

        fn record_success(&self) {}

        fn record_failure(&self) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_circuit_breaker() {
        let switch = Arc::new(Switch::default());
        let policy = Policy::default().circuit_breaker(switch.clone());

        assert!(policy.decide(&get(), &unavailable(None), 0).is_retry());

        switch.open.store(true, Ordering::SeqCst);
        assert_eq!(
            policy.decide(&get(), &unavailable(None), 0),
            Decision::GiveUp
        );

        if let Some(breaker) = policy.get_circuit_breaker() {
            breaker.record_failure();
        }
        assert_eq!(switch.failures.load(Ordering::SeqCst), 1);
    }
}
