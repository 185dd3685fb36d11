use std::{
    fmt,
    time::{Duration, SystemTime},
};

use http::{
    header::{HeaderValue, RETRY_AFTER},
    HeaderMap,
};
use log::debug;

use crate::Error;

/// A source of the current time.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current instant.
    fn now(&self) -> SystemTime;
}

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock that is stopped at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    instant: SystemTime,
}

impl FixedClock {
    /// Create a clock that always returns `instant`.
    pub fn new(instant: SystemTime) -> Self {
        FixedClock { instant }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        self.instant
    }
}

/// A parsed `Retry-After` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAfter {
    /// A number of seconds to wait, counted from now.
    Delay(Duration),
    /// The instant after which to retry.
    Date(SystemTime),
}

impl RetryAfter {
    /// Parse a header value.
    ///
    /// Accepts a non-negative number of seconds made of ASCII digits only,
    /// or an IMF-fixdate such as `Sun, 06 Nov 1994 08:49:37 GMT`. Every other
    /// value, including the obsolete RFC 850 and asctime date formats,
    /// yields `None`.
    pub fn parse(value: &HeaderValue) -> Option<RetryAfter> {
        let value = value.to_str().ok()?;

        if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
            return value
                .parse()
                .ok()
                .map(|secs| RetryAfter::Delay(Duration::from_secs(secs)));
        }

        let date = httpdate::parse_http_date(value).ok()?;
        // formatting yields IMF-fixdate only
        if httpdate::fmt_http_date(date) != value {
            return None;
        }
        Some(RetryAfter::Date(date))
    }

    /// Parse the first `Retry-After` header of `headers`.
    pub fn from_headers(headers: &HeaderMap) -> Option<RetryAfter> {
        headers.get(RETRY_AFTER).and_then(RetryAfter::parse)
    }

    /// The time left to wait at `now`; zero if the date has passed.
    pub fn delay_from(&self, now: SystemTime) -> Duration {
        match *self {
            RetryAfter::Delay(delay) => delay,
            RetryAfter::Date(date) => date.duration_since(now).unwrap_or(Duration::ZERO),
        }
    }
}

/// Computes how long to wait before retrying after `error`.
pub trait DelayFunction: Send + Sync + 'static {
    /// Returns the delay, or `None` to fall back to the policy's own delay.
    fn delay_for(&self, error: &Error) -> Option<Duration>;
}

/// Reads the delay from the `Retry-After` header of the failed response.
///
/// Errors without response, responses without the header and malformed
/// values all yield `None`.
pub fn retry_after_delay<C>(error: &Error, clock: &C) -> Option<Duration>
where
    C: Clock + ?Sized,
{
    let value = error.response_headers()?.get(RETRY_AFTER)?;

    match RetryAfter::parse(value) {
        Some(retry_after) => Some(retry_after.delay_from(clock.now())),
        None => {
            debug!("ignoring malformed Retry-After: {value:?}");
            None
        }
    }
}

/// A [`DelayFunction`] honoring the `Retry-After` response header.
#[derive(Clone, Default)]
pub struct RetryAfterDelayFunction<C = SystemClock> {
    clock: C,
}

impl RetryAfterDelayFunction {
    /// Create a delay function reading the wall clock.
    pub fn new() -> Self {
        RetryAfterDelayFunction { clock: SystemClock }
    }
}

impl<C: Clock> RetryAfterDelayFunction<C> {
    /// Create a delay function reading `clock`.
    pub fn with_clock(clock: C) -> Self {
        RetryAfterDelayFunction { clock }
    }
}

impl<C: Clock> DelayFunction for RetryAfterDelayFunction<C> {
    fn delay_for(&self, error: &Error) -> Option<Duration> {
        retry_after_delay(error, &self.clock)
    }
}

impl<C> fmt::Debug for RetryAfterDelayFunction<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RetryAfterDelayFunction")
            .field("clock", &std::any::type_name::<C>())
            .finish()
    }
}
