/// Gates attempts on the health of the remote side.
///
/// Only the interface lives here. An executor consults
/// [`allows_attempt`](CircuitBreaker::allows_attempt) before every attempt and
/// reports each outcome back; how the breaker opens, half-opens and closes is
/// up to the implementation.
pub trait CircuitBreaker: Send + Sync + 'static {
    /// Returns false while the circuit is open.
    fn allows_attempt(&self) -> bool;

    /// Reports a successful attempt.
    fn record_success(&self);

    /// Reports a failed attempt.
    fn record_failure(&self);
}
