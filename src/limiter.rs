//! Request pacing for outbound API calls.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;

/// Default outbound requests-per-second ceiling.
pub const DEFAULT_REQUESTS_PER_SECOND: NonZeroU32 = nonzero!(10u32);

/// Paces outbound requests to a fixed per-second ceiling.
///
/// Callers awaiting the gate are delayed until a slot frees up; they are
/// never dropped.
pub struct RequestGate {
    limiter: DefaultDirectRateLimiter,
}

impl std::fmt::Debug for RequestGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGate").finish_non_exhaustive()
    }
}

impl RequestGate {
    /// Gate limited to `requests_per_second` issuances per second.
    pub fn new(requests_per_second: NonZeroU32) -> Self {
        Self {
            limiter: RateLimiter::direct(Quota::per_second(requests_per_second)),
        }
    }

    /// Wait until the caller may issue a request.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }
}

impl Default for RequestGate {
    fn default() -> Self {
        Self::new(DEFAULT_REQUESTS_PER_SECOND)
    }
}
