//! Rate-limit metering
//!
//! `QuotaGate` keeps a local, non-authoritative count of the calls left in each
//! quota pool. When the count for a pool runs out, it asks the remote quota
//! endpoint for the authoritative state of both pools, and blocks until the reset
//! time while the pool is exhausted.

use crate::api::types::{ApiError, QuotaPool, RateLimits};
use crate::api::HostingApi;
use chrono::Utc;
use std::time::Duration;
use tracing::{debug, warn};

/// Shortest wait between two quota checks of an exhausted pool
const MIN_RESET_WAIT: Duration = Duration::from_secs(1);

/// Meters the core and search quota pools
#[derive(Debug)]
pub struct QuotaGate {
    core_remaining: u64,
    search_remaining: u64,
    cooldown: Duration,
}

impl QuotaGate {
    /// Creates a gate with both local counts at zero
    ///
    /// The first permit of each pool therefore always consults the quota endpoint.
    /// `cooldown` is the wait before the single retry of a failed quota check.
    pub fn new(cooldown: Duration) -> Self {
        Self {
            core_remaining: 0,
            search_remaining: 0,
            cooldown,
        }
    }

    /// Local count of calls left in a pool
    pub fn remaining(&self, pool: QuotaPool) -> u64 {
        match pool {
            QuotaPool::Core => self.core_remaining,
            QuotaPool::Search => self.search_remaining,
        }
    }

    fn remaining_mut(&mut self, pool: QuotaPool) -> &mut u64 {
        match pool {
            QuotaPool::Core => &mut self.core_remaining,
            QuotaPool::Search => &mut self.search_remaining,
        }
    }

    /// Waits until a call from `pool` may proceed, then consumes one permit
    ///
    /// # Arguments
    ///
    /// * `api` - The API whose quota endpoint is consulted
    /// * `pool` - The pool the upcoming call is charged to
    ///
    /// # Returns
    ///
    /// * `Ok(())` - A permit was consumed
    /// * `Err(ApiError)` - The quota endpoint failed twice in a row
    pub async fn acquire<A: HostingApi>(&mut self, api: &A, pool: QuotaPool) -> Result<(), ApiError> {
        while self.remaining(pool) == 0 {
            let limits = self.fetch_limits(api).await?;
            self.core_remaining = limits.core.remaining;
            self.search_remaining = limits.search.remaining;

            let limit = limits.pool(pool);
            if limit.remaining > 0 {
                debug!(
                    "Quota refreshed: core={} search={}",
                    limits.core.remaining, limits.search.remaining
                );
                break;
            }

            let wait = (limit.reset_at - Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO)
                .max(MIN_RESET_WAIT);
            warn!(
                "{} quota exhausted, waiting {}s until reset at {}",
                pool.as_str(),
                wait.as_secs(),
                limit.reset_at
            );
            tokio::time::sleep(wait).await;
        }

        *self.remaining_mut(pool) -= 1;
        Ok(())
    }

    async fn fetch_limits<A: HostingApi>(&self, api: &A) -> Result<RateLimits, ApiError> {
        match api.rate_limits().await {
            Ok(limits) => Ok(limits),
            Err(failure) => {
                let wait = failure.retry_after().unwrap_or(self.cooldown);
                warn!(
                    "Quota check failed ({}), retrying in {}s",
                    failure,
                    wait.as_secs()
                );
                tokio::time::sleep(wait).await;

                api.rate_limits()
                    .await
                    .map_err(|source| ApiError::RetriesExhausted {
                        operation: "rate_limit",
                        source,
                    })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::FakeApi;
    use crate::api::ApiFailure;

    #[tokio::test(start_paused = true)]
    async fn test_zero_count_consults_endpoint() {
        let api = FakeApi::new();
        api.set_limits(10, 5);
        let mut gate = QuotaGate::new(Duration::from_secs(60));

        gate.acquire(&api, QuotaPool::Search).await.unwrap();
        assert_eq!(api.rate_limit_calls(), 1);
        assert_eq!(gate.remaining(QuotaPool::Search), 4);
        assert_eq!(gate.remaining(QuotaPool::Core), 10);

        // Both pools were refreshed, so the core pool proceeds without a check
        gate.acquire(&api, QuotaPool::Core).await.unwrap();
        assert_eq!(api.rate_limit_calls(), 1);
        assert_eq!(gate.remaining(QuotaPool::Core), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_local_count_rechecks() {
        let api = FakeApi::new();
        api.set_limits(1, 1);
        let mut gate = QuotaGate::new(Duration::from_secs(60));

        gate.acquire(&api, QuotaPool::Core).await.unwrap();
        assert_eq!(gate.remaining(QuotaPool::Core), 0);

        gate.acquire(&api, QuotaPool::Core).await.unwrap();
        assert_eq!(api.rate_limit_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_reset_when_exhausted() {
        let api = FakeApi::new();
        api.set_limits(5, 5);
        api.queue_limits(0, 0);
        let mut gate = QuotaGate::new(Duration::from_secs(60));

        let start = tokio::time::Instant::now();
        gate.acquire(&api, QuotaPool::Search).await.unwrap();

        // First check reported zero, second check after the reset wait succeeded
        assert_eq!(api.rate_limit_calls(), 2);
        assert!(start.elapsed() >= MIN_RESET_WAIT);
        assert_eq!(gate.remaining(QuotaPool::Search), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_check_retried_once() {
        let api = FakeApi::new();
        api.set_limits(3, 3);
        api.fail_rate_limits(vec![ApiFailure::Network("reset".into())]);
        let mut gate = QuotaGate::new(Duration::from_secs(60));

        let start = tokio::time::Instant::now();
        gate.acquire(&api, QuotaPool::Core).await.unwrap();
        assert_eq!(api.rate_limit_calls(), 2);
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_check_fails_after_retry() {
        let api = FakeApi::new();
        api.fail_rate_limits(vec![
            ApiFailure::Network("reset".into()),
            ApiFailure::RateLimited {
                retry_after: Some(5),
            },
        ]);
        let mut gate = QuotaGate::new(Duration::from_secs(60));

        let result = gate.acquire(&api, QuotaPool::Core).await;
        assert!(matches!(
            result,
            Err(ApiError::RetriesExhausted {
                operation: "rate_limit",
                ..
            })
        ));
    }
}
