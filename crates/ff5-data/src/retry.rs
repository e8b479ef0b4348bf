//! Timeouts and retries for remote requests.

use std::future::Future;
use std::time::Duration;

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{DataError, Result};
use crate::source::{DateRange, FactorTableSource, Frequency, PriceHistorySource};

/// Exponential backoff for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry; doubled on each further retry
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// No retries.
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Fail with [`DataError::Timeout`] when `future` does not finish within `limit`.
pub async fn with_timeout<T>(
    operation: &str,
    limit: Duration,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| DataError::Timeout {
            operation: operation.to_string(),
            after: limit,
        })?
}

/// Run `f` until it succeeds, fails permanently, or the retries are spent.
///
/// Only errors for which [`DataError::is_transient`] holds are retried.
pub async fn retry_with_backoff<T, F, Fut>(label: &str, policy: RetryPolicy, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.delay_for(attempt);
                warn!(
                    label,
                    attempt,
                    max_retries = policy.max_retries,
                    error = %e,
                    "request failed, retrying in {delay:?}"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// A source whose requests are bounded by a timeout and retried with backoff.
///
/// Each attempt gets the full timeout; a timed-out attempt counts as transient.
#[derive(Debug)]
pub struct RetryingSource<S> {
    inner: S,
    policy: RetryPolicy,
    timeout: Duration,
}

impl<S> RetryingSource<S> {
    /// Wrap `inner`.
    pub const fn new(inner: S, policy: RetryPolicy, timeout: Duration) -> Self {
        Self {
            inner,
            policy,
            timeout,
        }
    }

    /// The wrapped source.
    pub const fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: PriceHistorySource> PriceHistorySource for RetryingSource<S> {
    fn source_id(&self) -> &str {
        self.inner.source_id()
    }

    async fn fetch_prices(&self, symbol: &str, range: DateRange) -> Result<DataFrame> {
        let label = format!("{} prices for {symbol}", self.inner.source_id());
        let (label, inner, limit) = (label.as_str(), &self.inner, self.timeout);
        retry_with_backoff(label, self.policy, move || {
            with_timeout(label, limit, inner.fetch_prices(symbol, range))
        })
        .await
    }
}

impl<S: FactorTableSource> FactorTableSource for RetryingSource<S> {
    fn dataset_id(&self, frequency: Frequency) -> String {
        self.inner.dataset_id(frequency)
    }

    async fn fetch_factor_csv(&self, frequency: Frequency) -> Result<String> {
        let label = self.inner.dataset_id(frequency);
        let (label, inner, limit) = (label.as_str(), &self.inner, self.timeout);
        retry_with_backoff(label, self.policy, move || {
            with_timeout(label, limit, inner.fetch_factor_csv(frequency))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn quick() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn delays_double() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn retries_transient_errors_then_succeeds() {
        let calls = Cell::new(0);
        let result = retry_with_backoff("test", quick(), || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 3 {
                    Err(DataError::Http {
                        status: 503,
                        url: "u".into(),
                    })
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Cell::new(0);
        let result: Result<()> = retry_with_backoff("test", quick(), || {
            calls.set(calls.get() + 1);
            async { Err(DataError::Http {
                status: 500,
                url: "u".into(),
            }) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<()> = retry_with_backoff("test", quick(), || {
            calls.set(calls.get() + 1);
            async { Err(DataError::Schema("bad header".into())) }
        })
        .await;

        assert!(matches!(result, Err(DataError::Schema(_))));
        assert_eq!(calls.get(), 1);
    }

    struct FlakyFactors {
        calls: Cell<usize>,
        failures: usize,
    }

    impl FactorTableSource for FlakyFactors {
        fn dataset_id(&self, frequency: Frequency) -> String {
            format!("flaky:{frequency}")
        }

        async fn fetch_factor_csv(&self, _frequency: Frequency) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            if self.calls.get() <= self.failures {
                Err(DataError::Http {
                    status: 502,
                    url: "u".into(),
                })
            } else {
                Ok("payload".to_string())
            }
        }
    }

    #[tokio::test]
    async fn retrying_source_recovers_from_transient_failures() {
        let source = RetryingSource::new(
            FlakyFactors {
                calls: Cell::new(0),
                failures: 2,
            },
            quick(),
            Duration::from_secs(1),
        );

        assert_eq!(source.fetch_factor_csv(Frequency::Monthly).await.unwrap(), "payload");
        assert_eq!(source.inner().calls.get(), 3);
        assert_eq!(source.dataset_id(Frequency::Daily), "flaky:daily");
    }

    #[tokio::test]
    async fn retrying_source_gives_up_with_the_last_error() {
        let source = RetryingSource::new(
            FlakyFactors {
                calls: Cell::new(0),
                failures: 10,
            },
            quick(),
            Duration::from_secs(1),
        );

        let err = source.fetch_factor_csv(Frequency::Monthly).await.unwrap_err();
        assert!(matches!(err, DataError::Http { status: 502, .. }));
        assert_eq!(source.inner().calls.get(), 3);
    }

    #[tokio::test]
    async fn timeout_is_reported() {
        let result: Result<()> = with_timeout("slow fetch", Duration::from_millis(5), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        match result {
            Err(DataError::Timeout { operation, after }) => {
                assert_eq!(operation, "slow fetch");
                assert_eq!(after, Duration::from_millis(5));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
