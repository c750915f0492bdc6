//! Circuit breaker around a metadata provider
//!
//! When the upstream catalog is down, every recommendation would otherwise
//! pay one failing round trip per result. After `failure_threshold`
//! consecutive failures the breaker opens and answers `ProviderUnavailable`
//! immediately. Once the cooldown has passed a single probe call is let
//! through; its outcome closes or re-opens the circuit.
//!
//! Each upstream call runs under `call_timeout`. A call that outlives it
//! counts as a failure, so an upstream that hangs opens the circuit just
//! like one that refuses connections. Keep `call_timeout` below any
//! deadline the caller applies, or the caller drops the call first and the
//! failure is never recorded.
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use crate::{
    error::{AppError, AppResult},
    models::Metadata,
    services::providers::MetadataProvider,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BreakerState {
    Closed { consecutive_failures: u32 },
    Open { until: Instant },
    /// A probe is in flight; other callers fail fast until `until`
    Probing { until: Instant },
}

pub struct CircuitBreakerProvider {
    inner: Arc<dyn MetadataProvider>,
    failure_threshold: u32,
    cooldown: Duration,
    call_timeout: Duration,
    state: Mutex<BreakerState>,
}

impl CircuitBreakerProvider {
    pub fn new(
        inner: Arc<dyn MetadataProvider>,
        failure_threshold: u32,
        cooldown: Duration,
        call_timeout: Duration,
    ) -> Self {
        Self {
            inner,
            failure_threshold: failure_threshold.max(1),
            cooldown,
            call_timeout,
            state: Mutex::new(BreakerState::Closed {
                consecutive_failures: 0,
            }),
        }
    }

    /// Whether the circuit is currently rejecting calls
    pub fn is_open(&self) -> bool {
        !matches!(self.current(), BreakerState::Closed { .. })
    }

    fn current(&self) -> BreakerState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Decides whether a call may proceed, moving Open → Probing when the cooldown is over
    fn admit(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        match *state {
            BreakerState::Closed { .. } => true,
            BreakerState::Open { until } | BreakerState::Probing { until } if now >= until => {
                *state = BreakerState::Probing {
                    until: now + self.cooldown,
                };
                tracing::info!(provider = self.inner.name(), "Circuit half-open, probing provider");
                true
            }
            BreakerState::Open { .. } | BreakerState::Probing { .. } => false,
        }
    }

    fn record_success(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !matches!(*state, BreakerState::Closed { .. }) {
            tracing::info!(provider = self.inner.name(), "Circuit closed, provider recovered");
        }
        *state = BreakerState::Closed {
            consecutive_failures: 0,
        };
    }

    fn record_failure(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        *state = match *state {
            BreakerState::Closed {
                consecutive_failures,
            } if consecutive_failures + 1 < self.failure_threshold => BreakerState::Closed {
                consecutive_failures: consecutive_failures + 1,
            },
            // A late failure from a call admitted before the circuit opened
            BreakerState::Open { until } => BreakerState::Open { until },
            _ => {
                tracing::warn!(
                    provider = self.inner.name(),
                    cooldown_secs = self.cooldown.as_secs_f64(),
                    "Circuit opened, failing metadata lookups fast"
                );
                BreakerState::Open {
                    until: now + self.cooldown,
                }
            }
        };
    }
}

#[async_trait::async_trait]
impl MetadataProvider for CircuitBreakerProvider {
    async fn fetch(&self, title: &str) -> AppResult<Option<Metadata>> {
        if !self.admit() {
            return Err(AppError::ProviderUnavailable(format!(
                "{} circuit open",
                self.inner.name()
            )));
        }

        let deadline = tokio::time::timeout(self.call_timeout, self.inner.fetch(title));
        let result = match deadline.await {
            Ok(result) => result,
            Err(_) => Err(AppError::ProviderUnavailable(format!(
                "{} did not answer within {}ms",
                self.inner.name(),
                self.call_timeout.as_millis()
            ))),
        };
        match &result {
            Ok(_) => self.record_success(),
            Err(_) => self.record_failure(),
        }
        result
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
