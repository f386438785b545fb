use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

// ============================================================================
// Circuit Breaker for Broker Sends
// ============================================================================
//
// Keeps a down broker from stalling every publish for a full send timeout.
// After `failure_threshold` consecutive failures the breaker opens and sends
// fail fast with CircuitOpen until `open_for` has elapsed. It then goes
// HalfOpen and lets trial sends through one at a time; other sends fail fast
// while a trial is in flight. `success_threshold` trial successes close it.
// A trial still unfinished after `open_for` is treated as abandoned.
//
// The breaker never retries anything itself.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Numeric form used by the `broker_circuit_state` gauge.
    pub fn as_gauge(&self) -> i64 {
        match self {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub open_for: Duration,
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_for: Duration::from_secs(30),
            success_threshold: 3,
        }
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    opened_at: Option<Instant>,
    trial_started: Option<Instant>,
}

#[derive(Clone)]
pub struct CircuitBreaker {
    name: Arc<str>,
    config: CircuitBreakerConfig,
    inner: Arc<Mutex<BreakerState>>,
}

#[derive(Debug)]
pub enum CircuitBreakerError<E> {
    CircuitOpen,
    OperationFailed(E),
}

impl<E: std::fmt::Display> std::fmt::Display for CircuitBreakerError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitBreakerError::CircuitOpen => write!(f, "Circuit breaker is open"),
            CircuitBreakerError::OperationFailed(e) => write!(f, "Operation failed: {}", e),
        }
    }
}

impl<E: std::error::Error> std::error::Error for CircuitBreakerError<E> {}

impl CircuitBreaker {
    pub fn new(name: &str, config: CircuitBreakerConfig) -> Self {
        Self {
            name: Arc::from(name),
            config,
            inner: Arc::new(Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                opened_at: None,
                trial_started: None,
            })),
        }
    }

    /// Run `operation` unless the circuit is open or a half-open trial is in flight.
    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: std::future::Future<Output = Result<T, E>>,
    {
        {
            let mut inner = self.inner.lock().await;
            match inner.state {
                CircuitState::Closed => {}
                CircuitState::Open => {
                    let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                    if elapsed < self.config.open_for {
                        return Err(CircuitBreakerError::CircuitOpen);
                    }
                    tracing::info!(breaker = %self.name, "Circuit breaker half-open, allowing trial call");
                    inner.state = CircuitState::HalfOpen;
                    inner.success_count = 0;
                    inner.trial_started = Some(Instant::now());
                }
                CircuitState::HalfOpen => {
                    let trial_running = inner
                        .trial_started
                        .is_some_and(|t| t.elapsed() < self.config.open_for);
                    if trial_running {
                        return Err(CircuitBreakerError::CircuitOpen);
                    }
                    inner.trial_started = Some(Instant::now());
                }
            }
        }

        match operation.await {
            Ok(value) => {
                self.record_success().await;
                Ok(value)
            }
            Err(e) => {
                self.record_failure().await;
                Err(CircuitBreakerError::OperationFailed(e))
            }
        }
    }

    async fn record_success(&self) {
        let mut inner = self.inner.lock().await;
        inner.trial_started = None;
        match inner.state {
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.config.success_threshold {
                    tracing::info!(breaker = %self.name, "Circuit breaker closed");
                    inner.state = CircuitState::Closed;
                    inner.failure_count = 0;
                    inner.success_count = 0;
                    inner.opened_at = None;
                }
            }
            CircuitState::Closed => inner.failure_count = 0,
            CircuitState::Open => {}
        }
    }

    async fn record_failure(&self) {
        let mut inner = self.inner.lock().await;
        inner.trial_started = None;
        inner.failure_count += 1;

        let should_open = match inner.state {
            CircuitState::Closed => inner.failure_count >= self.config.failure_threshold,
            CircuitState::HalfOpen => true,
            CircuitState::Open => false,
        };

        if should_open {
            tracing::warn!(
                breaker = %self.name,
                failures = inner.failure_count,
                "Circuit breaker opened"
            );
            inner.state = CircuitState::Open;
            inner.success_count = 0;
            inner.opened_at = Some(Instant::now());
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.inner.lock().await.state
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        tracing::info!(breaker = %self.name, "Circuit breaker manually reset");
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.success_count = 0;
        inner.opened_at = None;
        inner.trial_started = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(failures: u32, open_for: Duration, successes: u32) -> CircuitBreaker {
        CircuitBreaker::new(
            "test-broker",
            CircuitBreakerConfig {
                failure_threshold: failures,
                open_for,
                success_threshold: successes,
            },
        )
    }

    #[tokio::test]
    async fn test_opens_after_consecutive_failures() {
        let cb = breaker(3, Duration::from_secs(60), 1);

        for _ in 0..3 {
            let result = cb.call(async { Err::<(), _>("broker down") }).await;
            assert!(matches!(result, Err(CircuitBreakerError::OperationFailed(_))));
        }
        assert_eq!(cb.state().await, CircuitState::Open);

        // Fails fast without running the operation
        let result = cb.call(async { Ok::<_, &str>(()) }).await;
        assert!(matches!(result, Err(CircuitBreakerError::CircuitOpen)));
    }

    #[tokio::test]
    async fn test_success_resets_failure_count() {
        let cb = breaker(2, Duration::from_secs(60), 1);

        let _ = cb.call(async { Err::<(), _>("x") }).await;
        let _ = cb.call(async { Ok::<_, &str>(()) }).await;
        let _ = cb.call(async { Err::<(), _>("x") }).await;

        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_trial_closes_on_success() {
        let cb = breaker(1, Duration::from_millis(50), 1);

        let _ = cb.call(async { Err::<(), _>("x") }).await;
        assert_eq!(cb.state().await, CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(cb.call(async { Ok::<_, &str>(()) }).await.is_ok());
        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_lets_one_trial_through_at_a_time() {
        let cb = breaker(1, Duration::from_millis(50), 1);

        let _ = cb.call(async { Err::<(), _>("x") }).await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        let (release, hold) = tokio::sync::oneshot::channel::<()>();
        let trial = tokio::spawn({
            let cb = cb.clone();
            async move {
                cb.call(async move {
                    let _ = hold.await;
                    Ok::<_, &str>(())
                })
                .await
                .is_ok()
            }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(cb.state().await, CircuitState::HalfOpen);

        // Second send while the trial is pending fails fast
        let result = cb.call(async { Ok::<_, &str>(()) }).await;
        assert!(matches!(result, Err(CircuitBreakerError::CircuitOpen)));

        release.send(()).unwrap();
        assert!(trial.await.unwrap());
        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_failure_reopens() {
        let cb = breaker(1, Duration::from_millis(50), 2);

        let _ = cb.call(async { Err::<(), _>("x") }).await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        let _ = cb.call(async { Err::<(), _>("still down") }).await;

        assert_eq!(cb.state().await, CircuitState::Open);
    }

    #[tokio::test]
    async fn test_reset() {
        let cb = breaker(1, Duration::from_secs(60), 1);
        let _ = cb.call(async { Err::<(), _>("x") }).await;
        cb.reset().await;
        assert_eq!(cb.state().await, CircuitState::Closed);
        assert_eq!(CircuitState::Open.as_gauge(), 1);
    }
}
