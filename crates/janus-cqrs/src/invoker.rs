//! # Invoker
//!
//! Runs an executor with its registered dependencies under a deadline.
//!
//! ## Invoke Flow
//! ```text
//! invoke(ctx, executor)
//!      │
//!      ▼
//! registry.get::<E>() ── None ──► log + AppError::internal (MISSING_HANDLER_IMPL)
//!      │ Some(deps)                 executor never runs, never panics
//!      ▼
//! timeout == 0 ? execute(deps) : tokio::time::timeout(timeout, execute(deps))
//!      │                                   │
//!      │                                   └─ elapsed ──► future dropped,
//!      ▼                                                 AppError::timeout
//! Ok(output) / Err(app_error) ── logged with request + correlation IDs
//! ```

use std::sync::Arc;
use std::time::Duration;

use janus_core::context::RequestContext;
use janus_core::error::{AppError, AppResult};
use tracing::{debug, error, warn};

use crate::executor::Executor;
use crate::registry::HandlerRegistry;

/// Code returned when an executor type was never registered.
pub const MISSING_HANDLER_CODE: &str = "MISSING_HANDLER_IMPL";

/// Code returned when an executor exceeds the per-call timeout.
pub const TIMEOUT_CODE: &str = "EXECUTION_TIMEOUT";

/// Dispatches executors. Cheap to clone; the registry is shared read-only.
#[derive(Debug, Clone)]
pub struct Invoker {
    registry: Arc<HandlerRegistry>,
    timeout: Duration,
}

impl Invoker {
    /// Freezes `registry`. A zero `timeout` disables the per-call bound.
    pub fn new(registry: HandlerRegistry, timeout: Duration) -> Self {
        Self {
            registry: Arc::new(registry),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Runs `executor` with its registered dependencies.
    pub async fn invoke<E: Executor>(&self, ctx: &RequestContext, executor: E) -> AppResult<E::Output> {
        let Some(deps) = self.registry.get::<E>() else {
            error!(
                request_id = ctx.request_id(),
                correlation_id = ctx.correlation_id(),
                executor = E::tag(),
                "no dependencies registered for executor"
            );
            return Err(
                AppError::internal("An error occurred while processing the request")
                    .with_code(MISSING_HANDLER_CODE),
            );
        };

        debug!(
            request_id = ctx.request_id(),
            executor = E::tag(),
            kind = %E::KIND,
            "invoking executor"
        );

        let result = if self.timeout.is_zero() {
            executor.execute(deps, ctx).await
        } else {
            match tokio::time::timeout(self.timeout, executor.execute(deps, ctx)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        request_id = ctx.request_id(),
                        correlation_id = ctx.correlation_id(),
                        executor = E::tag(),
                        timeout_ms = self.timeout.as_millis() as u64,
                        "executor timed out"
                    );
                    return Err(AppError::timeout(format!(
                        "{} did not finish within {:?}",
                        E::KIND,
                        self.timeout
                    ))
                    .with_code(TIMEOUT_CODE));
                }
            }
        };

        if let Err(err) = &result {
            if err.is_client_error() {
                warn!(
                    request_id = ctx.request_id(),
                    correlation_id = ctx.correlation_id(),
                    executor = E::tag(),
                    error = %err,
                    "executor rejected request"
                );
            } else {
                error!(
                    request_id = ctx.request_id(),
                    correlation_id = ctx.correlation_id(),
                    executor = E::tag(),
                    error = %err,
                    "executor failed"
                );
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutorKind;
    use async_trait::async_trait;
    use janus_core::error::ErrorKind;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Greeter {
        greeting: &'static str,
    }

    struct Greet(&'static str);

    #[async_trait]
    impl Executor for Greet {
        type Deps = Greeter;
        type Output = String;
        const KIND: ExecutorKind = ExecutorKind::Query;

        async fn execute(self, deps: Arc<Greeter>, ctx: &RequestContext) -> AppResult<String> {
            Ok(format!("{} {} ({})", deps.greeting, self.0, ctx.request_id()))
        }
    }

    struct Sleepy {
        finished: Arc<AtomicBool>,
    }

    struct Nap(Duration);

    #[async_trait]
    impl Executor for Nap {
        type Deps = Sleepy;
        type Output = ();

        async fn execute(self, deps: Arc<Sleepy>, _ctx: &RequestContext) -> AppResult<()> {
            tokio::time::sleep(self.0).await;
            deps.finished.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Fail;

    #[async_trait]
    impl Executor for Fail {
        type Deps = ();
        type Output = ();

        async fn execute(self, _deps: Arc<()>, _ctx: &RequestContext) -> AppResult<()> {
            Err(AppError::not_found("nothing here").with_code("NOTHING"))
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::new("req-1", Some("corr-1".to_string()))
    }

    fn sleepy_invoker(timeout: Duration) -> (Invoker, Arc<AtomicBool>) {
        let finished = Arc::new(AtomicBool::new(false));
        let mut registry = HandlerRegistry::new();
        registry
            .register::<Nap>(Arc::new(Sleepy {
                finished: Arc::clone(&finished),
            }))
            .unwrap();
        (Invoker::new(registry, timeout), finished)
    }

    #[tokio::test]
    async fn test_invoke_registered_executor() {
        let mut registry = HandlerRegistry::new();
        registry
            .register::<Greet>(Arc::new(Greeter { greeting: "hello" }))
            .unwrap();
        let invoker = Invoker::new(registry, Duration::from_secs(1));

        let out = invoker.invoke(&ctx(), Greet("ada")).await.unwrap();
        assert_eq!(out, "hello ada (req-1)");
    }

    #[tokio::test]
    async fn test_missing_registration_is_internal_error() {
        let invoker = Invoker::new(HandlerRegistry::new(), Duration::ZERO);
        let err = invoker.invoke(&ctx(), Greet("ada")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.code(), MISSING_HANDLER_CODE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_cancels_executor() {
        let (invoker, finished) = sleepy_invoker(Duration::from_millis(50));
        let err = invoker
            .invoke(&ctx(), Nap(Duration::from_secs(10)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.code(), TIMEOUT_CODE);

        // The dropped executor never resumes.
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_disables_bound() {
        let (invoker, finished) = sleepy_invoker(Duration::ZERO);
        invoker
            .invoke(&ctx(), Nap(Duration::from_secs(3600)))
            .await
            .unwrap();
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_executor_error_is_returned() {
        let mut registry = HandlerRegistry::new();
        registry.register::<Fail>(Arc::new(())).unwrap();
        let invoker = Invoker::new(registry, Duration::from_secs(1));
        let err = invoker.invoke(&ctx(), Fail).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.code(), "NOTHING");
    }
}
