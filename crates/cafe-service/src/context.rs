//! Per-request execution context.
//!
//! Every persistence and collaborator call made on behalf of a request is
//! bounded by the request's timeout. Expiry drops the in-flight future; since
//! each mutation is one statement, nothing is left half-applied.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{PersistenceError, ServiceError, ServiceResult};

/// Deadline budget for one exposed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    timeout: Duration,
}

impl RequestContext {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(timeout: Duration) -> Self {
        RequestContext { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `call`, failing with `Persistence(Timeout)` if it outlives the
    /// request's budget.
    pub async fn run<F, T, E>(&self, operation: &'static str, call: F) -> ServiceResult<T>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<ServiceError>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Call timed out"
                );
                Err(PersistenceError::Timeout(self.timeout).into())
            }
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        RequestContext::new(Self::DEFAULT_TIMEOUT)
    }
}
