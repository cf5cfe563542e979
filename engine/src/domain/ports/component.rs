//! Component port
//! The lifecycle contract every piece of managed work implements

use crate::domain::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// A unit of lifecycle-managed work
///
/// `init` runs concurrently with every other component's `init` and must be
/// idempotent. `start` runs in registration order, and `stop` in reverse
/// order of successful starts.
#[async_trait]
pub trait Component: Send + Sync {
    fn name(&self) -> &str;

    async fn init(&self, token: CancellationToken) -> Result<()>;

    async fn start(&self, token: CancellationToken) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    /// Components that can report readiness return their check here
    fn ready_check(&self) -> Option<&dyn ReadyCheck> {
        None
    }
}

/// Optional readiness capability polled after a successful `start`
#[async_trait]
pub trait ReadyCheck: Send + Sync {
    async fn ready(&self) -> Result<()>;
}
