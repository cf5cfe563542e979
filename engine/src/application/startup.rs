//! Agent startup that a shutdown request can interrupt

use crate::domain::Result;
use crate::domain::services::ComponentManager;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Startup {
    /// Every component started and became ready
    Completed,
    /// Shutdown was requested first; everything started has been stopped
    Interrupted,
}

/// Run `init` then `start`, racing them against `shutdown`
///
/// When `shutdown` resolves first the token is cancelled but the in-flight
/// startup is still awaited, so a component whose `start` was underway
/// lands on the started stack and is stopped with the rest.
pub async fn start_until_shutdown<S>(manager: &ComponentManager, shutdown: S) -> Result<Startup>
where
    S: Future<Output = ()>,
{
    let token = CancellationToken::new();
    let startup = async {
        manager.init(token.clone()).await?;
        manager.start(token.clone()).await
    };
    tokio::pin!(startup);
    tokio::pin!(shutdown);

    tokio::select! {
        result = &mut startup => return result.map(|()| Startup::Completed),
        () = &mut shutdown => {}
    }

    info!("Shutdown requested during startup, waiting for in-flight start");
    token.cancel();
    if let Err(e) = startup.await {
        warn!(error = %e, "Startup ended early");
    }
    manager.stop().await?;
    Ok(Startup::Interrupted)
}
