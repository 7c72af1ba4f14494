//! Lifecycle controller seam.
//!
//! Install and activate are invoked by an external lifecycle controller
//! at defined transition points; the manager only talks back through two
//! primitives: superseding a waiting instance and claiming active
//! control. The manager depends on this interface but never implements
//! the host side itself.

use async_trait::async_trait;

use shellcache_core::Error;

/// Host primitives the cache manager signals during a lifecycle phase.
#[async_trait]
pub trait LifecycleController: Send + Sync {
    /// Supersede any waiting instance so the new version takes over
    /// without waiting for the normal transition point.
    async fn skip_waiting(&self) -> Result<(), Error>;

    /// Claim control of active clients after a successful activation.
    async fn claim_clients(&self) -> Result<(), Error>;
}

/// No-op controller for one-shot runs with no host to signal.
pub struct DetachedLifecycle;

#[async_trait]
impl LifecycleController for DetachedLifecycle {
    async fn skip_waiting(&self) -> Result<(), Error> {
        tracing::debug!("skip_waiting: no lifecycle host attached");
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), Error> {
        tracing::debug!("claim_clients: no lifecycle host attached");
        Ok(())
    }
}
