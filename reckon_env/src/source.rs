//! Ingestion abstraction for attribute updates.

use async_trait::async_trait;
use crate::types::AttributeUpdate;

/// A feed of spatial attribute updates, already demultiplexed per object.
///
/// # Implementations
///
/// - **Production**: `ChannelSource`, fed by the session layer's reflect callback
/// - **Simulation**: `ScheduledFeed` (reckon_sim), replaying oracle output on a virtual clock
///
/// # Update Flow
///
/// ```text
/// SuT federate            Session layer               Verifier
///   |                           |                          |
///   |-- spatial attribute ----->|                          |
///   |                           |-- AttributeUpdate ------>|
///   |                           |                          |-- recv() -> on_update()
/// ```
#[async_trait]
pub trait UpdateSource: Send + Sync + 'static {
    /// Receives the next update.
    ///
    /// # Returns
    /// * `Some(update)` - An update arrived
    /// * `None` - The source was closed or unsubscribed
    async fn recv(&self) -> Option<AttributeUpdate>;

    /// Stops delivery. Subsequent `recv()` calls return `None`.
    ///
    /// Evaluation must not begin before this has been called.
    fn unsubscribe(&self);

    /// Returns false once `unsubscribe()` has been called.
    fn is_subscribed(&self) -> bool;
}
