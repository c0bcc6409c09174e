//! Scheduled update feed on the virtual clock.
//!
//! Each update is queued with a delivery time. `recv()` hands updates out in
//! delivery order and moves the shared `SimContext` clock to each delivery
//! time first, so the verifier sees the scheduled receive time.

use crate::context::SimContext;
use async_trait::async_trait;
use reckon_env::{AttributeUpdate, EnvError, UpdateSource};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// An update and the virtual time it is delivered at.
#[derive(Debug, Clone)]
pub struct ScheduledUpdate {
    pub deliver_at: Duration,
    pub update: AttributeUpdate,
}

pub struct ScheduledFeed {
    ctx: SimContext,
    queue: Mutex<VecDeque<ScheduledUpdate>>,
    subscribed: AtomicBool,
}

impl ScheduledFeed {
    pub fn new(ctx: SimContext) -> Self {
        Self {
            ctx,
            queue: Mutex::new(VecDeque::new()),
            subscribed: AtomicBool::new(true),
        }
    }

    /// Builds a feed from a schedule; ties keep their given order.
    pub fn from_schedule(ctx: SimContext, mut schedule: Vec<ScheduledUpdate>) -> Self {
        schedule.sort_by_key(|s| s.deliver_at);
        let feed = Self::new(ctx);
        *feed.lock_queue() = schedule.into();
        feed
    }

    /// Queues an update, keeping delivery order.
    pub fn push(&self, deliver_at: Duration, update: AttributeUpdate) -> Result<(), EnvError> {
        if !self.is_subscribed() {
            return Err(EnvError::SourceClosed);
        }
        let mut queue = self.lock_queue();
        let index = queue.partition_point(|s| s.deliver_at <= deliver_at);
        queue.insert(index, ScheduledUpdate { deliver_at, update });
        Ok(())
    }

    pub fn pending(&self) -> usize {
        self.lock_queue().len()
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<ScheduledUpdate>> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl UpdateSource for ScheduledFeed {
    async fn recv(&self) -> Option<AttributeUpdate> {
        if !self.is_subscribed() {
            return None;
        }
        let next = self.lock_queue().pop_front()?;
        let deliver_ns = next.deliver_at.as_nanos() as u64;
        if deliver_ns > self.ctx.time_ns() {
            self.ctx.set_time(deliver_ns);
        }
        Some(next.update)
    }

    fn unsubscribe(&self) {
        self.subscribed.store(false, Ordering::SeqCst);
    }

    fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::SeqCst)
    }
}
