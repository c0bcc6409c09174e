//! Production implementations backed by Tokio.

use crate::{AttributeUpdate, ReckonContext, UpdateSource};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant, SystemTime};
use tokio::sync::{mpsc, Mutex};

/// Production context backed by Tokio and the system clock.
pub struct TokioContext {
    /// Start time for monotonic duration calculations
    start: Instant,
}

impl TokioContext {
    /// Creates a new TokioContext.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for TokioContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReckonContext for TokioContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Update source over a bounded tokio channel.
///
/// The session layer (or the simulator) holds the sender half and pushes
/// one `AttributeUpdate` per reflected spatial attribute.
pub struct ChannelSource {
    rx: Mutex<mpsc::Receiver<AttributeUpdate>>,
    subscribed: AtomicBool,
}

impl ChannelSource {
    /// Creates a source and the sender that feeds it.
    pub fn new(capacity: usize) -> (mpsc::Sender<AttributeUpdate>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        let source = Self {
            rx: Mutex::new(rx),
            subscribed: AtomicBool::new(true),
        };
        (tx, source)
    }
}

#[async_trait]
impl UpdateSource for ChannelSource {
    async fn recv(&self) -> Option<AttributeUpdate> {
        if !self.is_subscribed() {
            return None;
        }
        let update = self.rx.lock().await.recv().await?;
        // Anything that raced the unsubscribe is discarded
        if self.is_subscribed() {
            Some(update)
        } else {
            None
        }
    }

    fn unsubscribe(&self) {
        self.subscribed.store(false, Ordering::SeqCst);
    }

    fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tokio_context_time() {
        let ctx = TokioContext::new();
        let t1 = ctx.now();
        ctx.sleep(Duration::from_millis(10)).await;
        let t2 = ctx.now();

        assert!(t2 > t1);
        assert!(t2 - t1 >= Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_channel_source_delivers_in_order() {
        let (tx, source) = ChannelSource::new(8);
        tx.send(AttributeUpdate::new("a", vec![1], vec![])).await.unwrap();
        tx.send(AttributeUpdate::new("b", vec![2], vec![])).await.unwrap();

        assert_eq!(source.recv().await.unwrap().object.as_str(), "a");
        assert_eq!(source.recv().await.unwrap().object.as_str(), "b");
    }

    #[tokio::test]
    async fn test_channel_source_unsubscribe_stops_delivery() {
        let (tx, source) = ChannelSource::new(8);
        tx.send(AttributeUpdate::new("a", vec![1], vec![])).await.unwrap();

        source.unsubscribe();

        assert!(!source.is_subscribed());
        assert!(source.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_channel_source_closed_sender() {
        let (tx, source) = ChannelSource::new(1);
        drop(tx);
        assert!(source.recv().await.is_none());
    }
}
