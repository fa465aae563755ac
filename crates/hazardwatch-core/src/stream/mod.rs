// ── Snapshot subscriptions ──
//
// Read-side views over the active-alert and history stores. Each
// subscription sees whole snapshots, never partial updates.

mod filter;

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

pub use filter::AlertFilter;

/// Shared, immutable snapshot of a store.
pub type Snapshot<T> = Arc<Vec<Arc<T>>>;

/// A subscription to one store.
///
/// Gives the snapshot taken at subscription time plus change
/// notification, either through [`changed`](Self::changed) or as a
/// `Stream`.
pub struct SnapshotStream<T: Send + Sync + 'static> {
    current: Snapshot<T>,
    receiver: watch::Receiver<Snapshot<T>>,
}

impl<T: Send + Sync + 'static> SnapshotStream<T> {
    pub(crate) fn new(receiver: watch::Receiver<Snapshot<T>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Snapshot as of creation or the last `changed()`.
    pub fn current(&self) -> &Snapshot<T> {
        &self.current
    }

    /// Latest snapshot, which may be newer than `current()`.
    pub fn latest(&self) -> Snapshot<T> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change. `None` once the engine is gone.
    pub async fn changed(&mut self) -> Option<Snapshot<T>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    pub fn into_stream(self) -> SnapshotWatchStream<T> {
        SnapshotWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` of snapshots. Yields the current one first, then one per change.
pub struct SnapshotWatchStream<T: Send + Sync + 'static> {
    inner: WatchStream<Snapshot<T>>,
}

impl<T: Send + Sync + 'static> Stream for SnapshotWatchStream<T> {
    type Item = Snapshot<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures_util::StreamExt;

    use super::*;

    #[tokio::test]
    async fn changed_tracks_latest_snapshot() {
        let (tx, rx) = watch::channel(Arc::new(vec![Arc::new(1)]));
        let mut stream = SnapshotStream::new(rx);
        assert_eq!(stream.current().len(), 1);

        tx.send_modify(|snap| *snap = Arc::new(vec![Arc::new(1), Arc::new(2)]));
        assert_eq!(stream.latest().len(), 2);
        assert_eq!(stream.current().len(), 1);

        let next = stream.changed().await.unwrap();
        assert_eq!(next.len(), 2);
        assert_eq!(stream.current().len(), 2);

        drop(tx);
        assert!(stream.changed().await.is_none());
    }

    #[tokio::test]
    async fn into_stream_yields_current_then_changes() {
        let (tx, rx) = watch::channel(Arc::new(Vec::<Arc<u8>>::new()));
        let mut stream = SnapshotStream::new(rx).into_stream();

        assert!(stream.next().await.unwrap().is_empty());
        tx.send_modify(|snap| *snap = Arc::new(vec![Arc::new(7)]));
        assert_eq!(*stream.next().await.unwrap()[0], 7);
    }
}
