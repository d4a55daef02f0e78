use async_trait::async_trait;

use crate::error::Result;
use crate::tracker::queue::PendingBatch;

/// Durable storage for the pending event queue.
///
/// The queue is read-modify-written as a whole blob on every operation.
/// Implementations swallow their own IO errors (degrading to an empty
/// batch on load) so a broken store never takes the page down; concurrent
/// writers get last-writer-wins on the serialized blob, which is a
/// documented limitation rather than a guarantee.
pub trait TrackingStore: Send + Sync {
    fn load(&self) -> PendingBatch;
    fn save(&self, batch: &PendingBatch);
}

/// Delivery endpoint for a flush. Implemented by the HTTP target and by
/// fakes in tests.
#[async_trait]
pub trait FlushTarget: Send + Sync {
    async fn deliver(&self, batch: &PendingBatch) -> Result<()>;
}
