pub mod batcher;
pub mod queue;
pub mod store;
pub mod traits;

pub use batcher::{Batcher, FlushPolicy, HttpFlushTarget, TrackerHandle};
pub use queue::{PendingBatch, TrackingEvent, TrackingQueue};
pub use store::{JsonFileStore, MemoryStore};
pub use traits::{FlushTarget, TrackingStore};
