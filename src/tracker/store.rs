use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::warn;

use crate::tracker::queue::PendingBatch;
use crate::tracker::traits::TrackingStore;

/// JSON-file-backed store, the durable local queue.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TrackingStore for JsonFileStore {
    fn load(&self) -> PendingBatch {
        match std::fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                warn!(path = %self.path.display(), error = %err, "Corrupt tracking store, starting empty");
                PendingBatch::default()
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => PendingBatch::default(),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Failed to read tracking store");
                PendingBatch::default()
            }
        }
    }

    fn save(&self, batch: &PendingBatch) {
        let bytes = match serde_json::to_vec(batch) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(error = %err, "Failed to serialize tracking batch");
                return;
            }
        };
        if let Err(err) = std::fs::write(&self.path, bytes) {
            warn!(path = %self.path.display(), error = %err, "Failed to write tracking store");
        }
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<PendingBatch>,
}

impl TrackingStore for MemoryStore {
    fn load(&self) -> PendingBatch {
        self.slot.lock().unwrap().clone()
    }

    fn save(&self, batch: &PendingBatch) {
        *self.slot.lock().unwrap() = batch.clone();
    }
}
