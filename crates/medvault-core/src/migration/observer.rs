//! Migration event sink.
//!
//! The engine reports noteworthy events through an injected observer rather
//! than a process-wide logger. [`TracingObserver`] is the default.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Events emitted while a migration runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationEvent {
    /// Checkpoint written, record loop about to start.
    Started {
        /// Migration ID.
        migration_id: [u8; 16],
        /// Schema being migrated.
        schema_id: String,
        /// Number of candidate records.
        candidates: usize,
    },
    /// A record could not be decrypted while selecting candidates.
    CandidateSkipped {
        /// Migration ID.
        migration_id: [u8; 16],
        /// Skipped record.
        record_id: [u8; 16],
        /// Error message.
        reason: String,
    },
    /// A record failed to migrate.
    RecordFailed {
        /// Migration ID.
        migration_id: [u8; 16],
        /// Failed record.
        record_id: [u8; 16],
        /// Error message.
        reason: String,
    },
    /// Records were restored from the checkpoint.
    RolledBack {
        /// Migration ID.
        migration_id: [u8; 16],
        /// Number of records written back.
        restored: usize,
    },
    /// Restoring from the checkpoint failed; the checkpoint is retained.
    RollbackFailed {
        /// Migration ID.
        migration_id: [u8; 16],
        /// Error message.
        reason: String,
    },
    /// The checkpoint could not be deleted after the outcome was resolved.
    CheckpointCleanupFailed {
        /// Migration ID.
        migration_id: [u8; 16],
        /// Error message.
        reason: String,
    },
    /// The record loop finished.
    Completed {
        /// Migration ID.
        migration_id: [u8; 16],
        /// Records migrated.
        succeeded: usize,
        /// Records that failed.
        failed: usize,
    },
}

impl MigrationEvent {
    /// The migration this event belongs to.
    pub fn migration_id(&self) -> &[u8; 16] {
        match self {
            MigrationEvent::Started { migration_id, .. }
            | MigrationEvent::CandidateSkipped { migration_id, .. }
            | MigrationEvent::RecordFailed { migration_id, .. }
            | MigrationEvent::RolledBack { migration_id, .. }
            | MigrationEvent::RollbackFailed { migration_id, .. }
            | MigrationEvent::CheckpointCleanupFailed { migration_id, .. }
            | MigrationEvent::Completed { migration_id, .. } => migration_id,
        }
    }
}

/// Receives migration events.
///
/// Called synchronously from the migrating thread; implementations must not
/// block.
pub trait MigrationObserver: Send + Sync {
    /// Handle an event.
    fn notify(&self, event: &MigrationEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl MigrationObserver for TracingObserver {
    fn notify(&self, event: &MigrationEvent) {
        let migration_id = hex::encode(event.migration_id());
        match event {
            MigrationEvent::Started {
                schema_id,
                candidates,
                ..
            } => info!(%migration_id, %schema_id, candidates, "Migration started"),
            MigrationEvent::CandidateSkipped { record_id, reason, .. } => warn!(
                %migration_id,
                record_id = %hex::encode(record_id),
                %reason,
                "Skipping undecryptable record"
            ),
            MigrationEvent::RecordFailed { record_id, reason, .. } => warn!(
                %migration_id,
                record_id = %hex::encode(record_id),
                %reason,
                "Record migration failed"
            ),
            MigrationEvent::RolledBack { restored, .. } => {
                info!(%migration_id, restored, "Migration rolled back from checkpoint")
            }
            MigrationEvent::RollbackFailed { reason, .. } => error!(
                %migration_id,
                %reason,
                "Rollback failed; checkpoint retained for manual recovery"
            ),
            MigrationEvent::CheckpointCleanupFailed { reason, .. } => {
                warn!(%migration_id, %reason, "Failed to delete checkpoint")
            }
            MigrationEvent::Completed {
                succeeded, failed, ..
            } => {
                if *failed == 0 {
                    info!(%migration_id, succeeded, "Migration completed");
                } else {
                    debug!(%migration_id, succeeded, failed, "Migration finished with failures");
                }
            }
        }
    }
}

/// Collects events in memory, for tests and diagnostics.
#[derive(Debug, Default, Clone)]
pub struct MemoryObserver {
    events: Arc<Mutex<Vec<MigrationEvent>>>,
}

impl MemoryObserver {
    /// Create a new memory observer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded events.
    pub fn events(&self) -> Vec<MigrationEvent> {
        self.events.lock().clone()
    }

    /// Clear all events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Get event count.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl MigrationObserver for MemoryObserver {
    fn notify(&self, event: &MigrationEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl MigrationObserver for NullObserver {
    fn notify(&self, _event: &MigrationEvent) {}
}
