//! Preview, progress and result values reported to callers.

use super::transform::SchemaMigration;

/// Read-only assessment of a migration against stored records.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MigrationPreview {
    /// Number of records governed by the migration's schema.
    pub matching_records: usize,
    /// ID of the first matching record, if any.
    pub sample_record_id: Option<[u8; 16]>,
    /// Human-readable conversion risks.
    pub warnings: Vec<String>,
}

impl MigrationPreview {
    /// Whether any conversion risk was found.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// In-flight progress of an executing migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationProgress {
    /// Total candidate records.
    pub total_records: usize,
    /// Records processed so far, successful or not.
    pub processed_records: usize,
    /// Record currently being processed, `None` between records.
    pub current_record_id: Option<[u8; 16]>,
}

impl MigrationProgress {
    /// Create a progress report.
    pub fn new(
        total_records: usize,
        processed_records: usize,
        current_record_id: Option<[u8; 16]>,
    ) -> Self {
        Self {
            total_records,
            processed_records,
            current_record_id,
        }
    }

    /// Calculate percentage complete.
    pub fn percent_complete(&self) -> f64 {
        if self.total_records == 0 {
            100.0
        } else {
            (self.processed_records as f64 / self.total_records as f64) * 100.0
        }
    }

    /// Whether every record has been processed.
    pub fn is_finished(&self) -> bool {
        self.processed_records >= self.total_records && self.current_record_id.is_none()
    }
}

/// A failure confined to one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRecordError {
    /// Record that failed.
    pub record_id: [u8; 16],
    /// Field involved, when the failure is attributable to one.
    pub field_id: Option<String>,
    /// Error message.
    pub reason: String,
}

impl MigrationRecordError {
    /// Create a record error.
    pub fn new(record_id: [u8; 16], field_id: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            record_id,
            field_id,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for MigrationRecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "record {}", hex::encode(self.record_id))?;
        if let Some(field_id) = &self.field_id {
            write!(f, " field {}", field_id)?;
        }
        write!(f, ": {}", self.reason)
    }
}

/// Outcome of an executed migration.
///
/// A call that returns this value may still have failed: callers must check
/// `records_failed` / `errors`. When any record failed, the stored records
/// have been rolled back (or, if that failed too, the checkpoint retained).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationResult {
    /// The migration that was executed.
    pub migration: SchemaMigration,
    /// Candidate records processed.
    pub records_processed: usize,
    /// Records migrated without error.
    pub records_succeeded: usize,
    /// Records that failed.
    pub records_failed: usize,
    /// Per-record failures.
    pub errors: Vec<MigrationRecordError>,
    /// When execution started (microseconds since epoch).
    pub started_at: u64,
    /// When execution finished (microseconds since epoch).
    pub finished_at: u64,
}

impl MigrationResult {
    /// Whether every record migrated.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Wall-clock duration in microseconds.
    pub fn duration_micros(&self) -> u64 {
        self.finished_at.saturating_sub(self.started_at)
    }
}
