//! Migration engine - previews and executes schema migrations.
//!
//! Execution is strictly sequential: checkpoint, then decrypt / transform /
//! re-encrypt / save each record in fetch order, then either discard the
//! checkpoint or roll back from it.

use super::checkpoint::CheckpointStore;
use super::error::{MigrationError, RecordFailure};
use super::observer::{MigrationEvent, MigrationObserver, TracingObserver};
use super::report::{MigrationPreview, MigrationProgress, MigrationRecordError, MigrationResult};
use super::transform::{FieldTransformation, MigrationOptions, SchemaMigration};
use crate::content::{convert, RecordContent};
use crate::crypto::{ContentCodec, ContentKey, KeyResolver};
use crate::storage::key::current_timestamp;
use crate::storage::{MedicalRecord, RecordStore};
use std::sync::Arc;
use tracing::debug;

/// Orchestrates migration preview and execution over its collaborators.
pub struct MigrationEngine {
    records: Arc<dyn RecordStore>,
    checkpoints: Arc<dyn CheckpointStore>,
    codec: Arc<dyn ContentCodec>,
    keys: Arc<dyn KeyResolver>,
    observer: Arc<dyn MigrationObserver>,
}

impl MigrationEngine {
    /// Create a new engine reporting to [`TracingObserver`].
    pub fn new(
        records: Arc<dyn RecordStore>,
        checkpoints: Arc<dyn CheckpointStore>,
        codec: Arc<dyn ContentCodec>,
        keys: Arc<dyn KeyResolver>,
    ) -> Self {
        Self {
            records,
            checkpoints,
            codec,
            keys,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the event observer.
    pub fn with_observer(mut self, observer: Arc<dyn MigrationObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Dry-run a migration against the owner's records, assuming the default
    /// merge strategy.
    ///
    /// Reports how many records match and which type conversions would not
    /// succeed. Nothing is written.
    pub fn preview(
        &self,
        migration: &SchemaMigration,
        owner_id: &[u8; 16],
        primary_key: &ContentKey,
    ) -> Result<MigrationPreview, MigrationError> {
        self.preview_with_options(migration, owner_id, primary_key, &MigrationOptions::default())
    }

    /// Dry-run a migration with the options `execute` will be given.
    ///
    /// Transformations are replayed in order on a scratch copy of each
    /// record's content, so a conversion is checked against the value it
    /// will actually see.
    pub fn preview_with_options(
        &self,
        migration: &SchemaMigration,
        owner_id: &[u8; 16],
        primary_key: &ContentKey,
        options: &MigrationOptions,
    ) -> Result<MigrationPreview, MigrationError> {
        let key = self.keys.retrieve(owner_id, primary_key)?;
        let candidates = self.load_candidates(migration, owner_id, &key)?;

        let mut warnings = Vec::new();
        for (record, content) in &candidates {
            let mut scratch = content.clone();
            for transformation in migration.transformations() {
                if let FieldTransformation::TypeConvert { field_id, to_type } = transformation {
                    if let Some(value) = scratch.get(field_id) {
                        if convert(value, *to_type).is_none() {
                            warnings.push(format!(
                                "field '{}' ({}) cannot convert to {} on record {}",
                                field_id,
                                value.field_type(),
                                to_type,
                                hex::encode(record.id)
                            ));
                        }
                    }
                }
                transformation.apply(&mut scratch, options);
            }
        }

        Ok(MigrationPreview {
            matching_records: candidates.len(),
            sample_record_id: candidates.first().map(|(record, _)| record.id),
            warnings,
        })
    }

    /// Execute a migration against the owner's records.
    ///
    /// Key, fetch and checkpoint-creation failures abort the call before any
    /// record is touched. Per-record failures are collected into the result;
    /// if there are any, every candidate is restored from the checkpoint.
    pub fn execute(
        &self,
        migration: &SchemaMigration,
        owner_id: &[u8; 16],
        primary_key: &ContentKey,
        options: &MigrationOptions,
        progress: &mut dyn FnMut(&MigrationProgress),
    ) -> Result<MigrationResult, MigrationError> {
        let started_at = current_timestamp();
        let migration_id = *migration.id();

        let key = self.keys.retrieve(owner_id, primary_key)?;
        let candidates: Vec<MedicalRecord> = self
            .load_candidates(migration, owner_id, &key)?
            .into_iter()
            .map(|(record, _)| record)
            .collect();
        let total = candidates.len();

        progress(&MigrationProgress::new(total, 0, None));

        self.checkpoints
            .create(&migration_id, owner_id, migration.schema_id(), &candidates)?;

        self.observer.notify(&MigrationEvent::Started {
            migration_id,
            schema_id: migration.schema_id().to_string(),
            candidates: total,
        });

        let mut errors = Vec::new();
        for (processed, record) in candidates.iter().enumerate() {
            progress(&MigrationProgress::new(total, processed, Some(record.id)));

            match self.migrate_record(record, migration, &key, options) {
                Ok(()) => debug!(record_id = %hex::encode(record.id), "Record migrated"),
                Err(failure) => {
                    let reason = failure.to_string();
                    self.observer.notify(&MigrationEvent::RecordFailed {
                        migration_id,
                        record_id: record.id,
                        reason: reason.clone(),
                    });
                    errors.push(MigrationRecordError::new(record.id, None, reason));
                }
            }
        }

        if errors.is_empty() {
            self.discard_checkpoint(&migration_id);
        } else {
            self.roll_back(&migration_id);
        }

        progress(&MigrationProgress::new(total, total, None));

        self.observer.notify(&MigrationEvent::Completed {
            migration_id,
            succeeded: total - errors.len(),
            failed: errors.len(),
        });

        Ok(MigrationResult {
            migration: migration.clone(),
            records_processed: total,
            records_succeeded: total - errors.len(),
            records_failed: errors.len(),
            errors,
            started_at,
            finished_at: current_timestamp(),
        })
    }

    /// Fetch the owner's records and keep those governed by the migration's
    /// schema, in fetch order.
    fn load_candidates(
        &self,
        migration: &SchemaMigration,
        owner_id: &[u8; 16],
        key: &ContentKey,
    ) -> Result<Vec<(MedicalRecord, RecordContent)>, MigrationError> {
        let records = self.records.fetch_all(owner_id).map_err(MigrationError::Fetch)?;

        let mut candidates = Vec::new();
        for record in records {
            match self.codec.decrypt(&record.encrypted_content, key) {
                Ok(content) if content.schema_id == migration.schema_id() => {
                    candidates.push((record, content));
                }
                Ok(_) => {}
                Err(e) => self.observer.notify(&MigrationEvent::CandidateSkipped {
                    migration_id: *migration.id(),
                    record_id: record.id,
                    reason: e.to_string(),
                }),
            }
        }

        debug!(
            migration_id = %hex::encode(migration.id()),
            candidates = candidates.len(),
            "Loaded migration candidates"
        );

        Ok(candidates)
    }

    /// Decrypt, transform, re-encrypt and save one record.
    fn migrate_record(
        &self,
        record: &MedicalRecord,
        migration: &SchemaMigration,
        key: &ContentKey,
        options: &MigrationOptions,
    ) -> Result<(), RecordFailure> {
        let mut content = self
            .codec
            .decrypt(&record.encrypted_content, key)
            .map_err(RecordFailure::Decrypt)?;

        migration.apply(&mut content, options);

        let encrypted = self.codec.encrypt(&content, key).map_err(RecordFailure::Encrypt)?;

        let mut updated = record.clone();
        updated.revise(encrypted);
        self.records.save(&updated).map_err(RecordFailure::Save)
    }

    /// Restore from the checkpoint; keep the checkpoint if that fails.
    fn roll_back(&self, migration_id: &[u8; 16]) {
        match self.checkpoints.restore(migration_id) {
            Ok(restored) => {
                self.observer.notify(&MigrationEvent::RolledBack {
                    migration_id: *migration_id,
                    restored: restored.len(),
                });
                self.discard_checkpoint(migration_id);
            }
            Err(e) => self.observer.notify(&MigrationEvent::RollbackFailed {
                migration_id: *migration_id,
                reason: e.to_string(),
            }),
        }
    }

    fn discard_checkpoint(&self, migration_id: &[u8; 16]) {
        if let Err(e) = self.checkpoints.delete(migration_id) {
            self.observer.notify(&MigrationEvent::CheckpointCleanupFailed {
                migration_id: *migration_id,
                reason: e.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{FieldType, FieldValue, MergeStrategy};
    use crate::crypto::{KeyError, SealedJsonCodec};
    use crate::migration::{MemoryObserver, SledCheckpointStore};
    use crate::storage::SledRecordStore;

    /// Hands out one fixed key for a single owner.
    struct FixedKey {
        owner_id: [u8; 16],
        key: ContentKey,
    }

    impl KeyResolver for FixedKey {
        fn retrieve(
            &self,
            owner_id: &[u8; 16],
            _primary_key: &ContentKey,
        ) -> Result<ContentKey, KeyError> {
            if *owner_id == self.owner_id {
                Ok(self.key.clone())
            } else {
                Err(KeyError::KeyNotAvailable { owner_id: *owner_id })
            }
        }
    }

    const OWNER: [u8; 16] = [7u8; 16];

    struct TestEnv {
        records: Arc<SledRecordStore>,
        checkpoints: Arc<SledCheckpointStore>,
        observer: MemoryObserver,
        engine: MigrationEngine,
        key: ContentKey,
        _db: sled::Db,
    }

    fn test_env() -> TestEnv {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let records = Arc::new(SledRecordStore::open(&db).unwrap());
        let checkpoints = Arc::new(SledCheckpointStore::open(&db, records.clone()).unwrap());
        let key = ContentKey::generate();
        let observer = MemoryObserver::new();

        let engine = MigrationEngine::new(
            records.clone(),
            checkpoints.clone(),
            Arc::new(SealedJsonCodec::new()),
            Arc::new(FixedKey {
                owner_id: OWNER,
                key: key.clone(),
            }),
        )
        .with_observer(Arc::new(observer.clone()));

        TestEnv {
            records,
            checkpoints,
            observer,
            engine,
            key,
            _db: db,
        }
    }

    fn store(env: &TestEnv, content: &RecordContent) -> MedicalRecord {
        let bytes = SealedJsonCodec::new().encrypt(content, &env.key).unwrap();
        env.records.insert_new(&OWNER, bytes).unwrap()
    }

    fn read(env: &TestEnv, record_id: &[u8; 16]) -> (MedicalRecord, RecordContent) {
        let record = env.records.fetch(&OWNER, record_id).unwrap().unwrap();
        let content = SealedJsonCodec::new()
            .decrypt(&record.encrypted_content, &env.key)
            .unwrap();
        (record, content)
    }

    fn primary() -> ContentKey {
        ContentKey::from_bytes([0u8; 32])
    }

    #[test]
    fn test_preview_counts_and_warns() {
        let env = test_env();
        let first = store(&env, &RecordContent::new("vitals").with_field("pulse", "72"));
        store(&env, &RecordContent::new("vitals").with_field("pulse", "fast"));
        store(&env, &RecordContent::new("allergy").with_field("pulse", "n/a"));

        let migration = SchemaMigration::new(
            "vitals",
            1,
            2,
            vec![FieldTransformation::type_convert("pulse", FieldType::Int)],
        )
        .unwrap();

        let preview = env.engine.preview(&migration, &OWNER, &primary()).unwrap();

        assert_eq!(preview.matching_records, 2);
        assert_eq!(preview.sample_record_id, Some(first.id));
        assert_eq!(preview.warnings.len(), 1);
        assert!(preview.warnings[0].contains("pulse"));
        assert!(preview.warnings[0].contains("int"));
    }

    #[test]
    fn test_preview_follows_earlier_transformations() {
        let env = test_env();
        let record = store(
            &env,
            &RecordContent::new("vitals")
                .with_field("reading", "x")
                .with_field("pulse", "5"),
        );

        let migration = SchemaMigration::new(
            "vitals",
            1,
            2,
            vec![
                FieldTransformation::merge("reading", "pulse"),
                FieldTransformation::type_convert("pulse", FieldType::Int),
            ],
        )
        .unwrap();

        let preview = env.engine.preview(&migration, &OWNER, &primary()).unwrap();
        assert_eq!(preview.warnings.len(), 1);
        assert!(preview.warnings[0].contains(&hex::encode(record.id)));

        let keep_target = MigrationOptions::with_merge_strategy(MergeStrategy::PreferTarget);
        let preview = env
            .engine
            .preview_with_options(&migration, &OWNER, &primary(), &keep_target)
            .unwrap();
        assert!(!preview.has_warnings());

        // Preview's scratch copy never reaches the store.
        let (stored, content) = read(&env, &record.id);
        assert_eq!(stored, record);
        assert!(content.contains("reading"));
    }

    #[test]
    fn test_preview_empty_owner() {
        let env = test_env();
        let migration = SchemaMigration::new("vitals", 1, 2, vec![]).unwrap();

        let preview = env.engine.preview(&migration, &OWNER, &primary()).unwrap();

        assert_eq!(preview, MigrationPreview::default());
    }

    #[test]
    fn test_unknown_owner_is_fatal() {
        let env = test_env();
        let migration = SchemaMigration::new("vitals", 1, 2, vec![]).unwrap();

        let err = env.engine.preview(&migration, &[1u8; 16], &primary()).unwrap_err();
        assert!(matches!(err, MigrationError::KeyUnavailable(KeyError::KeyNotAvailable { .. })));

        let err = env
            .engine
            .execute(&migration, &[1u8; 16], &primary(), &MigrationOptions::default(), &mut |_| {})
            .unwrap_err();
        assert!(matches!(err, MigrationError::KeyUnavailable(_)));
        assert!(!env.checkpoints.has_checkpoint(migration.id()).unwrap());
    }

    #[test]
    fn test_execute_applies_transformations() {
        let env = test_env();
        let record = store(
            &env,
            &RecordContent::new("vitals")
                .with_field("pulse", "72")
                .with_field("legacy", "x")
                .with_field("note_a", "calm")
                .with_field("note_b", "seated"),
        );
        let untouched = store(&env, &RecordContent::new("allergy").with_field("pulse", "72"));

        let migration = SchemaMigration::new(
            "vitals",
            1,
            2,
            vec![
                FieldTransformation::remove("legacy"),
                FieldTransformation::type_convert("pulse", FieldType::Int),
                FieldTransformation::merge("note_a", "note_b"),
            ],
        )
        .unwrap();

        let result = env
            .engine
            .execute(&migration, &OWNER, &primary(), &MigrationOptions::default(), &mut |_| {})
            .unwrap();

        assert!(result.is_success());
        assert_eq!(result.records_processed, 1);
        assert_eq!(result.records_succeeded, 1);
        assert_eq!(result.records_failed, 0);
        assert_eq!(result.migration, migration);

        let (stored, content) = read(&env, &record.id);
        assert_eq!(stored.version, 2);
        assert_eq!(stored.id, record.id);
        assert_eq!(stored.owner_id, OWNER);
        assert_eq!(content.get("pulse"), Some(&FieldValue::Int(72)));
        assert_eq!(content.get("note_b"), Some(&FieldValue::from("calm, seated")));
        assert!(!content.contains("legacy"));
        assert!(!content.contains("note_a"));

        let (other, _) = read(&env, &untouched.id);
        assert_eq!(other, untouched);

        assert!(!env.checkpoints.has_checkpoint(migration.id()).unwrap());
    }

    #[test]
    fn test_progress_sequence() {
        let env = test_env();
        let a = store(&env, &RecordContent::new("vitals"));
        let b = store(&env, &RecordContent::new("vitals"));

        let migration = SchemaMigration::new("vitals", 1, 2, vec![]).unwrap();
        let mut events = Vec::new();
        env.engine
            .execute(&migration, &OWNER, &primary(), &MigrationOptions::default(), &mut |p| {
                events.push(*p)
            })
            .unwrap();

        assert_eq!(
            events,
            vec![
                MigrationProgress::new(2, 0, None),
                MigrationProgress::new(2, 0, Some(a.id)),
                MigrationProgress::new(2, 1, Some(b.id)),
                MigrationProgress::new(2, 2, None),
            ]
        );
    }

    #[test]
    fn test_undecryptable_record_is_not_a_candidate() {
        let env = test_env();
        store(&env, &RecordContent::new("vitals"));
        let foreign = env.records.insert_new(&OWNER, vec![1, 2, 3]).unwrap();

        let migration = SchemaMigration::new("vitals", 1, 2, vec![]).unwrap();
        let result = env
            .engine
            .execute(&migration, &OWNER, &primary(), &MigrationOptions::default(), &mut |_| {})
            .unwrap();

        assert_eq!(result.records_processed, 1);
        assert!(env.observer.events().iter().any(|e| matches!(
            e,
            MigrationEvent::CandidateSkipped { record_id, .. } if *record_id == foreign.id
        )));
    }

    #[test]
    fn test_events_for_successful_run() {
        let env = test_env();
        store(&env, &RecordContent::new("vitals"));

        let migration = SchemaMigration::new("vitals", 1, 2, vec![]).unwrap();
        env.engine
            .execute(&migration, &OWNER, &primary(), &MigrationOptions::default(), &mut |_| {})
            .unwrap();

        let events = env.observer.events();
        assert!(matches!(events.first(), Some(MigrationEvent::Started { candidates: 1, .. })));
        assert!(matches!(
            events.last(),
            Some(MigrationEvent::Completed { succeeded: 1, failed: 0, .. })
        ));
    }
}
