//! Storage layer for MedVault.
//!
//! This module provides a sled-based store for encrypted medical records.

mod config;
mod engine;
mod record;

pub mod key;

pub use config::StorageConfig;
pub use engine::{RecordStore, SledRecordStore, RECORDS_TREE};
pub use key::RecordKey;
pub use record::MedicalRecord;
