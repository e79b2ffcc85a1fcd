// src/storage/rocks.rs
use async_trait::async_trait;
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

use super::errors::{Result, StorageError};
use super::PatientStore;
use crate::core::identity::types::{BiometricIdentifier, PatientRecord};

const PATIENT_PREFIX: &str = "patient:";
const FINGERPRINT_PREFIX: &str = "fingerprint:";

/// RocksDB-backed record store.
///
/// Records live under `patient:<uuid>`; v7 ids sort by creation time so a
/// forward scan is oldest-first. A secondary `fingerprint:<len>:<id>:<uuid>`
/// index serves exact-match scans without touching every record.
pub struct RocksPatientStore {
    db: DB,
}

impl RocksPatientStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            std::fs::create_dir_all(path)?;
        }

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_keep_log_file_num(10);
        opts.set_max_open_files(1000);

        let db = DB::open(&opts, path)
            .map_err(|e| StorageError::DatabaseError(format!("Failed to open database: {}", e)))?;

        info!("Opened patient store at {:?}", path);
        Ok(Self { db })
    }

    fn patient_key(id: &Uuid) -> String {
        format!("{}{}", PATIENT_PREFIX, id.simple())
    }

    fn fingerprint_prefix(identifier: &BiometricIdentifier) -> String {
        // length prefix keeps "A1" from matching the index of "A1:x"
        format!(
            "{}{}:{}:",
            FINGERPRINT_PREFIX,
            identifier.as_str().len(),
            identifier.as_str()
        )
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let raw = match self.db.get(key.as_bytes())? {
            Some(data) => data,
            None => return Ok(None),
        };

        Ok(Some(serde_json::from_slice(&raw)?))
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(Box<[u8]>, Box<[u8]>)>> {
        let mut entries = Vec::new();
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix.as_bytes(), Direction::Forward));

        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            entries.push((key, value));
        }

        Ok(entries)
    }
}

#[async_trait]
impl PatientStore for RocksPatientStore {
    async fn insert(&self, record: &PatientRecord) -> Result<()> {
        let serialized = serde_json::to_vec(record)?;
        let index_key = format!(
            "{}{}",
            Self::fingerprint_prefix(&record.fingerprint_data),
            record.id.simple()
        );

        let mut batch = WriteBatch::default();
        batch.put(Self::patient_key(&record.id).as_bytes(), serialized);
        batch.put(index_key.as_bytes(), record.id.as_bytes());

        self.db
            .write(batch)
            .map_err(|e| StorageError::DatabaseError(format!("Batch write failed: {}", e)))?;

        debug!("Stored patient {}", record.id);
        Ok(())
    }

    async fn find_by_fingerprint(
        &self,
        identifier: &BiometricIdentifier,
    ) -> Result<Option<PatientRecord>> {
        for (_, value) in self.scan_prefix(&Self::fingerprint_prefix(identifier))? {
            let id = Uuid::from_slice(&value)
                .map_err(|e| StorageError::InvalidFormat(format!("Corrupt index entry: {}", e)))?;

            if let Some(record) = self.read_json::<PatientRecord>(&Self::patient_key(&id))? {
                if record.matches(identifier) {
                    return Ok(Some(record));
                }
            }
        }

        Ok(None)
    }

    async fn list_recent(&self) -> Result<Vec<PatientRecord>> {
        let mut records = self
            .scan_prefix(PATIENT_PREFIX)?
            .into_iter()
            .map(|(_, value)| serde_json::from_slice::<PatientRecord>(&value))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        records.reverse();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<PatientRecord>> {
        self.read_json(&Self::patient_key(id))
    }

    async fn close(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}
