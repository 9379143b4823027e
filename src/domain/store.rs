use crate::api::dto::{KeyRecord, MethodRecord};
use anyhow::Context;
use dashmap::DashMap;
use sled::Db;

/// Trait for method record storage backends.
/// Implementations must be thread-safe (Send + Sync).
pub trait RecordStore: Send + Sync {
    /// Insert or replace the record stored under its own key.
    fn put(&self, record: &MethodRecord) -> anyhow::Result<()>;
    fn get(&self, key: &KeyRecord) -> anyhow::Result<Option<MethodRecord>>;
    /// All records, ordered by key.
    fn all(&self) -> anyhow::Result<Vec<MethodRecord>>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn put_all(&self, records: &[MethodRecord]) -> anyhow::Result<()> {
        for record in records {
            self.put(record)?;
        }
        Ok(())
    }
}

// ============================================================================
// MemoryRecordStore - Fast in-memory storage using DashMap
// ============================================================================

#[derive(Default)]
pub struct MemoryRecordStore {
    records: DashMap<KeyRecord, MethodRecord>,
}

impl RecordStore for MemoryRecordStore {
    fn put(&self, record: &MethodRecord) -> anyhow::Result<()> {
        self.records.insert(record.key_record(), record.clone());
        Ok(())
    }

    fn get(&self, key: &KeyRecord) -> anyhow::Result<Option<MethodRecord>> {
        Ok(self.records.get(key).map(|r| r.clone()))
    }

    fn all(&self) -> anyhow::Result<Vec<MethodRecord>> {
        let mut records: Vec<MethodRecord> = self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by_key(|r| r.key_record());
        Ok(records)
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

// ============================================================================
// DiskRecordStore - Scalable disk-based storage using sled
// ============================================================================

pub struct DiskRecordStore {
    _db: Db,
    records_tree: sled::Tree,
}

impl DiskRecordStore {
    pub fn new(path: &str) -> anyhow::Result<Self> {
        let db = sled::open(path).with_context(|| format!("Failed to open record store at {}", path))?;
        let records_tree = db.open_tree("method_records")?;

        Ok(Self {
            _db: db,
            records_tree,
        })
    }

    /// Big-endian so sled's byte order matches key order.
    fn record_key(key: &KeyRecord) -> [u8; 18] {
        let mut bytes = [0u8; 18];
        bytes[0] = key.owner.is_some() as u8;
        bytes[1..9].copy_from_slice(&key.owner.map_or(0, |o| o.0).to_be_bytes());
        bytes[9] = key.method.is_some() as u8;
        bytes[10..18].copy_from_slice(&key.method.map_or(0, |m| m.0).to_be_bytes());
        bytes
    }

    pub fn flush(&self) -> anyhow::Result<()> {
        self.records_tree.flush()?;
        Ok(())
    }
}

impl RecordStore for DiskRecordStore {
    fn put(&self, record: &MethodRecord) -> anyhow::Result<()> {
        let bytes = bincode::serialize(record)?;
        self.records_tree
            .insert(Self::record_key(&record.key_record()), bytes)?;
        Ok(())
    }

    fn get(&self, key: &KeyRecord) -> anyhow::Result<Option<MethodRecord>> {
        match self.records_tree.get(Self::record_key(key))? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn all(&self) -> anyhow::Result<Vec<MethodRecord>> {
        self.records_tree
            .iter()
            .values()
            .map(|bytes| -> anyhow::Result<MethodRecord> { Ok(bincode::deserialize(&bytes?)?) })
            .collect()
    }

    fn len(&self) -> usize {
        self.records_tree.len()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
