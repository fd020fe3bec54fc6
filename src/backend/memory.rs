//! In-memory repository for tests and embedded use
//!
//! Same contract as the disk repository, minus durability: size and hash
//! are computed over the serialized state so file records behave the same.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use chrono::Utc;

use crate::access::{Identity, Permissions};
use crate::table::TableState;

use super::errors::{BackendError, BackendResult};
use super::{content_hash, FileInfo, FileRepository};

/// Repository keeping every table's state in process memory
#[derive(Default)]
pub struct MemoryRepository {
    files: Mutex<HashMap<i64, (FileInfo, TableState)>>,
    next_id: AtomicI64,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<i64, (FileInfo, TableState)>> {
        // A poisoned registry means a writer panicked mid-insert; the map
        // itself is still structurally sound.
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl FileRepository for MemoryRepository {
    fn create(
        &self,
        repository_id: i64,
        path: &str,
        owner: &Identity,
        permissions: Permissions,
    ) -> BackendResult<FileInfo> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let state = TableState::default();
        let bytes = serde_json::to_vec(&state)?;
        let now = Utc::now();
        let info = FileInfo {
            id,
            repository_id,
            path: path.to_string(),
            owner_id: owner.user_id,
            group_id: owner.group_id,
            permissions,
            size: bytes.len() as u64,
            hash: content_hash(&bytes),
            created_at: now,
            updated_at: now,
        };
        self.lock().insert(id, (info.clone(), state));
        Ok(info)
    }

    fn load(&self, file_id: i64) -> BackendResult<(FileInfo, TableState)> {
        self.lock()
            .get(&file_id)
            .cloned()
            .ok_or(BackendError::NotFound(file_id))
    }

    fn save(&self, file_id: i64, state: &TableState) -> BackendResult<FileInfo> {
        let bytes = serde_json::to_vec(state)?;
        let mut files = self.lock();
        let (info, stored) = files
            .get_mut(&file_id)
            .ok_or(BackendError::NotFound(file_id))?;
        info.size = bytes.len() as u64;
        info.hash = content_hash(&bytes);
        info.updated_at = Utc::now();
        *stored = state.clone();
        Ok(info.clone())
    }

    fn delete(&self, file_id: i64) -> BackendResult<()> {
        self.lock()
            .remove(&file_id)
            .map(|_| ())
            .ok_or(BackendError::NotFound(file_id))
    }

    fn stat(&self, file_id: i64) -> BackendResult<FileInfo> {
        self.lock()
            .get(&file_id)
            .map(|(info, _)| info.clone())
            .ok_or(BackendError::NotFound(file_id))
    }
}
