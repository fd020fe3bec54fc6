//! Persistence backend for table state
//!
//! The engine delegates durable bytes to a repository behind the small
//! `FileRepository` capability trait, selected at construction time. Two
//! implementations ship: `DiskRepository`, which frames each table's
//! serialized state with a CRC32 checksum and verifies it on every load,
//! and `MemoryRepository` for tests.
//!
//! # Invariants Enforced
//!
//! - Every load verifies the stored checksum; a mismatch aborts the call as
//!   corruption.
//! - `stat` reports the size and SHA-256 content hash of the persisted
//!   bytes, so a downloaded copy can be verified against the record.

mod disk;
mod errors;
mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::access::{Identity, Ownership, Permissions};
use crate::table::TableState;

pub use disk::DiskRepository;
pub use errors::{BackendError, BackendResult};
pub use memory::MemoryRepository;

/// Identity and ownership record of a table's backing file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Repository-assigned file id
    pub id: i64,
    /// Repository the file lives in
    pub repository_id: i64,
    /// Caller-chosen path within the repository
    pub path: String,
    /// Owning user
    pub owner_id: i64,
    /// Owning group
    pub group_id: i64,
    /// Permission bits the access guard evaluates
    pub permissions: Permissions,
    /// Size in bytes of the persisted state
    pub size: u64,
    /// SHA-256 hash of the persisted state, lowercase hex
    pub hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileInfo {
    /// The ownership facts the access guard consumes
    pub fn ownership(&self) -> Ownership {
        Ownership {
            owner_id: self.owner_id,
            group_id: self.group_id,
            permissions: self.permissions,
        }
    }
}

/// Durable storage capability the table engine delegates to
pub trait FileRepository: Send + Sync {
    /// Creates a new backing file owned by the caller, persists an empty
    /// table state into it, and returns its record.
    fn create(
        &self,
        repository_id: i64,
        path: &str,
        owner: &Identity,
        permissions: Permissions,
    ) -> BackendResult<FileInfo>;

    /// Loads the file record and its table state, verifying integrity.
    fn load(&self, file_id: i64) -> BackendResult<(FileInfo, TableState)>;

    /// Persists `state`, refreshing the record's size, hash and timestamp.
    fn save(&self, file_id: i64, state: &TableState) -> BackendResult<FileInfo>;

    /// Removes the file and its state entirely.
    fn delete(&self, file_id: i64) -> BackendResult<()>;

    /// Returns the current file record without loading the state.
    fn stat(&self, file_id: i64) -> BackendResult<FileInfo>;
}

/// SHA-256 of `bytes` as lowercase hex
pub(crate) fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}
