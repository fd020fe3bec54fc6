//! Disk-backed repository
//!
//! One pair of files per table under the repository root:
//! `<id>.tbl` holds the framed state payload, `<id>.meta.json` the file
//! record. The payload frame is `GRID` magic, a little-endian CRC32 of the
//! payload, then the serde_json bytes. Writes go to a temporary file and
//! rename into place; every load recomputes and verifies the checksum.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use crc32fast::Hasher;

use crate::access::{Identity, Permissions};
use crate::table::TableState;

use super::errors::{BackendError, BackendResult};
use super::{content_hash, FileInfo, FileRepository};

const MAGIC: &[u8; 4] = b"GRID";

/// Repository storing each table's state in a checksummed file on disk
pub struct DiskRepository {
    root: PathBuf,
    next_id: AtomicI64,
}

impl DiskRepository {
    /// Opens (or creates) a repository rooted at `root`. The next file id
    /// continues after the highest id already present.
    ///
    /// # Errors
    ///
    /// I/O errors creating or scanning the root directory.
    pub fn open(root: impl Into<PathBuf>) -> BackendResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| BackendError::io(format!("creating {}", root.display()), e))?;

        let mut max_id = 0;
        let entries = fs::read_dir(&root)
            .map_err(|e| BackendError::io(format!("scanning {}", root.display()), e))?;
        for entry in entries {
            let entry =
                entry.map_err(|e| BackendError::io(format!("scanning {}", root.display()), e))?;
            if let Some(name) = entry.file_name().to_str() {
                if let Some(stem) = name.strip_suffix(".tbl") {
                    if let Ok(id) = stem.parse::<i64>() {
                        max_id = max_id.max(id);
                    }
                }
            }
        }

        Ok(Self {
            root,
            next_id: AtomicI64::new(max_id + 1),
        })
    }

    fn table_path(&self, file_id: i64) -> PathBuf {
        self.root.join(format!("{}.tbl", file_id))
    }

    fn meta_path(&self, file_id: i64) -> PathBuf {
        self.root.join(format!("{}.meta.json", file_id))
    }

    fn read_meta(&self, file_id: i64) -> BackendResult<FileInfo> {
        let path = self.meta_path(file_id);
        if !path.exists() {
            return Err(BackendError::NotFound(file_id));
        }
        let bytes = fs::read(&path)
            .map_err(|e| BackendError::io(format!("reading {}", path.display()), e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write_meta(&self, info: &FileInfo) -> BackendResult<()> {
        let path = self.meta_path(info.id);
        let bytes = serde_json::to_vec_pretty(info)?;
        write_atomic(&path, &bytes)
    }

    /// Persists the framed payload and returns (size, hash) of the bytes on
    /// disk.
    fn write_state(&self, file_id: i64, state: &TableState) -> BackendResult<(u64, String)> {
        let payload = serde_json::to_vec(state)?;
        let mut hasher = Hasher::new();
        hasher.update(&payload);
        let crc = hasher.finalize();

        let mut framed = Vec::with_capacity(payload.len() + 8);
        framed.extend_from_slice(MAGIC);
        framed.extend_from_slice(&crc.to_le_bytes());
        framed.extend_from_slice(&payload);

        write_atomic(&self.table_path(file_id), &framed)?;
        Ok((framed.len() as u64, content_hash(&framed)))
    }

    fn read_state(&self, file_id: i64) -> BackendResult<TableState> {
        let path = self.table_path(file_id);
        if !path.exists() {
            return Err(BackendError::NotFound(file_id));
        }
        let framed = fs::read(&path)
            .map_err(|e| BackendError::io(format!("reading {}", path.display()), e))?;
        if framed.len() < 8 || &framed[0..4] != MAGIC {
            return Err(BackendError::corrupt(file_id, "bad frame header"));
        }
        let stored_crc = u32::from_le_bytes([framed[4], framed[5], framed[6], framed[7]]);
        let payload = &framed[8..];

        let mut hasher = Hasher::new();
        hasher.update(payload);
        if hasher.finalize() != stored_crc {
            return Err(BackendError::corrupt(file_id, "checksum mismatch"));
        }

        Ok(serde_json::from_slice(payload)?)
    }
}

impl FileRepository for DiskRepository {
    fn create(
        &self,
        repository_id: i64,
        path: &str,
        owner: &Identity,
        permissions: Permissions,
    ) -> BackendResult<FileInfo> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();

        let (size, hash) = self.write_state(id, &TableState::default())?;
        let info = FileInfo {
            id,
            repository_id,
            path: path.to_string(),
            owner_id: owner.user_id,
            group_id: owner.group_id,
            permissions,
            size,
            hash,
            created_at: now,
            updated_at: now,
        };
        self.write_meta(&info)?;
        Ok(info)
    }

    fn load(&self, file_id: i64) -> BackendResult<(FileInfo, TableState)> {
        let info = self.read_meta(file_id)?;
        let state = self.read_state(file_id)?;
        Ok((info, state))
    }

    fn save(&self, file_id: i64, state: &TableState) -> BackendResult<FileInfo> {
        let mut info = self.read_meta(file_id)?;
        let (size, hash) = self.write_state(file_id, state)?;
        info.size = size;
        info.hash = hash;
        info.updated_at = Utc::now();
        self.write_meta(&info)?;
        Ok(info)
    }

    fn delete(&self, file_id: i64) -> BackendResult<()> {
        // Meta must exist for the id to be valid at all.
        self.read_meta(file_id)?;
        for path in [self.table_path(file_id), self.meta_path(file_id)] {
            if path.exists() {
                fs::remove_file(&path)
                    .map_err(|e| BackendError::io(format!("removing {}", path.display()), e))?;
            }
        }
        Ok(())
    }

    fn stat(&self, file_id: i64) -> BackendResult<FileInfo> {
        self.read_meta(file_id)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> BackendResult<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)
        .map_err(|e| BackendError::io(format!("writing {}", tmp.display()), e))?;
    fs::rename(&tmp, path)
        .map_err(|e| BackendError::io(format!("renaming into {}", path.display()), e))?;
    Ok(())
}
