//! Service entry point for table handles
//!
//! `TableService` is what a session talks to: it creates new backing files,
//! opens existing ones after the access guard has approved the caller, and
//! keeps one shared in-memory state per open file so that concurrent handles
//! to the same table serialize their writes and read consistent snapshots.
//! Distinct tables share no lock.
//!
//! The repository behind the service is injected at construction time, so
//! callers pick disk-backed or in-memory persistence without touching the
//! engine.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, Weak};

use crate::access::{AccessGuard, Identity, Permissions};
use crate::backend::FileRepository;
use crate::error::TableResult;
use crate::observability::Logger;
use crate::table::{Table, TableState};

/// Factory and registry for table handles
pub struct TableService {
    repo: Arc<dyn FileRepository>,
    guard: AccessGuard,
    open: Mutex<HashMap<i64, Weak<RwLock<TableState>>>>,
}

impl TableService {
    /// Creates a service over the given repository
    pub fn new(repo: Arc<dyn FileRepository>) -> Self {
        Self {
            repo,
            guard: AccessGuard::new(),
            open: Mutex::new(HashMap::new()),
        }
    }

    /// Capability probe for remote callers
    pub fn tables_enabled(&self) -> bool {
        true
    }

    /// Creates a new, uninitialized table backed by a fresh file owned by
    /// the caller in the caller's session group, stamped with `permissions`.
    pub fn new_table(
        &self,
        repository_id: i64,
        path: &str,
        caller: &Identity,
        permissions: Permissions,
    ) -> TableResult<Table> {
        let info = self
            .repo
            .create(repository_id, path, caller, permissions)?;
        Logger::info(
            "table_created",
            &[
                ("file_id", &info.id.to_string()),
                ("path", path),
                ("owner_id", &caller.user_id.to_string()),
            ],
        );

        let core = Arc::new(RwLock::new(TableState::default()));
        self.register(info.id, &core);
        Ok(Table::new(
            Arc::clone(&self.repo),
            self.guard,
            caller.clone(),
            info,
            core,
        ))
    }

    /// Opens an existing table. The guard checks read visibility under the
    /// caller's active group context before any state is loaded into the
    /// handle; a denied caller changes nothing and learns nothing beyond
    /// the denial.
    pub fn open_table(&self, file_id: i64, caller: &Identity) -> TableResult<Table> {
        let info = self.repo.stat(file_id)?;
        self.guard
            .check_read(&info.ownership(), caller)
            .map_err(|e| {
                Logger::warn(
                    "open_denied",
                    &[
                        ("file_id", &file_id.to_string()),
                        ("user_id", &caller.user_id.to_string()),
                    ],
                );
                e
            })?;

        let core = self.shared_state(file_id)?;
        Logger::info(
            "table_opened",
            &[
                ("file_id", &file_id.to_string()),
                ("user_id", &caller.user_id.to_string()),
            ],
        );
        Ok(Table::new(
            Arc::clone(&self.repo),
            self.guard,
            caller.clone(),
            info,
            core,
        ))
    }

    /// Returns the shared state for `file_id`, loading it from the
    /// repository when no other handle has it open.
    fn shared_state(&self, file_id: i64) -> TableResult<Arc<RwLock<TableState>>> {
        let mut open = self.open.lock().unwrap_or_else(|e| e.into_inner());
        open.retain(|_, weak| weak.strong_count() > 0);

        if let Some(core) = open.get(&file_id).and_then(Weak::upgrade) {
            return Ok(core);
        }
        let (_, state) = self.repo.load(file_id)?;
        let core = Arc::new(RwLock::new(state));
        open.insert(file_id, Arc::downgrade(&core));
        Ok(core)
    }

    fn register(&self, file_id: i64, core: &Arc<RwLock<TableState>>) {
        let mut open = self.open.lock().unwrap_or_else(|e| e.into_inner());
        open.retain(|_, weak| weak.strong_count() > 0);
        open.insert(file_id, Arc::downgrade(core));
    }
}
