//! Table lifecycle scenarios
//!
//! End-to-end coverage of the handle state machine over a disk-backed
//! repository: initialize-once, append/update atomicity, the (0,0)
//! full-range read sentinel, file records, metadata, and the
//! uninitialized-table usage errors.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tempfile::TempDir;

use gridstore::access::{Identity, Permissions};
use gridstore::backend::{
    BackendError, BackendResult, DiskRepository, FileInfo, FileRepository, MemoryRepository,
};
use gridstore::column::Column;
use gridstore::metadata::{MetaValue, KEY_INITIALIZED, KEY_VERSION};
use gridstore::table::TableState;
use gridstore::TableService;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup() -> (TempDir, TableService, Identity) {
    let tmp = TempDir::new().unwrap();
    let repo = DiskRepository::open(tmp.path()).unwrap();
    let service = TableService::new(Arc::new(repo));
    let owner = Identity::member(1, 10);
    (tmp, service, owner)
}

/// In-memory repository whose `save` can be made to fail on demand, for
/// exercising the persist-then-swap discipline under backend failure.
struct FailingSaveRepository {
    inner: MemoryRepository,
    fail_saves: AtomicBool,
}

impl FailingSaveRepository {
    fn new() -> Self {
        Self {
            inner: MemoryRepository::new(),
            fail_saves: AtomicBool::new(false),
        }
    }
}

impl FileRepository for FailingSaveRepository {
    fn create(
        &self,
        repository_id: i64,
        path: &str,
        owner: &Identity,
        permissions: Permissions,
    ) -> BackendResult<FileInfo> {
        self.inner.create(repository_id, path, owner, permissions)
    }

    fn load(&self, file_id: i64) -> BackendResult<(FileInfo, TableState)> {
        self.inner.load(file_id)
    }

    fn save(&self, file_id: i64, state: &TableState) -> BackendResult<FileInfo> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(BackendError::io(
                "writing table state",
                std::io::Error::new(std::io::ErrorKind::Other, "no space left on device"),
            ));
        }
        self.inner.save(file_id, state)
    }

    fn delete(&self, file_id: i64) -> BackendResult<()> {
        self.inner.delete(file_id)
    }

    fn stat(&self, file_id: i64) -> BackendResult<FileInfo> {
        self.inner.stat(file_id)
    }
}

fn user_metadata(table: &gridstore::table::Table) -> HashMap<String, MetaValue> {
    table
        .get_all_metadata()
        .unwrap()
        .into_iter()
        .filter(|(k, _)| k != KEY_INITIALIZED && k != KEY_VERSION)
        .collect()
}

// =============================================================================
// Lifecycle
// =============================================================================

/// A fresh table takes one schema, accepts rows, and answers a where-query.
#[test]
fn test_blank_table_round_trip() {
    let (_tmp, service, owner) = setup();
    let table = service
        .new_table(1, "/test", &owner, Permissions::private())
        .unwrap();

    table
        .initialize(&[Column::long("lc", "", vec![])])
        .unwrap();
    table
        .add_data(&[Column::long("lc", "", vec![1, 2, 3, 4])])
        .unwrap();

    assert_eq!(table.get_number_of_rows().unwrap(), 4);
    assert_eq!(
        table
            .get_where_list("(lc==1)", &HashMap::new(), 0, 0, 0)
            .unwrap(),
        vec![0]
    );
}

#[test]
fn test_initialize_twice_rejected() {
    let (_tmp, service, owner) = setup();
    let table = service
        .new_table(1, "/test", &owner, Permissions::private())
        .unwrap();
    table
        .initialize(&[Column::long("lc", "", vec![])])
        .unwrap();

    let err = table
        .initialize(&[Column::long("other", "", vec![])])
        .unwrap_err();
    assert_eq!(err.code(), "GRID_USAGE_ERROR");
}

#[test]
fn test_initialize_with_no_columns_rejected() {
    let (_tmp, service, owner) = setup();
    let table = service
        .new_table(1, "/test", &owner, Permissions::private())
        .unwrap();
    assert!(table.initialize(&[]).is_err());
}

/// Every read-or-write operation other than initialize is a usage error on
/// an uninitialized table.
#[test]
fn test_uninitialized_table_read_write_rejected() {
    let (_tmp, service, owner) = setup();
    let table = service
        .new_table(1, "/test", &owner, Permissions::private())
        .unwrap();

    let lcol = Column::long("longcol", "long col", vec![1]);
    assert_eq!(
        table.add_data(&[lcol]).unwrap_err().code(),
        "GRID_USAGE_ERROR"
    );
    assert_eq!(
        table.read(Some(&[0]), 0, 0).unwrap_err().code(),
        "GRID_USAGE_ERROR"
    );
    assert_eq!(table.slice(&[], &[]).unwrap_err().code(), "GRID_USAGE_ERROR");
    assert_eq!(
        table
            .get_where_list("", &HashMap::new(), 0, 0, 0)
            .unwrap_err()
            .code(),
        "GRID_USAGE_ERROR"
    );
}

// =============================================================================
// Reads and the range sentinel
// =============================================================================

/// (start=0, stop=0) is the whole available range, not an empty one.
#[test]
fn test_read_zero_zero_means_full_range() {
    let (_tmp, service, owner) = setup();
    let table = service
        .new_table(1, "/test", &owner, Permissions::private())
        .unwrap();
    table
        .initialize(&[Column::long("lc", "desc", vec![])])
        .unwrap();
    table.add_data(&[Column::long("lc", "", vec![123])]).unwrap();

    let data = table.read(Some(&[0]), 0, 0).unwrap();
    assert_eq!(
        data.columns[0].values,
        gridstore::column::ColumnValues::Long(vec![123])
    );
}

#[test]
fn test_read_window_restricts_rows() {
    let (_tmp, service, owner) = setup();
    let table = service
        .new_table(1, "/test", &owner, Permissions::private())
        .unwrap();
    table.initialize(&[Column::long("lc", "", vec![])]).unwrap();
    table
        .add_data(&[Column::long("lc", "", vec![10, 20, 30, 40])])
        .unwrap();

    let data = table.read(None, 1, 3).unwrap();
    assert_eq!(data.row_numbers, vec![1, 2]);
    assert_eq!(
        data.columns[0].values,
        gridstore::column::ColumnValues::Long(vec![20, 30])
    );

    // Requested rows outside the window are dropped, not an error.
    let data = table.read(Some(&[0, 2]), 2, 4).unwrap();
    assert_eq!(data.row_numbers, vec![2]);
}

/// slice with an empty row list returns zero rows; that is not the sentinel.
#[test]
fn test_slice_empty_rows_is_empty_result() {
    let (_tmp, service, owner) = setup();
    let table = service
        .new_table(1, "/test", &owner, Permissions::private())
        .unwrap();
    table.initialize(&[Column::long("lc", "", vec![])]).unwrap();
    table
        .add_data(&[Column::long("lc", "", vec![1, 2])])
        .unwrap();

    let data = table.slice(&[0], &[]).unwrap();
    assert_eq!(data.row_count(), 0);
    assert_eq!(
        data.columns[0].values,
        gridstore::column::ColumnValues::Long(vec![])
    );
}

#[test]
fn test_read_coordinates_preserves_unsorted_order() {
    let (_tmp, service, owner) = setup();
    let table = service
        .new_table(1, "/test", &owner, Permissions::private())
        .unwrap();
    table.initialize(&[Column::long("lc", "", vec![])]).unwrap();
    table
        .add_data(&[Column::long("lc", "", vec![10, 20, 30])])
        .unwrap();

    let data = table.read_coordinates(&[2, 0]).unwrap();
    assert_eq!(data.row_numbers, vec![2, 0]);
    assert_eq!(
        data.columns[0].values,
        gridstore::column::ColumnValues::Long(vec![30, 10])
    );
}

// =============================================================================
// Update
// =============================================================================

/// An update through slice-modify-update changes the targeted cell.
#[test]
fn test_update_rewrites_targeted_cell() {
    let (_tmp, service, owner) = setup();
    let table = service
        .new_table(1, "/test", &owner, Permissions::private())
        .unwrap();
    table.initialize(&[Column::long("lc", "", vec![])]).unwrap();
    table
        .add_data(&[Column::long("lc", "", vec![1, 2, 3, 4])])
        .unwrap();

    let before = table.slice(&[0], &[0]).unwrap();
    assert_eq!(
        before.columns[0].values,
        gridstore::column::ColumnValues::Long(vec![1])
    );

    table
        .update(&[0], &[Column::long("lc", "", vec![100])])
        .unwrap();

    let after = table.slice(&[0], &[0]).unwrap();
    assert_eq!(
        after.columns[0].values,
        gridstore::column::ColumnValues::Long(vec![100])
    );
    // Other rows untouched.
    let rest = table.read_coordinates(&[1, 2, 3]).unwrap();
    assert_eq!(
        rest.columns[0].values,
        gridstore::column::ColumnValues::Long(vec![2, 3, 4])
    );
}

#[test]
fn test_update_out_of_range_row_rejected() {
    let (_tmp, service, owner) = setup();
    let table = service
        .new_table(1, "/test", &owner, Permissions::private())
        .unwrap();
    table.initialize(&[Column::long("lc", "", vec![])]).unwrap();
    table.add_data(&[Column::long("lc", "", vec![1])]).unwrap();

    let err = table
        .update(&[1], &[Column::long("lc", "", vec![9])])
        .unwrap_err();
    assert_eq!(err.code(), "GRID_USAGE_ERROR");
    // Nothing changed.
    let data = table.read(None, 0, 0).unwrap();
    assert_eq!(
        data.columns[0].values,
        gridstore::column::ColumnValues::Long(vec![1])
    );
}

/// An update targeting no rows and supplying no columns changes nothing:
/// no version bump, no rewrite of the backing file.
#[test]
fn test_empty_update_is_a_no_op() {
    let (_tmp, service, owner) = setup();
    let table = service
        .new_table(1, "/test", &owner, Permissions::private())
        .unwrap();
    table.initialize(&[Column::long("lc", "", vec![])]).unwrap();
    table.add_data(&[Column::long("lc", "", vec![1])]).unwrap();
    let before = table.get_original_file().unwrap();

    table.update(&[], &[]).unwrap();

    assert_eq!(table.get_metadata(KEY_VERSION).unwrap(), MetaValue::Long(2));
    let after = table.get_original_file().unwrap();
    assert_eq!(before.hash, after.hash);
}

// =============================================================================
// Backend failure atomicity
// =============================================================================

/// A save that fails at the repository surfaces as a backend error and
/// leaves rows, values and the version exactly as they were.
#[test]
fn test_failed_save_leaves_state_unchanged() {
    let repo = Arc::new(FailingSaveRepository::new());
    let service = TableService::new(repo.clone());
    let owner = Identity::member(1, 10);
    let table = service
        .new_table(1, "/test", &owner, Permissions::private())
        .unwrap();
    table.initialize(&[Column::long("lc", "", vec![])]).unwrap();
    table
        .add_data(&[Column::long("lc", "", vec![1, 2])])
        .unwrap();

    repo.fail_saves.store(true, Ordering::SeqCst);
    let err = table
        .add_data(&[Column::long("lc", "", vec![3])])
        .unwrap_err();
    assert_eq!(err.code(), "GRID_BACKEND_ERROR");
    let err = table
        .update(&[0], &[Column::long("lc", "", vec![9])])
        .unwrap_err();
    assert_eq!(err.code(), "GRID_BACKEND_ERROR");
    repo.fail_saves.store(false, Ordering::SeqCst);

    assert_eq!(table.get_number_of_rows().unwrap(), 2);
    let data = table.read(None, 0, 0).unwrap();
    assert_eq!(
        data.columns[0].values,
        gridstore::column::ColumnValues::Long(vec![1, 2])
    );
    assert_eq!(table.get_metadata(KEY_VERSION).unwrap(), MetaValue::Long(2));

    // The stored copy matches the live one.
    let (_, stored) = repo.load(table.get_original_file().unwrap().id).unwrap();
    assert_eq!(stored.row_count, 2);
    assert_eq!(stored.version, 2);
}

// =============================================================================
// Backing file record
// =============================================================================

/// The file record's size and hash match the persisted bytes after writes.
#[test]
fn test_original_file_size_and_hash_track_content() {
    let (tmp, service, owner) = setup();
    let mut table = service
        .new_table(1, "/test", &owner, Permissions::private())
        .unwrap();

    let before = table.get_original_file().unwrap();
    table.initialize(&[Column::long("lc", "desc", vec![])]).unwrap();
    table.add_data(&[Column::long("lc", "", vec![1])]).unwrap();
    let after = table.get_original_file().unwrap();
    table.close();

    assert_eq!(before.id, after.id);
    assert_ne!(before.hash, after.hash);

    // Verify against the actual bytes on disk.
    let path = tmp.path().join(format!("{}.tbl", after.id));
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(after.size, bytes.len() as u64);

    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(&bytes);
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    assert_eq!(after.hash, hex);
}

#[test]
fn test_delete_removes_backing_storage() {
    let (_tmp, service, owner) = setup();
    let mut table = service
        .new_table(1, "/testDelete", &owner, Permissions::private())
        .unwrap();
    table.initialize(&[Column::long("lc", "", vec![])]).unwrap();
    let file_id = table.file_id();

    table.delete().unwrap();
    table.close();

    assert!(service.open_table(file_id, &owner).is_err());
}

#[test]
fn test_close_then_reopen_persists_rows() {
    let (_tmp, service, owner) = setup();
    let mut table = service
        .new_table(1, "/test", &owner, Permissions::private())
        .unwrap();
    table.initialize(&[Column::long("lc", "", vec![])]).unwrap();
    table
        .add_data(&[Column::long("lc", "", vec![5, 6])])
        .unwrap();
    let file_id = table.file_id();
    table.close();

    // Operations on a closed handle are usage errors.
    assert_eq!(
        table.get_number_of_rows().unwrap_err().code(),
        "GRID_USAGE_ERROR"
    );

    let reopened = service.open_table(file_id, &owner).unwrap();
    assert_eq!(reopened.get_number_of_rows().unwrap(), 2);
}

/// Handles are debug-printable (so `Result<Table, _>` combinators that need
/// `T: Debug` work) and report whether the handle is still open.
#[test]
fn test_handle_debug_reports_open_state() {
    let (_tmp, service, owner) = setup();
    let mut table = service
        .new_table(1, "/test", &owner, Permissions::private())
        .unwrap();

    let rendered = format!("{:?}", table);
    assert!(rendered.contains("Table"));
    assert!(rendered.contains("open: true"));

    table.close();
    assert!(format!("{:?}", table).contains("open: false"));
}

// =============================================================================
// Metadata
// =============================================================================

/// A fresh table's user metadata is empty; string, int and float values
/// round-trip; reserved keys stay enumerable but rejected as targets.
#[test]
fn test_metadata_methods() {
    let (_tmp, service, owner) = setup();
    let table = service
        .new_table(1, "/test", &owner, Permissions::private())
        .unwrap();
    table
        .initialize(&[Column::long("lc", "desc", vec![])])
        .unwrap();

    assert!(user_metadata(&table).is_empty());

    table.set_metadata("s", "b".into()).unwrap();
    assert_eq!(table.get_metadata("s").unwrap(), MetaValue::Text("b".into()));
    assert_eq!(
        user_metadata(&table),
        HashMap::from([("s".to_string(), MetaValue::Text("b".into()))])
    );

    table.set_metadata("i", 1i64.into()).unwrap();
    assert_eq!(table.get_metadata("i").unwrap(), MetaValue::Long(1));

    table.set_metadata("f", 1.0f64.into()).unwrap();
    assert_eq!(table.get_metadata("f").unwrap(), MetaValue::Double(1.0));

    assert_eq!(user_metadata(&table).len(), 3);

    // Reserved keys are present in the full enumeration and writable by
    // nobody.
    let all = table.get_all_metadata().unwrap();
    assert_eq!(all.get(KEY_INITIALIZED), Some(&MetaValue::Bool(true)));
    assert_eq!(all.get(KEY_VERSION), Some(&MetaValue::Long(1)));
    assert!(table.set_metadata(KEY_VERSION, 99i64.into()).is_err());

    // Missing key is a usage error.
    assert_eq!(
        table.get_metadata("missing").unwrap_err().code(),
        "GRID_USAGE_ERROR"
    );
}

#[test]
fn test_set_all_metadata_replaces_user_entries() {
    let (_tmp, service, owner) = setup();
    let table = service
        .new_table(1, "/test", &owner, Permissions::private())
        .unwrap();
    table.initialize(&[Column::long("lc", "", vec![])]).unwrap();
    table.set_metadata("old", "x".into()).unwrap();

    table
        .set_all_metadata(&std::collections::BTreeMap::from([(
            "new".to_string(),
            MetaValue::Long(7),
        )]))
        .unwrap();

    let user = user_metadata(&table);
    assert_eq!(
        user,
        HashMap::from([("new".to_string(), MetaValue::Long(7))])
    );
}

// =============================================================================
// Structural version
// =============================================================================

#[test]
fn test_version_starts_at_one_and_increments() {
    let (_tmp, service, owner) = setup();
    let table = service
        .new_table(1, "/test", &owner, Permissions::private())
        .unwrap();
    table.initialize(&[Column::long("lc", "", vec![])]).unwrap();
    assert_eq!(table.get_metadata(KEY_VERSION).unwrap(), MetaValue::Long(1));

    table.add_data(&[Column::long("lc", "", vec![1])]).unwrap();
    assert_eq!(table.get_metadata(KEY_VERSION).unwrap(), MetaValue::Long(2));

    table
        .update(&[0], &[Column::long("lc", "", vec![2])])
        .unwrap();
    assert_eq!(table.get_metadata(KEY_VERSION).unwrap(), MetaValue::Long(3));
}
