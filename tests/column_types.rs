//! Column kind coverage
//!
//! Every kind the store supports, exercised together and alone: reference
//! columns, masks with unpadded blobs, fixed-width arrays (including the
//! width-1 case), bounded strings, and the validation errors their
//! constraints raise at write time.

use std::sync::Arc;

use gridstore::access::{Identity, Permissions};
use gridstore::backend::MemoryRepository;
use gridstore::column::{Column, ColumnValues, MaskValue};
use gridstore::table::Table;
use gridstore::TableService;

// =============================================================================
// Helper Functions
// =============================================================================

fn new_table() -> Table {
    let service = TableService::new(Arc::new(MemoryRepository::new()));
    let owner = Identity::member(1, 10);
    service
        .new_table(1, "/test", &owner, Permissions::private())
        .unwrap()
}

fn mask_column() -> Column {
    Column::new(
        "mask",
        "desc",
        ColumnValues::Mask(vec![
            MaskValue {
                image_id: 1,
                z: 3,
                t: 5,
                x: 7.0,
                y: 9.0,
                w: 11.0,
                h: 13.0,
                bytes: vec![15],
            },
            MaskValue {
                image_id: 2,
                z: 4,
                t: 6,
                x: 8.0,
                y: 10.0,
                w: 12.0,
                h: 14.0,
                bytes: vec![16, 17, 18, 19, 20],
            },
        ]),
    )
}

fn check_mask_column(values: &ColumnValues) {
    let rows = match values {
        ColumnValues::Mask(rows) => rows,
        other => panic!("expected mask values, got {:?}", other),
    };
    assert_eq!(rows[0].image_id, 1);
    assert_eq!(rows[0].z, 3);
    assert_eq!(rows[0].t, 5);
    assert_eq!(rows[0].x, 7.0);
    assert_eq!(rows[0].y, 9.0);
    assert_eq!(rows[0].w, 11.0);
    assert_eq!(rows[0].h, 13.0);
    assert_eq!(rows[0].bytes, vec![15]);

    assert_eq!(rows[1].image_id, 2);
    assert_eq!(rows[1].z, 4);
    assert_eq!(rows[1].t, 6);
    assert_eq!(rows[1].x, 8.0);
    assert_eq!(rows[1].y, 10.0);
    assert_eq!(rows[1].w, 12.0);
    assert_eq!(rows[1].h, 14.0);
    assert_eq!(rows[1].bytes, vec![16, 17, 18, 19, 20]);
}

// =============================================================================
// Mask columns
// =============================================================================

/// Blobs of different lengths round-trip byte-for-byte.
#[test]
fn test_mask_round_trip() {
    let table = new_table();
    let mask = mask_column();

    table.initialize(std::slice::from_ref(&mask)).unwrap();
    table.add_data(std::slice::from_ref(&mask)).unwrap();

    let data = table.read_coordinates(&[0, 1]).unwrap();
    check_mask_column(&data.columns[0].values);
}

// =============================================================================
// Array columns
// =============================================================================

#[test]
fn test_long_array_column() {
    let table = new_table();
    let larr = Column::new(
        "longarr",
        "desc",
        ColumnValues::LongArray {
            width: 2,
            values: vec![vec![-2, -1], vec![1, 2]],
        },
    );

    table.initialize(std::slice::from_ref(&larr)).unwrap();
    table.add_data(std::slice::from_ref(&larr)).unwrap();

    let data = table.read_coordinates(&[0, 1]).unwrap();
    assert_eq!(
        data.columns[0].values,
        ColumnValues::LongArray {
            width: 2,
            values: vec![vec![-2, -1], vec![1, 2]],
        }
    );
}

/// Width-1 arrays stay arrays, not scalars.
#[test]
fn test_double_array_column_width_one() {
    let table = new_table();
    let darr = Column::new(
        "doublearr",
        "desc",
        ColumnValues::DoubleArray {
            width: 1,
            values: vec![vec![0.5], vec![0.25]],
        },
    );

    table.initialize(std::slice::from_ref(&darr)).unwrap();
    table.add_data(std::slice::from_ref(&darr)).unwrap();

    let data = table.read_coordinates(&[0, 1]).unwrap();
    assert_eq!(
        data.columns[0].values,
        ColumnValues::DoubleArray {
            width: 1,
            values: vec![vec![0.5], vec![0.25]],
        }
    );
}

#[test]
fn test_array_width_mismatch_rejected_at_write_time() {
    let table = new_table();
    let larr = Column::new(
        "longarr",
        "desc",
        ColumnValues::LongArray {
            width: 2,
            values: vec![],
        },
    );
    table.initialize(&[larr]).unwrap();

    let wrong = Column::new(
        "longarr",
        "",
        ColumnValues::LongArray {
            width: 2,
            values: vec![vec![1, 2, 3]],
        },
    );
    let err = table.add_data(&[wrong]).unwrap_err();
    assert_eq!(err.code(), "GRID_VALIDATION_FAILED");
    assert_eq!(table.get_number_of_rows().unwrap(), 0);
}

// =============================================================================
// String columns
// =============================================================================

/// Max length 3 accepts "abc" and rejects "abcd"; the failed call commits
/// nothing.
#[test]
fn test_string_length_checked_at_write_time() {
    let table = new_table();
    table
        .initialize(&[Column::string("stringcol", "string col", 3, vec![])])
        .unwrap();

    table
        .add_data(&[Column::string("stringcol", "", 3, vec!["abc".into()])])
        .unwrap();
    let data = table.read_coordinates(&[0]).unwrap();
    assert_eq!(
        data.columns[0].values,
        ColumnValues::String {
            max_length: 3,
            values: vec!["abc".into()],
        }
    );

    let err = table
        .add_data(&[Column::string("stringcol", "", 3, vec!["abcd".into()])])
        .unwrap_err();
    assert_eq!(err.code(), "GRID_VALIDATION_FAILED");
    assert_eq!(table.get_number_of_rows().unwrap(), 1);
}

// =============================================================================
// All kinds together
// =============================================================================

/// Every column kind coexists in one table; an update of two columns leaves
/// every other cell identical.
#[test]
fn test_all_column_kinds_same_table() {
    let table = new_table();

    let cols = vec![
        Column::new("filecol", "file col", ColumnValues::File(vec![10, 20])),
        Column::new("imagecol", "image col", ColumnValues::Image(vec![30, 40])),
        Column::new("roicol", "roi col", ColumnValues::Roi(vec![50, 60])),
        Column::new("wellcol", "well col", ColumnValues::Well(vec![70, 80])),
        Column::new("platecol", "plate col", ColumnValues::Plate(vec![90, 100])),
        Column::new("boolcol", "bool col", ColumnValues::Bool(vec![true, false])),
        Column::double("doublecol", "double col", vec![0.25, 0.5]),
        Column::long("longcol", "long col", vec![-1, -2]),
        Column::string("stringcol", "string col", 3, vec!["abc".into(), "de".into()]),
        mask_column(),
        Column::new(
            "longarr",
            "longarr col",
            ColumnValues::LongArray {
                width: 2,
                values: vec![vec![-2, -1], vec![1, 2]],
            },
        ),
        Column::new(
            "floatarr",
            "floatarr col",
            ColumnValues::FloatArray {
                width: 2,
                values: vec![vec![-8.0, -4.0], vec![16.0, 32.0]],
            },
        ),
        Column::new(
            "doublearr",
            "doublearr col",
            ColumnValues::DoubleArray {
                width: 2,
                values: vec![vec![-0.25, -0.5], vec![0.125, 0.0625]],
            },
        ),
    ];

    table.initialize(&cols).unwrap();
    table.add_data(&cols).unwrap();
    let before = table.read_coordinates(&[0, 1]).unwrap();

    assert_eq!(before.columns[0].values, ColumnValues::File(vec![10, 20]));
    assert_eq!(before.columns[1].values, ColumnValues::Image(vec![30, 40]));
    assert_eq!(before.columns[2].values, ColumnValues::Roi(vec![50, 60]));
    assert_eq!(before.columns[3].values, ColumnValues::Well(vec![70, 80]));
    assert_eq!(before.columns[4].values, ColumnValues::Plate(vec![90, 100]));
    assert_eq!(
        before.columns[5].values,
        ColumnValues::Bool(vec![true, false])
    );
    assert_eq!(
        before.columns[6].values,
        ColumnValues::Double(vec![0.25, 0.5])
    );
    assert_eq!(before.columns[7].values, ColumnValues::Long(vec![-1, -2]));
    assert_eq!(
        before.columns[8].values,
        ColumnValues::String {
            max_length: 3,
            values: vec!["abc".into(), "de".into()],
        }
    );
    check_mask_column(&before.columns[9].values);

    // Update row 1 in two columns only.
    table
        .update(
            &[1],
            &[
                Column::long("longcol", "", vec![12345]),
                Column::new(
                    "longarr",
                    "",
                    ColumnValues::LongArray {
                        width: 2,
                        values: vec![vec![654, 321]],
                    },
                ),
            ],
        )
        .unwrap();

    assert_eq!(table.get_number_of_rows().unwrap(), 2);
    let after = table.read_coordinates(&[0, 1]).unwrap();

    // Untouched columns are byte-identical.
    for n in [0, 1, 2, 3, 4, 5, 6, 8, 11, 12] {
        assert_eq!(before.columns[n].values, after.columns[n].values);
    }
    check_mask_column(&after.columns[9].values);

    assert_eq!(after.columns[7].values, ColumnValues::Long(vec![-1, 12345]));
    assert_eq!(
        after.columns[10].values,
        ColumnValues::LongArray {
            width: 2,
            values: vec![vec![-2, -1], vec![654, 321]],
        }
    );
}

// =============================================================================
// Schema appendability
// =============================================================================

#[test]
fn test_add_column_only_before_data_exists() {
    let table = new_table();
    table.initialize(&[Column::long("lc", "", vec![])]).unwrap();

    table
        .add_column(&Column::bool("flag", "", vec![]))
        .unwrap();

    table
        .add_data(&[
            Column::long("lc", "", vec![1]),
            Column::bool("flag", "", vec![true]),
        ])
        .unwrap();

    // Once rows exist the schema is frozen.
    let err = table
        .add_column(&Column::double("late", "", vec![]))
        .unwrap_err();
    assert_eq!(err.code(), "GRID_USAGE_ERROR");
}
