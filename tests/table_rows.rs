//! # Table and Row Cursor Integration Tests
//!
//! Full-path coverage: table creation, row append, the forward cursor and
//! its three scan shapes, against the in-memory engine.

use eyre::Result;
use fitscore::header::{read_header, BlockKind};
use fitscore::{CellValue, Column, Error, FileEngine, MemoryEngine, ScanRecord, Table};
use hashbrown::HashMap;

fn events_table(engine: &mut MemoryEngine) -> Table {
    let cols = vec![
        Column::new("id", CellValue::Long(0)),
        Column::new("flux", CellValue::Floats(vec![0.0; 4])).with_unit("Jy"),
        Column::new("tag", CellValue::Text(" ".repeat(8))),
    ];
    let mut table = Table::create(engine, &cols, BlockKind::BinaryTable).unwrap();
    for i in 0..4i64 {
        let f = i as f32;
        table
            .append(
                engine,
                &[
                    CellValue::Long(i),
                    CellValue::Floats(vec![f, f + 0.5, f + 1.0, f + 1.5]),
                    CellValue::Text(format!("ev{i}")),
                ],
            )
            .unwrap();
    }
    table
}

#[test]
fn test_create_append_and_scan_round_trip() {
    let mut engine = MemoryEngine::new();
    let mut table = events_table(&mut engine);
    assert_eq!(table.num_rows(), 4);

    let mut rows = table.read(&mut engine, 0, 4);
    let mut seen = 0;
    while rows.next() {
        let mut dest = [
            CellValue::Long(0),
            CellValue::Floats(Vec::new()),
            CellValue::Text(String::new()),
        ];
        rows.scan(&mut dest).unwrap();
        let i = seen as i64;
        let f = seen as f32;
        assert_eq!(dest[0], CellValue::Long(i));
        assert_eq!(
            dest[1],
            CellValue::Floats(vec![f, f + 0.5, f + 1.0, f + 1.5])
        );
        assert_eq!(dest[2], CellValue::Text(format!("ev{seen}")));
        seen += 1;
    }
    assert_eq!(seen, 4);
    assert!(rows.err().is_none());
}

#[test]
fn test_positional_scan_arity_mismatch() {
    let mut engine = MemoryEngine::new();
    let mut table = events_table(&mut engine);

    let mut rows = table.read(&mut engine, 0, 4);
    assert!(rows.next());
    let mut short = [CellValue::Long(0)];
    let err = rows.scan(&mut short).unwrap_err();
    match err.downcast_ref::<Error>() {
        Some(Error::ArityMismatch { got: 1, expected: 3 }) => {}
        other => panic!("unexpected: {other:?}"),
    }
    // nothing was written into the destination
    assert_eq!(short[0], CellValue::Long(0));
    // the failure is sticky and survives close
    rows.close();
    assert!(rows.err().is_some());
}

#[test]
fn test_scan_map_selects_by_key() {
    let mut engine = MemoryEngine::new();
    let mut table = events_table(&mut engine);

    let mut rows = table.read(&mut engine, 2, 3);
    assert!(rows.next());

    let mut dest: HashMap<String, CellValue> = HashMap::new();
    dest.insert("id".to_string(), CellValue::Long(0));
    dest.insert("nonexistent".to_string(), CellValue::Long(0));
    rows.scan_map(&mut dest).unwrap();
    assert_eq!(dest.get("id"), Some(&CellValue::Long(2)));
    // unknown keys are skipped, unnamed columns untouched
    assert!(!dest.contains_key("flux"));

    let mut all: HashMap<String, CellValue> = HashMap::new();
    rows.scan_map(&mut all).unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all.get("tag"), Some(&CellValue::Text("ev2".to_string())));
}

#[derive(Default)]
struct Event {
    id: i64,
    flux: Vec<f32>,
}

impl ScanRecord for Event {
    fn columns(&self) -> &'static [&'static str] {
        &["id", "flux", "not_a_column"]
    }

    fn store(&mut self, field: usize, value: CellValue) -> Result<()> {
        match (field, value) {
            (0, CellValue::Long(v)) => self.id = v,
            (1, CellValue::Floats(v)) => self.flux = v,
            (f, v) => eyre::bail!("field {f} got unexpected value {v:?}"),
        }
        Ok(())
    }
}

#[test]
fn test_scan_struct_binds_fields_by_name() {
    let mut engine = MemoryEngine::new();
    let mut table = events_table(&mut engine);

    let mut rows = table.read(&mut engine, 0, 4);
    let mut total = 0i64;
    while rows.next() {
        let mut ev = Event::default();
        rows.scan_struct(&mut ev).unwrap();
        assert_eq!(ev.flux.len(), 4);
        total += ev.id;
    }
    assert_eq!(total, 0 + 1 + 2 + 3);
}

#[test]
fn test_read_columns_restricts_active_set() {
    let mut engine = MemoryEngine::new();
    let mut table = events_table(&mut engine);

    {
        let mut rows = table.read_columns(&mut engine, &["tag"], 1, 2).unwrap();
        assert!(rows.next());
        let mut dest = [CellValue::Text(String::new())];
        rows.scan(&mut dest).unwrap();
        assert_eq!(dest[0], CellValue::Text("ev1".to_string()));
    }

    assert!(table
        .read_columns(&mut engine, &["nope"], 0, 1)
        .is_err());
}

#[test]
fn test_variable_length_cells_vary_per_row() {
    let mut engine = MemoryEngine::new();
    let cols = vec![Column::new("samples", CellValue::Ints(Vec::new()))];
    let mut table = Table::create(&mut engine, &cols, BlockKind::BinaryTable).unwrap();
    assert_eq!(table.col(0).form, "QJ");

    table
        .append(&mut engine, &[CellValue::Ints(vec![1, 2, 3, 4, 5])])
        .unwrap();
    table.append(&mut engine, &[CellValue::Ints(vec![])]).unwrap();
    table.append(&mut engine, &[CellValue::Ints(vec![7])]).unwrap();

    let expected = [vec![1, 2, 3, 4, 5], vec![], vec![7]];
    let mut rows = table.read(&mut engine, 0, 3);
    let mut i = 0;
    while rows.next() {
        let mut dest = [CellValue::Ints(Vec::new())];
        rows.scan(&mut dest).unwrap();
        assert_eq!(dest[0], CellValue::Ints(expected[i].clone()));
        i += 1;
    }
    assert_eq!(i, 3);
}

#[test]
fn test_rejected_append_commits_nothing() {
    let mut engine = MemoryEngine::new();
    let cols = vec![
        Column::new("id", CellValue::Long(0)),
        Column::new("x", CellValue::Double(0.0)),
    ];
    let mut table = Table::create(&mut engine, &cols, BlockKind::BinaryTable).unwrap();

    // second value mismatches: the whole row must be rejected up front
    let err = table
        .append(
            &mut engine,
            &[CellValue::Long(7), CellValue::Text("oops".into())],
        )
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::TypeMismatch { .. })
    ));
    assert_eq!(table.num_rows(), 0);
    assert_eq!(engine.row_count().unwrap(), 0);

    // the same row with a matching second value lands intact
    table
        .append(&mut engine, &[CellValue::Long(7), CellValue::Double(0.5)])
        .unwrap();
    assert_eq!(engine.row_count().unwrap(), 1);
}

#[test]
fn test_cursor_clamps_past_end() {
    let mut engine = MemoryEngine::new();
    let mut table = events_table(&mut engine);

    let mut rows = table.read(&mut engine, 0, 100);
    let mut n = 0;
    while rows.next() {
        rows.scan(&mut []).unwrap();
        n += 1;
    }
    assert_eq!(n, 4);
    assert!(rows.err().is_none());
}

#[test]
fn test_created_table_reopens_identically() {
    let mut engine = MemoryEngine::new();
    let table = events_table(&mut engine);
    let block = table.block();

    let header = read_header(&mut engine, block).unwrap();
    let reopened = Table::open(&mut engine, &header, block).unwrap();

    assert_eq!(reopened.num_cols(), table.num_cols());
    assert_eq!(reopened.num_rows(), table.num_rows());
    for i in 0..table.num_cols() {
        assert_eq!(reopened.col(i).name, table.col(i).name);
        assert_eq!(reopened.col(i).form, table.col(i).form);
        assert_eq!(reopened.col(i).ty, table.col(i).ty);
    }
    assert_eq!(reopened.col(1).unit, "Jy");
}

#[test]
fn test_read_only_container_rejects_create() {
    let mut engine = MemoryEngine::new();
    engine.set_read_only(true);
    let cols = vec![Column::new("id", CellValue::Long(0))];
    assert!(Table::create(&mut engine, &cols, BlockKind::BinaryTable).is_err());
}
