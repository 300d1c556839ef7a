//! End-to-end tests for the paged record store: round-trips, forwarded
//! updates, and the page accounting invariant.

use relstore::datum::{Attribute, CompOp, Value};
use relstore::heap::{directory, page, RecordPage, RecordStore, Rid};
use relstore::storage::{PagedFile, PAGE_SIZE};
use relstore::tuple::Tuple;
use tempfile::tempdir;

fn descriptor() -> Vec<Attribute> {
    vec![
        Attribute::int("id"),
        Attribute::varchar("name", 40),
        Attribute::real("salary"),
    ]
}

fn emp(id: i32, name: &str, salary: f32) -> Tuple {
    Tuple::new(vec![
        Value::Int(id),
        Value::Varchar(name.into()),
        Value::Real(salary),
    ])
}

/// Checks the accounting invariant of every data page:
/// free + trailer + slot array + live record bytes = PAGE_SIZE,
/// and that every forwarded slot points at a live, unforwarded slot.
fn verify_file(path: &std::path::Path) {
    let mut file = PagedFile::open(path).unwrap();
    let mut buf = [0u8; PAGE_SIZE];
    let mut forwards = Vec::new();

    for page_num in 0..file.page_count() {
        if directory::is_directory_page(page_num) {
            continue;
        }
        file.read_page(page_num, &mut buf).unwrap();
        let view = RecordPage::new(&buf[..]);
        let slots = view.slot_count();
        let occupied: usize = (0..slots).map(|i| view.slot(i).occupied()).sum();
        assert_eq!(
            view.free_bytes() + page::TRAILER_SIZE + slots as usize * page::SLOT_SIZE + occupied,
            PAGE_SIZE,
            "accounting broken on page {}",
            page_num
        );

        for i in 0..slots {
            let slot = view.slot(i);
            if !slot.is_tombstone() && slot.is_forwarded() {
                forwards.push(view.forwarding_rid(slot.local_offset()));
            }
        }
    }

    for target in forwards {
        file.read_page(target.page_num, &mut buf).unwrap();
        let view = RecordPage::new(&buf[..]);
        let slot = view.slot(target.slot_num as u16);
        assert!(!slot.is_tombstone(), "forward target {} is a tombstone", target);
        assert!(!slot.is_forwarded(), "forward target {} forwards again", target);
    }
}

#[test]
fn insert_read_delete_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("emp.db");
    RecordStore::create(&path).unwrap();
    let mut store = RecordStore::open(&path).unwrap();

    let r1 = store.insert(&descriptor(), &emp(7, "Ada", 1000.0)).unwrap();
    assert_eq!(store.read(&descriptor(), r1).unwrap(), emp(7, "Ada", 1000.0));

    store.delete(&descriptor(), r1).unwrap();
    assert!(store.read(&descriptor(), r1).is_err());
    verify_file(&path);
}

#[test]
fn forwarded_update_keeps_rid_and_invariants() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("emp.db");
    RecordStore::create(&path).unwrap();
    let mut store = RecordStore::open(&path).unwrap();

    // Fill the first data page nearly full.
    let mut rids = Vec::new();
    for i in 0..1000 {
        rids.push(store.insert(&descriptor(), &emp(i, "x", i as f32 + 1.0)).unwrap());
    }
    let first = rids[0];
    assert_eq!(first, Rid::new(1, 0));

    // Grow the first record's varchar to 40 bytes; the page has no room,
    // so the payload moves but the RID must not.
    let grown = emp(0, &"y".repeat(40), 1.0);
    store.update(&descriptor(), first, &grown).unwrap();
    assert_eq!(store.read(&descriptor(), first).unwrap(), grown);
    verify_file(&path);

    // A second growth while already forwarded.
    let regrown = emp(0, &"z".repeat(40), 2.0);
    store.update(&descriptor(), first, &regrown).unwrap();
    assert_eq!(store.read(&descriptor(), first).unwrap(), regrown);

    // Shrink it back; it stays readable at the same RID.
    let shrunk = emp(0, "s", 3.0);
    store.update(&descriptor(), first, &shrunk).unwrap();
    assert_eq!(store.read(&descriptor(), first).unwrap(), shrunk);
    verify_file(&path);

    // Neighbours were never disturbed.
    for (i, rid) in rids.iter().enumerate().skip(1) {
        assert_eq!(
            store.read(&descriptor(), *rid).unwrap(),
            emp(i as i32, "x", i as f32 + 1.0)
        );
    }

    // Deleting the forwarded record cleans both pages.
    store.delete(&descriptor(), first).unwrap();
    assert!(store.read(&descriptor(), first).is_err());
    verify_file(&path);
}

#[test]
fn update_then_read_returns_new_value() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("emp.db");
    RecordStore::create(&path).unwrap();
    let mut store = RecordStore::open(&path).unwrap();

    let rid = store.insert(&descriptor(), &emp(1, "before", 1.0)).unwrap();
    store.update(&descriptor(), rid, &emp(1, "after", 2.0)).unwrap();
    assert_eq!(store.read(&descriptor(), rid).unwrap(), emp(1, "after", 2.0));
    verify_file(&path);
}

#[test]
fn scan_visits_forwarded_records_once() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("emp.db");
    RecordStore::create(&path).unwrap();
    let mut store = RecordStore::open(&path).unwrap();

    let mut rids = Vec::new();
    for i in 0..500 {
        rids.push(store.insert(&descriptor(), &emp(i, "abcdefgh", 0.0)).unwrap());
    }
    // Forward a handful of records off their home pages.
    for rid in rids.iter().take(5) {
        store.update(&descriptor(), *rid, &emp(-1, &"w".repeat(40), 9.0)).unwrap();
    }

    let mut scan = store
        .scan(&descriptor(), None, CompOp::NoOp, &Value::Null, &["id".to_string()])
        .unwrap();
    let mut total = 0;
    let mut forwarded = 0;
    while let Some((_, tuple)) = scan.next().unwrap() {
        if tuple.values[0] == Value::Int(-1) {
            forwarded += 1;
        }
        total += 1;
    }
    assert_eq!(total, 500);
    assert_eq!(forwarded, 5);
    verify_file(&path);
}

#[test]
fn scan_predicate_and_projection() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("emp.db");
    RecordStore::create(&path).unwrap();
    let mut store = RecordStore::open(&path).unwrap();

    for i in 0..100 {
        store.insert(&descriptor(), &emp(i, &format!("e{}", i), i as f32)).unwrap();
    }

    let mut scan = store
        .scan(
            &descriptor(),
            Some("salary"),
            CompOp::Ge,
            &Value::Real(90.0),
            &["name".to_string(), "id".to_string()],
        )
        .unwrap();
    let mut rows = Vec::new();
    while let Some((_, tuple)) = scan.next().unwrap() {
        rows.push(tuple);
    }
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[0].values, vec![Value::Varchar("e90".into()), Value::Int(90)]);
}

#[test]
fn reopened_store_serves_existing_records() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("emp.db");
    RecordStore::create(&path).unwrap();

    let rid = {
        let mut store = RecordStore::open(&path).unwrap();
        store.insert(&descriptor(), &emp(42, "persist", 4.2)).unwrap()
    };

    let mut store = RecordStore::open(&path).unwrap();
    assert_eq!(store.read(&descriptor(), rid).unwrap(), emp(42, "persist", 4.2));
    let next = store.insert(&descriptor(), &emp(43, "more", 4.3)).unwrap();
    assert_ne!(rid, next);
}
