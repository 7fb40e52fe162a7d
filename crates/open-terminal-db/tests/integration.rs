//! Integration tests covering cross-module flows.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use open_terminal_db::{
    binary_search, quick_sort, sort_with, DbError, IndexFile, KeyField, RecordStore,
    SortAlgorithm, WriteMode,
};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

fn test_path(name: &str) -> PathBuf {
    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    std::env::temp_dir().join(format!("otdb_it_{}_{}_{}", std::process::id(), name, id))
}

fn cleanup(path: &Path) {
    let _ = std::fs::remove_file(path);
}

/// Test: append → quicksort → delete sequence over a small scan batch.
#[test]
fn collect_sort_delete_flow() {
    let path = test_path("collect");

    // Step 1: collect three scans out of order. Records are 9 bytes,
    // a terminated 8-character scan string.
    let mut store = RecordStore::create(&path, 9).unwrap();
    for scan in [&b"cccc0001\0"[..], b"aaaa0002\0", b"bbbb0003\0"] {
        store.write(scan, WriteMode::Append).unwrap();
    }
    assert_eq!(store.total(), 3);
    assert_eq!(store.cursor(), Some(2));

    // Step 2: sort on the leading 4-byte code.
    let stats = quick_sort(&mut store, KeyField::new(0, 4)).unwrap();
    assert_eq!(stats.records, 3);

    let mut buf = [0u8; 9];
    store.read_first(&mut buf).unwrap();
    assert_eq!(&buf, b"aaaa0002\0");
    store.read_next(&mut buf).unwrap();
    assert_eq!(&buf, b"bbbb0003\0");
    store.read_next(&mut buf).unwrap();
    assert_eq!(&buf, b"cccc0001\0");

    // Step 3: delete the first record; the rest shift down.
    store.delete(0).unwrap();
    assert_eq!(store.total(), 2);
    store.read_first(&mut buf).unwrap();
    assert_eq!(&buf, b"bbbb0003\0");
    store.read_next(&mut buf).unwrap();
    assert_eq!(&buf, b"cccc0001\0");

    cleanup(&path);
}

/// Test: records written before a close come back byte-identical on
/// both a fresh open and a reopen of the same handle.
#[test]
fn persistence_round_trip() {
    let path = test_path("persist");
    let records: Vec<Vec<u8>> = (0..10)
        .map(|i| format!("rec{:03}pay{:07}", i, i * 7).into_bytes())
        .collect();

    // Step 1: write and close.
    let mut store = RecordStore::create(&path, 16).unwrap();
    for record in &records {
        store.write(record, WriteMode::Append).unwrap();
    }
    store.close();

    // Step 2: a fresh open sees the same totals and bytes.
    let mut fresh = RecordStore::open(&path, 16).unwrap();
    assert_eq!(fresh.total(), 10);
    let mut buf = [0u8; 16];
    for (position, record) in records.iter().enumerate() {
        fresh.goto(position as u64).unwrap();
        fresh.read_current(&mut buf).unwrap();
        assert_eq!(&buf[..], &record[..]);
    }
    drop(fresh);

    // Step 3: the original handle reopens and picks the records up too.
    store.reopen().unwrap();
    assert_eq!(store.total(), 10);
    store.read_last(&mut buf).unwrap();
    assert_eq!(&buf[..], &records[9][..]);

    cleanup(&path);
}

/// Test: build an index over an article store, resolve keys through
/// it, then extend both store and index with a new article.
#[test]
fn article_index_flow() {
    let store_path = test_path("articles");
    let index_path = test_path("articles_idx");

    // Step 1: an article store keyed by a 6-byte code at offset 2.
    let mut articles = RecordStore::create(&store_path, 16).unwrap();
    for article in [
        &b"01490123item_aaa"[..],
        b"02120456item_bbb",
        b"03990789item_ccc",
    ] {
        articles.write(article, WriteMode::Append).unwrap();
    }
    let mut index = IndexFile::build(&mut articles, KeyField::new(2, 6), &index_path).unwrap();
    assert_eq!(index.len(), 3);

    // Step 2: resolve a code and fetch its article.
    let position = index.search(b"120456").unwrap();
    assert_eq!(position, 1);
    articles.goto(position).unwrap();
    let mut buf = [0u8; 16];
    articles.read_current(&mut buf).unwrap();
    assert_eq!(&buf, b"02120456item_bbb");

    // Step 3: a new article arrives; append it and index it.
    articles.write(b"04000111item_ddd", WriteMode::Append).unwrap();
    index.insert(b"000111", articles.total() - 1).unwrap();
    assert_eq!(index.search(b"000111").unwrap(), 3);

    // The older entries still resolve.
    assert_eq!(index.search(b"490123").unwrap(), 0);
    assert_eq!(index.search(b"990789").unwrap(), 2);

    cleanup(&store_path);
    cleanup(&index_path);
}

/// Test: one hundred shuffled records sort identically under all
/// three algorithms and every key binary-searches back.
#[test]
fn bulk_sort_and_search_flow() {
    let mut key_orders: Vec<Vec<Vec<u8>>> = Vec::new();
    for algorithm in [
        SortAlgorithm::Insertion,
        SortAlgorithm::Heap,
        SortAlgorithm::Quick,
    ] {
        let path = test_path("bulk");

        // Step 1: fill with a fixed permutation of 100 distinct keys.
        let mut store = RecordStore::create(&path, 12).unwrap();
        for i in 0..100u64 {
            let key = (i * 37 + 11) % 100;
            let record = format!("{:04}data{:04}", key, i).into_bytes();
            store.write(&record, WriteMode::Append).unwrap();
        }

        // Step 2: sort on the leading key column.
        let stats = sort_with(&mut store, KeyField::new(0, 4), algorithm).unwrap();
        assert_eq!(stats.records, 100);

        // Step 3: every key resolves by bisection to a record that
        // carries it.
        let mut buf = [0u8; 12];
        for key in 0..100 {
            let wanted = format!("{:04}", key).into_bytes();
            let position = binary_search(&mut store, &wanted, 0).unwrap();
            store.goto(position).unwrap();
            store.read_current(&mut buf).unwrap();
            assert_eq!(&buf[..4], &wanted[..]);
        }
        assert!(matches!(
            binary_search(&mut store, b"0100", 0).unwrap_err(),
            DbError::NotFound
        ));

        // Step 4: record the key order for cross-algorithm comparison.
        store.goto(0).unwrap();
        let mut order = Vec::new();
        store.read_current(&mut buf).unwrap();
        order.push(buf[..4].to_vec());
        for _ in 1..store.total() {
            store.read_next(&mut buf).unwrap();
            order.push(buf[..4].to_vec());
        }
        key_orders.push(order);

        cleanup(&path);
    }
    assert_eq!(key_orders[0], key_orders[1]);
    assert_eq!(key_orders[1], key_orders[2]);
}
