mod common;

use std::sync::Arc;
use std::thread;

use common::mock_cluster::{InMemoryStore, LoadCountingStore, MockMatcher};
use crossbeam_channel::bounded;
use parmatch::cluster::{
    ClusterMessage, collect_records, create_cluster_channels, encode, partition, run_cluster,
    run_worker, spawn_workers, task_count,
};
use parmatch::error::ClusterError;
use parmatch::features::FeatureStore;
use parmatch::features::matcher::Matcher;
use parmatch::types::{Correspondence, MatchRecord, PairId, WorkRange};

fn record(first: u32, second: u32) -> MatchRecord {
    MatchRecord::without_geometry(
        PairId::new(first, second),
        vec![Correspondence {
            query: first,
            train: second,
        }],
    )
}

// --- collector termination ---

#[test]
fn test_collector_terminates_on_exact_end_signal_count() {
    let (tx_a, rx_a) = bounded(8);
    let (tx_b, rx_b) = bounded(8);

    tx_a.send(ClusterMessage::Record(encode(&record(0, 1)))).unwrap();
    tx_a.send(ClusterMessage::Record(encode(&record(0, 2)))).unwrap();
    tx_a.send(ClusterMessage::Done).unwrap();
    tx_b.send(ClusterMessage::Done).unwrap();

    let buffer = collect_records(&[rx_a, rx_b], None).unwrap();
    assert_eq!(buffer.len(), 2);
}

#[test]
fn test_collector_tolerates_arbitrary_interleaving() {
    // Worker B finishes before worker A has sent anything.
    let (tx_a, rx_a) = bounded(8);
    let (tx_b, rx_b) = bounded(8);

    tx_b.send(ClusterMessage::Done).unwrap();
    let sender = thread::spawn(move || {
        tx_a.send(ClusterMessage::Record(encode(&record(1, 2)))).unwrap();
        tx_a.send(ClusterMessage::Done).unwrap();
    });

    let buffer = collect_records(&[rx_a, rx_b], None).unwrap();
    sender.join().unwrap();
    assert_eq!(buffer.len(), 1);
}

#[test]
fn test_collector_counts_messages_via_callback() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let (tx, rx) = bounded(8);
    tx.send(ClusterMessage::Record(encode(&record(0, 1)))).unwrap();
    tx.send(ClusterMessage::Done).unwrap();

    let seen = AtomicUsize::new(0);
    let on_message = |n: usize| {
        seen.fetch_add(n, Ordering::Relaxed);
    };
    collect_records(&[rx], Some(&on_message)).unwrap();
    // One record + one end signal.
    assert_eq!(seen.load(Ordering::Relaxed), 2);
}

// --- protocol violations ---

#[test]
fn test_collector_rejects_malformed_record() {
    let (tx, rx) = bounded(8);
    tx.send(ClusterMessage::Record(vec![3.0, 1.0, 2.0])).unwrap();
    tx.send(ClusterMessage::Done).unwrap();

    let err = collect_records(&[rx], None).unwrap_err();
    assert!(matches!(
        err,
        ClusterError::ProtocolViolation { rank: 1, .. }
    ));
}

#[test]
fn test_collector_rejects_channel_closed_before_end_signal() {
    let (tx, rx) = bounded(8);
    tx.send(ClusterMessage::Record(encode(&record(0, 1)))).unwrap();
    drop(tx);

    let err = collect_records(&[rx], None).unwrap_err();
    assert!(matches!(
        err,
        ClusterError::ProtocolViolation { rank: 1, .. }
    ));
}

// --- worker executor ---

#[test]
fn test_worker_sends_one_record_per_task_then_done() {
    let store = InMemoryStore::with_items(4);
    let (tx, rx) = bounded(64);

    // Full range for N=4: all 6 tasks.
    run_worker(1, WorkRange::new(0, 6), &store, &MockMatcher, &tx).unwrap();
    drop(tx);

    let messages: Vec<ClusterMessage> = rx.iter().collect();
    assert_eq!(messages.len(), 7);
    assert_eq!(messages[6], ClusterMessage::Done);

    // Records arrive in canonical enumeration order with canonical pairs.
    let expected = [(0, 1), (0, 2), (1, 2), (0, 3), (1, 3), (2, 3)];
    for (msg, &(j, i)) in messages.iter().zip(&expected) {
        let ClusterMessage::Record(buf) = msg else {
            panic!("expected record before the end signal");
        };
        let rec = parmatch::cluster::decode(buf).unwrap();
        assert_eq!(rec.pair, PairId::new(j, i));
    }
}

#[test]
fn test_worker_empty_range_sends_only_done() {
    let store = InMemoryStore::with_items(4);
    let (tx, rx) = bounded(8);

    run_worker(2, WorkRange::new(3, 3), &store, &MockMatcher, &tx).unwrap();
    drop(tx);

    let messages: Vec<ClusterMessage> = rx.iter().collect();
    assert_eq!(messages, vec![ClusterMessage::Done]);
}

#[test]
fn test_worker_never_loads_items_outside_its_slice() {
    let store = LoadCountingStore::with_items(4);
    let (tx, _rx) = bounded(64);

    // Last task only: pair (2, 3).
    run_worker(1, WorkRange::new(5, 6), &store, &MockMatcher, &tx).unwrap();

    assert_eq!(store.loads_of(0), 0);
    assert_eq!(store.loads_of(1), 0);
    assert_eq!(store.loads_of(2), 1);
    assert_eq!(store.loads_of(3), 1);
}

#[test]
fn test_worker_reloads_outer_item_once_per_row() {
    let store = LoadCountingStore::with_items(4);
    let (tx, _rx) = bounded(64);

    run_worker(1, WorkRange::new(0, 6), &store, &MockMatcher, &tx).unwrap();

    // Outer loads: item 1 at activation, items 2 and 3 on row change. Inner
    // loads: one per task. Item 0 is only ever an inner item.
    assert_eq!(store.loads_of(0), 3);
    assert_eq!(store.loads_of(1), 3); // 1 outer + 2 inner
    assert_eq!(store.loads_of(2), 2); // 1 outer + 1 inner
    assert_eq!(store.loads_of(3), 1); // outer only
}

#[test]
fn test_worker_threads_are_named_for_their_rank() {
    let store: Arc<dyn FeatureStore> = Arc::new(InMemoryStore::with_items(3));
    let matcher: Arc<dyn Matcher> = Arc::new(MockMatcher);
    let channels = create_cluster_channels(2);
    let ranges = partition(task_count(3), 3).unwrap();

    let handles = spawn_workers(&ranges[1..], &store, &matcher, channels.txs).unwrap();
    let names: Vec<Option<String>> = handles
        .iter()
        .map(|h| h.thread().name().map(str::to_string))
        .collect();

    for rx in &channels.rxs {
        for _ in rx.iter() {}
    }
    for h in handles {
        h.join().unwrap().unwrap();
    }
    assert_eq!(
        names,
        vec![Some("worker-1".into()), Some("worker-2".into())]
    );
}

// --- end to end ---

#[test]
fn test_three_items_two_workers_scenario() {
    let store: Arc<dyn FeatureStore> = Arc::new(InMemoryStore::with_items(3));
    let buffer = run_cluster(store, Arc::new(MockMatcher), 2, None).unwrap();

    assert_eq!(buffer.len(), task_count(3));
    for (j, i) in [(0u32, 1u32), (0, 2), (1, 2)] {
        let (rec, reversed) = buffer.get(j, i).unwrap();
        assert!(!reversed);
        assert_eq!(rec.pair, PairId::new(j, i));
    }
}

#[test]
fn test_many_workers_many_items() {
    let store: Arc<dyn FeatureStore> = Arc::new(InMemoryStore::with_items(12));
    let buffer = run_cluster(store, Arc::new(MockMatcher), 5, None).unwrap();
    assert_eq!(buffer.len(), task_count(12));
}

#[test]
fn test_more_workers_than_tasks() {
    let store: Arc<dyn FeatureStore> = Arc::new(InMemoryStore::with_items(2));
    let buffer = run_cluster(store, Arc::new(MockMatcher), 4, None).unwrap();
    assert_eq!(buffer.len(), 1);
}

#[test]
fn test_zero_workers_is_invalid_topology() {
    let store: Arc<dyn FeatureStore> = Arc::new(InMemoryStore::with_items(3));
    let err = run_cluster(store, Arc::new(MockMatcher), 0, None).unwrap_err();
    let cluster_err = err.downcast::<ClusterError>().unwrap();
    assert!(matches!(cluster_err, ClusterError::InvalidTopology { ranks: 1 }));
}
