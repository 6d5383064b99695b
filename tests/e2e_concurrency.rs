//! Concurrency tests: writers are serialized, readers never see half a batch,
//! and history transitions on one domain never interleave.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use quadstore::{HistoryManager, QuadStore};

#[test]
fn test_concurrent_inserts_are_all_applied() {
    let store = QuadStore::open_memory();
    let ctx = store.new_node().unwrap();

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    let s = store.new_value_node(&format!("s{t}-{i}")).unwrap();
                    let edge = store.new_edge(&ctx, &s, &s, &s).unwrap();
                    assert!(store.put_edge(&edge).unwrap());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.edges().having_context(&ctx).unwrap().len().unwrap(), 200);
}

#[test]
fn test_readers_never_observe_partial_batches() {
    let store = QuadStore::open_memory();
    let [ctx, a, b] = std::array::from_fn(|_| store.new_node().unwrap());
    let ea = store.new_edge(&ctx, &ctx, &ctx, &a).unwrap();
    store.put_edge(&ea).unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let writer = {
        let store = store.clone();
        let done = done.clone();
        thread::spawn(move || {
            for i in 0..200 {
                let (from, to) = if i % 2 == 0 { (a, b) } else { (b, a) };
                let old = store.edges().having_object(&from).unwrap();
                let new = old.with_object(&to).unwrap();
                store
                    .transact(|batch| {
                        batch.put_edges(&new)?;
                        batch.pop_edges(&old)?;
                        Ok(())
                    })
                    .unwrap();
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let view = store.edges().having_context(&ctx).unwrap();
    while !done.load(Ordering::SeqCst) {
        assert_eq!(view.len().unwrap(), 1, "observed a half-applied move");
    }
    writer.join().unwrap();
    assert_eq!(view.len().unwrap(), 1);
}

#[test]
fn test_history_transitions_on_one_domain_are_serialized() {
    let store = QuadStore::open_memory();
    let manager = HistoryManager::with_defaults(&store).unwrap();
    let history = manager.create().unwrap();
    let pred = store.new_value_node("p").unwrap();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let history = manager.open(&history.domain()).unwrap();
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..10 {
                    let s = store.new_value_node(&format!("{t}:{i}")).unwrap();
                    let edge = history.new_edge(&pred, &s, &s).unwrap();
                    history.done(&store.new_edges([edge]).unwrap()).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // One linear chain: root plus one version per commit.
    let versions = history.versions().unwrap();
    assert_eq!(versions.len(), 41);
    for version in &versions {
        assert!(history.successors(*version).unwrap().len() <= 1);
    }
    assert_eq!(history.edges().unwrap().len().unwrap(), 40);
    history.check().unwrap();
}

#[test]
fn test_two_managers_share_the_domain_lock() {
    let store = QuadStore::open_memory();
    let first = HistoryManager::with_defaults(&store).unwrap();
    let second = HistoryManager::with_defaults(&store).unwrap();
    let domain = first.create().unwrap().domain();
    let pred = store.new_value_node("p").unwrap();

    let handles: Vec<_> = [first.open(&domain).unwrap(), second.open(&domain).unwrap()]
        .into_iter()
        .enumerate()
        .map(|(t, history)| {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..50 {
                    let s = store.new_value_node(&format!("{t}/{i}")).unwrap();
                    let edge = history.new_edge(&pred, &s, &s).unwrap();
                    history.done(&store.new_edges([edge]).unwrap()).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let history = second.open(&domain).unwrap();
    assert_eq!(history.versions().unwrap().len(), 101);
    assert_eq!(history.edges().unwrap().len().unwrap(), 100);
    history.check().unwrap();
}
