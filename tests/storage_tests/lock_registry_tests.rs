//! Tests for LockRegistry
//!
//! These tests verify:
//! - One lock instance per block id
//! - Concurrent first access does not create duplicates
//! - Reader/writer semantics of the handed-out locks

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use blockdoc::storage::LockRegistry;

#[test]
fn test_same_id_returns_same_lock() {
    let registry = LockRegistry::new();

    let a = registry.acquire(0);
    let b = registry.acquire(0);

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_different_ids_get_different_locks() {
    let registry = LockRegistry::new();

    let a = registry.acquire(0);
    let b = registry.acquire(1);

    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_registry_starts_empty() {
    let registry = LockRegistry::new();
    assert!(registry.is_empty());
}

#[test]
fn test_concurrent_first_access_single_instance() {
    let registry = Arc::new(LockRegistry::new());
    let barrier = Arc::new(Barrier::new(16));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.acquire(42)
            })
        })
        .collect();

    let locks: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    for lock in &locks[1..] {
        assert!(Arc::ptr_eq(&locks[0], lock));
    }
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_concurrent_first_access_many_ids() {
    let registry = Arc::new(LockRegistry::new());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for id in 0..100u64 {
                    registry.acquire((id + t) % 100);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.len(), 100);
}

#[test]
fn test_recursive_read_does_not_deadlock() {
    let registry = LockRegistry::new();
    let lock = registry.acquire(0);

    let outer = lock.read_recursive();
    let inner = registry.acquire(0);
    let nested = inner.read_recursive();

    drop(nested);
    drop(outer);
    assert!(lock.try_write().is_some());
}

#[test]
fn test_writer_excludes_readers() {
    let registry = Arc::new(LockRegistry::new());
    let lock = registry.acquire(7);

    let guard = lock.write();

    let other = Arc::clone(&registry);
    let blocked = thread::spawn(move || other.acquire(7).try_read().is_none())
        .join()
        .unwrap();
    assert!(blocked);

    drop(guard);

    let other = Arc::clone(&registry);
    let reader = thread::spawn(move || {
        let lock = other.acquire(7);
        let _read = lock.read();
        thread::sleep(Duration::from_millis(5));
        true
    });
    assert!(reader.join().unwrap());
}
