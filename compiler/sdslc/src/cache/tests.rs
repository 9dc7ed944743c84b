use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use pretty_assertions::assert_eq;
use sdsl_diagnostic::{Diagnostic, ErrorCode};
use sdsl_ir::ContentHash;
use sdsl_spirv::{EffectBytecode, EffectReflection};

use super::*;

fn id(byte: u8) -> EffectId {
    EffectId(ContentHash::from_bytes([byte; 32]))
}

fn artifact(source: &str) -> Arc<EffectBytecode> {
    Arc::new(EffectBytecode {
        words: vec![0x0723_0203, 0x0001_0000, 0, 1, 0],
        reflection: EffectReflection::default(),
        program_hash: ContentHash::default(),
        used_sources: vec![(source.to_string(), ContentHash::default())],
    })
}

#[test]
fn test_concurrent_requests_compile_once() {
    const THREADS: usize = 16;
    let cache = BytecodeCache::new();
    let compiles = AtomicUsize::new(0);
    let barrier = Barrier::new(THREADS);

    let results: Vec<Outcome> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    cache.get_or_compile(id(1), || {
                        compiles.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(50));
                        Outcome::Ready(artifact("A"), CompilationOrigin::FreshlyCompiled)
                    })
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(compiles.load(Ordering::SeqCst), 1);
    let artifacts: Vec<Arc<EffectBytecode>> = results
        .iter()
        .map(|outcome| match outcome {
            Outcome::Ready(bytecode, _) => Arc::clone(bytecode),
            other => panic!("unexpected outcome {other:?}"),
        })
        .collect();
    assert!(artifacts.iter().all(|a| Arc::ptr_eq(a, &artifacts[0])));
    let fresh = results
        .iter()
        .filter(|o| matches!(o, Outcome::Ready(_, CompilationOrigin::FreshlyCompiled)))
        .count();
    assert_eq!(fresh, 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_failures_are_shared_but_not_cached() {
    let cache = BytecodeCache::new();
    let failed = cache.get_or_compile(id(2), || {
        Outcome::Failed(Arc::from(vec![
            Diagnostic::error(ErrorCode::E3001).with_message("type mismatch")
        ]))
    });
    assert!(matches!(&failed, Outcome::Failed(d) if d.len() == 1));
    assert!(cache.is_empty());

    let retried = cache.get_or_compile(id(2), || {
        Outcome::Ready(artifact("A"), CompilationOrigin::FreshlyCompiled)
    });
    assert!(matches!(retried, Outcome::Ready(_, CompilationOrigin::FreshlyCompiled)));
}

#[test]
fn test_waiters_retry_after_cancellation() {
    let cache = BytecodeCache::new();
    let started = Barrier::new(2);
    let compiles = AtomicUsize::new(0);

    let (owner, waiter) = thread::scope(|scope| {
        let owner = scope.spawn(|| {
            cache.get_or_compile(id(3), || {
                compiles.fetch_add(1, Ordering::SeqCst);
                started.wait();
                thread::sleep(Duration::from_millis(50));
                Outcome::Cancelled
            })
        });
        started.wait();
        let waiter = scope.spawn(|| {
            cache.get_or_compile(id(3), || {
                compiles.fetch_add(1, Ordering::SeqCst);
                Outcome::Ready(artifact("A"), CompilationOrigin::FreshlyCompiled)
            })
        });
        (owner.join().unwrap(), waiter.join().unwrap())
    });

    assert!(matches!(owner, Outcome::Cancelled));
    assert!(matches!(waiter, Outcome::Ready(_, CompilationOrigin::FreshlyCompiled)));
    assert_eq!(compiles.load(Ordering::SeqCst), 2);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_invalidate_by_source() {
    let cache = BytecodeCache::new();
    cache.get_or_compile(id(4), || Outcome::Ready(artifact("A"), CompilationOrigin::FreshlyCompiled));
    cache.get_or_compile(id(5), || Outcome::Ready(artifact("B"), CompilationOrigin::FreshlyCompiled));
    assert_eq!(cache.invalidate(|b| b.uses_source("A")), 1);
    assert!(cache.get(id(4)).is_none());
    assert!(cache.get(id(5)).is_some());

    let hit = cache.get_or_compile(id(5), || panic!("should not compile"));
    assert!(matches!(hit, Outcome::Ready(_, CompilationOrigin::LoadedFromCache)));
}

#[test]
fn test_flight_overlapping_invalidation_is_not_cached() {
    let cache = BytecodeCache::new();
    let compiling = Barrier::new(2);
    let invalidated = Barrier::new(2);

    let outcome = thread::scope(|scope| {
        let owner = scope.spawn(|| {
            cache.get_or_compile(id(6), || {
                compiling.wait();
                invalidated.wait();
                Outcome::Ready(artifact("A"), CompilationOrigin::FreshlyCompiled)
            })
        });
        compiling.wait();
        assert_eq!(cache.invalidate(|b| b.uses_source("A")), 0);
        invalidated.wait();
        owner.join().unwrap()
    });

    assert!(matches!(outcome, Outcome::Ready(_, CompilationOrigin::FreshlyCompiled)));
    assert!(cache.get(id(6)).is_none());
    let next = cache.get_or_compile(id(6), || {
        Outcome::Ready(artifact("A"), CompilationOrigin::FreshlyCompiled)
    });
    assert!(matches!(next, Outcome::Ready(_, CompilationOrigin::FreshlyCompiled)));
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_panicking_owner_releases_waiters() {
    let cache = BytecodeCache::new();
    let started = Barrier::new(2);

    let (owner, waiter) = thread::scope(|scope| {
        let owner = scope.spawn(|| {
            cache.get_or_compile(id(7), || {
                started.wait();
                thread::sleep(Duration::from_millis(50));
                panic!("lowering failed");
            })
        });
        started.wait();
        let waiter = scope.spawn(|| {
            cache.get_or_compile(id(7), || {
                Outcome::Ready(artifact("A"), CompilationOrigin::FreshlyCompiled)
            })
        });
        (owner.join(), waiter.join().unwrap())
    });

    assert!(owner.is_err());
    assert!(matches!(waiter, Outcome::Ready(_, CompilationOrigin::FreshlyCompiled)));
    assert!(cache.inflight.is_empty());
    assert_eq!(cache.len(), 1);
}
