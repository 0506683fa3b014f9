//! Integration test for the worker task pool.

use aura_core::{wait_all, TaskPool};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_every_increment_lands() {
    for threads in [1, 2, 4, 8] {
        for jobs in [0usize, 1, 17, 1_000] {
            let pool = TaskPool::new(threads).unwrap();
            let counter = Arc::new(AtomicUsize::new(0));

            let handles: Vec<_> = (0..jobs)
                .map(|_| {
                    let counter = Arc::clone(&counter);
                    pool.enqueue(move || {
                        counter.fetch_add(1, Ordering::Relaxed);
                    })
                    .unwrap()
                })
                .collect();
            wait_all(handles).unwrap();

            assert_eq!(
                counter.load(Ordering::Relaxed),
                jobs,
                "{threads} threads, {jobs} jobs"
            );
        }
    }
}

#[test]
fn test_shutdown_drains_queue() {
    let pool = TaskPool::new(2).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));
    let jobs = 200;

    for _ in 0..jobs {
        let counter = Arc::clone(&counter);
        // Handles dropped on purpose: the jobs are detached.
        let _ = pool.enqueue(move || {
            thread::sleep(Duration::from_micros(50));
            counter.fetch_add(1, Ordering::Relaxed);
        });
    }

    pool.shutdown();
    assert_eq!(counter.load(Ordering::Relaxed), jobs);
    assert_eq!(pool.pending(), 0);
    assert_eq!(pool.stats().completed, jobs as u64);
}

#[test]
fn test_drop_drains_queue() {
    let counter = Arc::new(AtomicUsize::new(0));
    {
        let pool = TaskPool::new(3).unwrap();
        for _ in 0..64 {
            let counter = Arc::clone(&counter);
            let _ = pool.enqueue(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            });
        }
    }
    assert_eq!(counter.load(Ordering::Relaxed), 64);
}

#[test]
fn test_concurrent_submitters() {
    let pool = Arc::new(TaskPool::new(4).unwrap());
    let counter = Arc::new(AtomicUsize::new(0));
    let submitters = 8;
    let per_submitter = 500;

    let start = Instant::now();
    let threads: Vec<_> = (0..submitters)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                let handles: Vec<_> = (0..per_submitter)
                    .map(|i| {
                        let counter = Arc::clone(&counter);
                        pool.enqueue(move || {
                            counter.fetch_add(1, Ordering::Relaxed);
                            i
                        })
                        .unwrap()
                    })
                    .collect();
                let values = wait_all(handles).unwrap();
                assert_eq!(values, (0..per_submitter).collect::<Vec<_>>());
            })
        })
        .collect();

    for t in threads {
        t.join().unwrap();
    }
    let elapsed = start.elapsed();

    let total = submitters * per_submitter;
    assert_eq!(counter.load(Ordering::Relaxed), total);
    println!(
        "{total} jobs from {submitters} submitters in {:.2}ms ({:.0} jobs/s)",
        elapsed.as_secs_f64() * 1000.0,
        total as f64 / elapsed.as_secs_f64()
    );
}

#[test]
fn test_workers_are_named() {
    let pool = TaskPool::new(2).unwrap();
    let name = pool
        .enqueue(|| thread::current().name().map(str::to_owned))
        .unwrap()
        .wait()
        .unwrap()
        .unwrap();
    assert!(name.starts_with("aura-worker-"), "got {name}");
}
