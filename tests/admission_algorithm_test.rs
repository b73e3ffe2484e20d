//! Integration tests for the admission algorithm.
//!
//! These tests validate:
//! 1. A pool below its maximum grows instead of queueing
//! 2. The worker count never exceeds the maximum under concurrent submission
//! 3. Tasks that reach the backlog run in FIFO order
//! 4. A saturated bounded backlog rejects and hands the task back
//! 5. Submissions after shutdown are rejected

use rand::Rng;
use scalable_pool::config::PoolConfig;
use scalable_pool::core::{Admission, RejectReason, ScalablePool, ShutdownMode, Task};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

// ============================================================================
// HELPERS
// ============================================================================

fn pool(core: usize, max: usize, capacity: Option<usize>) -> ScalablePool {
    ScalablePool::new(
        PoolConfig::new()
            .with_core_pool_size(core)
            .with_maximum_pool_size(max)
            .with_keep_alive(Duration::from_secs(10))
            .with_queue_capacity(capacity)
            .with_thread_name_prefix("admission-test"),
    )
    .unwrap()
}

/// Tasks blocked on a gate until the returned sender is dropped.
fn gate() -> (flume::Sender<()>, flume::Receiver<()>) {
    flume::unbounded()
}

fn blocker(gate_rx: &flume::Receiver<()>) -> impl FnOnce() + Send + 'static {
    let gate_rx = gate_rx.clone();
    move || {
        let _ = gate_rx.recv();
    }
}

// ============================================================================
// GROWTH BEFORE QUEUEING
// ============================================================================

#[test]
fn test_growth_precedes_queueing() {
    let pool = pool(1, 4, None);
    let (gate_tx, gate_rx) = gate();

    for _ in 0..4 {
        assert_eq!(pool.execute(blocker(&gate_rx)).unwrap(), Admission::Spawned);
    }
    assert_eq!(pool.pool_size(), 4);

    // At the maximum: further work waits in the backlog.
    assert_eq!(pool.execute(blocker(&gate_rx)).unwrap(), Admission::Queued);
    assert_eq!(pool.execute(blocker(&gate_rx)).unwrap(), Admission::Queued);
    let stats = pool.stats();
    assert_eq!(stats.pool_size, 4);
    assert_eq!(stats.queued_tasks, 2);

    drop(gate_tx);
    pool.shutdown(ShutdownMode::Graceful);
    assert!(pool.await_termination(Duration::from_secs(5)));
    assert_eq!(pool.stats().completed_tasks, 6);
    assert_eq!(pool.stats().largest_pool_size, 4);
}

#[test]
fn test_idle_worker_receives_hand_off() {
    let pool = pool(1, 4, None);
    let (done_tx, done_rx) = flume::unbounded();

    let tx = done_tx.clone();
    assert_eq!(
        pool.execute(move || tx.send(()).unwrap()).unwrap(),
        Admission::Spawned
    );
    done_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    // Wait for the worker to park on the queue.
    let deadline = Instant::now() + Duration::from_secs(5);
    while pool.stats().idle_workers == 0 {
        assert!(Instant::now() < deadline, "worker never parked");
        thread::sleep(Duration::from_millis(5));
    }

    let tx = done_tx;
    assert_eq!(
        pool.execute(move || tx.send(()).unwrap()).unwrap(),
        Admission::HandedOff
    );
    done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(pool.pool_size(), 1);
}

#[test]
fn test_zero_core_pool_still_grows_on_demand() {
    let pool = pool(0, 2, None);
    assert_eq!(pool.pool_size(), 0);

    let (done_tx, done_rx) = flume::unbounded();
    pool.execute(move || done_tx.send(7).unwrap()).unwrap();
    assert_eq!(done_rx.recv_timeout(Duration::from_secs(5)).unwrap(), 7);
}

// ============================================================================
// POOL SIZE LIMIT
// ============================================================================

#[test]
fn test_peak_concurrency_never_exceeds_maximum() {
    const MAX: usize = 4;
    const SUBMITTERS: usize = 8;
    const PER_SUBMITTER: usize = 50;

    let pool = Arc::new(pool(1, MAX, None));
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let start = Arc::new(Barrier::new(SUBMITTERS));

    let submitters: Vec<_> = (0..SUBMITTERS)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                let mut rng = rand::rng();
                start.wait();
                for _ in 0..PER_SUBMITTER {
                    let running = Arc::clone(&running);
                    let peak = Arc::clone(&peak);
                    let work = Duration::from_micros(rng.random_range(0..500));
                    pool.execute(move || {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(work);
                        running.fetch_sub(1, Ordering::SeqCst);
                    })
                    .unwrap();
                    if rng.random_bool(0.2) {
                        thread::sleep(Duration::from_micros(rng.random_range(0..200)));
                    }
                }
            })
        })
        .collect();

    for handle in submitters {
        handle.join().unwrap();
    }

    pool.shutdown(ShutdownMode::Graceful);
    assert!(pool.await_termination(Duration::from_secs(30)));

    let stats = pool.stats();
    assert!(peak.load(Ordering::SeqCst) <= MAX);
    assert!(stats.largest_pool_size <= MAX);
    assert_eq!(stats.submitted_tasks, (SUBMITTERS * PER_SUBMITTER) as u64);
    assert_eq!(stats.completed_tasks, (SUBMITTERS * PER_SUBMITTER) as u64);
    assert_eq!(stats.rejected_tasks, 0);
}

// ============================================================================
// BACKLOG ORDERING
// ============================================================================

#[test]
fn test_backlog_is_fifo() {
    let pool = pool(1, 1, None);
    let (gate_tx, gate_rx) = gate();
    let (order_tx, order_rx) = flume::unbounded();

    assert_eq!(pool.execute(blocker(&gate_rx)).unwrap(), Admission::Spawned);
    for i in 0..10 {
        let order_tx = order_tx.clone();
        let admission = pool.execute(move || order_tx.send(i).unwrap()).unwrap();
        assert_eq!(admission, Admission::Queued);
    }
    drop(gate_tx);

    let observed: Vec<i32> = (0..10)
        .map(|_| order_rx.recv_timeout(Duration::from_secs(5)).unwrap())
        .collect();
    assert_eq!(observed, (0..10).collect::<Vec<_>>());
}

// ============================================================================
// REJECTION
// ============================================================================

#[test]
fn test_saturated_pool_rejects_and_returns_task() {
    let pool = pool(1, 1, Some(1));
    let (gate_tx, gate_rx) = gate();

    assert_eq!(pool.execute(blocker(&gate_rx)).unwrap(), Admission::Spawned);
    assert_eq!(pool.execute(blocker(&gate_rx)).unwrap(), Admission::Queued);

    let ran = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ran);
    let task = Task::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })
    .with_name("overflow");

    let rejected = pool.submit(task).unwrap_err();
    assert_eq!(rejected.reason(), RejectReason::Saturated);
    assert_eq!(pool.stats().rejected_tasks, 1);

    // The caller still owns the task and may run it itself.
    let task = rejected.into_task();
    assert_eq!(task.name(), Some("overflow"));
    task.run().unwrap();
    assert_eq!(ran.load(Ordering::SeqCst), 1);

    drop(gate_tx);
}

#[test]
fn test_zero_capacity_rejects_while_sole_worker_busy() {
    let pool = pool(1, 1, Some(0));
    let (gate_tx, gate_rx) = gate();

    assert_eq!(pool.execute(blocker(&gate_rx)).unwrap(), Admission::Spawned);

    let rejected = pool.execute(|| {}).unwrap_err();
    assert_eq!(rejected.reason(), RejectReason::Saturated);
    assert_eq!(pool.stats().queued_tasks, 0);

    // Once the worker is free and parked it takes work by direct hand-off.
    drop(gate_tx);
    let deadline = Instant::now() + Duration::from_secs(5);
    while pool.stats().idle_workers == 0 {
        assert!(Instant::now() < deadline, "worker never parked");
        thread::sleep(Duration::from_millis(5));
    }
    let (done_tx, done_rx) = flume::unbounded();
    assert_eq!(
        pool.execute(move || done_tx.send(()).unwrap()).unwrap(),
        Admission::HandedOff
    );
    done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(pool.stats().largest_pool_size, 1);
}

#[test]
fn test_rejects_after_shutdown() {
    let pool = pool(1, 2, None);
    pool.execute(|| {}).unwrap();
    pool.shutdown(ShutdownMode::Graceful);

    let rejected = pool.execute(|| {}).unwrap_err();
    assert_eq!(rejected.reason(), RejectReason::Shutdown);
    assert!(pool.await_termination(Duration::from_secs(5)));
    assert!(pool.execute(|| {}).is_err());
}
