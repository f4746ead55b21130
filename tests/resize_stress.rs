use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};
use std::thread;
use std::time::{Duration, Instant};

use rand::Rng;
use taskpool::{PoolError, Priority, ThreadPoolBuilder};

#[test]
fn test_resize_while_submitting() {
    let pool = Arc::new(ThreadPoolBuilder::new().num_threads(4).build().unwrap());
    let submitted = Arc::new(AtomicUsize::new(0));
    let completed = Arc::new(AtomicUsize::new(0));
    let stop = Arc::new(AtomicBool::new(false));

    let producer = {
        let pool = Arc::clone(&pool);
        let submitted = Arc::clone(&submitted);
        let completed = Arc::clone(&completed);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut rng = rand::thread_rng();
            let priorities = [Priority::High, Priority::Medium, Priority::Low];
            while !stop.load(Ordering::SeqCst) {
                let completed = Arc::clone(&completed);
                let priority = priorities[rng.gen_range(0..priorities.len())];
                pool.run(
                    move || {
                        completed.fetch_add(1, Ordering::SeqCst);
                    },
                    priority,
                );
                submitted.fetch_add(1, Ordering::SeqCst);
                if rng.gen_ratio(1, 16) {
                    thread::yield_now();
                }
            }
        })
    };

    let mut rng = rand::thread_rng();
    for _ in 0..40 {
        let k = rng.gen_range(2..=16);
        pool.set_workers_count(k).unwrap();
        assert_eq!(pool.total_worker_count(), k);
        assert!(pool.idle_worker_count() <= pool.total_worker_count());
    }

    stop.store(true, Ordering::SeqCst);
    producer.join().unwrap();

    let expected = submitted.load(Ordering::SeqCst);
    let deadline = Instant::now() + Duration::from_secs(10);
    while completed.load(Ordering::SeqCst) < expected && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(completed.load(Ordering::SeqCst), expected);
    assert_eq!(pool.pending_task_count(), 0);
}

#[test]
fn test_invalid_worker_counts_are_rejected() {
    let pool = ThreadPoolBuilder::new().num_threads(3).build().unwrap();

    assert!(matches!(
        pool.set_workers_count(1),
        Err(PoolError::InvalidWorkerCount(1))
    ));
    assert!(matches!(
        pool.set_workers_count(1001),
        Err(PoolError::InvalidWorkerCount(1001))
    ));
    assert_eq!(pool.total_worker_count(), 3);

    assert!(matches!(
        ThreadPoolBuilder::new().num_threads(1001).build(),
        Err(PoolError::InvalidWorkerCount(1001))
    ));
}

#[test]
fn test_resize_from_inside_a_task() {
    let pool = Arc::new(ThreadPoolBuilder::new().num_threads(4).build().unwrap());
    let (tx, rx) = crossbeam::channel::bounded(1);
    {
        let handle = Arc::clone(&pool);
        pool.run(
            move || {
                tx.send(handle.set_workers_count(2)).unwrap();
            },
            Priority::High,
        );
    }
    let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(result.is_ok());
    assert_eq!(pool.total_worker_count(), 2);

    let answer = pool.spawn(|| 42);
    assert_eq!(*answer.get().unwrap(), 42);
}
