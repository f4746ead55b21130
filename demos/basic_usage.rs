use taskpool::{Priority, ThreadPoolBuilder};

fn main() {
    env_logger::init();

    let pool = ThreadPoolBuilder::new().num_threads(4).build().unwrap();

    pool.run(
        || println!("Hello from the basic thread pool!"),
        Priority::High,
    );

    let future = pool.spawn(|| {
        println!("Computing on a worker");
        10
    });
    future.on_success(|value| println!("Callback saw: {}", value));
    let res = future.get().unwrap();
    println!("Result from task: {}", res);

    let sums = pool.parallel(0..1000, |chunk| chunk.sum::<usize>());
    let total: usize = sums.values().unwrap().iter().map(|s| **s).sum();
    println!("Sum of 0..1000 across {} chunks: {}", sums.len(), total);

    pool.shutdown();
}
