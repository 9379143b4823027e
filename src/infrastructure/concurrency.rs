/// Thread pool setup for bulk record work (parallel dumps).
use anyhow::Result;
use tracing::info;

/// Initialize the global rayon thread pool.
/// `threads == 0` reserves ~50% of CPU capacity, minimum 1 worker.
pub fn init_thread_pool(threads: usize) -> Result<()> {
    let cores = num_cpus::get();
    let workers = if threads == 0 {
        std::cmp::max(1, cores / 2)
    } else {
        threads
    };

    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build_global()?;

    info!(workers, cores, "initialized thread pool");
    Ok(())
}
