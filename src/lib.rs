pub use mvs_core as core;
pub use mvs_depthmap as depthmap;
pub use mvs_largescale as largescale;
pub use mvs_multiview as multiview;

/// Initialize a single global Rayon thread pool for all CPU-parallel routines.
///
/// Call this once at application startup before running heavy reconstruction
/// workloads. Repeated calls are idempotent and return the first
/// initialization result.
///
/// Priority order:
/// 1. explicit `num_threads`
/// 2. `MVS_CPU_THREADS` env var
/// 3. Rayon default
pub fn init_thread_pool(num_threads: Option<usize>) -> Result<(), String> {
    mvs_core::init_global_thread_pool(num_threads)
}
