/// Minimum pixel count (h*w) to use row/column-level Rayon parallelism in FFT passes.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Small epsilon added to temporal standard deviation before dividing, to
/// avoid blow-up on constant (zero-variance) pixels. Matches spec §4.2 (e).
pub const COHERENCE_EPSILON: f32 = 1e-10;

/// Fixed VFS post-smoothing sigma (spec §4.5 step 6 / §9): not user
/// configurable, kept as a named constant to preserve parity with the
/// MATLAB reference (`getAreaBorders.m`, `hh = fspecial('gaussian', size(VFS), 3)`).
pub const VFS_POST_SMOOTH_SIGMA: f32 = 3.0;

/// Minimum absolute VFS magnitude for a pixel to be considered "defined"
/// (not a masked/undefined boundary pixel) during boundary detection (spec §4.7).
pub const BOUNDARY_DEFINED_THRESHOLD: f32 = 0.1;

/// Environment variable that opts in to the experimental GPU FFT backend
/// (spec §6.3). Default (unset, or any value other than "1") is CPU.
pub const ENABLE_GPU_FFT_ENV_VAR: &str = "ENABLE_GPU_FFT_EXPERIMENTAL";

/// Above this many time samples, the GPU backend's naive DFT kernel is
/// known to become unreliable (spec §4.1 "Backend hazard"). The GPU
/// backend refuses transforms above this size even when explicitly
/// enabled, and the orchestrator logs a warning and falls back to CPU.
pub const GPU_FFT_MAX_TIME_SAMPLES: usize = 512;
