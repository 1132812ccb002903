use std::sync::Arc;

use ndarray::{Array2, Array3};
use num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::consts::ENABLE_GPU_FFT_ENV_VAR;
use crate::error::Result;

/// Double-precision complex number used for FFT intermediates throughout
/// the numeric kernel.
pub type Complex64 = Complex<f64>;

/// Device selection requested by the caller. Opaque downstream of
/// construction: every component that receives `Arc<dyn ComputeBackend>`
/// is unaware of which concrete backend produced it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DevicePreference {
    #[default]
    Cpu,
    Gpu,
}

/// Pluggable numeric backend for the FFT-based primitives of the numeric
/// kernel. Operations with no backend-dependent reproducibility
/// requirement (gradients, median filter, connected components) are plain
/// functions in `compute::cpu` rather than trait methods, since nothing
/// about them benefits from GPU dispatch.
pub trait ComputeBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Forward FFT along the time axis of a `[T, H, W]` cube, after
    /// removing the per-pixel temporal mean. Must be reproducible across
    /// backends within `1e-5` relative tolerance.
    fn fft_time_axis(&self, cube: &Array3<f32>) -> Result<Array3<Complex64>>;

    /// `Re(IFFT2(FFT2(data) * |FFT2(kernel)|))` with a centered, unit-sum
    /// Gaussian kernel the same shape as `data`. Cyclic by construction;
    /// this is intentional and matches the MATLAB reference.
    fn fft_gaussian_blur(&self, data: &Array2<f32>, sigma: f32) -> Result<Array2<f32>>;
}

/// Construct a backend. GPU is only ever selected when both
/// `DevicePreference::Gpu` is requested and `ENABLE_GPU_FFT_EXPERIMENTAL=1`
/// is set in the environment; otherwise construction silently downgrades
/// to CPU and logs why.
pub fn create_backend(preference: DevicePreference) -> Arc<dyn ComputeBackend> {
    match preference {
        DevicePreference::Cpu => Arc::new(super::cpu::CpuBackend),
        DevicePreference::Gpu => {
            let opted_in = std::env::var(ENABLE_GPU_FFT_ENV_VAR)
                .map(|v| v == "1")
                .unwrap_or(false);
            if !opted_in {
                tracing::warn!(
                    env_var = ENABLE_GPU_FFT_ENV_VAR,
                    "GPU backend requested but experimental opt-in is not set; falling back to CPU"
                );
                return Arc::new(super::cpu::CpuBackend);
            }
            build_gpu_backend()
        }
    }
}

#[cfg(feature = "gpu")]
fn build_gpu_backend() -> Arc<dyn ComputeBackend> {
    use crate::consts::GPU_FFT_MAX_TIME_SAMPLES;
    tracing::warn!(
        max_time_samples = GPU_FFT_MAX_TIME_SAMPLES,
        "using experimental GPU FFT backend; transforms above the size bound are refused and degrade to CPU"
    );
    match super::gpu::GpuBackend::new() {
        Ok(backend) => Arc::new(backend),
        Err(err) => {
            tracing::warn!(error = %err, "GPU backend initialization failed; falling back to CPU");
            Arc::new(super::cpu::CpuBackend)
        }
    }
}

#[cfg(not(feature = "gpu"))]
fn build_gpu_backend() -> Arc<dyn ComputeBackend> {
    tracing::warn!(
        "GPU backend requested and opted in, but this build has no `gpu` feature compiled; falling back to CPU"
    );
    Arc::new(super::cpu::CpuBackend)
}
