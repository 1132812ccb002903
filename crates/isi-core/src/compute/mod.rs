mod backend;
pub mod cpu;
#[cfg(feature = "gpu")]
pub mod gpu;

pub use backend::{create_backend, Complex64, ComputeBackend, DevicePreference};
