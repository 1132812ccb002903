pub mod boundary;
pub mod compute;
pub mod config;
pub mod consts;
pub mod error;
pub mod fourier;
pub mod persist;
pub mod phase_smoother;
pub mod pipeline;
pub mod result;
pub mod retinotopy;
pub mod segmentation;
pub mod threshold;
pub mod types;
pub mod vfs;

pub use error::{IsiError, Result};
