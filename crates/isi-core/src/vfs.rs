//! Gradient & VFS Engine (C5): FFT-based map smoothing, central-difference
//! gradients, gradient-angle visual field sign (Zhuang et al. 2017).

use std::sync::Arc;

use num_complex::Complex;

use crate::compute::cpu::gradient_central;
use crate::compute::ComputeBackend;
use crate::consts::VFS_POST_SMOOTH_SIGMA;
use crate::error::Result;
use crate::types::{RetinotopyMap, VfsMap};

/// Runs the full C5 sequence: optional pre-smoothing, gradients, gradient
/// angles, gradient-angle VFS, NaN cleanup, and the fixed post-smoothing
/// pass. Returns the smoothed raw VFS in `[-1, 1]`.
pub fn compute_vfs(
    azimuth: &RetinotopyMap,
    elevation: &RetinotopyMap,
    smoothing_sigma: f32,
    backend: &Arc<dyn ComputeBackend>,
) -> Result<VfsMap> {
    let azimuth = if smoothing_sigma > 0.0 {
        backend.fft_gaussian_blur(azimuth, smoothing_sigma)?
    } else {
        azimuth.clone()
    };
    let elevation = if smoothing_sigma > 0.0 {
        backend.fft_gaussian_blur(elevation, smoothing_sigma)?
    } else {
        elevation.clone()
    };

    let (d_azim_dy, d_azim_dx) = gradient_central(&azimuth);
    let (d_elev_dy, d_elev_dx) = gradient_central(&elevation);

    let mut raw_vfs = VfsMap::zeros(azimuth.dim());

    // Gradient direction angles: θ_H = atan2(∂azim/∂y, ∂azim/∂x),
    // θ_V = atan2(∂elev/∂y, ∂elev/∂x).
    ndarray::Zip::from(&mut raw_vfs)
        .and(&d_azim_dy)
        .and(&d_azim_dx)
        .and(&d_elev_dy)
        .and(&d_elev_dx)
        .for_each(|v, &ady, &adx, &edy, &edx| {
            let theta_h = ady.atan2(adx);
            let theta_v = edy.atan2(edx);
            let combined = Complex::new(theta_h.cos(), theta_h.sin())
                * Complex::new(theta_v.cos(), -theta_v.sin());
            let mut value = combined.arg().sin();
            if value.is_nan() {
                value = 0.0;
            }
            *v = value;
        });

    let smoothed = backend.fft_gaussian_blur(&raw_vfs, VFS_POST_SMOOTH_SIGMA)?;
    Ok(smoothed.mapv(|v| if v.is_nan() { 0.0 } else { v.clamp(-1.0, 1.0) }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::create_backend;
    use crate::compute::DevicePreference;
    use ndarray::Array2;

    #[test]
    fn constant_maps_yield_zero_vfs() {
        let backend = create_backend(DevicePreference::Cpu);
        let azimuth = Array2::<f32>::from_elem((16, 16), 5.0);
        let elevation = Array2::<f32>::from_elem((16, 16), -3.0);
        let vfs = compute_vfs(&azimuth, &elevation, 0.0, &backend).unwrap();
        for &v in vfs.iter() {
            assert!(v.abs() < 1e-3);
        }
    }

    #[test]
    fn vfs_stays_in_bounds() {
        let backend = create_backend(DevicePreference::Cpu);
        let mut azimuth = Array2::<f32>::zeros((16, 16));
        let mut elevation = Array2::<f32>::zeros((16, 16));
        for y in 0..16 {
            for x in 0..16 {
                azimuth[[y, x]] = x as f32;
                elevation[[y, x]] = y as f32 * 2.0;
            }
        }
        let vfs = compute_vfs(&azimuth, &elevation, 1.0, &backend).unwrap();
        for &v in vfs.iter() {
            assert!((-1.0..=1.0).contains(&v));
        }
    }
}
