//! Phase Smoother (C3): optional non-cyclic spatial Gaussian applied to
//! raw phase maps before bidirectional conversion. Conceptually distinct
//! from and smaller than C5's post-conversion FFT-based smoothing.

use crate::compute::cpu::gaussian_blur_separable;
use crate::types::PhaseMap;

/// Smooths `phase` in place if `sigma > 0`; a no-op otherwise (spec §4.3).
pub fn smooth_phase(phase: &PhaseMap, sigma: f32) -> PhaseMap {
    if sigma > 0.0 {
        gaussian_blur_separable(phase, sigma)
    } else {
        phase.clone()
    }
}
