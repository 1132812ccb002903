//! Fourier Phase Extractor (C2): per-pixel phase, magnitude, and coherence
//! at the stimulus temporal frequency (Kalatsky & Stryker 2003).

use std::sync::Arc;

use crate::compute::ComputeBackend;
use crate::consts::COHERENCE_EPSILON;
use crate::error::{IsiError, Result};
use crate::types::{CoherenceMap, FrameCube, MagnitudeMap, PhaseMap};

/// `argmin_k |k/T - stimulus_freq|` over the forward-frequency axis.
pub fn stimulus_bin(t: usize, stimulus_freq: f64) -> usize {
    (0..t)
        .min_by(|&a, &b| {
            let da = (a as f64 / t as f64 - stimulus_freq).abs();
            let db = (b as f64 / t as f64 - stimulus_freq).abs();
            da.partial_cmp(&db).unwrap()
        })
        .unwrap_or(0)
}

/// Extract per-pixel phase/magnitude/coherence at the stimulus frequency
/// from a single direction's frame cube.
///
/// `stimulus_freq` is `cycles_per_sweep / T`. Contiguity is enforced here
/// rather than assumed (spec §3's `FrameCube` invariant).
pub fn compute_phase_maps(
    cube: &FrameCube,
    backend: &Arc<dyn ComputeBackend>,
    stimulus_freq: f64,
) -> Result<(PhaseMap, MagnitudeMap, CoherenceMap)> {
    let (t, h, w) = cube.dim();
    if t == 0 || h == 0 || w == 0 {
        return Err(IsiError::InvalidShape {
            expected: "[T>0, H>0, W>0]".into(),
            got: format!("[{t}, {h}, {w}]"),
        });
    }
    if cube.iter().all(|v| v.is_nan()) {
        return Err(IsiError::InvalidInput("frame cube is entirely NaN".into()));
    }

    let cube = cube.as_standard_layout().to_owned();
    let bin = stimulus_bin(t, stimulus_freq);

    let spectrum = backend.fft_time_axis(&cube)?;

    let mut phase = PhaseMap::zeros((h, w));
    let mut magnitude = MagnitudeMap::zeros((h, w));
    let mut coherence = CoherenceMap::zeros((h, w));

    for y in 0..h {
        for x in 0..w {
            let amplitude = spectrum[[bin, y, x]];
            let mag = amplitude.norm();

            let mean: f64 = (0..t).map(|k| cube[[k, y, x]] as f64).sum::<f64>() / t as f64;
            let variance: f64 = (0..t)
                .map(|k| {
                    let d = cube[[k, y, x]] as f64 - mean;
                    d * d
                })
                .sum::<f64>()
                / t as f64;
            let std_t = variance.sqrt();

            phase[[y, x]] = amplitude.arg() as f32;
            magnitude[[y, x]] = mag as f32;
            coherence[[y, x]] = ((mag / (std_t + COHERENCE_EPSILON as f64)) as f32).clamp(0.0, 1.0);
        }
    }

    Ok((phase, magnitude, coherence))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stimulus_bin_picks_nearest() {
        assert_eq!(stimulus_bin(64, 10.0 / 64.0), 10);
        assert_eq!(stimulus_bin(64, 10.4 / 64.0), 10);
    }
}
