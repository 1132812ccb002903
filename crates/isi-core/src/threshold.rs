//! Threshold Engine (C6): coherence, magnitude, and statistical
//! thresholding of the raw VFS map.
//!
//! `τ` (the statistical threshold) is always derived from the raw VFS's
//! own statistics, never from an already-filtered subset — using the
//! filtered subset would compound selection bias (spec §4.6).

use crate::types::{CoherenceMap, DirectionBundle, DirectionKey, MagnitudeMap, VfsMap};

/// The three thresholded VFS variants plus the values actually used,
/// surfaced for provenance (spec §9's open question on the magnitude
/// variant diverging from the configured field name).
pub struct ThresholdResult {
    pub coherence_vfs: Option<VfsMap>,
    pub magnitude_vfs: VfsMap,
    pub statistical_vfs: VfsMap,
    pub effective_magnitude_threshold: f32,
    pub coherence_available: bool,
}

/// Per-direction diagnostic maps (spec §4.6 "Also per direction"):
/// informational only, never gating C7/C8.
#[derive(Clone, Debug)]
pub struct PerDirectionDiagnostics {
    pub magnitude_thresholded: DirectionBundle<MagnitudeMap>,
    pub percentile_thresholded: DirectionBundle<MagnitudeMap>,
}

pub fn apply_thresholds(
    raw_vfs: &VfsMap,
    coherence: &DirectionBundle<CoherenceMap>,
    magnitude: &DirectionBundle<MagnitudeMap>,
    coherence_threshold: f32,
    vfs_threshold_sd: f32,
) -> ThresholdResult {
    let coherence_available = coherence.is_complete();

    let coherence_vfs = if coherence_available {
        Some(coherence_threshold_vfs(raw_vfs, coherence, coherence_threshold))
    } else {
        tracing::warn!("coherence maps unavailable for one or more directions; coherence-thresholded VFS degraded");
        None
    };

    let (magnitude_vfs, effective_magnitude_threshold) = magnitude_threshold_vfs(raw_vfs, magnitude);

    let tau = vfs_threshold_sd * population_std(raw_vfs);
    let statistical_vfs = if let Some(ref coherence_masked) = coherence_vfs {
        statistical_threshold_vfs(coherence_masked, tau)
    } else {
        tracing::warn!("coherence unavailable; statistical threshold applied directly to raw VFS");
        statistical_threshold_vfs(raw_vfs, tau)
    };

    ThresholdResult {
        coherence_vfs,
        magnitude_vfs,
        statistical_vfs,
        effective_magnitude_threshold,
        coherence_available,
    }
}

fn coherence_threshold_vfs(
    raw_vfs: &VfsMap,
    coherence: &DirectionBundle<CoherenceMap>,
    coherence_threshold: f32,
) -> VfsMap {
    let min_coherence = per_pixel_min(coherence);
    let mut out = raw_vfs.clone();
    ndarray::Zip::from(&mut out)
        .and(&min_coherence)
        .for_each(|v, &min_c| {
            if min_c < coherence_threshold {
                *v = 0.0;
            }
        });
    out
}

/// Returns `(thresholded, median_of_mean_magnitudes)`. The median value
/// itself is used as the threshold, diverging from the configured
/// `magnitude_threshold` field name — this is the reference behavior,
/// preserved deliberately (spec §9).
fn magnitude_threshold_vfs(raw_vfs: &VfsMap, magnitude: &DirectionBundle<MagnitudeMap>) -> (VfsMap, f32) {
    let mean_magnitude = per_pixel_mean(magnitude, raw_vfs.dim());
    let median = median_of(mean_magnitude.iter().copied());
    let mut out = raw_vfs.clone();
    ndarray::Zip::from(&mut out)
        .and(&mean_magnitude)
        .for_each(|v, &m| {
            if m < median {
                *v = 0.0;
            }
        });
    (out, median)
}

fn statistical_threshold_vfs(base: &VfsMap, tau: f32) -> VfsMap {
    base.mapv(|v| if v.abs() < tau { 0.0 } else { v })
}

pub fn per_direction_diagnostics(
    magnitude: &DirectionBundle<MagnitudeMap>,
    magnitude_threshold: f32,
    response_threshold_percent: f32,
) -> PerDirectionDiagnostics {
    let mut magnitude_thresholded = DirectionBundle::new();
    let mut percentile_thresholded = DirectionBundle::new();

    for (key, map) in magnitude.iter() {
        magnitude_thresholded.insert(
            key,
            map.mapv(|v| if v < magnitude_threshold { 0.0 } else { v }),
        );

        let non_zero = map.iter().copied().filter(|&v| v > 0.0);
        let cutoff = percentile_of(non_zero, response_threshold_percent);
        percentile_thresholded.insert(key, map.mapv(|v| if v < cutoff { 0.0 } else { v }));
    }

    PerDirectionDiagnostics {
        magnitude_thresholded,
        percentile_thresholded,
    }
}

fn per_pixel_min(coherence: &DirectionBundle<CoherenceMap>) -> CoherenceMap {
    let mut iter = coherence.iter();
    let (_, first) = iter.next().expect("at least one direction present");
    let mut out = first.clone();
    for (_, map) in iter {
        ndarray::Zip::from(&mut out).and(map).for_each(|o, &m| {
            *o = o.min(m);
        });
    }
    out
}

fn per_pixel_mean(magnitude: &DirectionBundle<MagnitudeMap>, shape: (usize, usize)) -> MagnitudeMap {
    let mut sum = MagnitudeMap::zeros(shape);
    let count = magnitude.len().max(1) as f32;
    for (_, map) in magnitude.iter() {
        sum = sum + map;
    }
    sum.mapv(|v| v / count)
}

fn population_std(data: &VfsMap) -> f32 {
    let n = data.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mean: f64 = data.iter().map(|&v| v as f64).sum::<f64>() / n;
    let variance: f64 = data.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt() as f32
}

fn median_of(values: impl Iterator<Item = f32>) -> f32 {
    let mut sorted: Vec<f32> = values.collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    if sorted.is_empty() {
        return 0.0;
    }
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn percentile_of(values: impl Iterator<Item = f32>, percent: f32) -> f32 {
    let mut sorted: Vec<f32> = values.collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((percent / 100.0) * (sorted.len() - 1) as f32).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn coherence_threshold_is_deterministic() {
        let raw_vfs = Array2::from_shape_vec((1, 2), vec![0.5, -0.5]).unwrap();
        let mut coherence = DirectionBundle::new();
        for key in DirectionKey::ALL {
            coherence.insert(key, Array2::from_shape_vec((1, 2), vec![0.9, 0.1]).unwrap());
        }
        let out = coherence_threshold_vfs(&raw_vfs, &coherence, 0.5);
        assert_eq!(out[[0, 0]], 0.5);
        assert_eq!(out[[0, 1]], 0.0);
    }

    #[test]
    fn median_of_even_count() {
        assert_eq!(median_of([1.0, 2.0, 3.0, 4.0].into_iter()), 2.5);
    }
}
