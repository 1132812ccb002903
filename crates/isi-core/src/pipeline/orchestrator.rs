use std::sync::Arc;

use tracing::info;

use crate::compute::ComputeBackend;
use crate::config::AnalysisConfig;
use crate::error::{IsiError, Result};
use crate::fourier::compute_phase_maps;
use crate::phase_smoother::smooth_phase;
use crate::result::{AnalysisResult, ResultMetadata};
use crate::segmentation::segment_areas;
use crate::threshold::{apply_thresholds, per_direction_diagnostics};
use crate::types::{CoherenceMap, DirectionBundle, DirectionKey, Map2D, MagnitudeMap, PhaseMap};
use crate::{boundary, retinotopy, vfs};

use super::types::{center_crop_square, AnalysisStage, CancelFlag, DirectionInput, NoOpReporter, ProgressReporter};

/// Sequences C2 through C8 and assembles the `AnalysisResult` (spec §4.9).
/// Persistence (C10) is a separate, explicit step — the orchestrator never
/// writes to disk.
pub fn run_analysis_reported(
    config: &AnalysisConfig,
    backend: Arc<dyn ComputeBackend>,
    reporter: Arc<dyn ProgressReporter>,
    inputs: DirectionBundle<DirectionInput>,
    anatomical: Option<Map2D<f32>>,
    image_width_px: Option<usize>,
    cancel: &CancelFlag,
) -> Result<AnalysisResult> {
    check_cancel(cancel)?;
    reporter.begin_stage(AnalysisStage::FourierExtraction, Some(inputs.len()));

    let mut phase = DirectionBundle::<PhaseMap>::new();
    let mut magnitude = DirectionBundle::<MagnitudeMap>::new();
    let mut coherence = DirectionBundle::<CoherenceMap>::new();
    let mut synthesized_coherence_directions = Vec::new();

    let mut done = 0usize;
    for key in DirectionKey::ALL {
        let Some(input) = inputs.get(key) else {
            continue;
        };
        match input {
            DirectionInput::FrameCube { cube, stimulus_freq } => {
                let (p, m, c) = compute_phase_maps(cube, &backend, *stimulus_freq)?;
                phase.insert(key, p);
                magnitude.insert(key, m);
                coherence.insert(key, c);
            }
            DirectionInput::Precomputed {
                phase: p,
                magnitude: m,
                coherence: c,
            } => {
                phase.insert(key, p.clone());
                magnitude.insert(key, m.clone());
                match c {
                    Some(c) => {
                        coherence.insert(key, c.clone());
                    }
                    None => {
                        tracing::warn!(direction = %key, "no coherence map supplied; synthesizing 1.0 (reduced confidence)");
                        coherence.insert(key, CoherenceMap::ones(p.dim()));
                        synthesized_coherence_directions.push(key);
                    }
                }
            }
        }
        done += 1;
        reporter.advance(done);
    }
    reporter.finish_stage();
    info!(directions = phase.len(), "Fourier extraction complete");

    check_cancel(cancel)?;
    reporter.begin_stage(AnalysisStage::PhaseSmoothing, Some(phase.len()));
    if config.phase_filter_sigma > 0.0 {
        let mut smoothed = DirectionBundle::<PhaseMap>::new();
        for (key, map) in phase.iter() {
            smoothed.insert(key, smooth_phase(map, config.phase_filter_sigma));
        }
        phase = smoothed;
    }
    reporter.finish_stage();

    check_cancel(cancel)?;
    reporter.begin_stage(AnalysisStage::RetinotopyCombination, None);
    let azimuth = retinotopy::generate_azimuth_map(&phase);
    let elevation = retinotopy::generate_elevation_map(&phase);
    reporter.finish_stage();

    check_cancel(cancel)?;
    reporter.begin_stage(AnalysisStage::GradientVfs, None);
    let raw_vfs = match (&azimuth, &elevation) {
        (Some(az), Some(el)) => Some(vfs::compute_vfs(az, el, config.smoothing_sigma, &backend)?),
        _ => None,
    };
    reporter.finish_stage();

    check_cancel(cancel)?;
    reporter.begin_stage(AnalysisStage::Thresholding, None);
    let (coherence_vfs, magnitude_vfs, statistical_vfs, effective_magnitude_threshold, coherence_available) =
        match &raw_vfs {
            Some(raw) => {
                let result = apply_thresholds(
                    raw,
                    &coherence,
                    &magnitude,
                    config.coherence_threshold,
                    config.vfs_threshold_sd,
                );
                (
                    result.coherence_vfs,
                    Some(result.magnitude_vfs),
                    Some(result.statistical_vfs),
                    result.effective_magnitude_threshold,
                    result.coherence_available,
                )
            }
            None => (None, None, None, 0.0, coherence.is_complete()),
        };
    let diagnostics = if magnitude.is_empty() {
        None
    } else {
        Some(per_direction_diagnostics(
            &magnitude,
            config.magnitude_threshold,
            config.response_threshold_percent,
        ))
    };
    reporter.finish_stage();

    check_cancel(cancel)?;
    reporter.begin_stage(AnalysisStage::BoundaryDetection, None);
    let display_vfs = coherence_vfs.as_ref().or(magnitude_vfs.as_ref());
    let boundary_map = display_vfs.map(|v| boundary::detect_boundaries(v));
    reporter.finish_stage();

    check_cancel(cancel)?;
    reporter.begin_stage(AnalysisStage::AreaSegmentation, None);
    let (area_map, used_pixel_area_fallback) = match (display_vfs, &boundary_map) {
        (Some(display), Some(boundary_map)) => {
            let result = segment_areas(
                display,
                boundary_map,
                image_width_px,
                config.ring_size_mm,
                config.area_min_size_mm2,
            );
            (Some(result.area_map), result.used_pixel_fallback)
        }
        _ => (None, false),
    };
    reporter.finish_stage();

    let metadata = ResultMetadata {
        gradient_window_size: config.gradient_window_size,
        effective_magnitude_threshold,
        coherence_available,
        used_pixel_area_fallback,
        backend_name: backend.name().to_string(),
        synthesized_coherence_directions,
    };

    Ok(AnalysisResult {
        phase,
        magnitude,
        coherence,
        azimuth,
        elevation,
        raw_vfs,
        coherence_vfs,
        magnitude_vfs,
        statistical_vfs,
        boundary: boundary_map,
        area: area_map,
        anatomical: anatomical.map(|a| center_crop_square(&a)),
        per_direction_diagnostics: diagnostics,
        metadata,
    })
}

/// Run the full analysis with no progress reporting.
pub fn run_analysis(
    config: &AnalysisConfig,
    backend: Arc<dyn ComputeBackend>,
    inputs: DirectionBundle<DirectionInput>,
    anatomical: Option<Map2D<f32>>,
    image_width_px: Option<usize>,
    cancel: &CancelFlag,
) -> Result<AnalysisResult> {
    let reporter = Arc::new(NoOpReporter);
    run_analysis_reported(config, backend, reporter, inputs, anatomical, image_width_px, cancel)
}

fn check_cancel(cancel: &CancelFlag) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(IsiError::Cancelled);
    }
    Ok(())
}
