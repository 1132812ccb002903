use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::types::{CoherenceMap, MagnitudeMap, Map2D, PhaseMap};

/// Analysis stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnalysisStage {
    FourierExtraction,
    PhaseSmoothing,
    RetinotopyCombination,
    GradientVfs,
    Thresholding,
    BoundaryDetection,
    AreaSegmentation,
    Persisting,
}

impl std::fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FourierExtraction => write!(f, "Extracting Fourier phase/magnitude/coherence"),
            Self::PhaseSmoothing => write!(f, "Smoothing phase maps"),
            Self::RetinotopyCombination => write!(f, "Combining retinotopy"),
            Self::GradientVfs => write!(f, "Computing visual field sign"),
            Self::Thresholding => write!(f, "Applying thresholds"),
            Self::BoundaryDetection => write!(f, "Detecting boundaries"),
            Self::AreaSegmentation => write!(f, "Segmenting areas"),
            Self::Persisting => write!(f, "Persisting result"),
        }
    }
}

/// Per-direction input: either a raw frame cube (run C2 ourselves) or a
/// precomputed phase/magnitude pair from an external Fourier extraction,
/// optionally with its own coherence map (spec §6.1 session loader).
pub enum DirectionInput {
    FrameCube {
        cube: crate::types::FrameCube,
        stimulus_freq: f64,
    },
    Precomputed {
        phase: PhaseMap,
        magnitude: MagnitudeMap,
        coherence: Option<CoherenceMap>,
    },
}

/// Anatomical reference image, passed through unmodified. Non-square
/// inputs are center-cropped to square before being stored on the result.
pub fn center_crop_square(image: &Map2D<f32>) -> Map2D<f32> {
    let (h, w) = image.dim();
    let side = h.min(w);
    let y0 = (h - side) / 2;
    let x0 = (w - side) / 2;
    image.slice(ndarray::s![y0..y0 + side, x0..x0 + side]).to_owned()
}

/// Thread-safe progress reporting for the analysis pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any
/// other UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn begin_stage(&self, _stage: AnalysisStage, _total_items: Option<usize>) {}
    fn advance(&self, _items_done: usize) {}
    fn finish_stage(&self) {}
}

pub(super) struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// Cooperative cancellation, queried between stages (spec §5).
#[derive(Clone)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for CancelFlag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn center_crop_picks_smaller_dimension() {
        let image = Array2::<f32>::zeros((10, 20));
        let cropped = center_crop_square(&image);
        assert_eq!(cropped.dim(), (10, 10));
    }
}
