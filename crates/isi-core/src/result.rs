//! Result Model (C10, part one): the immutable output of a full analysis
//! run, plus provenance metadata recorded for transparency.

use crate::threshold::PerDirectionDiagnostics;
use crate::types::{
    AreaMap, BoundaryMap, CoherenceMap, DirectionBundle, DirectionKey, MagnitudeMap, PhaseMap,
    RetinotopyMap, VfsMap,
};

/// Provenance recorded alongside the result (spec §9 open questions,
/// §4.8 calibration fallback): everything a caller needs to understand
/// *why* the numbers came out the way they did, without re-deriving it.
#[derive(Clone, Debug)]
pub struct ResultMetadata {
    /// Accepted but unused; central differences are always used for
    /// gradients regardless of this configured value.
    pub gradient_window_size: i32,
    /// The median-of-mean-magnitudes value actually applied as the
    /// magnitude threshold, which diverges from the configured
    /// `magnitude_threshold` field (spec §9).
    pub effective_magnitude_threshold: f32,
    /// False if one or more direction's coherence map was absent, in
    /// which case `statistical_vfs` was derived from the raw VFS
    /// directly instead of the coherence-masked VFS.
    pub coherence_available: bool,
    /// True if area segmentation fell back to treating
    /// `area_min_size_mm2` as a raw pixel count because no image width
    /// was available for mm-to-pixel calibration.
    pub used_pixel_area_fallback: bool,
    pub backend_name: String,
    /// Directions for which no coherence map was available and `1.0` was
    /// synthesized in its place, marking that direction reduced-confidence
    /// (spec §4.9).
    pub synthesized_coherence_directions: Vec<DirectionKey>,
}

/// Full output of a run (spec §3): immutable once constructed, fields
/// read-only borrowed by consumers (renderer, persistence).
#[derive(Clone, Debug)]
pub struct AnalysisResult {
    pub phase: DirectionBundle<PhaseMap>,
    pub magnitude: DirectionBundle<MagnitudeMap>,
    pub coherence: DirectionBundle<CoherenceMap>,
    pub azimuth: Option<RetinotopyMap>,
    pub elevation: Option<RetinotopyMap>,
    pub raw_vfs: Option<VfsMap>,
    pub coherence_vfs: Option<VfsMap>,
    pub magnitude_vfs: Option<VfsMap>,
    pub statistical_vfs: Option<VfsMap>,
    pub boundary: Option<BoundaryMap>,
    pub area: Option<AreaMap>,
    /// Passed through unmodified if the caller supplied one; the core
    /// never produces or alters it.
    pub anatomical: Option<Map2DPassthrough>,
    /// Per-direction magnitude/percentile diagnostics (spec §4.6 "Also per
    /// direction"): informational only, never consulted by C7/C8.
    pub per_direction_diagnostics: Option<PerDirectionDiagnostics>,
    pub metadata: ResultMetadata,
}

/// Opaque pass-through for an anatomical reference image (spec §2,
/// "optional anatomical passthrough"). The core never interprets its
/// contents.
pub type Map2DPassthrough = ndarray::Array2<f32>;
