//! Area Segmenter (C8): connected-component labeling of the display VFS
//! with spatial-calibrated minimum-area filtering.
//!
//! Connected-component labeling (`connected_components_4`) is the same
//! two-pass union-find routine the numeric kernel exposes for 4-connected
//! binary masks, run here once for the positive-sign region and once for
//! the negative-sign region.

use crate::compute::cpu::connected_components_4;
use crate::types::{AreaMap, BoundaryMap, VfsMap};

pub struct SegmentationResult {
    pub area_map: AreaMap,
    /// True if calibration was unavailable and `area_min_size_mm2` was
    /// used directly as a raw pixel-count threshold (spec §4.8 step 1).
    pub used_pixel_fallback: bool,
}

pub fn segment_areas(
    display_vfs: &VfsMap,
    boundary: &BoundaryMap,
    image_width_px: Option<usize>,
    ring_size_mm: f32,
    area_min_size_mm2: f32,
) -> SegmentationResult {
    let (raw_n_min, used_pixel_fallback) = match image_width_px {
        Some(width) if width > 0 => {
            let pixels_per_mm = width as f32 / ring_size_mm;
            (area_min_size_mm2 * pixels_per_mm * pixels_per_mm, false)
        }
        _ => {
            tracing::warn!(
                "image width unavailable for mm\u{2192}pixel calibration; treating area_min_size_mm2 as a raw pixel count"
            );
            (area_min_size_mm2, true)
        }
    };
    // Truncates, matching the reference's `int(min_area_size_pixels)`.
    let n_min = raw_n_min.trunc() as usize;

    let (h, w) = display_vfs.dim();
    let mut positive_mask = ndarray::Array2::<bool>::from_elem((h, w), false);
    let mut negative_mask = ndarray::Array2::<bool>::from_elem((h, w), false);

    for y in 0..h {
        for x in 0..w {
            let v = display_vfs[[y, x]];
            let valid = boundary[[y, x]] == 0 && !v.is_nan();
            if !valid {
                continue;
            }
            if v > 0.0 {
                positive_mask[[y, x]] = true;
            } else if v < 0.0 {
                negative_mask[[y, x]] = true;
            }
        }
    }

    let (positive_labels, positive_count) = connected_components_4(&positive_mask);
    let (negative_labels, _negative_count) = connected_components_4(&negative_mask);

    let mut area_map = AreaMap::zeros((h, w));
    for y in 0..h {
        for x in 0..w {
            let pos = positive_labels[[y, x]];
            let neg = negative_labels[[y, x]];
            area_map[[y, x]] = if pos > 0 {
                pos
            } else if neg > 0 {
                neg + positive_count as i32
            } else {
                0
            };
        }
    }

    drop_small_components(&mut area_map, n_min);

    SegmentationResult {
        area_map,
        used_pixel_fallback,
    }
}

fn drop_small_components(area_map: &mut AreaMap, min_size: usize) {
    let mut areas = std::collections::HashMap::<i32, usize>::new();
    for &label in area_map.iter() {
        if label > 0 {
            *areas.entry(label).or_insert(0) += 1;
        }
    }
    for label in area_map.iter_mut() {
        if *label > 0 && areas[label] < min_size {
            *label = 0;
        }
    }
}
