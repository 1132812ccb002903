//! Boundary Detector (C7): sign-reversal detection on the thresholded VFS.
//!
//! Thinning is intentionally disabled (spec §4.7/§9): the diff-based
//! detection below is already at most 2 pixels wide, and an additional
//! thinning pass is costly for no correctness benefit.

use crate::consts::BOUNDARY_DEFINED_THRESHOLD;
use crate::compute::cpu::median_filter_3x3;
use crate::types::{BoundaryMap, VfsMap};

/// Median-filters `display_vfs`, then marks a pixel as a boundary if it and
/// either its right or lower neighbor both have `|vfs| > 0.1` and their
/// product is negative (a true sign reversal, ignoring near-zero
/// "undefined" pixels).
pub fn detect_boundaries(display_vfs: &VfsMap) -> BoundaryMap {
    let filtered = median_filter_3x3(display_vfs);
    let (h, w) = filtered.dim();
    let mut boundary = BoundaryMap::zeros((h, w));

    for y in 0..h {
        for x in 0..w {
            let here = filtered[[y, x]];
            let mut is_boundary = false;

            if x + 1 < w {
                let right = filtered[[y, x + 1]];
                if is_sign_reversal(here, right) {
                    is_boundary = true;
                }
            }
            if y + 1 < h {
                let below = filtered[[y + 1, x]];
                if is_sign_reversal(here, below) {
                    is_boundary = true;
                }
            }

            boundary[[y, x]] = is_boundary as u8;
        }
    }

    boundary
}

fn is_sign_reversal(a: f32, b: f32) -> bool {
    a.abs() > BOUNDARY_DEFINED_THRESHOLD && b.abs() > BOUNDARY_DEFINED_THRESHOLD && a * b < 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn marks_horizontal_reversal() {
        let vfs = Array2::from_shape_vec((1, 3), vec![0.8, -0.8, -0.8]).unwrap();
        let boundary = detect_boundaries(&vfs);
        assert_eq!(boundary[[0, 0]], 1);
    }

    #[test]
    fn undefined_pixels_never_boundary() {
        let vfs = Array2::from_shape_vec((1, 2), vec![0.05, -0.05]).unwrap();
        let boundary = detect_boundaries(&vfs);
        assert_eq!(boundary[[0, 0]], 0);
    }
}
