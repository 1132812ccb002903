//! Retinotopy Combiner (C4): bidirectional phase combination into azimuth
//! and elevation maps (Marshel et al. 2011).
//!
//! Decision and contract (spec §4.4): simple half-difference of wrapped
//! phases with no temporal-delay correction. This is the published and
//! verified-correct form for this data flow; a "delay-corrected" variant
//! would be a different algorithm, not a fix.

use crate::types::{DirectionBundle, DirectionKey, PhaseMap, RetinotopyMap};

const AZIMUTH_DEGREES_PER_RADIAN: f32 = 60.0 / std::f32::consts::PI;
const ELEVATION_DEGREES_PER_RADIAN: f32 = 30.0 / std::f32::consts::PI;

/// `((φ_LR − φ_RL) / 2) · (60 / π)`. `None` if either direction is absent.
pub fn generate_azimuth_map(phases: &DirectionBundle<PhaseMap>) -> Option<RetinotopyMap> {
    combine(
        phases.get(DirectionKey::Lr)?,
        phases.get(DirectionKey::Rl)?,
        AZIMUTH_DEGREES_PER_RADIAN,
    )
    .into()
}

/// `((φ_TB − φ_BT) / 2) · (30 / π)`. `None` if either direction is absent.
pub fn generate_elevation_map(phases: &DirectionBundle<PhaseMap>) -> Option<RetinotopyMap> {
    combine(
        phases.get(DirectionKey::Tb)?,
        phases.get(DirectionKey::Bt)?,
        ELEVATION_DEGREES_PER_RADIAN,
    )
    .into()
}

fn combine(forward: &PhaseMap, reverse: &PhaseMap, degrees_per_radian: f32) -> Option<RetinotopyMap> {
    if forward.dim() != reverse.dim() {
        return None;
    }
    let mut out = RetinotopyMap::zeros(forward.dim());
    ndarray::Zip::from(&mut out)
        .and(forward)
        .and(reverse)
        .for_each(|o, &f, &r| {
            *o = ((f - r) / 2.0) * degrees_per_radian;
        });
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn azimuth_requires_both_directions() {
        let mut bundle = DirectionBundle::new();
        bundle.insert(DirectionKey::Lr, Array2::<f32>::zeros((2, 2)));
        assert!(generate_azimuth_map(&bundle).is_none());
    }

    #[test]
    fn azimuth_half_difference() {
        let mut bundle = DirectionBundle::new();
        bundle.insert(DirectionKey::Lr, Array2::from_elem((1, 1), std::f32::consts::FRAC_PI_2));
        bundle.insert(DirectionKey::Rl, Array2::from_elem((1, 1), -std::f32::consts::FRAC_PI_2));
        let azimuth = generate_azimuth_map(&bundle).unwrap();
        assert!((azimuth[[0, 0]] - 60.0).abs() < 1e-4);
    }
}
