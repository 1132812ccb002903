//! Fourier extraction shape and range invariants (spec §8 invariants 6, 7).

mod common;

use isi_core::compute::{create_backend, DevicePreference};
use isi_core::fourier::compute_phase_maps;

use common::sinusoidal_azimuth_cube;

#[test]
fn outputs_match_input_spatial_shape() {
    let backend = create_backend(DevicePreference::Cpu);
    let cube = sinusoidal_azimuth_cube(48, 12, 20, 6.0, 1.0);

    let (phase, magnitude, coherence) = compute_phase_maps(&cube, &backend, 6.0 / 48.0).unwrap();

    assert_eq!(phase.dim(), (12, 20));
    assert_eq!(magnitude.dim(), (12, 20));
    assert_eq!(coherence.dim(), (12, 20));
}

#[test]
fn coherence_is_always_clamped_to_unit_interval() {
    let backend = create_backend(DevicePreference::Cpu);
    let cube = sinusoidal_azimuth_cube(48, 8, 8, 6.0, 1.0);

    let (_, _, coherence) = compute_phase_maps(&cube, &backend, 6.0 / 48.0).unwrap();
    for &c in coherence.iter() {
        assert!((0.0..=1.0).contains(&c), "coherence {c} outside [0,1]");
    }
}

#[test]
fn all_nan_cube_is_rejected_as_invalid_input() {
    let backend = create_backend(DevicePreference::Cpu);
    let cube = ndarray::Array3::<f32>::from_elem((8, 4, 4), f32::NAN);

    let err = compute_phase_maps(&cube, &backend, 0.1).unwrap_err();
    assert!(matches!(err, isi_core::IsiError::InvalidInput(_)));
}
