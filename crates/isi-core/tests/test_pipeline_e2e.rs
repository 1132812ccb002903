//! End-to-end orchestrator scenarios (spec §8 S1, S2, and edge cases 10-12).

mod common;

use isi_core::compute::{create_backend, DevicePreference};
use isi_core::pipeline::{run_analysis, CancelFlag, DirectionInput};
use isi_core::types::{DirectionBundle, DirectionKey};

use common::{constant_cube, minimal_config, sinusoidal_azimuth_cube};

#[test]
fn s1_constant_input_yields_all_zero_outputs() {
    let backend = create_backend(DevicePreference::Cpu);
    let config = minimal_config();
    let cube = constant_cube(64, 32, 32, 100.0);

    let mut inputs = DirectionBundle::new();
    for key in DirectionKey::ALL {
        inputs.insert(
            key,
            DirectionInput::FrameCube {
                cube: cube.clone(),
                stimulus_freq: 10.0 / 64.0,
            },
        );
    }

    let result = run_analysis(&config, backend, inputs, None, None, &CancelFlag::new()).unwrap();

    for (_, magnitude) in result.magnitude.iter() {
        assert!(magnitude.iter().all(|&v| v.abs() < 1e-6));
    }
    for (_, coherence) in result.coherence.iter() {
        assert!(coherence.iter().all(|&v| v.abs() < 1e-6));
    }

    let raw_vfs = result.raw_vfs.expect("azimuth and elevation both present");
    assert!(raw_vfs.iter().all(|&v| v == 0.0));

    let boundary = result.boundary.expect("display vfs present");
    assert!(boundary.iter().all(|&v| v == 0));

    let area = result.area.expect("boundary and display vfs present");
    assert!(area.iter().all(|&v| v == 0));
}

#[test]
fn s2_pure_sinusoidal_azimuth_recovers_monotonic_ramp() {
    let backend = create_backend(DevicePreference::Cpu);
    let config = minimal_config();

    let lr = sinusoidal_azimuth_cube(64, 16, 32, 10.0, 1.0);
    let rl = sinusoidal_azimuth_cube(64, 16, 32, 10.0, -1.0);

    let mut inputs = DirectionBundle::new();
    inputs.insert(
        DirectionKey::Lr,
        DirectionInput::FrameCube {
            cube: lr,
            stimulus_freq: 10.0 / 64.0,
        },
    );
    inputs.insert(
        DirectionKey::Rl,
        DirectionInput::FrameCube {
            cube: rl,
            stimulus_freq: 10.0 / 64.0,
        },
    );

    let result = run_analysis(&config, backend, inputs, None, None, &CancelFlag::new()).unwrap();
    let azimuth = result.azimuth.expect("both LR and RL supplied");

    // Monotonic left-to-right ramp, within the documented range.
    let row: Vec<f32> = (0..azimuth.ncols()).map(|x| azimuth[[0, x]]).collect();
    for pair in row.windows(2) {
        assert!(pair[1] >= pair[0] - 1e-3, "azimuth must not decrease left to right");
    }
    for &v in &row {
        assert!((-60.0..=60.0).contains(&v), "azimuth {v} outside published range");
    }
}

#[test]
fn edge_case_missing_rl_direction_has_no_azimuth_and_does_not_crash() {
    let backend = create_backend(DevicePreference::Cpu);
    let config = minimal_config();
    let cube = constant_cube(32, 16, 16, 50.0);

    let mut inputs = DirectionBundle::new();
    inputs.insert(
        DirectionKey::Lr,
        DirectionInput::FrameCube {
            cube,
            stimulus_freq: 5.0 / 32.0,
        },
    );

    let result = run_analysis(&config, backend, inputs, None, None, &CancelFlag::new()).unwrap();
    assert!(result.azimuth.is_none());
    assert!(result.raw_vfs.is_none());
}

#[test]
fn edge_case_no_calibration_uses_pixel_fallback_and_warns() {
    let backend = create_backend(DevicePreference::Cpu);
    let config = minimal_config();
    let cube = constant_cube(32, 16, 16, 1.0);

    let mut inputs = DirectionBundle::new();
    for key in DirectionKey::ALL {
        inputs.insert(
            key,
            DirectionInput::FrameCube {
                cube: cube.clone(),
                stimulus_freq: 5.0 / 32.0,
            },
        );
    }

    let result = run_analysis(&config, backend, inputs, None, None, &CancelFlag::new()).unwrap();
    assert!(result.metadata.used_pixel_area_fallback);
}

#[test]
fn cancelled_flag_aborts_before_any_work() {
    let backend = create_backend(DevicePreference::Cpu);
    let config = minimal_config();
    let cube = constant_cube(16, 8, 8, 1.0);

    let mut inputs = DirectionBundle::new();
    inputs.insert(
        DirectionKey::Lr,
        DirectionInput::FrameCube {
            cube,
            stimulus_freq: 2.0 / 16.0,
        },
    );

    let cancel = CancelFlag::new();
    cancel.cancel();

    let err = run_analysis(&config, backend, inputs, None, None, &cancel).unwrap_err();
    assert!(matches!(err, isi_core::IsiError::Cancelled));
}
