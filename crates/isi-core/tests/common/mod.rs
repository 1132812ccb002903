//! Shared fixture builders for integration tests: synthetic bar-sweep
//! frame cubes and ready-made `AnalysisConfig`s.

use ndarray::Array3;

use isi_core::config::AnalysisConfig;
use isi_core::types::FrameCube;

/// A `[T, H, W]` cube where every pixel holds the same constant value
/// (spec §8 S1: zero modulation, zero coherence).
pub fn constant_cube(t: usize, h: usize, w: usize, value: f32) -> FrameCube {
    Array3::from_elem((t, h, w), value)
}

/// A `[T, H, W]` cube whose per-pixel time series is
/// `cos(2π · cycles_per_sweep/T · t + phase(x))`, where `phase(x)` is a
/// linear ramp across the horizontal axis. `phase_sign` flips the ramp
/// direction so a forward/reverse sweep pair can be built (spec §8 S2).
pub fn sinusoidal_azimuth_cube(
    t: usize,
    h: usize,
    w: usize,
    cycles_per_sweep: f64,
    phase_sign: f64,
) -> FrameCube {
    let mut cube = Array3::<f32>::zeros((t, h, w));
    for x in 0..w {
        let phase_x = phase_sign * (x as f64 - w as f64 / 2.0) * std::f64::consts::PI / w as f64;
        for time in 0..t {
            let angle = 2.0 * std::f64::consts::PI * (cycles_per_sweep / t as f64) * time as f64 + phase_x;
            let value = angle.cos() as f32;
            for y in 0..h {
                cube[[time, y, x]] = value;
            }
        }
    }
    cube
}

/// A minimal valid config with every required field set. Individual
/// tests override fields as needed since `AnalysisConfig` is `Copy`.
pub fn minimal_config() -> AnalysisConfig {
    AnalysisConfig::from_toml_str(
        r#"
        coherence_threshold = 0.3
        magnitude_threshold = 0.0
        smoothing_sigma = 0.0
        vfs_threshold_sd = 0.0
        ring_size_mm = 10.0
        phase_filter_sigma = 0.0
        gradient_window_size = 3
        response_threshold_percent = 50.0
        area_min_size_mm2 = 1.0
        "#,
    )
    .expect("fixture config must be valid")
}
