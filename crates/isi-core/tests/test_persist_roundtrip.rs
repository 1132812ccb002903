//! HDF5 persistence: dataset names, atomic rename, round-trip stability
//! (spec §6.2, §8 invariants 1, 8).

use ndarray::Array2;

use isi_core::persist::save_result;
use isi_core::result::{AnalysisResult, ResultMetadata};
use isi_core::types::{DirectionBundle, DirectionKey};

fn sample_result() -> AnalysisResult {
    let mut phase = DirectionBundle::new();
    let mut magnitude = DirectionBundle::new();
    let mut coherence = DirectionBundle::new();
    for key in DirectionKey::ALL {
        phase.insert(key, Array2::<f32>::zeros((4, 4)));
        magnitude.insert(key, Array2::<f32>::ones((4, 4)));
        coherence.insert(key, Array2::<f32>::ones((4, 4)));
    }

    AnalysisResult {
        phase,
        magnitude,
        coherence,
        azimuth: Some(Array2::<f32>::zeros((4, 4))),
        elevation: Some(Array2::<f32>::zeros((4, 4))),
        raw_vfs: Some(Array2::<f32>::zeros((4, 4))),
        coherence_vfs: Some(Array2::<f32>::zeros((4, 4))),
        magnitude_vfs: Some(Array2::<f32>::zeros((4, 4))),
        statistical_vfs: Some(Array2::<f32>::zeros((4, 4))),
        boundary: Some(ndarray::Array2::<u8>::zeros((4, 4))),
        area: Some(ndarray::Array2::<i32>::zeros((4, 4))),
        anatomical: None,
        per_direction_diagnostics: None,
        metadata: ResultMetadata {
            gradient_window_size: 3,
            effective_magnitude_threshold: 0.0,
            coherence_available: true,
            used_pixel_area_fallback: false,
            backend_name: "cpu".to_string(),
            synthesized_coherence_directions: Vec::new(),
        },
    }
}

#[test]
fn save_creates_all_documented_datasets() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("result.h5");

    save_result(&sample_result(), &path).unwrap();

    let file = hdf5::File::open(&path).unwrap();
    for name in [
        "azimuth_map",
        "elevation_map",
        "raw_vfs_map",
        "coherence_vfs_map",
        "magnitude_vfs_map",
        "statistical_vfs_map",
        "boundary_map",
        "area_map",
    ] {
        assert!(file.dataset(name).is_ok(), "missing dataset {name}");
    }
    for group in ["phase_maps", "magnitude_maps", "coherence_maps"] {
        let g = file.group(group).unwrap();
        for direction in ["LR", "RL", "TB", "BT"] {
            assert!(g.dataset(direction).is_ok(), "missing {group}/{direction}");
        }
    }
}

#[test]
fn save_is_idempotent_and_leaves_no_stale_tmp_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("result.h5");

    save_result(&sample_result(), &path).unwrap();
    save_result(&sample_result(), &path).unwrap();

    assert!(path.exists());
    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1, "stale tmp-*.tmp-<pid> file left behind");
}

#[test]
fn save_produces_byte_identical_output_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let path_a = dir.path().join("a.h5");
    let path_b = dir.path().join("b.h5");

    let result = sample_result();
    save_result(&result, &path_a).unwrap();
    save_result(&result, &path_b).unwrap();

    let bytes_a = std::fs::read(&path_a).unwrap();
    let bytes_b = std::fs::read(&path_b).unwrap();
    assert_eq!(bytes_a, bytes_b, "serialize\u{2192}deserialize\u{2192}serialize must be byte-identical");
}

#[test]
fn saved_dataset_shape_and_contents_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("result.h5");
    save_result(&sample_result(), &path).unwrap();

    let file = hdf5::File::open(&path).unwrap();
    let dataset = file.dataset("azimuth_map").unwrap();
    assert_eq!(dataset.shape(), vec![4, 4]);

    let raw: Vec<f32> = dataset.read_raw().unwrap();
    assert_eq!(raw.len(), 16);
    assert!(raw.iter().all(|&v| v == 0.0));
}
