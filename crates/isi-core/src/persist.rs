//! Result Serializer (C10, part two): atomic-write HDF5 persistence.
//!
//! Writes to a pid-suffixed temporary sibling path, flushes and fsyncs it
//! to disk, closes it, then renames over the final target. A stale temp
//! file or a pre-existing target from a previous run is removed before
//! writing starts, so a crashed prior write never blocks a retry. The pid
//! suffix keeps two concurrent writers targeting the same output path
//! from racing on the same temp file.

use std::path::{Path, PathBuf};

use hdf5::File as Hdf5File;

use crate::error::{IsiError, Result};
use crate::result::AnalysisResult;
use crate::types::DirectionKey;

pub fn save_result(result: &AnalysisResult, path: &Path) -> Result<()> {
    let tmp_path = tmp_path_for(path)?;
    if tmp_path.exists() {
        std::fs::remove_file(&tmp_path)?;
    }

    write_container(result, &tmp_path)?;

    if path.exists() {
        std::fs::remove_file(path)?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> Result<PathBuf> {
    let file_name = path.file_name().ok_or_else(|| {
        IsiError::PersistenceFailure(format!("target path has no file name: {}", path.display()))
    })?;
    let tmp_name = format!("{}.tmp-{}", file_name.to_string_lossy(), std::process::id());
    Ok(path.with_file_name(tmp_name))
}

fn write_container(result: &AnalysisResult, tmp_path: &Path) -> Result<()> {
    {
        let file = Hdf5File::create(tmp_path)
            .map_err(|e| IsiError::PersistenceFailure(format!("create {}: {e}", tmp_path.display())))?;

        write_direction_group(&file, "phase_maps", result.phase.iter())?;
        write_direction_group(&file, "magnitude_maps", result.magnitude.iter())?;
        write_direction_group(&file, "coherence_maps", result.coherence.iter())?;

        write_optional_2d(&file, "azimuth_map", result.azimuth.as_ref())?;
        write_optional_2d(&file, "elevation_map", result.elevation.as_ref())?;
        write_optional_2d(&file, "raw_vfs_map", result.raw_vfs.as_ref())?;
        write_optional_2d(&file, "coherence_vfs_map", result.coherence_vfs.as_ref())?;
        write_optional_2d(&file, "magnitude_vfs_map", result.magnitude_vfs.as_ref())?;
        write_optional_2d(&file, "statistical_vfs_map", result.statistical_vfs.as_ref())?;

        if let Some(boundary) = &result.boundary {
            file.new_dataset_builder()
                .with_data(&boundary.as_standard_layout())
                .create("boundary_map")
                .map_err(persistence_err("boundary_map"))?;
        }
        if let Some(area) = &result.area {
            file.new_dataset_builder()
                .with_data(&area.as_standard_layout())
                .create("area_map")
                .map_err(persistence_err("area_map"))?;
        }

        file.flush()
            .map_err(|e| IsiError::PersistenceFailure(format!("flush: {e}")))?;
        // `file` closes here, before the fsync below: HDF5 buffers its own
        // writes independently of the OS page cache, so the underlying fd
        // must be reopened after `flush` to fsync what the library handed
        // to the kernel.
    }

    let raw = std::fs::File::open(tmp_path)?;
    raw.sync_all()?;
    Ok(())
}

fn write_direction_group<'a>(
    file: &Hdf5File,
    group_name: &str,
    entries: impl Iterator<Item = (DirectionKey, &'a ndarray::Array2<f32>)>,
) -> Result<()> {
    let group = file
        .create_group(group_name)
        .map_err(persistence_err(group_name))?;
    for (key, map) in entries {
        group
            .new_dataset_builder()
            .with_data(&map.as_standard_layout())
            .create(key.as_str())
            .map_err(persistence_err(key.as_str()))?;
    }
    Ok(())
}

fn write_optional_2d(file: &Hdf5File, name: &str, map: Option<&ndarray::Array2<f32>>) -> Result<()> {
    if let Some(map) = map {
        file.new_dataset_builder()
            .with_data(&map.as_standard_layout())
            .create(name)
            .map_err(persistence_err(name))?;
    }
    Ok(())
}

fn persistence_err(what: &str) -> impl FnOnce(hdf5::Error) -> IsiError + '_ {
    move |e| IsiError::PersistenceFailure(format!("{what}: {e}"))
}
