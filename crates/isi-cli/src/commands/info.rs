use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use ndarray::ArrayD;

#[derive(Args)]
pub struct InfoArgs {
    /// Input array file (.npy)
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let array: ArrayD<f32> = ndarray_npy::read_npy(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    println!("File:       {}", args.file.display());
    println!("Shape:      {:?}", array.shape());
    println!("Elements:   {}", array.len());

    let (mut min, mut max, mut sum, mut nan_count) = (f32::INFINITY, f32::NEG_INFINITY, 0.0f64, 0usize);
    for &v in array.iter() {
        if v.is_nan() {
            nan_count += 1;
            continue;
        }
        min = min.min(v);
        max = max.max(v);
        sum += v as f64;
    }
    let finite_count = array.len() - nan_count;
    println!("Min:        {min}");
    println!("Max:        {max}");
    if finite_count > 0 {
        println!("Mean:       {}", sum / finite_count as f64);
    }
    if nan_count > 0 {
        println!("NaN count:  {nan_count}");
    }

    Ok(())
}
