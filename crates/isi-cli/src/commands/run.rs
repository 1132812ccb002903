use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use isi_core::compute::{create_backend, DevicePreference};
use isi_core::config::AnalysisConfig;
use isi_core::persist::save_result;
use isi_core::pipeline::{run_analysis_reported, AnalysisStage, CancelFlag, DirectionInput, ProgressReporter};
use isi_core::types::{DirectionBundle, DirectionKey};

#[derive(Args)]
pub struct RunArgs {
    /// Analysis config file (TOML, all 9 fields required)
    #[arg(long)]
    pub config: PathBuf,

    /// Left-to-right frame cube (.npy, shape [T,H,W])
    #[arg(long)]
    pub lr: Option<PathBuf>,
    /// Right-to-left frame cube (.npy, shape [T,H,W])
    #[arg(long)]
    pub rl: Option<PathBuf>,
    /// Top-to-bottom frame cube (.npy, shape [T,H,W])
    #[arg(long)]
    pub tb: Option<PathBuf>,
    /// Bottom-to-top frame cube (.npy, shape [T,H,W])
    #[arg(long)]
    pub bt: Option<PathBuf>,

    /// Stimulus temporal frequency (cycles per sweep / T), applied to every
    /// direction provided as a frame cube
    #[arg(long, default_value = "0.15625")]
    pub stimulus_freq: f64,

    /// Optional anatomical reference image (.npy, shape [H,W])
    #[arg(long)]
    pub anatomical: Option<PathBuf>,

    /// Image width in pixels, for mm-to-pixel area calibration
    #[arg(long)]
    pub image_width_px: Option<usize>,

    /// Request the experimental GPU backend (still requires
    /// ENABLE_GPU_FFT_EXPERIMENTAL=1 in the environment)
    #[arg(long)]
    pub gpu: bool,

    /// Output result container (HDF5)
    #[arg(short, long, default_value = "result.h5")]
    pub output: PathBuf,
}

struct CliProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter for CliProgressReporter {
    fn begin_stage(&self, stage: AnalysisStage, total_items: Option<usize>) {
        self.bar.set_message(stage.to_string());
        if let Some(total) = total_items {
            self.bar.set_length(total as u64);
        }
        self.bar.set_position(0);
    }

    fn advance(&self, items_done: usize) {
        self.bar.set_position(items_done as u64);
    }

    fn finish_stage(&self) {}
}

pub fn run(args: &RunArgs) -> Result<()> {
    let config_text = std::fs::read_to_string(&args.config)
        .with_context(|| format!("failed to read config {}", args.config.display()))?;
    let config = AnalysisConfig::from_toml_str(&config_text).context("invalid analysis config")?;

    let mut inputs = DirectionBundle::new();
    for (key, path) in [
        (DirectionKey::Lr, &args.lr),
        (DirectionKey::Rl, &args.rl),
        (DirectionKey::Tb, &args.tb),
        (DirectionKey::Bt, &args.bt),
    ] {
        if let Some(path) = path {
            let cube = ndarray_npy::read_npy(path)
                .with_context(|| format!("failed to read frame cube {}", path.display()))?;
            inputs.insert(
                key,
                DirectionInput::FrameCube {
                    cube,
                    stimulus_freq: args.stimulus_freq,
                },
            );
        }
    }

    if inputs.is_empty() {
        anyhow::bail!("at least one of --lr/--rl/--tb/--bt must be provided");
    }

    let anatomical = args
        .anatomical
        .as_ref()
        .map(|path| -> Result<_> {
            ndarray_npy::read_npy(path)
                .with_context(|| format!("failed to read anatomical image {}", path.display()))
        })
        .transpose()?;

    let preference = if args.gpu { DevicePreference::Gpu } else { DevicePreference::Cpu };
    let backend = create_backend(preference);

    println!("ISI Analysis");
    println!("  Directions: {:?}", inputs.keys().collect::<Vec<_>>());
    println!("  Backend:    {}", backend.name());
    println!();

    let bar = ProgressBar::new(1);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg:32} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    let reporter = Arc::new(CliProgressReporter { bar: bar.clone() });
    let cancel = CancelFlag::new();

    let result = run_analysis_reported(
        &config,
        backend,
        reporter,
        inputs,
        anatomical,
        args.image_width_px,
        &cancel,
    )?;
    bar.finish_with_message("Done");

    println!();
    println!("  Coherence available:      {}", result.metadata.coherence_available);
    println!(
        "  Effective mag. threshold: {:.6}",
        result.metadata.effective_magnitude_threshold
    );
    if result.metadata.used_pixel_area_fallback {
        println!("  Area calibration:         pixel-count fallback (no image width supplied)");
    }
    if !result.metadata.synthesized_coherence_directions.is_empty() {
        println!(
            "  Synthesized coherence for: {:?}",
            result.metadata.synthesized_coherence_directions
        );
    }

    save_result(&result, &args.output)
        .with_context(|| format!("failed to persist result to {}", args.output.display()))?;
    println!("\nResult saved to {}", args.output.display());

    Ok(())
}
