use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use image::{DynamicImage, ImageFormat, RgbaImage};
use tracing::info;
use tracing_subscriber::EnvFilter;

use spansort::{load_settings, FrameClock, GpuPixelSorter, PixelSorter, SortSettings};

#[derive(Debug, Parser)]
#[command(name = "spansort")]
#[command(about = "Threshold-masked span pixel sorter")]
#[command(version = env!("SPANSORT_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Sort an image or a directory of frames, optionally animated.
    Render {
        input: PathBuf,
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
        #[arg(long)]
        settings: Option<PathBuf>,
        #[arg(long, default_value_t = 1)]
        frames: u32,
        #[arg(long, default_value_t = 30.0)]
        fps: f32,
        /// Run the passes as wgpu compute kernels.
        #[arg(long)]
        gpu: bool,
        /// Reuse the first input frame for every output frame.
        #[arg(long)]
        freeze: bool,
    },
    /// Validate a settings file.
    Check { settings: PathBuf },
}

enum Backend {
    Cpu(PixelSorter),
    Gpu(Box<GpuPixelSorter>),
}

impl Backend {
    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        match self {
            Self::Cpu(sorter) => sorter.resize(width, height),
            Self::Gpu(sorter) => sorter.resize(width, height)?,
        }
        Ok(())
    }

    fn tick(&mut self, delta_seconds: f32) {
        match self {
            Self::Cpu(sorter) => sorter.tick(delta_seconds),
            Self::Gpu(sorter) => sorter.tick(delta_seconds),
        }
    }

    fn render(&mut self, source: &RgbaImage, clock: &FrameClock) -> Result<RgbaImage> {
        let image = match self {
            Self::Cpu(sorter) => sorter.render_or_passthrough(source, clock)?,
            Self::Gpu(sorter) => sorter.render_or_passthrough(source, clock)?,
        };
        Ok(image)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Render {
            input,
            output,
            settings,
            frames,
            fps,
            gpu,
            freeze,
        } => {
            let source = FrameSource::open(&input, freeze)?;
            run_render(&source, &output, settings.as_deref(), frames, fps, gpu)
        }
        Commands::Check { settings } => run_check(&settings),
    }
}

fn run_check(settings_path: &Path) -> Result<()> {
    let settings = load_settings(settings_path)?;
    println!(
        "OK: {} (thresholds {}..{}, {:?} {:?} by {:?}, view {:?})",
        settings_path.display(),
        settings.low_threshold,
        settings.high_threshold,
        settings.scan_direction,
        settings.sort_order,
        settings.sort_key,
        settings.output_view()
    );
    Ok(())
}

/// Where each output frame's source image comes from.
enum FrameSource {
    /// Image files of a directory in name order, looped.
    Sequence(Vec<PathBuf>),
    /// One image reused for every frame.
    Frozen(RgbaImage),
}

impl FrameSource {
    fn open(input: &Path, freeze: bool) -> Result<Self> {
        if !input.is_dir() {
            return Ok(Self::Frozen(load_image(input)?));
        }

        let mut frames: Vec<PathBuf> = fs::read_dir(input)
            .with_context(|| format!("failed listing {}", input.display()))?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.is_file() && ImageFormat::from_path(path).is_ok())
            .collect();
        frames.sort();
        if frames.is_empty() {
            bail!("no images found in {}", input.display());
        }
        info!(count = frames.len(), dir = %input.display(), "found input frames");

        if freeze {
            return Ok(Self::Frozen(load_image(&frames[0])?));
        }
        Ok(Self::Sequence(frames))
    }

    fn frame(&self, index: u32) -> Result<Cow<'_, RgbaImage>> {
        match self {
            Self::Frozen(image) => Ok(Cow::Borrowed(image)),
            Self::Sequence(paths) => {
                load_image(&paths[index as usize % paths.len()]).map(Cow::Owned)
            }
        }
    }
}

fn load_image(path: &Path) -> Result<RgbaImage> {
    Ok(image::open(path)
        .with_context(|| format!("failed opening {}", path.display()))?
        .to_rgba8())
}

fn run_render(
    source: &FrameSource,
    output: &Path,
    settings_path: Option<&Path>,
    frames: u32,
    fps: f32,
    gpu: bool,
) -> Result<()> {
    if frames == 0 {
        bail!("--frames must be at least 1");
    }
    if !fps.is_finite() || fps <= 0.0 {
        bail!("--fps must be a positive number, got {fps}");
    }

    let settings = match settings_path {
        Some(path) => load_settings(path)?,
        None => SortSettings::default(),
    };
    let (width, height) = source.frame(0)?.dimensions();

    let mut backend = if gpu {
        let sorter = pollster::block_on(GpuPixelSorter::new(width, height, settings))?;
        Backend::Gpu(Box::new(sorter))
    } else {
        Backend::Cpu(PixelSorter::new(width, height, settings)?)
    };

    for frame_index in 0..frames {
        let clock = FrameClock::at_fps(frame_index as u64, fps);
        if frame_index > 0 {
            backend.tick(clock.delta_seconds);
        }
        let image = source.frame(frame_index)?;
        let (width, height) = image.dimensions();
        backend.resize(width, height)?;
        let sorted = backend.render(&image, &clock)?;

        let path = frame_path(output, frame_index, frames);
        save_frame(sorted, &path)?;
        info!(frame = frame_index, path = %path.display(), "wrote frame");
    }

    println!("Wrote {}", output.display());
    Ok(())
}

fn save_frame(image: RgbaImage, path: &Path) -> Result<()> {
    // JPEG has no alpha channel.
    let is_jpeg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));
    let written = if is_jpeg {
        DynamicImage::ImageRgba8(image).to_rgb8().save(path)
    } else {
        image.save(path)
    };
    written.with_context(|| format!("failed writing {}", path.display()))
}

/// `out.png` for a single frame, `out_0000.png`, `out_0001.png`, ... otherwise.
fn frame_path(output: &Path, frame_index: u32, frames: u32) -> PathBuf {
    if frames <= 1 {
        return output.to_path_buf();
    }
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_owned());
    output.with_file_name(format!("{stem}_{frame_index:04}.png"))
}
