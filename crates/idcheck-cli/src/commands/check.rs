//! Check command - validate photos against the ID photo rules.

use std::collections::HashSet;
use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use idcheck_adapters::{load_standard_models, models_dir, FsImageSource};
use idcheck_core::{
    CorrectedImageRecord, DetectorRegistry, ErrorRecord, FrameTarget, Image, ImageDimensions,
    ImageSource, Outcome, PhotoResult, Pipeline, ProgressEvent, ProgressSink, ResultOutput,
    ValidationConfig,
};
use tracing::{debug, info, warn};

use super::ExitCode;
use crate::config::AppConfig;
use crate::output::{JsonOutput, ProgressBar};

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// JSON Lines (one JSON object per line)
    #[default]
    Jsonl,
    /// Single JSON array
    Json,
}

/// Parse a `NAME=VALUE` threshold override with VALUE in 0.0-1.0.
fn parse_threshold(s: &str) -> Result<(String, f32), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("'{s}' is not in NAME=VALUE form"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("'{s}' has an empty name"));
    }
    let value: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{value}' is not a valid number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok((name.to_string(), value))
    } else {
        Err(format!("{value} is not in 0.0..=1.0"))
    }
}

/// Parse a `WIDTHxHEIGHT` resolution.
fn parse_resolution(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("'{s}' is not in WIDTHxHEIGHT form"))?;
    let width: u32 = w
        .trim()
        .parse()
        .map_err(|_| format!("'{w}' is not a valid width"))?;
    let height: u32 = h
        .trim()
        .parse()
        .map_err(|_| format!("'{h}' is not a valid height"))?;
    if width == 0 || height == 0 {
        return Err(format!("'{s}' must be non-zero in both dimensions"));
    }
    Ok((width, height))
}

/// Shared arguments for photo validation.
#[derive(Args, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct CheckArgs {
    /// Files or directories to validate
    pub paths: Vec<PathBuf>,

    /// Recurse into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Override a finding threshold, e.g. `--threshold occlusion=0.7` (repeatable)
    #[arg(long = "threshold", value_name = "NAME=VALUE", value_parser = parse_threshold)]
    pub thresholds: Vec<(String, f32)>,

    /// Report fixable photos as needing correction instead of fixing them
    #[arg(long)]
    pub no_autofix: bool,

    /// Correction attempts before a photo is rejected
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,

    /// Per-photo deadline in milliseconds
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub deadline_ms: Option<u64>,

    /// Minimum accepted resolution, e.g. 600x800
    #[arg(long, value_name = "WxH", value_parser = parse_resolution)]
    pub min_resolution: Option<(u32, u32)>,

    /// Run only the geometry and quality checks
    #[arg(long)]
    pub no_detectors: bool,

    /// Write corrected photos as PNG into this directory
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Fit corrected photos to a fixed output frame, e.g. 480x640
    #[arg(long, value_name = "WxH", value_parser = parse_resolution)]
    pub frame: Option<(u32, u32)>,

    /// Show progress bar
    #[arg(long)]
    pub progress: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Pretty-print JSON output (only affects --format json)
    #[arg(long)]
    pub pretty: bool,

    /// Custom models directory (overrides default and config)
    #[arg(long, value_name = "DIR")]
    pub models_dir: Option<PathBuf>,

    /// Merged config (populated by `with_config`, not from CLI).
    #[arg(skip)]
    config: Option<AppConfig>,
}

impl CheckArgs {
    /// Apply configuration file values, respecting CLI precedence.
    ///
    /// Layering priority (lowest to highest):
    /// 1. Built-in defaults of [`ValidationConfig`]
    /// 2. Config file values (XDG, then project-local)
    /// 3. CLI arguments (already set on self)
    ///
    /// For boolean flags: CLI `--no-*` always wins. Config can enable/disable
    /// only when CLI flag wasn't explicitly set.
    pub fn with_config(mut args: Self, config: &AppConfig) -> Self {
        if !args.recursive {
            args.recursive = config.general.recursive.unwrap_or(false);
        }

        if !args.no_autofix {
            if let Some(enabled) = config.autofix.enabled {
                args.no_autofix = !enabled;
            }
        }
        if !args.no_detectors {
            if let Some(enabled) = config.models.enabled {
                args.no_detectors = !enabled;
            }
        }

        args.max_retries = args.max_retries.or(config.autofix.max_retries);
        // A zero deadline is reported by config validation and ignored here.
        args.deadline_ms = args
            .deadline_ms
            .or(config.pipeline.deadline_ms.filter(|&ms| ms > 0));
        if args.min_resolution.is_none() {
            if let (Some(w), Some(h)) = (config.quality.min_width, config.quality.min_height) {
                args.min_resolution = Some((w, h));
            }
        }

        if args.format.is_none() {
            args.format = config
                .output
                .format
                .as_ref()
                .and_then(|s| match s.as_str() {
                    "json" => Some(OutputFormat::Json),
                    "jsonl" => Some(OutputFormat::Jsonl),
                    _ => None,
                });
        }
        if !args.pretty {
            args.pretty = config.output.pretty.unwrap_or(false);
        }
        if !args.progress {
            args.progress = config.output.progress.unwrap_or(false);
        }
        if args.output_dir.is_none() {
            args.output_dir.clone_from(&config.output.dir);
        }
        if args.frame.is_none() {
            args.frame = config.autofix.frame.map(|[w, h]| (w, h));
        }
        if args.models_dir.is_none() {
            args.models_dir.clone_from(&config.models.dir);
        }

        // Kept for the settings that have no CLI flag.
        args.config = Some(config.clone());

        args
    }

    /// Build the per-photo validation configuration.
    pub fn validation_config(&self) -> ValidationConfig {
        let mut config = ValidationConfig::default();

        if let Some(file) = &self.config {
            let q = &file.quality;
            let quality = &mut config.quality;
            quality.aspect_range = (
                q.aspect_min.unwrap_or(quality.aspect_range.0),
                q.aspect_max.unwrap_or(quality.aspect_range.1),
            );
            quality.face_fraction_range = (
                q.face_fraction_min.unwrap_or(quality.face_fraction_range.0),
                q.face_fraction_max.unwrap_or(quality.face_fraction_range.1),
            );
            if let Some(tolerance) = q.centering_tolerance {
                quality.centering_tolerance = tolerance;
            }
            if let Some(fill) = file.autofix.background_fill {
                config.correction.background_fill = fill;
            }
            for (name, &threshold) in &file.thresholds {
                config = config.with_threshold(name.clone(), threshold);
            }
        }

        // CLI thresholds are applied last so they replace file values.
        for (name, threshold) in &self.thresholds {
            config = config.with_threshold(name.clone(), *threshold);
        }

        config = config.with_autofix(!self.no_autofix);
        if let Some(retries) = self.max_retries {
            config = config.with_max_retries(retries);
        }
        if let Some(ms) = self.deadline_ms {
            config = config.with_deadline(Duration::from_millis(ms));
        }
        if let Some((w, h)) = self.min_resolution {
            config = config.with_min_resolution(w, h);
        }
        if let Some((w, h)) = self.frame {
            let mut frame = FrameTarget::STANDARD.with_size(w, h);
            if let Some(y) = self
                .config
                .as_ref()
                .and_then(|c| c.autofix.frame_face_center_y)
            {
                frame.face_center_y = y;
            }
            config = config.with_output_frame(frame);
        }

        config
    }

    /// Get output format with fallback to JSONL.
    fn format(&self) -> OutputFormat {
        self.format.unwrap_or(OutputFormat::Jsonl)
    }
}

/// Result of running the check command.
#[allow(dead_code)] // Fields exposed for programmatic use
pub struct CheckResult {
    /// Number of photos that produced a decision.
    pub processed: usize,
    /// Number of photos that were unreadable or failed evaluation.
    pub skipped: usize,
    /// Number of decided photos that were not approved.
    pub not_approved: usize,
    /// Exit code.
    pub exit_code: ExitCode,
}

impl CheckResult {
    fn new(processed: usize, skipped: usize, not_approved: usize) -> Self {
        let exit_code = if skipped > 0 {
            ExitCode::Error
        } else if not_approved > 0 {
            ExitCode::NotApproved
        } else {
            ExitCode::Success
        };
        Self {
            processed,
            skipped,
            not_approved,
            exit_code,
        }
    }
}

/// Run the check command.
///
/// Expects `args` to have been processed through `with_config()` first
/// to apply configuration file settings.
pub fn run(args: &CheckArgs) -> Result<CheckResult> {
    info!("Running check command on {} paths", args.paths.len());

    if args.paths.is_empty() {
        anyhow::bail!("No paths specified");
    }

    let source = FsImageSource::new(args.paths.clone(), args.recursive);
    let total = source.count_hint();

    let show_progress = !args.quiet && (args.progress || std::io::stderr().is_terminal());

    let progress_bar = ProgressBar::new(total.map(|t| t as u64), args.quiet, show_progress);

    let output = JsonOutput::stdout();

    let pipeline = Pipeline::new(build_registry(args));
    let config = args.validation_config();
    debug!(?config, "Validation config");

    let (result, batch) =
        process_photos(&source, &pipeline, &config, &output, &progress_bar, args)?;

    // For JSON format, output all results as one array
    if matches!(args.format(), OutputFormat::Json) {
        output.write_array(&batch, args.pretty)?;
    }
    output.flush()?;

    Ok(result)
}

/// Build the detector registry from the installed models.
fn build_registry(args: &CheckArgs) -> DetectorRegistry {
    if args.no_detectors {
        info!("Detectors disabled, running geometry and quality checks only");
        return DetectorRegistry::new();
    }

    let dir = args.models_dir.clone().unwrap_or_else(models_dir);
    debug!("Using models directory: {}", dir.display());
    let registry = DetectorRegistry::standard(load_standard_models(&dir));
    if registry.is_empty() {
        warn!(
            "No detector models installed in {}; only geometry and quality are checked",
            dir.display()
        );
    }
    registry
}

/// Run every photo from `source` through the pipeline.
///
/// JSONL results are written as they are produced; for JSON output they
/// are returned for the caller to write as one array.
fn process_photos(
    source: &dyn ImageSource,
    pipeline: &Pipeline,
    config: &ValidationConfig,
    output: &dyn ResultOutput,
    progress: &dyn ProgressSink,
    args: &CheckArgs,
) -> Result<(CheckResult, Vec<PhotoResult>)> {
    let total = source.count_hint();
    let mut processed = 0usize;
    let mut skipped = 0usize;
    let mut not_approved = 0usize;
    let mut all_results: Vec<PhotoResult> = Vec::new();
    let mut writer = args.output_dir.as_deref().map(CorrectedWriter::new);

    for (index, photo) in source.images().enumerate() {
        let photo = match photo {
            Ok(photo) => photo,
            Err(e) => {
                // The message carries the path via anyhow context.
                progress.on_event(ProgressEvent::Skipped {
                    path: format!("photo {index}"),
                    reason: format!("{e:#}"),
                });
                skipped += 1;
                continue;
            }
        };

        let path = photo.path.clone();
        progress.on_event(ProgressEvent::Started {
            path: path.clone(),
            index,
            total,
        });

        let dimensions = Image::probe_dimensions(&photo.bytes, photo.format)
            .ok()
            .map(|(w, h)| ImageDimensions::new(w, h));

        let validated = pipeline
            .validate(&photo.bytes, photo.format, config)
            .map_err(|e| ErrorRecord::from(&e))
            .and_then(|decision| {
                let corrected_image = match (&decision.corrected_image, writer.as_mut()) {
                    (Some(image), Some(writer)) => {
                        Some(writer.write(&path, image).map_err(|e| ErrorRecord {
                            kind: "io".to_string(),
                            message: format!("{e:#}"),
                        })?)
                    }
                    _ => None,
                };
                Ok((decision, corrected_image))
            });

        let outcome = match validated {
            Ok((decision, corrected_image)) => {
                if !decision.is_approved() {
                    not_approved += 1;
                }
                processed += 1;
                progress.on_event(ProgressEvent::Completed {
                    path: path.clone(),
                    status: decision.status,
                });
                Outcome::Decision {
                    decision: decision.to_record(),
                    corrected_image,
                }
            }
            Err(error) => {
                warn!("Could not evaluate {path}: {}", error.message);
                skipped += 1;
                progress.on_event(ProgressEvent::Skipped {
                    path: path.clone(),
                    reason: error.message.clone(),
                });
                Outcome::Error { error }
            }
        };

        let result = PhotoResult {
            path,
            timestamp: iso_timestamp(),
            dimensions,
            outcome,
        };

        match args.format() {
            OutputFormat::Jsonl => output.write(&result)?,
            OutputFormat::Json => all_results.push(result),
        }
    }

    progress.on_event(ProgressEvent::Finished { processed, skipped });

    Ok((
        CheckResult::new(processed, skipped, not_approved),
        all_results,
    ))
}

/// Writes corrected photos of one batch into a directory.
///
/// Files are named `<stem>.corrected.png`; a stem already written in this
/// batch gets a `-2`, `-3`, ... suffix so no photo overwrites another.
struct CorrectedWriter<'a> {
    dir: &'a Path,
    written: HashSet<PathBuf>,
}

impl<'a> CorrectedWriter<'a> {
    fn new(dir: &'a Path) -> Self {
        Self {
            dir,
            written: HashSet::new(),
        }
    }

    fn target(&self, source_path: &str) -> PathBuf {
        let stem = Path::new(source_path)
            .file_stem()
            .map_or_else(|| "photo".into(), |s| s.to_string_lossy());
        let mut target = self.dir.join(format!("{stem}.corrected.png"));
        let mut n = 2u32;
        while self.written.contains(&target) {
            target = self.dir.join(format!("{stem}-{n}.corrected.png"));
            n += 1;
        }
        target
    }

    fn write(&mut self, source_path: &str, image: &Image) -> Result<CorrectedImageRecord> {
        fs::create_dir_all(self.dir).with_context(|| {
            format!("Failed to create output directory {}", self.dir.display())
        })?;

        let target = self.target(source_path);
        let bytes = image
            .encode_png()
            .with_context(|| format!("Failed to encode corrected {source_path}"))?;
        fs::write(&target, bytes)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        debug!("Wrote corrected photo to {}", target.display());

        let record = CorrectedImageRecord {
            path: target.display().to_string(),
            format: "png".to_string(),
            width: image.width(),
            height: image.height(),
        };
        self.written.insert(target);
        Ok(record)
    }
}

/// Generate ISO 8601 UTC timestamp (RFC 3339 format).
fn iso_timestamp() -> String {
    match time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339) {
        Ok(ts) => ts,
        Err(e) => {
            debug!("Timestamp format failed: {e}");
            String::from("1970-01-01T00:00:00Z")
        }
    }
}
