//! Screen and check commands - gate and screen eye photographs.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use eyenemia_adapters::{collect_inputs, models_dir, FsAssetStore, ModelRegistry};
use eyenemia_core::inference::CandleModelLoader;
use eyenemia_core::{
    AlphaFlatten, AssetStore, ClassificationConfig, ImageDimensions, PipelineConfig,
    ProgressEvent, ProgressSink, QualityConfig, QualityError, QualityGate, QualityVerdict,
    ResultOutput, ScreeningError, ScreeningReport, ScreeningService, SegmentationConfig,
    VerdictSummary,
};
use tracing::{debug, info, warn};

use super::ExitCode;
use crate::config::AppConfig;
use crate::output::{JsonOutput, OutputFormat, ProgressBar};

/// Matte colour used when the config selects matte flattening without a colour.
const DEFAULT_MATTE: [u8; 3] = [255, 255, 255];

/// What the command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Quality gate only.
    Check,
    /// Quality gate, then the screening pipeline.
    Screen,
}

/// Parse and validate a threshold value (0.0-1.0).
fn parse_threshold(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not in 0.0..=1.0"))
    }
}

/// Parse a non-negative sharpness threshold.
fn parse_blur_threshold(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(format!("{value} must be a non-negative number"))
    }
}

/// Shared arguments for `screen` and `check`.
#[derive(Args, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct ScreenArgs {
    /// Files or directories to screen
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Recurse into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Laplacian-variance sharpness threshold (default 50)
    #[arg(long, value_parser = parse_blur_threshold)]
    pub blur_threshold: Option<f64>,

    /// Minimum eye-region detection confidence (0.0-1.0)
    #[arg(long, value_parser = parse_threshold)]
    pub confidence: Option<f32>,

    /// Custom models directory (overrides default and config)
    #[arg(long, value_name = "DIR")]
    pub models_dir: Option<PathBuf>,

    /// Directory uploads are staged into
    #[arg(long, value_name = "DIR")]
    pub upload_dir: Option<PathBuf>,

    /// Run inference on the CPU
    #[arg(long)]
    pub cpu: bool,

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

    /// Merged config (populated by `with_config`, not from CLI).
    #[arg(skip)]
    config: Option<AppConfig>,
}

impl ScreenArgs {
    /// Apply configuration file values, respecting CLI precedence.
    ///
    /// Layering priority (lowest to highest):
    /// 1. Hardcoded defaults (in accessor methods)
    /// 2. Config file values (XDG, then project-local)
    /// 3. CLI arguments (already set on self)
    pub fn with_config(mut args: Self, config: &AppConfig) -> Self {
        if !args.recursive {
            args.recursive = config.general.recursive.unwrap_or(false);
        }

        args.blur_threshold = args.blur_threshold.or(config.quality.blur_threshold);
        args.confidence = args.confidence.or(config.segmentation.confidence);

        if args.format.is_none() {
            args.format = config
                .output
                .format
                .as_deref()
                .and_then(OutputFormat::from_config);
        }
        if !args.pretty {
            args.pretty = config.output.pretty.unwrap_or(false);
        }
        if !args.progress {
            args.progress = config.output.progress.unwrap_or(false);
        }
        if !args.cpu {
            args.cpu = config.models.force_cpu.unwrap_or(false);
        }

        if args.models_dir.is_none() {
            args.models_dir.clone_from(&config.models.dir);
        }
        if args.upload_dir.is_none() {
            args.upload_dir.clone_from(&config.storage.upload_dir);
        }

        args.config = Some(config.clone());

        args
    }

    /// Quality gate settings with fallback to hardcoded defaults.
    fn quality_config(&self) -> QualityConfig {
        let defaults = QualityConfig::default();
        let quality = self.config.as_ref().map(|c| &c.quality);
        QualityConfig {
            min_width: quality.and_then(|q| q.min_width).unwrap_or(defaults.min_width),
            min_height: quality
                .and_then(|q| q.min_height)
                .unwrap_or(defaults.min_height),
            max_width: quality.and_then(|q| q.max_width).unwrap_or(defaults.max_width),
            max_height: quality
                .and_then(|q| q.max_height)
                .unwrap_or(defaults.max_height),
            blur_threshold: self.blur_threshold.unwrap_or(defaults.blur_threshold),
            ..defaults
        }
    }

    /// Pipeline settings with fallback to hardcoded defaults.
    fn pipeline_config(&self) -> PipelineConfig {
        let config = self.config.as_ref();
        let segmentation_defaults = SegmentationConfig::default();
        let classification_defaults = ClassificationConfig::default();

        let flatten = match config.and_then(|c| c.classification.flatten.as_deref()) {
            Some("matte") => AlphaFlatten::Matte(
                config
                    .and_then(|c| c.classification.matte_color)
                    .unwrap_or(DEFAULT_MATTE),
            ),
            _ => AlphaFlatten::Discard,
        };

        PipelineConfig {
            segmentation: SegmentationConfig {
                confidence: self
                    .confidence
                    .unwrap_or(segmentation_defaults.confidence),
                mask_threshold: config
                    .and_then(|c| c.segmentation.mask_threshold)
                    .unwrap_or(segmentation_defaults.mask_threshold),
            },
            classification: ClassificationConfig {
                input_size: config
                    .and_then(|c| c.classification.input_size)
                    .unwrap_or(classification_defaults.input_size),
                flatten,
            },
        }
    }

    /// Get output format with fallback to JSONL.
    fn format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }

    /// Models directory with fallback to the data directory.
    fn models_dir(&self) -> PathBuf {
        self.models_dir.clone().unwrap_or_else(models_dir)
    }

    /// Upload directory with fallback to the cache directory.
    fn upload_dir(&self) -> PathBuf {
        self.upload_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("eyenemia")
                .join("uploads")
        })
    }
}

/// Result of running the screen or check command.
#[allow(dead_code)] // Fields exposed for programmatic use
pub struct ScreenResult {
    /// Images that passed the gate (check) or received a class (screen).
    pub diagnosed: usize,
    /// Images rejected by the quality gate.
    pub rejected: usize,
    /// Images with no region, failed classification, or errors.
    pub undiagnosed: usize,
    /// Exit code.
    pub exit_code: ExitCode,
}

/// Tally of per-image outcomes.
#[derive(Default)]
struct Tally {
    diagnosed: usize,
    rejected: usize,
    undiagnosed: usize,
}

impl Tally {
    fn record(&mut self, mode: Mode, report: &ScreeningReport) {
        if report.is_rejected() {
            self.rejected += 1;
        } else if report.error.is_some() {
            self.undiagnosed += 1;
        } else if mode == Mode::Check || report.is_diagnosed() {
            self.diagnosed += 1;
        } else {
            self.undiagnosed += 1;
        }
    }
}

/// Run the screen or check command.
///
/// Expects `args` to have been processed through `with_config()` first
/// to apply configuration file settings.
pub fn run(args: &ScreenArgs, mode: Mode) -> Result<ScreenResult> {
    info!("Running {mode:?} on {} paths", args.paths.len());

    if args.paths.is_empty() {
        anyhow::bail!("No paths specified");
    }

    let store = FsAssetStore::new(args.upload_dir())?;
    debug!("Staging uploads in {}", store.root().display());

    let service = ScreeningService::new(
        QualityGate::new(args.quality_config()),
        args.pipeline_config(),
        Box::new(store.clone()),
    );

    if mode == Mode::Screen {
        let registry = ModelRegistry::new(args.models_dir());
        debug!("Using models directory: {}", registry.dir().display());
        let loader = CandleModelLoader::detect(args.cpu);
        service
            .initialize(&loader, &registry.paths())
            .with_context(|| format!("Cannot screen with models from {}", registry.dir().display()))?;
    }

    let inputs = collect_inputs(&args.paths, args.recursive);

    let show_progress = !args.quiet && (args.progress || std::io::stderr().is_terminal());
    let progress = ProgressBar::new(Some(inputs.len() as u64), args.quiet, show_progress);
    let output = JsonOutput::stdout(args.format(), args.pretty);

    let tally = process_inputs(&service, &store, &inputs, mode, &output, &progress)?;
    output.finish()?;

    let exit_code = if tally.rejected + tally.undiagnosed > 0 {
        ExitCode::NotDiagnosed
    } else {
        ExitCode::Success
    };

    Ok(ScreenResult {
        diagnosed: tally.diagnosed,
        rejected: tally.rejected,
        undiagnosed: tally.undiagnosed,
        exit_code,
    })
}

/// Stage, gate and (in screen mode) screen every input, reporting as it goes.
fn process_inputs(
    service: &ScreeningService,
    store: &FsAssetStore,
    inputs: &[PathBuf],
    mode: Mode,
    output: &dyn ResultOutput,
    progress: &dyn ProgressSink,
) -> Result<Tally> {
    let total = inputs.len();
    let mut tally = Tally::default();

    for (index, input) in inputs.iter().enumerate() {
        let display = input.display().to_string();
        progress.on_event(ProgressEvent::Started {
            path: display.clone(),
            index,
            total: Some(total),
        });

        let staged = match store.ingest(input) {
            Ok(staged) => staged,
            Err(e) => {
                progress.on_event(ProgressEvent::Skipped {
                    path: display,
                    reason: format!("{e:#}"),
                });
                tally.undiagnosed += 1;
                continue;
            }
        };

        let report = match mode {
            Mode::Check => check_one(service, store, &display, &staged),
            Mode::Screen => screen_one(service, &display, &staged),
        };
        tally.record(mode, &report);

        output.write(&report)?;
        progress.on_event(ProgressEvent::Completed { report });
    }

    output.flush()?;
    progress.on_event(ProgressEvent::Finished {
        diagnosed: tally.diagnosed,
        rejected: tally.rejected,
        undiagnosed: tally.undiagnosed,
    });

    Ok(tally)
}

/// Gate one staged upload. Accepted copies are removed; `check` keeps nothing.
fn check_one(
    service: &ScreeningService,
    store: &FsAssetStore,
    display: &str,
    staged: &Path,
) -> ScreeningReport {
    let mut report = ScreeningReport::new(display, iso_timestamp());
    match service.check(staged) {
        Ok(admitted) => {
            report.dimensions = Some(admitted.asset.dimensions());
            report.quality = Some(admitted.verdict);
            if let Err(e) = store.delete(staged) {
                warn!("Failed to remove staged copy {}: {e:#}", staged.display());
            }
        }
        Err(e) => record_error(&mut report, e),
    }
    report
}

/// Screen one staged upload end to end.
fn screen_one(service: &ScreeningService, display: &str, staged: &Path) -> ScreeningReport {
    let mut report = ScreeningReport::new(display, iso_timestamp());
    match service.screen(staged) {
        Ok(screening) => {
            report.dimensions = Some(screening.admitted.asset.dimensions());
            report.quality = Some(screening.admitted.verdict);
            report.verdict = Some(VerdictSummary::from(&screening.verdict));
        }
        Err(e) => record_error(&mut report, e),
    }
    report
}

fn record_error(report: &mut ScreeningReport, error: ScreeningError) {
    match error {
        ScreeningError::Rejected(rejection) => {
            report.dimensions = rejected_dimensions(&rejection);
            report.quality = Some(QualityVerdict::rejected(&rejection));
        }
        other => {
            warn!("{}: {other:#}", report.path);
            report.error = Some(format!("{:#}", anyhow::Error::new(other)));
        }
    }
}

const fn rejected_dimensions(rejection: &QualityError) -> Option<ImageDimensions> {
    match rejection {
        QualityError::TooSmall { width, height, .. } | QualityError::TooLarge { width, height, .. } => {
            Some(ImageDimensions::new(*width, *height))
        }
        _ => None,
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

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use eyenemia_core::ModelSet;
    use eyenemia_test_support::{
        MockClassifier, MockProgressSink, MockResultOutput, MockSegmenter, SyntheticImageBuilder,
    };
    use std::sync::Arc;
    use tempfile::TempDir;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: ScreenArgs,
    }

    fn parse(argv: &[&str]) -> ScreenArgs {
        let mut full = vec!["eyenemia"];
        full.extend_from_slice(argv);
        Harness::try_parse_from(full).map(|h| h.args).unwrap_or_else(|e| panic!("{e}"))
    }

    fn config(toml: &str) -> AppConfig {
        toml::from_str(toml).unwrap_or_else(|e| panic!("{e}"))
    }

    #[test]
    fn test_defaults_without_config() {
        let args = ScreenArgs::with_config(parse(&["eye.png"]), &AppConfig::default());
        assert_eq!(args.quality_config(), QualityConfig::default());
        assert_eq!(args.pipeline_config(), PipelineConfig::default());
        assert_eq!(args.format(), OutputFormat::Jsonl);
    }

    #[test]
    fn test_cli_overrides_config() {
        let cfg = config(
            r"
[quality]
blur_threshold = 80.0

[segmentation]
confidence = 0.6

[output]
format = 'json'
",
        );
        let args = ScreenArgs::with_config(
            parse(&["--blur-threshold", "20", "--format", "jsonl", "eye.png"]),
            &cfg,
        );
        assert!((args.quality_config().blur_threshold - 20.0).abs() < f64::EPSILON);
        assert!((args.pipeline_config().segmentation.confidence - 0.6).abs() < f32::EPSILON);
        assert_eq!(args.format(), OutputFormat::Jsonl);
    }

    #[test]
    fn test_config_builds_matte_flatten() {
        let cfg = config(
            r"
[classification]
input_size = 256
flatten = 'matte'
matte_color = [10, 20, 30]
",
        );
        let pipeline = ScreenArgs::with_config(parse(&["eye.png"]), &cfg).pipeline_config();
        assert_eq!(pipeline.classification.input_size, 256);
        assert_eq!(pipeline.classification.flatten, AlphaFlatten::Matte([10, 20, 30]));
    }

    #[test]
    fn test_config_dimension_bounds() {
        let cfg = config(
            r"
[quality]
min_width = 300
max_height = 2000
",
        );
        let quality = ScreenArgs::with_config(parse(&["eye.png"]), &cfg).quality_config();
        assert_eq!(quality.min_width, 300);
        assert_eq!(quality.min_height, 120);
        assert_eq!(quality.max_height, 2000);
    }

    #[test]
    fn test_threshold_parsers() {
        assert!(parse_threshold("0.3").is_ok());
        assert_eq!(parse_threshold("1.5").unwrap_err(), "1.5 is not in 0.0..=1.0");
        assert!(parse_blur_threshold("0").is_ok());
        assert!(parse_blur_threshold("-3").is_err());
        assert!(parse_blur_threshold("abc").is_err());
    }

    #[test]
    fn test_tally_counts() {
        let mut tally = Tally::default();
        let accepted = {
            let mut r = ScreeningReport::new("a", "t");
            r.quality = Some(QualityVerdict::accepted(100.0));
            r
        };
        tally.record(Mode::Check, &accepted);
        tally.record(Mode::Screen, &accepted);
        assert_eq!((tally.diagnosed, tally.undiagnosed), (1, 1));

        let mut failed = ScreeningReport::new("b", "t");
        failed.error = Some("boom".into());
        tally.record(Mode::Screen, &failed);
        assert_eq!(tally.undiagnosed, 2);
    }

    #[test]
    fn test_rejected_dimensions() {
        let small = QualityError::TooSmall {
            width: 40,
            height: 30,
            min_width: 120,
            min_height: 120,
        };
        assert_eq!(rejected_dimensions(&small), Some(ImageDimensions::new(40, 30)));
        let blurry = QualityError::Blurry {
            score: 1.0,
            threshold: 50.0,
        };
        assert_eq!(rejected_dimensions(&blurry), None);
    }

    fn inputs(dir: &TempDir) -> Vec<PathBuf> {
        let sharp = dir.path().join("sharp.png");
        SyntheticImageBuilder::eye_photo(320, 240)
            .image
            .save(&sharp)
            .unwrap_or_else(|e| panic!("{e}"));
        let tiny = dir.path().join("tiny.png");
        SyntheticImageBuilder::checkerboard(40, 40)
            .image
            .save(&tiny)
            .unwrap_or_else(|e| panic!("{e}"));
        vec![sharp, tiny, dir.path().join("vanished.png")]
    }

    fn service(store: &FsAssetStore, classifier: MockClassifier) -> ScreeningService {
        let models = ModelSet::new(Box::new(MockSegmenter::full_frame(0.9)), Box::new(classifier));
        ScreeningService::new(
            QualityGate::default(),
            PipelineConfig::default(),
            Box::new(store.clone()),
        )
        .with_models(Arc::new(models))
    }

    #[test]
    fn test_process_inputs_check_mode() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("{e}"));
        let store = FsAssetStore::new(dir.path().join("uploads")).unwrap_or_else(|e| panic!("{e}"));
        let service = service(&store, MockClassifier::returning(vec![0.2, 0.8]));
        let output = MockResultOutput::new();
        let progress = MockProgressSink::new();

        let tally = process_inputs(
            &service,
            &store,
            &inputs(&dir),
            Mode::Check,
            &output,
            &progress,
        )
        .unwrap_or_else(|e| panic!("{e}"));

        assert_eq!((tally.diagnosed, tally.rejected, tally.undiagnosed), (1, 1, 1));
        assert_eq!(progress.started_count(), 3);
        assert_eq!(progress.completed_count(), 2);
        assert_eq!(progress.skipped_count(), 1);
        assert_eq!(progress.finished_counts(), Some((1, 1, 1)));
        assert_eq!(output.flush_count(), 1);

        let reports = output.reports();
        assert_eq!(reports.len(), 2);
        assert!(reports[0].verdict.is_none());
        assert!(reports[1].is_rejected());
        assert_eq!(std::fs::read_dir(store.root()).map(Iterator::count).ok(), Some(0));
    }

    #[test]
    fn test_process_inputs_screen_mode() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("{e}"));
        let store = FsAssetStore::new(dir.path().join("uploads")).unwrap_or_else(|e| panic!("{e}"));
        let service = service(&store, MockClassifier::returning(vec![0.2, 0.8]));
        let output = MockResultOutput::new();
        let progress = MockProgressSink::new();

        let tally = process_inputs(
            &service,
            &store,
            &inputs(&dir)[..1],
            Mode::Screen,
            &output,
            &progress,
        )
        .unwrap_or_else(|e| panic!("{e}"));

        assert_eq!((tally.diagnosed, tally.rejected, tally.undiagnosed), (1, 0, 0));
        let report = &output.reports()[0];
        assert!(report.is_diagnosed());
        let verdict = report.verdict.as_ref().unwrap_or_else(|| panic!("verdict"));
        assert_eq!(verdict.label, "Normal");
        assert!((verdict.confidence - 0.8).abs() < 1e-6);
        assert!(store.root().join("sharp.png").exists());
    }

    #[test]
    fn test_process_inputs_classification_failure_is_undiagnosed() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("{e}"));
        let store = FsAssetStore::new(dir.path().join("uploads")).unwrap_or_else(|e| panic!("{e}"));
        let service = service(&store, MockClassifier::failing("device lost"));
        let output = MockResultOutput::new();

        let tally = process_inputs(
            &service,
            &store,
            &inputs(&dir)[..1],
            Mode::Screen,
            &output,
            &MockProgressSink::new(),
        )
        .unwrap_or_else(|e| panic!("{e}"));

        assert_eq!(tally.undiagnosed, 1);
        let report = &output.reports()[0];
        assert!(report
            .error
            .as_deref()
            .is_some_and(|e| e.contains("classification failed") && e.contains("device lost")));
    }
}
