//! Configuration file support for idcheck.
//!
//! Supports TOML configuration from:
//! - XDG config: `~/.config/idcheck/config.toml` (lowest priority)
//! - Project-local: `.idcheck.toml` (searched up directory tree)
//! - CLI flags (highest priority, applied separately)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

/// Top-level configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General options.
    pub general: GeneralConfig,
    /// Rejection threshold overrides by finding name.
    pub thresholds: BTreeMap<String, f32>,
    /// Geometry and quality settings.
    pub quality: QualitySection,
    /// Automatic correction settings.
    pub autofix: AutofixConfig,
    /// Pipeline execution settings.
    pub pipeline: PipelineConfig,
    /// Model settings.
    pub models: ModelsConfig,
    /// Output formatting settings.
    pub output: OutputConfig,
}

/// General configuration options.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Recurse into subdirectories by default.
    pub recursive: Option<bool>,
}

/// Geometry and quality configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct QualitySection {
    /// Minimum width in pixels.
    pub min_width: Option<u32>,
    /// Minimum height in pixels.
    pub min_height: Option<u32>,
    /// Lower bound of the accepted aspect ratio (width / height).
    pub aspect_min: Option<f32>,
    /// Upper bound of the accepted aspect ratio.
    pub aspect_max: Option<f32>,
    /// Lower bound of the accepted face height fraction.
    pub face_fraction_min: Option<f32>,
    /// Upper bound of the accepted face height fraction.
    pub face_fraction_max: Option<f32>,
    /// Centre offset, as a fraction of the frame, tolerated before the
    /// centring finding reaches its threshold.
    pub centering_tolerance: Option<f32>,
}

/// Automatic correction configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AutofixConfig {
    /// Enable/disable automatic correction.
    pub enabled: Option<bool>,
    /// Correction attempts before escalating to rejection.
    pub max_retries: Option<u32>,
    /// Fill colour for replaced background and uncovered margins.
    pub background_fill: Option<[u8; 3]>,
    /// Output frame `[width, height]` corrected photos are fitted to.
    pub frame: Option<[u32; 2]>,
    /// Face centre y in the output frame, as a fraction of its height.
    pub frame_face_center_y: Option<f32>,
}

/// Pipeline execution configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Per-photo deadline in milliseconds.
    pub deadline_ms: Option<u64>,
}

/// Model configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Custom models directory path.
    pub dir: Option<PathBuf>,
    /// Enable/disable the model-based detectors.
    pub enabled: Option<bool>,
}

/// Output formatting configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: "json" or "jsonl".
    pub format: Option<String>,
    /// Pretty-print JSON output.
    pub pretty: Option<bool>,
    /// Show progress bar.
    pub progress: Option<bool>,
    /// Directory for corrected images.
    pub dir: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from XDG and project-local files.
    ///
    /// Priority (lowest to highest):
    /// 1. XDG config: `~/.config/idcheck/config.toml`
    /// 2. Project-local: `.idcheck.toml` (searched up from cwd)
    ///
    /// Missing files are silently ignored. Invalid values are logged as warnings.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(xdg_path) = xdg_config_path() {
            if xdg_path.exists() {
                info!("Loading XDG config: {}", xdg_path.display());
                if let Some(xdg_config) = load_file(&xdg_path) {
                    config = xdg_config;
                }
            } else {
                debug!("XDG config not found: {}", xdg_path.display());
            }
        }

        if let Some(project_path) = find_project_config() {
            info!("Loading project config: {}", project_path.display());
            if let Some(project_config) = load_file(&project_path) {
                config.merge(project_config);
            }
        }

        if let Err(e) = config.validate() {
            eprintln!("warning: {e}");
        }

        config
    }

    /// Validate configuration values are within acceptable ranges.
    fn validate(&self) -> Result<(), String> {
        for (name, &t) in &self.thresholds {
            if !(0.0..=1.0).contains(&t) {
                return Err(format!("thresholds.{name} must be 0.0-1.0, got {t}"));
            }
        }

        let q = &self.quality;
        for (key, value) in [
            ("quality.face_fraction_min", q.face_fraction_min),
            ("quality.face_fraction_max", q.face_fraction_max),
            ("quality.centering_tolerance", q.centering_tolerance),
        ] {
            if let Some(v) = value {
                if !(0.0..=1.0).contains(&v) {
                    return Err(format!("{key} must be 0.0-1.0, got {v}"));
                }
            }
        }
        if let (Some(lo), Some(hi)) = (q.aspect_min, q.aspect_max) {
            if lo <= 0.0 || lo >= hi {
                return Err(format!(
                    "quality.aspect_min must be positive and below quality.aspect_max, got {lo} and {hi}"
                ));
            }
        }
        if let (Some(lo), Some(hi)) = (q.face_fraction_min, q.face_fraction_max) {
            if lo >= hi {
                return Err(format!(
                    "quality.face_fraction_min must be below quality.face_fraction_max, got {lo} and {hi}"
                ));
            }
        }

        if let Some([w, h]) = self.autofix.frame {
            if w == 0 || h == 0 {
                return Err(format!(
                    "autofix.frame must be non-zero in both dimensions, got [{w}, {h}]"
                ));
            }
        }
        if let Some(y) = self.autofix.frame_face_center_y {
            if !(0.0..=1.0).contains(&y) {
                return Err(format!("autofix.frame_face_center_y must be 0.0-1.0, got {y}"));
            }
        }

        if self.pipeline.deadline_ms == Some(0) {
            return Err("pipeline.deadline_ms must be greater than 0".to_string());
        }

        if let Some(ref f) = self.output.format {
            if f != "json" && f != "jsonl" {
                return Err(format!(
                    "output.format must be 'json' or 'jsonl', got '{f}'"
                ));
            }
        }

        Ok(())
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` when present.
    fn merge(&mut self, other: Self) {
        self.general.recursive = other.general.recursive.or(self.general.recursive);

        self.thresholds.extend(other.thresholds);

        let q = other.quality;
        self.quality.min_width = q.min_width.or(self.quality.min_width);
        self.quality.min_height = q.min_height.or(self.quality.min_height);
        self.quality.aspect_min = q.aspect_min.or(self.quality.aspect_min);
        self.quality.aspect_max = q.aspect_max.or(self.quality.aspect_max);
        self.quality.face_fraction_min = q.face_fraction_min.or(self.quality.face_fraction_min);
        self.quality.face_fraction_max = q.face_fraction_max.or(self.quality.face_fraction_max);
        self.quality.centering_tolerance =
            q.centering_tolerance.or(self.quality.centering_tolerance);

        self.autofix.enabled = other.autofix.enabled.or(self.autofix.enabled);
        self.autofix.max_retries = other.autofix.max_retries.or(self.autofix.max_retries);
        self.autofix.background_fill = other
            .autofix
            .background_fill
            .or(self.autofix.background_fill);
        self.autofix.frame = other.autofix.frame.or(self.autofix.frame);
        self.autofix.frame_face_center_y = other
            .autofix
            .frame_face_center_y
            .or(self.autofix.frame_face_center_y);

        self.pipeline.deadline_ms = other.pipeline.deadline_ms.or(self.pipeline.deadline_ms);

        self.models.dir = other.models.dir.or_else(|| self.models.dir.take());
        self.models.enabled = other.models.enabled.or(self.models.enabled);

        self.output.format = other.output.format.or_else(|| self.output.format.take());
        self.output.pretty = other.output.pretty.or(self.output.pretty);
        self.output.progress = other.output.progress.or(self.output.progress);
        self.output.dir = other.output.dir.or_else(|| self.output.dir.take());
    }
}

/// Get the XDG config file path.
fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("idcheck").join("config.toml"))
}

/// Find project-local config by searching up from current directory.
fn find_project_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_parents(&cwd)
}

/// Search for `.idcheck.toml` in the given directory and its parents.
fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);

    while let Some(dir) = current {
        let config_path = dir.join(".idcheck.toml");
        if config_path.exists() {
            return Some(config_path);
        }
        current = dir.parent();
    }

    None
}

/// Load and parse a TOML config file.
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to read config file {}: {}", path.display(), e);
            return None;
        }
    };

    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.thresholds.is_empty());
        assert!(config.autofix.enabled.is_none());
        assert!(config.pipeline.deadline_ms.is_none());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: AppConfig = toml::from_str("").expect("parse empty config");
        assert!(config.general.recursive.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r"
[general]
recursive = true

[thresholds]
occlusion = 0.7
centering = 0.6

[quality]
min_width = 600
min_height = 800
aspect_min = 0.7
aspect_max = 0.8
face_fraction_min = 0.3
face_fraction_max = 0.6
centering_tolerance = 0.04

[autofix]
enabled = false
max_retries = 2
background_fill = [250, 250, 250]
frame = [480, 640]
frame_face_center_y = 0.52

[pipeline]
deadline_ms = 1500

[models]
dir = '/opt/idcheck/models'
enabled = true

[output]
format = 'json'
pretty = true
progress = false
dir = 'corrected'
";
        let config: AppConfig = toml::from_str(toml).expect("parse full config");

        assert_eq!(config.general.recursive, Some(true));
        assert_eq!(config.thresholds.get("occlusion"), Some(&0.7));
        assert_eq!(config.quality.min_height, Some(800));
        assert_eq!(config.quality.centering_tolerance, Some(0.04));
        assert_eq!(config.autofix.enabled, Some(false));
        assert_eq!(config.autofix.background_fill, Some([250, 250, 250]));
        assert_eq!(config.autofix.frame, Some([480, 640]));
        assert_eq!(config.pipeline.deadline_ms, Some(1500));
        assert_eq!(
            config.models.dir,
            Some(PathBuf::from("/opt/idcheck/models"))
        );
        assert_eq!(config.output.format, Some("json".to_string()));
        assert_eq!(config.output.dir, Some(PathBuf::from("corrected")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_configs() {
        let mut base: AppConfig = toml::from_str(
            r"
[thresholds]
occlusion = 0.5
dress_code = 0.6

[autofix]
max_retries = 1
",
        )
        .expect("parse base");

        let override_config: AppConfig = toml::from_str(
            r"
[thresholds]
occlusion = 0.8

[pipeline]
deadline_ms = 500
",
        )
        .expect("parse override");

        base.merge(override_config);

        assert_eq!(base.thresholds.get("occlusion"), Some(&0.8));
        assert_eq!(base.thresholds.get("dress_code"), Some(&0.6));
        assert_eq!(base.autofix.max_retries, Some(1));
        assert_eq!(base.pipeline.deadline_ms, Some(500));
    }

    #[test]
    fn test_merge_empty_override_preserves_base() {
        let mut base: AppConfig = toml::from_str(
            r"
[output]
format = 'json'
",
        )
        .expect("parse base");

        base.merge(AppConfig::default());

        assert_eq!(base.output.format, Some("json".to_string()));
    }

    #[test]
    fn test_invalid_toml_syntax_handled() {
        let toml = r"
[autofix
enabled = true
";
        let result: Result<AppConfig, _> = toml::from_str(toml);
        assert!(result.is_err(), "invalid TOML should return error");
    }

    #[test]
    fn test_invalid_field_type_handled() {
        let toml = r#"
[pipeline]
deadline_ms = "soon"
"#;
        let result: Result<AppConfig, _> = toml::from_str(toml);
        assert!(result.is_err(), "type mismatch should return error");
    }

    #[test]
    fn test_validate_threshold_out_of_range() {
        let mut config = AppConfig::default();
        config.thresholds.insert("occlusion".into(), 1.5);

        let result = config.validate();
        assert!(result.unwrap_err().contains("thresholds.occlusion"));
    }

    #[test]
    fn test_validate_inverted_aspect_range() {
        let mut config = AppConfig::default();
        config.quality.aspect_min = Some(0.9);
        config.quality.aspect_max = Some(0.8);

        assert!(config.validate().unwrap_err().contains("quality.aspect_min"));
    }

    #[test]
    fn test_validate_zero_deadline() {
        let mut config = AppConfig::default();
        config.pipeline.deadline_ms = Some(0);

        assert!(config
            .validate()
            .unwrap_err()
            .contains("pipeline.deadline_ms"));
    }

    #[test]
    fn test_validate_empty_frame() {
        let mut config = AppConfig::default();
        config.autofix.frame = Some([480, 0]);

        assert!(config.validate().unwrap_err().contains("autofix.frame"));
    }

    #[test]
    fn test_validate_output_format_invalid() {
        let mut config = AppConfig::default();
        config.output.format = Some("xml".to_string());

        assert!(config.validate().unwrap_err().contains("output.format"));
    }

    #[test]
    fn test_find_config_in_parents() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(".idcheck.toml"), "").unwrap();

        let found = find_config_in_parents(&nested).unwrap();
        assert_eq!(found, dir.path().join(".idcheck.toml"));
    }
}
