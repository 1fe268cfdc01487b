//! Configuration system for InsightForge.
//!
//! Uses `figment` for layered configuration: defaults -> user config ->
//! workspace config -> explicit file -> environment. CLI flags are applied by
//! the binary on top of the extracted value.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Name of the workspace-local configuration directory.
pub const WORKSPACE_CONFIG_DIR: &str = ".insightforge";

/// Top-level configuration for a reporting run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForgeConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub cleaning: CleaningConfig,
    #[serde(default)]
    pub insights: InsightsConfig,
    #[serde(default)]
    pub charts: ChartsConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

/// Where tabular input is read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Directory scanned for `*.csv`, `*.xlsx` and `*.json` files.
    #[serde(default = "default_input_dir")]
    pub dir: PathBuf,
    /// Optional SQLite table appended to the file-based input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqlite: Option<SqliteInput>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            dir: default_input_dir(),
            sqlite: None,
        }
    }
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("data").join("input")
}

/// A table inside an SQLite database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteInput {
    pub db_path: PathBuf,
    pub table: String,
}

/// Where generated artifacts are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// Also write the cleaned table as `cleaned_dataset.csv`.
    #[serde(default = "default_true")]
    pub export_cleaned_csv: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            export_cleaned_csv: true,
        }
    }
}

impl OutputConfig {
    pub fn charts_dir(&self) -> PathBuf {
        self.dir.join("charts")
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data").join("output")
}

/// Null-normalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Sentinel written into absent cells of non-numeric, non-temporal columns.
    #[serde(default = "default_missing_text")]
    pub missing_text: String,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            missing_text: default_missing_text(),
        }
    }
}

fn default_missing_text() -> String {
    "N/A".to_string()
}

/// Thresholds used by the local insight computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsConfig {
    /// Keywords with fewer rows than this are ignored for conversion ranking.
    #[serde(default = "default_min_keyword_support")]
    pub min_keyword_support: usize,
    /// Number of categories listed in the metrics summary.
    #[serde(default = "default_top_categories")]
    pub top_categories: usize,
    /// Number of keywords listed in the metrics summary.
    #[serde(default = "default_top_keywords")]
    pub top_keywords: usize,
    /// Categories further than this many standard deviations from the mean are flagged.
    #[serde(default = "default_outlier_std_multiplier")]
    pub outlier_std_multiplier: f64,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            min_keyword_support: default_min_keyword_support(),
            top_categories: default_top_categories(),
            top_keywords: default_top_keywords(),
            outlier_std_multiplier: default_outlier_std_multiplier(),
        }
    }
}

fn default_min_keyword_support() -> usize {
    5
}
fn default_top_categories() -> usize {
    3
}
fn default_top_keywords() -> usize {
    5
}
fn default_outlier_std_multiplier() -> f64 {
    1.0
}

/// Chart rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of keywords shown in the keyword volume chart.
    #[serde(default = "default_chart_top_keywords")]
    pub top_keywords: usize,
    #[serde(default = "default_chart_width")]
    pub width_px: u32,
    #[serde(default = "default_chart_height")]
    pub height_px: u32,
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            top_keywords: default_chart_top_keywords(),
            width_px: default_chart_width(),
            height_px: default_chart_height(),
        }
    }
}

fn default_chart_top_keywords() -> usize {
    10
}
fn default_chart_width() -> u32 {
    1600
}
fn default_chart_height() -> u32 {
    840
}

/// Document assembly settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_report_title")]
    pub title: String,
    /// Short product name used in footers.
    #[serde(default = "default_brand")]
    pub brand: String,
    /// File name (without extension) of the PDF and slide deck.
    #[serde(default = "default_file_stem")]
    pub file_stem: String,
    /// Maximum bullets per section.
    #[serde(default = "default_section_limit")]
    pub section_limit: usize,
    /// Maximum bullets on the anomaly and recommendation slides.
    #[serde(default = "default_watchout_limit")]
    pub watchout_limit: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_report_title(),
            brand: default_brand(),
            file_stem: default_file_stem(),
            section_limit: default_section_limit(),
            watchout_limit: default_watchout_limit(),
        }
    }
}

impl ReportConfig {
    pub fn pdf_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(format!("{}.pdf", self.file_stem))
    }

    pub fn slides_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(format!("{}.pptx", self.file_stem))
    }
}

fn default_report_title() -> String {
    "InsightForge Executive Brief".to_string()
}
fn default_brand() -> String {
    "InsightForge".to_string()
}
fn default_file_stem() -> String {
    "InsightForge_Report".to_string()
}
fn default_section_limit() -> usize {
    6
}
fn default_watchout_limit() -> usize {
    4
}

/// Configuration for the optional text-generation collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Set to false to always use the local insight computation.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Inline API key; takes precedence over `api_key_env`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL of an OpenAI-compatible endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: default_provider(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            api_key: None,
            base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    /// Resolve the API key from the inline value or the configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        let usable = |k: &String| !k.trim().is_empty();
        self.api_key
            .clone()
            .filter(usable)
            .or_else(|| std::env::var(&self.api_key_env).ok().filter(usable))
    }
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_temperature() -> f32 {
    0.4
}
fn default_max_tokens() -> u32 {
    600
}
fn default_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl ForgeConfig {
    /// Reject values that would make a run meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.charts.width_px == 0 || self.charts.height_px == 0 {
            return Err(ConfigError::Invalid {
                key: "charts.width_px/height_px".into(),
                message: "chart dimensions must be non-zero".into(),
            });
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Invalid {
                key: "llm.temperature".into(),
                message: format!("{} is outside 0.0..=2.0", self.llm.temperature),
            });
        }
        if self.insights.outlier_std_multiplier.is_nan()
            || self.insights.outlier_std_multiplier < 0.0
        {
            return Err(ConfigError::Invalid {
                key: "insights.outlier_std_multiplier".into(),
                message: "must be a non-negative number".into(),
            });
        }
        if self.report.file_stem.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "report.file_stem".into(),
                message: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "insightforge", "insightforge")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Path of the workspace-level configuration file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(WORKSPACE_CONFIG_DIR).join("config.toml")
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `INSIGHTFORGE_`, nested with `__`)
/// 2. Explicit config file (`--config`)
/// 3. Workspace-local config (`.insightforge/config.toml`)
/// 4. User config (`~/.config/insightforge/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    explicit: Option<&Path>,
) -> Result<ForgeConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(ForgeConfig::default()));

    if let Some(user_config) = user_config_path()
        && user_config.exists()
    {
        figment = figment.merge(Toml::file(&user_config));
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = explicit {
        // Toml::file silently ignores missing files; an explicit path must exist.
        if !path.exists() {
            return Err(ConfigError::Invalid {
                key: "--config".into(),
                message: format!("{} does not exist", path.display()),
            });
        }
        figment = figment.merge(Toml::file(path));
    }

    // INSIGHTFORGE_LLM__MODEL, INSIGHTFORGE_OUTPUT__DIR, etc.
    figment = figment.merge(Env::prefixed("INSIGHTFORGE_").split("__"));

    let config: ForgeConfig = figment.extract().map_err(Box::new)?;
    config.validate()?;
    Ok(config)
}

/// Check whether a workspace or user configuration file exists.
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if user_config_path().is_some_and(|p| p.exists()) {
        return true;
    }
    workspace.is_some_and(|ws| workspace_config_path(ws).exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = ForgeConfig::default();
        assert_eq!(config.input.dir, PathBuf::from("data/input"));
        assert_eq!(config.output.dir, PathBuf::from("data/output"));
        assert_eq!(config.cleaning.missing_text, "N/A");
        assert_eq!(config.insights.min_keyword_support, 5);
        assert_eq!(config.charts.top_keywords, 10);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert!(config.output.export_cleaned_csv);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = ForgeConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: ForgeConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.llm.model, config.llm.model);
        assert_eq!(parsed.report.file_stem, config.report.file_stem);
        assert_eq!(parsed.input.sqlite, None);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let parsed: ForgeConfig = toml::from_str("[llm]\nmodel = \"gpt-4o\"\n").unwrap();
        assert_eq!(parsed.llm.model, "gpt-4o");
        assert_eq!(parsed.llm.max_tokens, 600);
        assert_eq!(parsed.report.section_limit, 6);
    }

    #[test]
    fn test_load_config_from_workspace() {
        figment::Jail::expect_with(|jail| {
            let ws = jail.directory().to_path_buf();
            jail.create_dir(WORKSPACE_CONFIG_DIR)?;
            jail.create_file(
                ".insightforge/config.toml",
                "[output]\ndir = \"reports\"\n[insights]\nmin_keyword_support = 2\n",
            )?;

            let config = load_config(Some(&ws), None).map_err(|e| e.to_string())?;
            assert_eq!(config.output.dir, PathBuf::from("reports"));
            assert_eq!(config.insights.min_keyword_support, 2);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            let ws = jail.directory().to_path_buf();
            jail.create_dir(WORKSPACE_CONFIG_DIR)?;
            jail.create_file(".insightforge/config.toml", "[llm]\nmodel = \"from-file\"\n")?;
            jail.set_env("INSIGHTFORGE_LLM__MODEL", "from-env");

            let config = load_config(Some(&ws), None).map_err(|e| e.to_string())?;
            assert_eq!(config.llm.model, "from-env");
            Ok(())
        });
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = load_config(None, Some(&missing)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_chart_size() {
        let mut config = ForgeConfig::default();
        config.charts.width_px = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_api_key_prefers_inline() {
        let config = LlmConfig {
            api_key: Some("sk-inline".into()),
            api_key_env: "INSIGHTFORGE_TEST_UNSET_KEY".into(),
            ..LlmConfig::default()
        };
        assert_eq!(config.resolve_api_key().as_deref(), Some("sk-inline"));

        let blank = LlmConfig {
            api_key: Some("  ".into()),
            api_key_env: "INSIGHTFORGE_TEST_UNSET_KEY".into(),
            ..LlmConfig::default()
        };
        assert_eq!(blank.resolve_api_key(), None);
    }

    #[test]
    fn test_blank_inline_key_falls_back_to_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("INSIGHTFORGE_TEST_FALLBACK_KEY", "sk-from-env");
            let config = LlmConfig {
                api_key: Some("  ".into()),
                api_key_env: "INSIGHTFORGE_TEST_FALLBACK_KEY".into(),
                ..LlmConfig::default()
            };
            assert_eq!(config.resolve_api_key().as_deref(), Some("sk-from-env"));

            jail.set_env("INSIGHTFORGE_TEST_FALLBACK_KEY", " ");
            assert_eq!(config.resolve_api_key(), None);
            Ok(())
        });
    }

    #[test]
    fn test_report_paths() {
        let report = ReportConfig::default();
        let out = Path::new("out");
        assert_eq!(report.pdf_path(out), PathBuf::from("out/InsightForge_Report.pdf"));
        assert_eq!(report.slides_path(out), PathBuf::from("out/InsightForge_Report.pptx"));
    }
}
