//! CLI subcommand handlers.

use crate::{Commands, ConfigAction, RunArgs};
use insightforge_analytics::data::{DirectoryLoader, SchemaDefinition, clean_dataset, infer_schema};
use insightforge_core::config::{ForgeConfig, SqliteInput, load_config, workspace_config_path};
use insightforge_report::{Pipeline, PipelineReport};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    match command {
        Commands::Run(args) => {
            let report = handle_run(args, workspace, config_path).await?;
            print!("{}", describe_report(&report));
            Ok(())
        }
        Commands::Inspect { dir } => {
            let table = handle_inspect(dir, workspace, config_path).await?;
            print!("{table}");
            Ok(())
        }
        Commands::Config { action } => handle_config(action, workspace, config_path),
    }
}

fn load(workspace: &Path, config_path: Option<&Path>) -> anyhow::Result<ForgeConfig> {
    load_config(Some(workspace), config_path)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))
}

/// Relative paths given on the command line or in config resolve against the workspace.
fn in_workspace(workspace: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        workspace.join(path)
    }
}

fn apply_run_overrides(config: &mut ForgeConfig, args: RunArgs, workspace: &Path) {
    if let Some(dir) = args.input_dir {
        config.input.dir = dir;
    }
    if let Some(dir) = args.output {
        config.output.dir = dir;
    }
    if let (Some(db_path), Some(table)) = (args.sqlite, args.table) {
        config.input.sqlite = Some(SqliteInput { db_path, table });
    }
    if args.no_llm {
        config.llm.enabled = false;
    }
    if args.no_charts {
        config.charts.enabled = false;
    }

    config.input.dir = in_workspace(workspace, config.input.dir.clone());
    config.output.dir = in_workspace(workspace, config.output.dir.clone());
    if let Some(sqlite) = config.input.sqlite.as_mut() {
        sqlite.db_path = in_workspace(workspace, sqlite.db_path.clone());
    }
}

async fn handle_run(
    args: RunArgs,
    workspace: &Path,
    config_path: Option<&Path>,
) -> anyhow::Result<PipelineReport> {
    let mut config = load(workspace, config_path)?;
    apply_run_overrides(&mut config, args, workspace);
    debug!(
        input = %config.input.dir.display(),
        output = %config.output.dir.display(),
        llm = config.llm.enabled,
        "Effective run settings"
    );

    let report = Pipeline::new(config).run().await?;
    Ok(report)
}

fn describe_report(report: &PipelineReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Processed {} rows x {} columns from {} source(s); insights: {}",
        report.rows, report.columns, report.sources, report.insight_source
    );
    if report.skipped_sources > 0 {
        let _ = writeln!(out, "Skipped {} unreadable source(s)", report.skipped_sources);
    }
    for chart in &report.charts {
        let _ = writeln!(out, "Chart:  {}", chart.path.display());
    }
    let _ = writeln!(out, "PDF:    {}", report.pdf_path.display());
    let _ = writeln!(out, "Slides: {}", report.slides_path.display());
    if let Some(csv) = &report.cleaned_csv {
        let _ = writeln!(out, "CSV:    {}", csv.display());
    }
    out
}

async fn handle_inspect(
    dir: Option<PathBuf>,
    workspace: &Path,
    config_path: Option<&Path>,
) -> anyhow::Result<String> {
    let mut config = load(workspace, config_path)?;
    apply_run_overrides(
        &mut config,
        RunArgs {
            input_dir: dir,
            ..RunArgs::default()
        },
        workspace,
    );

    let summary = DirectoryLoader::new(&config.input.dir)
        .with_sqlite(config.input.sqlite.clone())
        .load()
        .await?;
    let raw = infer_schema(&summary.dataset);
    let cleaned = infer_schema(&clean_dataset(
        &summary.dataset,
        &config.cleaning.missing_text,
    ));

    let mut out = format!(
        "{} rows from {} source(s)\n",
        summary.dataset.row_count(),
        summary.sources.len()
    );
    for skipped in &summary.skipped {
        let _ = writeln!(out, "skipped {}: {}", skipped.location, skipped.reason);
    }
    out.push_str(&schema_table(&raw, &cleaned));
    Ok(out)
}

/// One line per column: name, inferred type, nulls before cleaning, type after cleaning.
fn schema_table(raw: &SchemaDefinition, cleaned: &SchemaDefinition) -> String {
    let width = raw
        .columns
        .iter()
        .map(|c| c.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("column".len());
    let mut out = format!(
        "{:<width$}  {:<8}  {:>6}  {}\n",
        "column", "type", "nulls", "cleaned"
    );
    for (before, after) in raw.columns.iter().zip(&cleaned.columns) {
        let _ = writeln!(
            out,
            "{:<width$}  {:<8}  {:>6}  {}",
            before.name,
            before.dtype.to_string(),
            before.null_count,
            after.dtype
        );
    }
    out
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let path = workspace_config_path(workspace);
            if path.exists() {
                println!("Configuration file already exists at: {}", path.display());
                return Ok(());
            }
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            let toml_str = toml::to_string_pretty(&ForgeConfig::default())?;
            std::fs::write(&path, &toml_str)?;
            println!("Created default configuration at: {}", path.display());
            Ok(())
        }
        ConfigAction::Show => {
            let config = load(workspace, config_path)?;
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const EVENTS_CSV: &str = "\
category,activity,ad_keywords
Retail,1,summer sale
Travel,,cheap flights
";

    fn workspace_with_input() -> TempDir {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("data").join("input");
        std::fs::create_dir_all(&input).unwrap();
        std::fs::write(input.join("events.csv"), EVENTS_CSV).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_config_init_creates_file() {
        let dir = TempDir::new().unwrap();
        let command = Commands::Config {
            action: ConfigAction::Init,
        };
        handle_command(command, dir.path(), None).await.unwrap();

        let path = workspace_config_path(dir.path());
        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: ForgeConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed.report.file_stem, "InsightForge_Report");
        assert_eq!(parsed.cleaning.missing_text, "N/A");
    }

    #[test]
    fn test_config_init_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = workspace_config_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[report]\ntitle = \"Custom\"\n").unwrap();

        handle_config(ConfigAction::Init, dir.path(), None).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "[report]\ntitle = \"Custom\"\n");
    }

    #[test]
    fn test_config_show_rejects_missing_explicit_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(handle_config(ConfigAction::Show, dir.path(), Some(&missing)).is_err());
    }

    #[test]
    fn test_run_overrides_resolve_against_workspace() {
        let workspace = Path::new("/work");
        let mut config = ForgeConfig::default();
        apply_run_overrides(
            &mut config,
            RunArgs {
                output: Some(PathBuf::from("/tmp/out")),
                no_llm: true,
                no_charts: true,
                sqlite: Some(PathBuf::from("db.sqlite")),
                table: Some("events".into()),
                ..RunArgs::default()
            },
            workspace,
        );
        assert_eq!(config.input.dir, Path::new("/work/data/input"));
        assert_eq!(config.output.dir, Path::new("/tmp/out"));
        assert!(!config.llm.enabled);
        assert!(!config.charts.enabled);
        assert_eq!(
            config.input.sqlite,
            Some(SqliteInput {
                db_path: PathBuf::from("/work/db.sqlite"),
                table: "events".into(),
            })
        );
    }

    #[tokio::test]
    async fn test_inspect_prints_schema() {
        let dir = workspace_with_input();
        let table = handle_inspect(None, dir.path(), None).await.unwrap();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "2 rows from 1 source(s)");
        assert!(lines[1].starts_with("column"));
        assert!(lines[3].starts_with("activity"));
        assert!(lines[3].trim_end().ends_with("integer"));
        assert!(!dir.path().join("data").join("output").exists());
    }

    #[tokio::test]
    async fn test_inspect_empty_dir_fails() {
        let dir = TempDir::new().unwrap();
        assert!(handle_inspect(None, dir.path(), None).await.is_err());
    }

    #[tokio::test]
    async fn test_run_writes_documents() {
        let dir = workspace_with_input();
        let args = RunArgs {
            no_llm: true,
            no_charts: true,
            ..RunArgs::default()
        };
        let report = handle_run(args, dir.path(), None).await.unwrap();

        let output = dir.path().join("data").join("output");
        assert_eq!(report.pdf_path, output.join("InsightForge_Report.pdf"));
        assert!(report.pdf_path.exists());
        assert!(report.slides_path.exists());
        assert!(output.join("cleaned_dataset.csv").exists());

        let text = describe_report(&report);
        assert!(text.starts_with("Processed 2 rows x 3 columns from 1 source(s); insights: local"));
        assert!(text.contains("Slides: "));
    }
}
