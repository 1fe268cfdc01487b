//! Pipeline orchestrator: ingest, clean, derive insights, render charts, and
//! assemble the documents.
//!
//! Stages run one after the other. Empty ingestion halts the run before the
//! output directory is touched; after that every stage is attempted and
//! document failures are reported once all of them have run.

use crate::charts::{ChartArtifact, plan_charts, render_charts};
use crate::pdf::build_pdf;
use crate::slides::build_slides;
use chrono::Local;
use insightforge_analytics::data::{DirectoryLoader, clean_dataset, write_csv};
use insightforge_analytics::insights::{InsightSource, generate_insights};
use insightforge_core::config::ForgeConfig;
use insightforge_core::error::ForgeError;
use insightforge_core::providers::{TextGenerator, create_generator};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

pub const CLEANED_CSV_NAME: &str = "cleaned_dataset.csv";

/// What a completed run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub rows: usize,
    pub columns: usize,
    /// Number of sources that contributed rows.
    pub sources: usize,
    pub skipped_sources: usize,
    pub insight_source: InsightSource,
    pub charts: Vec<ChartArtifact>,
    pub pdf_path: PathBuf,
    pub slides_path: PathBuf,
    pub cleaned_csv: Option<PathBuf>,
}

/// How the collaborator is chosen for a run.
enum GeneratorChoice {
    /// Build one from `llm` config, if enabled.
    FromConfig,
    Disabled,
    Provided(Box<dyn TextGenerator>),
}

pub struct Pipeline {
    config: ForgeConfig,
    generator: GeneratorChoice,
}

impl Pipeline {
    pub fn new(config: ForgeConfig) -> Self {
        Self {
            config,
            generator: GeneratorChoice::FromConfig,
        }
    }

    /// Always use the local insight computation.
    pub fn without_llm(mut self) -> Self {
        self.generator = GeneratorChoice::Disabled;
        self
    }

    /// Use the given collaborator instead of building one from config.
    pub fn with_generator(mut self, generator: Box<dyn TextGenerator>) -> Self {
        self.generator = GeneratorChoice::Provided(generator);
        self
    }

    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    fn generator_from_config(&self) -> Option<Box<dyn TextGenerator>> {
        if !self.config.llm.enabled {
            return None;
        }
        create_generator(&self.config.llm)
            .inspect_err(|e| {
                warn!(error = %e, "Text generation unavailable, insights will be computed locally")
            })
            .ok()
    }

    pub async fn run(&self) -> Result<PipelineReport, ForgeError> {
        let config = &self.config;

        info!(stage = "ingest", dir = %config.input.dir.display(), "Loading input");
        let summary = DirectoryLoader::new(&config.input.dir)
            .with_sqlite(config.input.sqlite.clone())
            .load()
            .await?;
        info!(
            stage = "ingest",
            rows = summary.dataset.row_count(),
            columns = summary.dataset.column_count(),
            sources = summary.sources.len(),
            skipped = summary.skipped.len(),
            "Input loaded"
        );

        info!(stage = "clean", "Normalizing missing values");
        let cleaned = clean_dataset(&summary.dataset, &config.cleaning.missing_text);

        std::fs::create_dir_all(&config.output.dir)?;

        info!(stage = "insights", "Deriving insights");
        let built = match self.generator {
            GeneratorChoice::FromConfig => self.generator_from_config(),
            _ => None,
        };
        let generator: Option<&dyn TextGenerator> = match &self.generator {
            GeneratorChoice::Provided(provided) => Some(provided.as_ref()),
            _ => built.as_deref(),
        };
        let insights = generate_insights(&cleaned, generator, &config.insights).await;
        info!(
            stage = "insights",
            source = %insights.source,
            bullets = insights.sections.as_bullets().len(),
            "Insights ready"
        );

        let charts = if config.charts.enabled {
            info!(stage = "charts", "Rendering charts");
            let specs = plan_charts(&cleaned, &config.charts);
            render_charts(&specs, &config.output.charts_dir(), &config.charts)
        } else {
            info!(stage = "charts", "Chart rendering disabled");
            Vec::new()
        };

        let generated_at = Local::now();
        let mut failures: Vec<ForgeError> = Vec::new();

        info!(stage = "slides", "Assembling slide deck");
        let slides_path = config.report.slides_path(&config.output.dir);
        if let Err(e) = build_slides(
            &slides_path,
            &insights.sections,
            &charts,
            &config.report,
            generated_at,
        ) {
            failures.push(e.into());
        }

        info!(stage = "pdf", "Assembling PDF brief");
        let pdf_path = config.report.pdf_path(&config.output.dir);
        if let Err(e) = build_pdf(
            &pdf_path,
            &insights.sections,
            &charts,
            &config.report,
            generated_at,
        ) {
            failures.push(e.into());
        }

        let cleaned_csv = if config.output.export_cleaned_csv {
            info!(stage = "export", "Writing cleaned dataset");
            let path = config.output.dir.join(CLEANED_CSV_NAME);
            match write_csv(&cleaned, &path) {
                Ok(()) => Some(path),
                Err(e) => {
                    failures.push(e.into());
                    None
                }
            }
        } else {
            None
        };

        if let Some(first) = first_failure(failures) {
            return Err(first);
        }

        info!(stage = "done", charts = charts.len(), "Pipeline complete");
        Ok(PipelineReport {
            rows: cleaned.row_count(),
            columns: cleaned.column_count(),
            sources: summary.sources.len(),
            skipped_sources: summary.skipped.len(),
            insight_source: insights.source,
            charts,
            pdf_path,
            slides_path,
            cleaned_csv,
        })
    }
}

/// Log every failure and hand back the first.
fn first_failure(failures: Vec<ForgeError>) -> Option<ForgeError> {
    let mut failures = failures.into_iter();
    let first = failures.next()?;
    warn!(error = %first, "Output stage failed");
    for e in failures {
        warn!(error = %e, "Output stage failed");
    }
    Some(first)
}
