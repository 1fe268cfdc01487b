//! Insight derivation.
//!
//! [`generate_insights`] asks the optional text-generation collaborator first
//! and falls back to [`local::local_insights`] on any failure, so it never
//! errors and never returns an empty result.

pub mod format;
pub mod llm;
pub mod local;
pub mod stats;

use crate::data::Dataset;
use insightforge_core::config::InsightsConfig;
use insightforge_core::providers::TextGenerator;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Insight bullets grouped into named sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightSections {
    #[serde(default)]
    pub overview: Vec<String>,
    #[serde(default)]
    pub key_metrics: Vec<String>,
    #[serde(default)]
    pub trends: Vec<String>,
    #[serde(default)]
    pub anomalies: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub summary: Vec<String>,
}

impl InsightSections {
    /// Sections in document order, keyed by their wire names.
    pub fn sections(&self) -> [(&'static str, &[String]); 6] {
        [
            ("overview", self.overview.as_slice()),
            ("key_metrics", self.key_metrics.as_slice()),
            ("trends", self.trends.as_slice()),
            ("anomalies", self.anomalies.as_slice()),
            ("recommendations", self.recommendations.as_slice()),
            ("summary", self.summary.as_slice()),
        ]
    }

    /// Flat view of every bullet, in section order.
    pub fn as_bullets(&self) -> Vec<String> {
        self.sections()
            .into_iter()
            .flat_map(|(_, bullets)| bullets.iter().cloned())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sections().iter().all(|(_, b)| b.is_empty())
    }
}

/// Where a set of insights came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InsightSource {
    Llm { model: String },
    Local,
}

impl fmt::Display for InsightSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsightSource::Llm { model } => write!(f, "llm ({model})"),
            InsightSource::Local => f.write_str("local"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InsightOutcome {
    pub sections: InsightSections,
    pub source: InsightSource,
}

/// Derive insights for a cleaned dataset.
pub async fn generate_insights(
    dataset: &Dataset,
    generator: Option<&dyn TextGenerator>,
    config: &InsightsConfig,
) -> InsightOutcome {
    if let Some(generator) = generator {
        match llm::request_sections(generator, dataset, config).await {
            Ok(sections) => {
                info!(model = generator.model_name(), "Using collaborator insights");
                return InsightOutcome {
                    sections,
                    source: InsightSource::Llm {
                        model: generator.model_name().to_string(),
                    },
                };
            }
            Err(e) => {
                warn!(error = %e, "Collaborator insights unavailable, using local computation")
            }
        }
    }

    InsightOutcome {
        sections: local::local_insights(dataset, config),
        source: InsightSource::Local,
    }
}
