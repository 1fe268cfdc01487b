//! Collaborator-backed insights: metrics summary, prompt, and response parsing.

use super::InsightSections;
use super::stats::{activity_values, group_rates, overall_rate, unique_count, volumes};
use crate::data::{CATEGORY_COLUMN, Dataset, KEYWORD_COLUMN};
use insightforge_core::config::InsightsConfig;
use insightforge_core::error::LlmError;
use insightforge_core::providers::TextGenerator;
use std::collections::BTreeMap;
use tracing::debug;

pub const SYSTEM_PROMPT: &str = "You are an executive insights generator.";

/// Compact, prompt-ready description of the dataset.
pub type Metrics = BTreeMap<String, String>;

pub fn collect_metrics(dataset: &Dataset, config: &InsightsConfig) -> Metrics {
    let mut metrics = Metrics::new();
    metrics.insert("row_count".into(), dataset.row_count().to_string());
    for column in [CATEGORY_COLUMN, KEYWORD_COLUMN] {
        if let Some(n) = unique_count(dataset, column) {
            metrics.insert(format!("{column}_unique"), n.to_string());
        }
    }

    let Some(activity) = activity_values(dataset) else {
        return metrics;
    };
    if let Some(rate) = overall_rate(&activity) {
        metrics.insert("activity_rate".into(), format!("{rate:.2}"));
    }
    let (active, inactive) = volumes(&activity);
    metrics.insert("active_volume".into(), format!("{}", active.trunc() as i64));
    metrics.insert("inactive_volume".into(), format!("{}", inactive.trunc() as i64));

    let ranked = [
        ("top_categories", CATEGORY_COLUMN, config.top_categories),
        ("top_keywords", KEYWORD_COLUMN, config.top_keywords),
    ];
    for (key, column, limit) in ranked {
        if let Some(rates) = group_rates(dataset, column, &activity) {
            let listed: Vec<String> = rates
                .iter()
                .take(limit)
                .map(|g| format!("{}:{:.1}%", g.key, g.rate))
                .collect();
            metrics.insert(key.into(), listed.join(", "));
        }
    }
    metrics
}

pub fn build_prompt(metrics: &Metrics) -> String {
    let summary: String = metrics
        .iter()
        .map(|(k, v)| format!("- {k}: {v}\n"))
        .collect();
    format!(
        "You advise the leadership team on the weekly business review.\n\
         Write short narrative bullets from the data summary below and answer with a\n\
         JSON object holding exactly these array-of-string keys:\n\
         overview, key_metrics, trends, anomalies, recommendations, summary.\n\
         Give 2-4 bullets per key, each under 160 characters.\n\
         Lead with comparisons, cause and effect, and concrete next actions; skip generic filler.\n\
         \n\
         DATA SUMMARY:\n{summary}"
    )
}

/// Remove a surrounding Markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn bullets(value: Option<&serde_json::Value>) -> Vec<String> {
    let items: Vec<&serde_json::Value> = match value {
        Some(serde_json::Value::Array(items)) => items.iter().collect(),
        Some(single @ serde_json::Value::String(_)) => vec![single],
        _ => Vec::new(),
    };
    items
        .into_iter()
        .filter_map(|item| match item {
            serde_json::Value::String(s) => Some(s.trim().to_string()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse the collaborator's response into sections.
///
/// Requires a JSON object with at least one non-empty bullet across the six keys.
pub fn parse_sections(response: &str) -> Result<InsightSections, LlmError> {
    let json: serde_json::Value =
        serde_json::from_str(strip_code_fence(response)).map_err(|e| LlmError::ResponseParse {
            message: format!("Invalid JSON: {e}"),
        })?;
    let object = json.as_object().ok_or_else(|| LlmError::ResponseParse {
        message: "expected a JSON object".into(),
    })?;

    let sections = InsightSections {
        overview: bullets(object.get("overview")),
        key_metrics: bullets(object.get("key_metrics")),
        trends: bullets(object.get("trends")),
        anomalies: bullets(object.get("anomalies")),
        recommendations: bullets(object.get("recommendations")),
        summary: bullets(object.get("summary")),
    };
    if sections.is_empty() {
        return Err(LlmError::ResponseParse {
            message: "response contained no bullets".into(),
        });
    }
    Ok(sections)
}

/// Ask the collaborator for insights. Any failure is returned for the caller to absorb.
pub async fn request_sections(
    generator: &dyn TextGenerator,
    dataset: &Dataset,
    config: &InsightsConfig,
) -> Result<InsightSections, LlmError> {
    let metrics = collect_metrics(dataset, config);
    let prompt = build_prompt(&metrics);
    debug!(model = generator.model_name(), metrics = metrics.len(), "Requesting insights");
    let response = generator.generate(SYSTEM_PROMPT, &prompt).await?;
    parse_sections(&response)
}
