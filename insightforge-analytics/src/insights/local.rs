//! Deterministic insight computation.
//!
//! Always succeeds: missing columns only remove the sentences that depend
//! on them, and the overview, summary, and at least one recommendation are
//! always present.

use super::InsightSections;
use super::format::thousands;
use super::stats::{Outlier, activity_values, group_rates, outliers, overall_rate, unique_count};
use crate::data::{CATEGORY_COLUMN, Dataset, KEYWORD_COLUMN};
use insightforge_core::config::InsightsConfig;

pub const SUMMARY_SENTENCE: &str =
    "Dataset processed successfully; see recommendations for next best actions.";
pub const DEFAULT_RECOMMENDATION: &str =
    "Prioritize best-performing categories while shoring up laggards.";
pub const MISSING_ACTIVITY_NOTE: &str = "Activity column missing; showing structural metrics only.";

pub fn local_insights(dataset: &Dataset, config: &InsightsConfig) -> InsightSections {
    let mut sections = InsightSections::default();

    let category_note = match unique_count(dataset, CATEGORY_COLUMN) {
        Some(n) => format!("{n} categories"),
        None => "mixed feature set".to_string(),
    };
    sections.overview.push(format!(
        "Ingested {} rows covering {category_note}.",
        thousands(dataset.row_count() as u64)
    ));

    match activity_values(dataset) {
        Some(activity) => {
            if let Some(rate) = overall_rate(&activity) {
                sections
                    .key_metrics
                    .push(format!("Portfolio-wide activity rate sits at {rate:.1}%."));
            }

            if let Some(rates) = group_rates(dataset, CATEGORY_COLUMN, &activity)
                && let (Some(best), Some(worst)) = (rates.first(), rates.last())
            {
                sections.trends.push(format!(
                    "{} leads with {:.1}% activation vs. {} at {:.1}%.",
                    best.key, best.rate, worst.key, worst.rate
                ));
                for outlier in outliers(&rates, config.outlier_std_multiplier) {
                    sections.anomalies.push(match outlier {
                        Outlier::High(g) => format!(
                            "{} outperforms materially at {:.1}% activation.",
                            g.key, g.rate
                        ),
                        Outlier::Low(g) => {
                            format!("{} under-indexes at {:.1}% activation.", g.key, g.rate)
                        }
                    });
                }
            }

            if let Some(mut keywords) = group_rates(dataset, KEYWORD_COLUMN, &activity) {
                keywords.retain(|k| k.count >= config.min_keyword_support);
                if let (Some(top), Some(low)) = (keywords.first(), keywords.last()) {
                    sections.key_metrics.push(format!(
                        "Keyword '{}' tops conversion at {:.1}%.",
                        top.key, top.rate
                    ));
                    if top.key != low.key {
                        sections.recommendations.push(format!(
                            "Reallocate spend from '{}' into '{}' to lift ROI.",
                            low.key, top.key
                        ));
                    }
                }
            }
        }
        None => sections.overview.push(MISSING_ACTIVITY_NOTE.to_string()),
    }

    sections.summary.push(SUMMARY_SENTENCE.to_string());
    if sections.recommendations.is_empty() {
        sections
            .recommendations
            .push(DEFAULT_RECOMMENDATION.to_string());
    }
    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;
    use pretty_assertions::assert_eq;

    fn campaign_dataset() -> Dataset {
        let mut rows = Vec::new();
        for (category, keyword, activity) in [
            ("A", "shoes", 1),
            ("A", "shoes", 0),
            ("A", "shoes", 1),
            ("A", "shoes", 1),
            ("B", "socks", 1),
            ("B", "socks", 0),
            ("B", "socks", 0),
            ("B", "socks", 0),
            ("A", "shoes", 1),
            ("B", "socks", 0),
        ] {
            rows.push(vec![
                Value::Text(category.into()),
                Value::Text(keyword.into()),
                Value::Int(activity),
            ]);
        }
        Dataset::new(
            vec!["category".into(), "ad_keywords".into(), "activity".into()],
            rows,
        )
    }

    #[test]
    fn test_full_insights() {
        let sections = local_insights(&campaign_dataset(), &InsightsConfig::default());
        assert_eq!(
            sections.overview,
            vec!["Ingested 10 rows covering 2 categories."]
        );
        assert_eq!(
            sections.key_metrics,
            vec![
                "Portfolio-wide activity rate sits at 50.0%.",
                "Keyword 'shoes' tops conversion at 80.0%.",
            ]
        );
        assert_eq!(
            sections.trends,
            vec!["A leads with 80.0% activation vs. B at 20.0%."]
        );
        assert!(sections.anomalies.is_empty());
        assert_eq!(
            sections.recommendations,
            vec!["Reallocate spend from 'socks' into 'shoes' to lift ROI."]
        );
        assert_eq!(sections.summary, vec![SUMMARY_SENTENCE]);
    }

    #[test]
    fn test_keyword_support_threshold() {
        let config = InsightsConfig {
            min_keyword_support: 6,
            ..InsightsConfig::default()
        };
        let sections = local_insights(&campaign_dataset(), &config);
        assert_eq!(sections.key_metrics.len(), 1);
        assert_eq!(sections.recommendations, vec![DEFAULT_RECOMMENDATION]);
    }

    #[test]
    fn test_single_supported_keyword_skips_reallocation() {
        let mut rows = Vec::new();
        for (keyword, activity) in [
            ("shoes", 1),
            ("shoes", 0),
            ("shoes", 1),
            ("shoes", 1),
            ("shoes", 1),
            ("socks", 0),
            ("socks", 1),
        ] {
            rows.push(vec![Value::Text(keyword.into()), Value::Int(activity)]);
        }
        let ds = Dataset::new(vec!["ad_keywords".into(), "activity".into()], rows);

        let sections = local_insights(&ds, &InsightsConfig::default());
        assert_eq!(
            sections.key_metrics,
            vec![
                "Portfolio-wide activity rate sits at 71.4%.",
                "Keyword 'shoes' tops conversion at 80.0%.",
            ]
        );
        assert_eq!(sections.recommendations, vec![DEFAULT_RECOMMENDATION]);
    }

    #[test]
    fn test_missing_activity_column() {
        let ds = Dataset::new(
            vec!["category".into()],
            vec![vec![Value::Text("A".into())]; 1500],
        );
        let sections = local_insights(&ds, &InsightsConfig::default());
        assert_eq!(
            sections.overview,
            vec![
                "Ingested 1,500 rows covering 1 categories.",
                MISSING_ACTIVITY_NOTE,
            ]
        );
        assert!(sections.key_metrics.is_empty());
        assert!(sections.trends.is_empty());
        assert_eq!(sections.recommendations, vec![DEFAULT_RECOMMENDATION]);
    }

    #[test]
    fn test_activity_without_groups() {
        let ds = Dataset::new(
            vec!["activity".into()],
            vec![vec![Value::Int(1)], vec![Value::Int(0)]],
        );
        let sections = local_insights(&ds, &InsightsConfig::default());
        assert_eq!(
            sections.overview,
            vec!["Ingested 2 rows covering mixed feature set."]
        );
        assert_eq!(
            sections.key_metrics,
            vec!["Portfolio-wide activity rate sits at 50.0%."]
        );
        assert!(sections.trends.is_empty());
    }

    #[test]
    fn test_empty_dataset_yields_placeholders() {
        let sections = local_insights(&Dataset::empty(), &InsightsConfig::default());
        assert!(!sections.is_empty());
        assert_eq!(
            sections.overview,
            vec![
                "Ingested 0 rows covering mixed feature set.",
                MISSING_ACTIVITY_NOTE,
            ]
        );
        assert_eq!(sections.summary, vec![SUMMARY_SENTENCE]);
    }

    #[test]
    fn test_outlier_sentences() {
        let mut rows = Vec::new();
        let groups = [("Hi", 10), ("M1", 5), ("M2", 5), ("M3", 5), ("Lo", 0)];
        for (category, active) in groups {
            for i in 0..10 {
                rows.push(vec![
                    Value::Text(category.into()),
                    Value::Int(i64::from(i < active)),
                ]);
            }
        }
        let ds = Dataset::new(vec!["category".into(), "activity".into()], rows);
        let sections = local_insights(&ds, &InsightsConfig::default());
        assert_eq!(
            sections.anomalies,
            vec![
                "Hi outperforms materially at 100.0% activation.",
                "Lo under-indexes at 0.0% activation.",
            ]
        );
    }
}
