//! Chart planning.
//!
//! [`plan_charts`] turns a cleaned dataset into a list of [`ChartSpec`]s: the
//! data, labels, and caption of every chart whose source columns exist.
//! [`render::render_charts`] draws them to PNG files.

pub mod render;

use chrono::NaiveDateTime;
use insightforge_analytics::data::{
    CATEGORY_COLUMN, ColumnType, Dataset, KEYWORD_COLUMN, infer_column_type,
};
use insightforge_analytics::insights::format::{thousands, thousands_f64};
use insightforge_analytics::insights::stats::{activity_values, group_rates, mean};
use insightforge_core::config::ChartsConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub use render::render_charts;

/// An RGB color from the fixed palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

pub const NAVY: Rgb = Rgb(0x0B, 0x25, 0x45);
pub const TEAL: Rgb = Rgb(0x1D, 0x78, 0x74);
pub const GOLD: Rgb = Rgb(0xF0, 0xA2, 0x02);
pub const VIOLET: Rgb = Rgb(0x7F, 0x3C, 0xFF);
pub const MINT: Rgb = Rgb(0x4F, 0xED, 0x84);
pub const APRICOT: Rgb = Rgb(0xF6, 0xAD, 0x55);

/// Plotted values.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    /// Labelled bars, drawn in order.
    Bars(Vec<(String, f64)>),
    /// Values against their record index.
    Line(Vec<f64>),
    /// Values against time, sorted by time.
    TimeSeries(Vec<(NaiveDateTime, f64)>),
}

/// Everything needed to draw one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub file_name: String,
    /// Title shown in documents.
    pub title: String,
    /// Title drawn inside the image.
    pub heading: String,
    pub caption: String,
    pub x_label: String,
    pub y_label: String,
    pub color: Rgb,
    pub data: ChartData,
}

/// A rendered chart image with its title and caption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartArtifact {
    pub path: PathBuf,
    pub title: String,
    pub description: String,
    pub width_px: u32,
    pub height_px: u32,
}

/// Title-case a column name the way headings are written: the first letter
/// after any non-letter is upper case, the rest lower case.
pub fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_letter = false;
    for ch in name.chars() {
        if ch.is_alphabetic() {
            if prev_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_letter = true;
        } else {
            out.push(ch);
            prev_letter = false;
        }
    }
    out
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Value counts of a column, most frequent first; ties keep key order.
fn value_counts(dataset: &Dataset, column: &str) -> Option<Vec<(String, usize)>> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for value in dataset.column(column)? {
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }
    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    Some(counts)
}

fn numeric_columns(dataset: &Dataset) -> Vec<usize> {
    (0..dataset.column_count())
        .filter(|&i| infer_column_type(dataset.column_at(i)).is_numeric())
        .collect()
}

fn category_counts(dataset: &Dataset) -> Option<ChartSpec> {
    let counts = value_counts(dataset, CATEGORY_COLUMN)?;
    let (top, volume) = counts.first()?.clone();
    Some(ChartSpec {
        file_name: "events_by_category.png".into(),
        title: "Events by Category".into(),
        heading: "Events by Category".into(),
        caption: format!(
            "{top} leads in engagement volume, contributing {} logged interactions across the period.",
            thousands(volume as u64)
        ),
        x_label: "Category".into(),
        y_label: "Volume".into(),
        color: NAVY,
        data: ChartData::Bars(counts.into_iter().map(|(k, n)| (k, n as f64)).collect()),
    })
}

fn category_conversion(dataset: &Dataset) -> Option<ChartSpec> {
    let activity = activity_values(dataset)?;
    let rates = group_rates(dataset, CATEGORY_COLUMN, &activity)?;
    let best = rates.first()?;
    let values: Vec<f64> = rates.iter().map(|g| g.rate).collect();
    let mid = median(&values)?;
    Some(ChartSpec {
        file_name: "activity_rate_by_category.png".into(),
        title: "Activity Rate by Category".into(),
        heading: "Activity Rate by Category (%)".into(),
        caption: format!(
            "{} converts {:.1}% of impressions into active sessions; median segment trails at {mid:.1}%.",
            best.key, best.rate
        ),
        x_label: "Category".into(),
        y_label: "Active Share (%)".into(),
        color: TEAL,
        data: ChartData::Bars(rates.iter().map(|g| (g.key.clone(), g.rate)).collect()),
    })
}

fn top_keywords(dataset: &Dataset, top_n: usize) -> Option<ChartSpec> {
    let mut counts = value_counts(dataset, KEYWORD_COLUMN)?;
    counts.truncate(top_n);
    let (top, volume) = counts.first()?.clone();
    Some(ChartSpec {
        file_name: "top_ad_keywords.png".into(),
        title: "Top Ad Keywords".into(),
        heading: format!("Top {top_n} Performing Keywords"),
        caption: format!(
            "'{top}' is the highest-traction creative keyword with {} logged engagements.",
            thousands(volume as u64)
        ),
        x_label: "Keyword".into(),
        y_label: "Volume".into(),
        color: GOLD,
        data: ChartData::Bars(counts.into_iter().map(|(k, n)| (k, n as f64)).collect()),
    })
}

fn numeric_values(dataset: &Dataset, idx: usize) -> Vec<f64> {
    dataset
        .column_at(idx)
        .map(|v| v.as_f64().unwrap_or(0.0))
        .collect()
}

fn numeric_over_index(dataset: &Dataset, numeric: &[usize]) -> Option<ChartSpec> {
    let &idx = numeric.first()?;
    let name = &dataset.columns[idx];
    let values = numeric_values(dataset, idx);
    let (peak_at, _) = values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })?;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let title = title_case(name);
    let stem: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    Some(ChartSpec {
        file_name: format!("{stem}_over_index.png"),
        title: format!("{title} Trajectory"),
        heading: format!("{title} Trajectory"),
        caption: format!(
            "{title} spans {min:.0}-{max:.0} with visible inflection around record {peak_at}."
        ),
        x_label: "Record Index".into(),
        y_label: title,
        color: VIOLET,
        data: ChartData::Line(values),
    })
}

fn numeric_summary(dataset: &Dataset, numeric: &[usize]) -> Option<ChartSpec> {
    let mut means: Vec<(String, f64)> = numeric
        .iter()
        .filter_map(|&i| Some((dataset.columns[i].clone(), mean(&numeric_values(dataset, i))?)))
        .collect();
    means.sort_by(|a, b| b.1.total_cmp(&a.1));
    let (top, top_mean) = means.first()?.clone();
    Some(ChartSpec {
        file_name: "numeric_summary.png".into(),
        title: "Average Metrics by Column".into(),
        heading: "Average Metrics by Column".into(),
        caption: format!(
            "{} carries the highest average at {} across {} numeric columns.",
            title_case(&top),
            thousands_f64(top_mean, 2),
            means.len()
        ),
        x_label: "Column".into(),
        y_label: "Mean".into(),
        color: MINT,
        data: ChartData::Bars(means),
    })
}

fn time_series(dataset: &Dataset, numeric: &[usize]) -> Option<ChartSpec> {
    let time_idx = (0..dataset.column_count())
        .find(|&i| infer_column_type(dataset.column_at(i)) == ColumnType::DateTime)?;
    let &metric_idx = numeric.first()?;
    let mut points: Vec<(NaiveDateTime, f64)> = dataset
        .rows
        .iter()
        .filter_map(|row| {
            let at = row.get(time_idx)?.as_datetime()?;
            Some((at, row.get(metric_idx)?.as_f64().unwrap_or(0.0)))
        })
        .collect();
    points.sort_by_key(|(at, _)| *at);
    let (first_at, first) = *points.first()?;
    let (last_at, last) = *points.last()?;

    let time_name = &dataset.columns[time_idx];
    let metric = &dataset.columns[metric_idx];
    Some(ChartSpec {
        file_name: "time_series.png".into(),
        title: format!("{} over Time", title_case(metric)),
        heading: format!("{metric} over Time"),
        caption: format!(
            "{} moves from {} on {} to {} on {}.",
            title_case(metric),
            thousands_f64(first, 1),
            first_at.format("%d %b %Y"),
            thousands_f64(last, 1),
            last_at.format("%d %b %Y")
        ),
        x_label: title_case(time_name),
        y_label: title_case(metric),
        color: APRICOT,
        data: ChartData::TimeSeries(points),
    })
}

/// Plan every applicable chart, in document order.
///
/// A chart whose source columns are absent (or empty) is left out.
pub fn plan_charts(dataset: &Dataset, config: &ChartsConfig) -> Vec<ChartSpec> {
    if dataset.is_empty() {
        return Vec::new();
    }
    let numeric = numeric_columns(dataset);
    [
        category_counts(dataset),
        category_conversion(dataset),
        top_keywords(dataset, config.top_keywords),
        numeric_over_index(dataset, &numeric),
        numeric_summary(dataset, &numeric),
        time_series(dataset, &numeric),
    ]
    .into_iter()
    .flatten()
    .collect()
}
