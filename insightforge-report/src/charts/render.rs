//! PNG rendering of planned charts with plotters.
//!
//! Text is drawn with DejaVu Sans compiled into the binary, so rendering
//! does not depend on the fonts installed on the host.

use super::{ChartArtifact, ChartData, ChartSpec, Rgb};
use chrono::{DateTime, NaiveDateTime};
use insightforge_core::config::ChartsConfig;
use insightforge_core::error::RenderError;
use plotters::prelude::*;
use plotters::style::register_font;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

const FONT_FAMILY: &str = "sans-serif";
static FONT_REGULAR: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
static FONT_BOLD: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");

/// Register the embedded faces under [`FONT_FAMILY`] once per process.
fn register_fonts() -> Result<(), RenderError> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let registered = *REGISTERED.get_or_init(|| {
        register_font(FONT_FAMILY, FontStyle::Normal, FONT_REGULAR).is_ok()
            && register_font(FONT_FAMILY, FontStyle::Bold, FONT_BOLD).is_ok()
    });
    if registered {
        Ok(())
    } else {
        Err(RenderError::chart(FONT_FAMILY, "embedded font could not be parsed"))
    }
}

type DrawResult = Result<(), Box<dyn std::error::Error>>;

const INK: RGBColor = RGBColor(0x0B, 0x25, 0x45);
const GRID: RGBColor = RGBColor(0xEF, 0xEF, 0xF2);
const TICK: RGBColor = RGBColor(0x4A, 0x4A, 0x4A);

fn rgb(color: Rgb) -> RGBColor {
    RGBColor(color.0, color.1, color.2)
}

/// Value range with a little headroom; flat series get a unit band.
fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    let span = hi - lo;
    if span.abs() < f64::EPSILON {
        (lo - 1.0, hi + 1.0)
    } else {
        (lo - span * 0.05, hi + span * 0.05)
    }
}

fn draw_bars(
    path: &Path,
    size: (u32, u32),
    spec: &ChartSpec,
    bars: &[(String, f64)],
) -> DrawResult {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let top = bars.iter().map(|(_, v)| *v).fold(0.0, f64::max);
    let y_max = if top > 0.0 { top * 1.1 } else { 1.0 };
    let mut chart = ChartBuilder::on(&root)
        .caption(
            &spec.heading,
            (FONT_FAMILY, 36.0).into_font().style(FontStyle::Bold).color(&INK),
        )
        .margin(24)
        .x_label_area_size(90)
        .y_label_area_size(90)
        .build_cartesian_2d((0..bars.len()).into_segmented(), 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .bold_line_style(&GRID)
        .x_labels(bars.len())
        .x_label_formatter(&|v: &SegmentValue<usize>| match v {
            SegmentValue::CenterOf(i) => bars.get(*i).map(|(l, _)| l.clone()).unwrap_or_default(),
            _ => String::new(),
        })
        .label_style((FONT_FAMILY, 18.0).into_font().color(&TICK))
        .x_desc(spec.x_label.clone())
        .y_desc(spec.y_label.clone())
        .axis_desc_style((FONT_FAMILY, 22.0).into_font().color(&INK))
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(rgb(spec.color).filled())
            .margin(12)
            .data(bars.iter().enumerate().map(|(i, (_, v))| (i, *v))),
    )?;

    root.present()?;
    Ok(())
}

fn draw_line(path: &Path, size: (u32, u32), spec: &ChartSpec, values: &[f64]) -> DrawResult {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let x_max = values.len().saturating_sub(1).max(1) as f64;
    let (y_lo, y_hi) = padded_range(values.iter().copied());
    let mut chart = ChartBuilder::on(&root)
        .caption(
            &spec.heading,
            (FONT_FAMILY, 36.0).into_font().style(FontStyle::Bold).color(&INK),
        )
        .margin(24)
        .x_label_area_size(70)
        .y_label_area_size(90)
        .build_cartesian_2d(0f64..x_max, y_lo..y_hi)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .bold_line_style(&GRID)
        .x_label_formatter(&|x: &f64| format!("{x:.0}"))
        .label_style((FONT_FAMILY, 18.0).into_font().color(&TICK))
        .x_desc(spec.x_label.clone())
        .y_desc(spec.y_label.clone())
        .axis_desc_style((FONT_FAMILY, 22.0).into_font().color(&INK))
        .draw()?;

    chart.draw_series(LineSeries::new(
        values.iter().enumerate().map(|(i, v)| (i as f64, *v)),
        rgb(spec.color).stroke_width(3),
    ))?;

    root.present()?;
    Ok(())
}

fn draw_time_series(
    path: &Path,
    size: (u32, u32),
    spec: &ChartSpec,
    points: &[(NaiveDateTime, f64)],
) -> DrawResult {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let xs: Vec<(f64, f64)> = points
        .iter()
        .map(|(at, v)| (at.and_utc().timestamp() as f64, *v))
        .collect();
    let (mut x_lo, mut x_hi) = padded_range(xs.iter().map(|(x, _)| *x));
    if xs.len() == 1 {
        x_lo = xs[0].0 - 86_400.0;
        x_hi = xs[0].0 + 86_400.0;
    }
    let (y_lo, y_hi) = padded_range(xs.iter().map(|(_, y)| *y));
    let color = rgb(spec.color);

    let mut chart = ChartBuilder::on(&root)
        .caption(
            &spec.heading,
            (FONT_FAMILY, 36.0).into_font().style(FontStyle::Bold).color(&INK),
        )
        .margin(24)
        .x_label_area_size(90)
        .y_label_area_size(90)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .bold_line_style(&GRID)
        .x_labels(8)
        .x_label_formatter(&|x: &f64| {
            DateTime::from_timestamp(*x as i64, 0)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        })
        .label_style((FONT_FAMILY, 18.0).into_font().color(&TICK))
        .x_desc(spec.x_label.clone())
        .y_desc(spec.y_label.clone())
        .axis_desc_style((FONT_FAMILY, 22.0).into_font().color(&INK))
        .draw()?;

    chart.draw_series(LineSeries::new(xs.iter().copied(), color.stroke_width(3)))?;
    chart.draw_series(xs.iter().map(|&(x, y)| Circle::new((x, y), 5, color.filled())))?;

    root.present()?;
    Ok(())
}

/// Render one chart to `path`.
pub fn render_chart(spec: &ChartSpec, path: &Path, size: (u32, u32)) -> Result<(), RenderError> {
    let drawn = match &spec.data {
        ChartData::Bars(bars) => draw_bars(path, size, spec, bars),
        ChartData::Line(values) => draw_line(path, size, spec, values),
        ChartData::TimeSeries(points) => draw_time_series(path, size, spec, points),
    };
    drawn.map_err(|e| RenderError::chart(&spec.file_name, e))
}

/// Render every planned chart into `dir`.
///
/// A chart that fails to render is logged and left out of the result.
pub fn render_charts(
    specs: &[ChartSpec],
    dir: &Path,
    config: &ChartsConfig,
) -> Vec<ChartArtifact> {
    if specs.is_empty() {
        return Vec::new();
    }
    if let Err(e) = register_fonts() {
        warn!(error = %e, "Chart text cannot be drawn, skipping charts");
        return Vec::new();
    }
    if let Err(e) = std::fs::create_dir_all(dir) {
        warn!(dir = %dir.display(), error = %e, "Cannot create chart directory");
        return Vec::new();
    }

    let size = (config.width_px, config.height_px);
    let mut artifacts = Vec::with_capacity(specs.len());
    for spec in specs {
        let path = dir.join(&spec.file_name);
        match render_chart(spec, &path, size) {
            Ok(()) => {
                debug!(chart = %spec.file_name, "Rendered chart");
                artifacts.push(ChartArtifact {
                    path,
                    title: spec.title.clone(),
                    description: spec.caption.clone(),
                    width_px: config.width_px,
                    height_px: config.height_px,
                });
            }
            Err(e) => warn!(chart = %spec.file_name, error = %e, "Skipping chart"),
        }
    }
    info!(rendered = artifacts.len(), planned = specs.len(), "Charts rendered");
    artifacts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::{NAVY, plan_charts};
    use insightforge_analytics::data::value::parse_datetime;
    use insightforge_analytics::data::{Dataset, Value};
    use pretty_assertions::assert_eq;

    const PNG_MAGIC: &[u8] = b"\x89PNG";

    #[test]
    fn test_padded_range() {
        assert_eq!(padded_range([2.0, 2.0].into_iter()), (1.0, 3.0));
        assert_eq!(padded_range(std::iter::empty()), (0.0, 1.0));
        let (lo, hi) = padded_range([0.0, 100.0].into_iter());
        assert_eq!((lo, hi), (-5.0, 105.0));
    }

    #[test]
    fn test_embedded_fonts_register() {
        assert!(register_fonts().is_ok());
        // Second call reuses the first registration.
        assert!(register_fonts().is_ok());
    }

    #[test]
    fn test_render_charts_writes_pngs() {
        let dir = tempfile::tempdir().unwrap();
        let rows = [
            ("Retail", 12.5),
            ("Travel", 8.0),
            ("Retail", 3.25),
            ("Food", 1.0),
        ]
        .into_iter()
        .map(|(category, spend)| vec![Value::Text(category.into()), Value::Float(spend)])
        .collect();
        let ds = Dataset::new(vec!["category".into(), "spend".into()], rows);
        let config = ChartsConfig {
            width_px: 640,
            height_px: 360,
            ..ChartsConfig::default()
        };
        let specs = plan_charts(&ds, &config);
        assert!(!specs.is_empty());

        let charts_dir = dir.path().join("charts");
        let artifacts = render_charts(&specs, &charts_dir, &config);

        assert_eq!(artifacts.len(), specs.len());
        for (artifact, spec) in artifacts.iter().zip(&specs) {
            assert_eq!(artifact.path, charts_dir.join(&spec.file_name));
            assert_eq!((artifact.width_px, artifact.height_px), (640, 360));
            let bytes = std::fs::read(&artifact.path).unwrap();
            assert!(bytes.starts_with(PNG_MAGIC));
        }
    }

    #[test]
    fn test_render_each_chart_kind() {
        let dir = tempfile::tempdir().unwrap();
        let spec = |file_name: &str, data: ChartData| ChartSpec {
            file_name: file_name.into(),
            title: "T".into(),
            heading: "Heading".into(),
            caption: "c".into(),
            x_label: "x".into(),
            y_label: "y".into(),
            color: NAVY,
            data,
        };
        let day = |d: &str| parse_datetime(d).unwrap();
        let specs = [
            spec("bars.png", ChartData::Bars(vec![("a".into(), 2.0), ("b".into(), 0.0)])),
            spec("line.png", ChartData::Line(vec![5.0])),
            spec(
                "series.png",
                ChartData::TimeSeries(vec![(day("2024-01-01"), 1.0), (day("2024-01-03"), 0.0)]),
            ),
        ];
        let artifacts = render_charts(&specs, dir.path(), &ChartsConfig::default());
        let names: Vec<_> = artifacts
            .iter()
            .map(|a| a.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["bars.png", "line.png", "series.png"]);
    }

    #[test]
    fn test_render_charts_empty_plan_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let charts_dir = dir.path().join("charts");
        let artifacts = render_charts(&[], &charts_dir, &ChartsConfig::default());
        assert!(artifacts.is_empty());
        assert!(!charts_dir.exists());
    }

    #[test]
    fn test_render_failure_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the chart directory should be.
        let blocked = dir.path().join("charts");
        std::fs::write(&blocked, b"").unwrap();
        let spec = ChartSpec {
            file_name: "x.png".into(),
            title: "X".into(),
            heading: "X".into(),
            caption: "x".into(),
            x_label: "i".into(),
            y_label: "v".into(),
            color: NAVY,
            data: ChartData::Line(vec![1.0, 2.0]),
        };
        let artifacts = render_charts(&[spec], &blocked, &ChartsConfig::default());
        assert!(artifacts.is_empty());
    }
}
