//! Slide deck (`.pptx`) assembly.
//!
//! The deck is a zip of OOXML parts. [`plan_slides`] decides which slides
//! exist and in what order; [`build_slides`] renders each part from
//! [`templates`] and writes the package.

pub mod templates;

use crate::charts::ChartArtifact;
use chrono::{DateTime, Local};
use handlebars::Handlebars;
use insightforge_analytics::insights::InsightSections;
use insightforge_core::config::ReportConfig;
use insightforge_core::error::RenderError;
use serde::Serialize;
use serde_json::json;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const ACCENT_HEX: &str = "1F4E79";
const BODY_FONT: &str = "Calibri";

// Chart placement in EMU (914400 per inch).
const PICTURE_LEFT: u64 = 822_960;
const PICTURE_TOP: u64 = 1_097_280;
const PICTURE_MAX_W: u64 = 7_315_200;
const PICTURE_MAX_H: u64 = 4_480_560;

/// One planned slide.
#[derive(Debug, Clone, PartialEq)]
pub enum Slide {
    Cover { title: String, subtitle: String },
    Bullets { title: String, bullets: Vec<String> },
    Chart(ChartArtifact),
}

impl Slide {
    pub fn title(&self) -> &str {
        match self {
            Slide::Cover { title, .. } | Slide::Bullets { title, .. } => title,
            Slide::Chart(chart) => &chart.title,
        }
    }
}

fn section_slide(title: &str, bullets: &[String], limit: usize) -> Option<Slide> {
    let bullets: Vec<String> = bullets
        .iter()
        .filter(|b| !b.trim().is_empty())
        .take(limit)
        .cloned()
        .collect();
    (!bullets.is_empty()).then(|| Slide::Bullets {
        title: title.to_string(),
        bullets,
    })
}

/// Slide order: cover, five section slides, one slide per chart, closing summary.
/// Sections without bullets get no slide.
pub fn plan_slides(
    sections: &InsightSections,
    charts: &[ChartArtifact],
    report: &ReportConfig,
    generated_at: &DateTime<Local>,
) -> Vec<Slide> {
    let mut slides = vec![Slide::Cover {
        title: report.title.clone(),
        subtitle: format!(
            "Automated insight pack \u{2022} {}",
            generated_at.format("%d %b %Y %H:%M")
        ),
    }];

    let front = [
        ("Executive Overview", &sections.overview, report.section_limit),
        ("Key Metrics", &sections.key_metrics, report.section_limit),
        ("Trend Signals", &sections.trends, report.section_limit),
        ("Anomalies & Watchouts", &sections.anomalies, report.watchout_limit),
        (
            "Strategic Recommendations",
            &sections.recommendations,
            report.watchout_limit,
        ),
    ];
    slides.extend(
        front
            .into_iter()
            .filter_map(|(title, bullets, limit)| section_slide(title, bullets, limit)),
    );
    slides.extend(charts.iter().cloned().map(Slide::Chart));
    slides.extend(section_slide(
        "Closing Summary",
        &sections.summary,
        report.section_limit,
    ));
    slides
}

/// Picture extent in EMU: full chart width, shrunk to fit above the caption.
fn fit_picture(width_px: u32, height_px: u32) -> (u64, u64) {
    if width_px == 0 || height_px == 0 {
        return (PICTURE_MAX_W, PICTURE_MAX_W * 9 / 16);
    }
    let (w, h) = (u64::from(width_px), u64::from(height_px));
    let cy = PICTURE_MAX_W * h / w;
    if cy <= PICTURE_MAX_H {
        (PICTURE_MAX_W, cy)
    } else {
        (PICTURE_MAX_H * w / h, PICTURE_MAX_H)
    }
}

#[derive(Serialize)]
struct TitleBox {
    y: u64,
    cy: u64,
    size: u32,
    align: &'static str,
    anchor: &'static str,
}

impl TitleBox {
    const COVER: TitleBox = TitleBox {
        y: 2_286_000,
        cy: 1_470_025,
        size: 4000,
        align: "ctr",
        anchor: "b",
    };
    const HEADER: TitleBox = TitleBox {
        y: 274_638,
        cy: 1_143_000,
        size: 3200,
        align: "l",
        anchor: "ctr",
    };
}

#[derive(Serialize)]
struct Picture {
    media: String,
    x: u64,
    y: u64,
    cx: u64,
    cy: u64,
}

#[derive(Serialize)]
struct SlideContext<'a> {
    title: &'a str,
    subtitle: Option<&'a str>,
    bullets: &'a [String],
    picture: Option<Picture>,
    caption: Option<&'a str>,
    title_box: TitleBox,
    accent: &'static str,
    font: &'static str,
}

#[derive(Serialize)]
struct SlideEntry {
    number: usize,
    id: usize,
    rel_id: String,
}

struct RenderedSlide {
    xml: String,
    rels: String,
    media: Option<(String, Vec<u8>)>,
}

fn registry() -> Result<Handlebars<'static>, RenderError> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(false);
    for (name, source) in templates::dynamic_templates() {
        handlebars
            .register_template_string(name, source)
            .map_err(|e| RenderError::slides(format!("template {name}: {e}")))?;
    }
    Ok(handlebars)
}

fn render<T: Serialize>(
    handlebars: &Handlebars<'_>,
    name: &str,
    data: &T,
) -> Result<String, RenderError> {
    handlebars
        .render(name, data)
        .map_err(|e| RenderError::slides(format!("template {name}: {e}")))
}

fn render_slide(
    handlebars: &Handlebars<'_>,
    slide: &Slide,
    media_index: usize,
) -> Result<RenderedSlide, RenderError> {
    let (context, media) = match slide {
        Slide::Cover { title, subtitle } => (
            SlideContext {
                title,
                subtitle: Some(subtitle),
                bullets: &[],
                picture: None,
                caption: None,
                title_box: TitleBox::COVER,
                accent: ACCENT_HEX,
                font: BODY_FONT,
            },
            None,
        ),
        Slide::Bullets { title, bullets } => (
            SlideContext {
                title,
                subtitle: None,
                bullets,
                picture: None,
                caption: None,
                title_box: TitleBox::HEADER,
                accent: ACCENT_HEX,
                font: BODY_FONT,
            },
            None,
        ),
        Slide::Chart(chart) => {
            let bytes = std::fs::read(&chart.path).map_err(|e| {
                RenderError::slides(format!("cannot read chart {}: {e}", chart.path.display()))
            })?;
            let media = format!("image{media_index}.png");
            let (cx, cy) = fit_picture(chart.width_px, chart.height_px);
            (
                SlideContext {
                    title: &chart.title,
                    subtitle: None,
                    bullets: &[],
                    picture: Some(Picture {
                        media: media.clone(),
                        x: PICTURE_LEFT,
                        y: PICTURE_TOP,
                        cx,
                        cy,
                    }),
                    caption: Some(&chart.description),
                    title_box: TitleBox::HEADER,
                    accent: ACCENT_HEX,
                    font: BODY_FONT,
                },
                Some((media, bytes)),
            )
        }
    };

    Ok(RenderedSlide {
        xml: render(handlebars, templates::SLIDE, &context)?,
        rels: render(handlebars, templates::SLIDE_RELS, &context)?,
        media,
    })
}

fn add_part<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    options: SimpleFileOptions,
    name: &str,
    bytes: &[u8],
) -> Result<(), RenderError> {
    zip.start_file(name, options)
        .map_err(|e| RenderError::slides(format!("{name}: {e}")))?;
    zip.write_all(bytes)
        .map_err(|e| RenderError::slides(format!("{name}: {e}")))
}

/// Write the slide deck to `path`.
///
/// A chart whose image cannot be read is logged and gets no slide.
pub fn build_slides(
    path: &Path,
    sections: &InsightSections,
    charts: &[ChartArtifact],
    report: &ReportConfig,
    generated_at: DateTime<Local>,
) -> Result<PathBuf, RenderError> {
    let handlebars = registry()?;

    let mut rendered = Vec::new();
    for slide in plan_slides(sections, charts, report, &generated_at) {
        let media_index = rendered
            .iter()
            .filter(|s: &&RenderedSlide| s.media.is_some())
            .count()
            + 1;
        match render_slide(&handlebars, &slide, media_index) {
            Ok(r) => rendered.push(r),
            Err(e @ RenderError::Slides { .. }) if matches!(slide, Slide::Chart(_)) => {
                warn!(slide = slide.title(), error = %e, "Leaving chart out of slide deck");
            }
            Err(e) => return Err(e),
        }
    }

    let entries: Vec<SlideEntry> = (1..=rendered.len())
        .map(|number| SlideEntry {
            number,
            id: 255 + number,
            rel_id: format!("rId{}", number + 2),
        })
        .collect();
    let package = json!({
        "slides": entries,
        "slide_count": rendered.len(),
        "title": report.title,
        "brand": report.brand,
        "created": generated_at.to_utc().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
    });

    let file = File::create(path)
        .map_err(|e| RenderError::slides(format!("cannot create {}: {e}", path.display())))?;
    let mut zip = ZipWriter::new(file);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let generated = [
        ("[Content_Types].xml", templates::CONTENT_TYPES),
        ("docProps/core.xml", templates::CORE_PROPS),
        ("docProps/app.xml", templates::APP_PROPS),
        ("ppt/presentation.xml", templates::PRESENTATION),
        ("ppt/_rels/presentation.xml.rels", templates::PRESENTATION_RELS),
    ];
    for (name, template) in generated {
        let xml = render(&handlebars, template, &package)?;
        add_part(&mut zip, options, name, xml.as_bytes())?;
    }
    for part in templates::static_parts() {
        add_part(&mut zip, options, part.path, part.content.as_bytes())?;
    }
    for (number, slide) in rendered.iter().enumerate().map(|(i, s)| (i + 1, s)) {
        add_part(
            &mut zip,
            options,
            &format!("ppt/slides/slide{number}.xml"),
            slide.xml.as_bytes(),
        )?;
        add_part(
            &mut zip,
            options,
            &format!("ppt/slides/_rels/slide{number}.xml.rels"),
            slide.rels.as_bytes(),
        )?;
        if let Some((media, bytes)) = &slide.media {
            add_part(&mut zip, options, &format!("ppt/media/{media}"), bytes)?;
        }
        debug!(number, "Slide written");
    }
    zip.finish()
        .map_err(|e| RenderError::slides(format!("cannot finalize deck: {e}")))?;

    info!(path = %path.display(), slides = rendered.len(), "Slide deck written");
    Ok(path.to_path_buf())
}
