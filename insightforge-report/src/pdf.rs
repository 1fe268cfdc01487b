//! PDF brief assembly with printpdf's built-in Helvetica faces.
//!
//! Layout: an accent-banded cover, two summary pages ("Executive Snapshot"
//! and "Risks & Recommended Plays") and one page per chart. Every page
//! carries a `"<brand> - Page N"` footer. Built-in fonts only cover
//! Latin-1, so all text goes through [`latin1_safe`] first.

use crate::charts::ChartArtifact;
use chrono::{DateTime, Local};
use insightforge_analytics::insights::InsightSections;
use insightforge_core::config::ReportConfig;
use insightforge_core::error::RenderError;
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Rect, Rgb, image_crate,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN_X: f32 = 18.0;
const TOP_Y: f32 = 279.0;
const BOTTOM_Y: f32 = 22.0;
const FOOTER_Y: f32 = 10.0;
const IMAGE_W_MM: f32 = 180.0;

const ACCENT: (u8, u8, u8) = (31, 78, 121);
const BODY: (u8, u8, u8) = (40, 40, 40);
const MUTED: (u8, u8, u8) = (80, 80, 80);
const WHITE: (u8, u8, u8) = (255, 255, 255);

const COVER_BLURB: &str = "Automated performance review spanning overview, key metrics, \
     trend diagnostics, anomalies, and recommended next actions.";

fn color((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(Rgb::new(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        None,
    ))
}

/// Reduce text to what the built-in fonts can show.
///
/// Bullets and dashes become `-`, curly quotes become straight ones, and any
/// other character outside Latin-1 becomes `?`.
pub fn latin1_safe(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2022}' | '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            c if u32::from(c) <= 0xFF => c,
            _ => '?',
        })
        .collect()
}

/// Greedy word wrap at `max_chars`. Empty input yields one empty line.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Rough Helvetica advance width, enough for centering.
fn approx_width_mm(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.5 * 0.3528
}

/// Non-blank bullets of each heading, capped at `limit`; empty headings dropped.
fn page_blocks<'a>(
    blocks: &[(&'a str, &'a [String])],
    limit: usize,
) -> Vec<(&'a str, Vec<&'a str>)> {
    blocks
        .iter()
        .filter_map(|(heading, bullets)| {
            let items: Vec<&str> = bullets
                .iter()
                .map(|b| b.as_str())
                .filter(|b| !b.trim().is_empty())
                .take(limit)
                .collect();
            (!items.is_empty()).then_some((*heading, items))
        })
        .collect()
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

impl Fonts {
    fn load(doc: &PdfDocumentReference) -> Result<Self, RenderError> {
        let load = |font: BuiltinFont| doc.add_builtin_font(font).map_err(RenderError::pdf);
        Ok(Self {
            regular: load(BuiltinFont::Helvetica)?,
            bold: load(BuiltinFont::HelveticaBold)?,
            italic: load(BuiltinFont::HelveticaOblique)?,
        })
    }
}

/// Tracks the current page and cursor, breaking pages as text runs out of room.
struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    fonts: &'a Fonts,
    brand: &'a str,
    layer: PdfLayerReference,
    page: usize,
    y: f32,
}

impl<'a> PageWriter<'a> {
    fn new(
        doc: &'a PdfDocumentReference,
        fonts: &'a Fonts,
        brand: &'a str,
        first: PdfLayerReference,
    ) -> Self {
        let writer = Self {
            doc,
            fonts,
            brand,
            layer: first,
            page: 1,
            y: TOP_Y,
        };
        writer.footer();
        writer
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.page += 1;
        self.y = TOP_Y;
        self.footer();
    }

    fn footer(&self) {
        let text = latin1_safe(&format!("{} - Page {}", self.brand, self.page));
        let x = (PAGE_W - approx_width_mm(&text, 9.0)) / 2.0;
        self.layer.set_fill_color(color(ACCENT));
        self.layer
            .use_text(text, 9.0, Mm(x), Mm(FOOTER_Y), &self.fonts.italic);
    }

    fn ensure_room(&mut self, needed_mm: f32) {
        if self.y - needed_mm < BOTTOM_Y {
            self.new_page();
        }
    }

    fn text(
        &mut self,
        text: &str,
        size: f32,
        font: &IndirectFontRef,
        rgb: (u8, u8, u8),
        line_mm: f32,
    ) {
        self.ensure_room(line_mm);
        self.y -= line_mm;
        self.layer.set_fill_color(color(rgb));
        self.layer
            .use_text(latin1_safe(text), size, Mm(MARGIN_X), Mm(self.y), font);
    }

    fn paragraph(
        &mut self,
        text: &str,
        size: f32,
        font: &IndirectFontRef,
        rgb: (u8, u8, u8),
        max_chars: usize,
    ) {
        let line_mm = size * 0.3528 * 1.6;
        for line in wrap_text(text, max_chars) {
            self.text(&line, size, font, rgb, line_mm);
        }
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }
}

fn draw_cover(writer: &mut PageWriter<'_>, title: &str, generated_at: &DateTime<Local>) {
    let fonts = writer.fonts;
    let layer = &writer.layer;

    layer.set_fill_color(color(ACCENT));
    layer.add_rect(
        Rect::new(Mm(0.0), Mm(PAGE_H - 40.0), Mm(PAGE_W), Mm(PAGE_H)).with_mode(PaintMode::Fill),
    );

    let title = latin1_safe(title);
    layer.set_fill_color(color(WHITE));
    layer.use_text(
        title.as_str(),
        24.0,
        Mm((PAGE_W - approx_width_mm(&title, 24.0)) / 2.0),
        Mm(PAGE_H - 22.0),
        &fonts.bold,
    );
    let stamp = format!("Generated {}", generated_at.format("%d %b %Y %H:%M"));
    layer.use_text(
        stamp.as_str(),
        14.0,
        Mm((PAGE_W - approx_width_mm(&stamp, 14.0)) / 2.0),
        Mm(PAGE_H - 33.0),
        &fonts.regular,
    );

    writer.y = PAGE_H - 80.0;
    writer.paragraph(COVER_BLURB, 12.0, &fonts.regular, (60, 60, 60), 80);
}

/// Returns false when every heading was empty and no page was added.
fn draw_summary_page(
    writer: &mut PageWriter<'_>,
    title: &str,
    blocks: &[(&str, &[String])],
    limit: usize,
) -> bool {
    let available = page_blocks(blocks, limit);
    if available.is_empty() {
        return false;
    }
    let fonts = writer.fonts;
    writer.new_page();
    writer.text(title, 18.0, &fonts.bold, ACCENT, 10.0);
    writer.gap(3.0);
    for (heading, items) in available {
        writer.text(heading, 14.0, &fonts.bold, ACCENT, 9.0);
        writer.gap(1.0);
        for bullet in items {
            writer.paragraph(&format!("- {bullet}"), 12.0, &fonts.regular, BODY, 85);
        }
        writer.gap(3.0);
    }
    true
}

fn draw_chart_page(writer: &mut PageWriter<'_>, chart: &ChartArtifact) -> Result<(), RenderError> {
    let decoded = image_crate::open(&chart.path).map_err(|e| {
        RenderError::pdf(format!("cannot read chart {}: {e}", chart.path.display()))
    })?;
    let (width_px, height_px) = (decoded.width(), decoded.height());
    let fonts = writer.fonts;

    writer.new_page();
    writer.text(&chart.title, 16.0, &fonts.bold, ACCENT, 10.0);
    writer.gap(4.0);

    // Scale so the image spans IMAGE_W_MM.
    let dpi = width_px as f32 * 25.4 / IMAGE_W_MM;
    let height_mm = height_px as f32 * 25.4 / dpi;
    let bottom = writer.y - height_mm;
    Image::from_dynamic_image(&decoded).add_to_layer(
        writer.layer.clone(),
        ImageTransform {
            translate_x: Some(Mm((PAGE_W - IMAGE_W_MM) / 2.0)),
            translate_y: Some(Mm(bottom)),
            dpi: Some(dpi),
            ..Default::default()
        },
    );
    writer.y = bottom - 4.0;
    writer.paragraph(&chart.description, 12.0, &fonts.italic, MUTED, 85);
    Ok(())
}

/// Lay the whole brief out on `doc`. Returns the number of pages.
fn compose(
    doc: &PdfDocumentReference,
    first: PdfLayerReference,
    sections: &InsightSections,
    charts: &[ChartArtifact],
    report: &ReportConfig,
    generated_at: &DateTime<Local>,
) -> Result<usize, RenderError> {
    let fonts = Fonts::load(doc)?;
    let mut writer = PageWriter::new(doc, &fonts, &report.brand, first);

    draw_cover(&mut writer, &report.title, generated_at);
    draw_summary_page(
        &mut writer,
        "Executive Snapshot",
        &[
            ("Overview", sections.overview.as_slice()),
            ("Key Metrics", sections.key_metrics.as_slice()),
            ("Trend Diagnostics", sections.trends.as_slice()),
        ],
        report.section_limit,
    );
    draw_summary_page(
        &mut writer,
        "Risks & Recommended Plays",
        &[
            ("Anomalies & Watchouts", sections.anomalies.as_slice()),
            ("Strategic Recommendations", sections.recommendations.as_slice()),
            ("Closing Summary", sections.summary.as_slice()),
        ],
        report.section_limit,
    );

    for chart in charts {
        if let Err(e) = draw_chart_page(&mut writer, chart) {
            warn!(chart = %chart.path.display(), error = %e, "Leaving chart out of PDF");
        }
    }
    Ok(writer.page)
}

/// Write the PDF brief to `path`.
pub fn build_pdf(
    path: &Path,
    sections: &InsightSections,
    charts: &[ChartArtifact],
    report: &ReportConfig,
    generated_at: DateTime<Local>,
) -> Result<PathBuf, RenderError> {
    let (doc, page, layer) =
        PdfDocument::new(latin1_safe(&report.title), Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
    let first = doc.get_page(page).get_layer(layer);
    let pages = compose(&doc, first, sections, charts, report, &generated_at)?;

    let file = File::create(path)
        .map_err(|e| RenderError::pdf(format!("cannot create {}: {e}", path.display())))?;
    doc.save(&mut BufWriter::new(file)).map_err(RenderError::pdf)?;
    info!(path = %path.display(), pages, "PDF written");
    Ok(path.to_path_buf())
}
