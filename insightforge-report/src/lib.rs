//! # insightforge-report
//!
//! Chart planning and rendering, the PDF brief, the slide deck, and the
//! [`Pipeline`] that runs every stage from input directory to documents.

pub mod charts;
pub mod pdf;
pub mod pipeline;
pub mod slides;

pub use charts::{ChartArtifact, ChartSpec, plan_charts, render_charts};
pub use pdf::build_pdf;
pub use pipeline::{CLEANED_CSV_NAME, Pipeline, PipelineReport};
pub use slides::build_slides;
