//! # insightforge-analytics
//!
//! Tabular ingestion (CSV, Excel, JSON, SQLite), null cleaning, schema
//! inference, and insight derivation for the InsightForge pipeline.

pub mod data;
pub mod insights;

pub use data::{
    Dataset, DirectoryLoader, IngestSummary, Value, clean_dataset, infer_schema, write_csv,
};
pub use insights::{InsightOutcome, InsightSections, InsightSource, generate_insights};
