//! End-to-end runs of the reporting pipeline against temporary input
//! directories, with the collaborator either disabled or mocked.

use insightforge_analytics::insights::InsightSource;
use insightforge_core::config::ForgeConfig;
use insightforge_core::error::{ForgeError, IngestError};
use insightforge_core::providers::MockTextGenerator;
use insightforge_report::{CLEANED_CSV_NAME, Pipeline};
use std::io::Read;
use std::path::Path;

const EVENTS_CSV: &str = "\
category,activity,ad_keywords,event_date,spend
Retail,1,summer sale,2024-01-01,12.5
Retail,0,summer sale,2024-01-02,
Travel,1,cheap flights,not a date,8.0
,1,cheap flights,2024-01-04,3.25
Travel,0,NA,2024-01-05,1.0
";

fn config_for(root: &Path) -> ForgeConfig {
    let mut config = ForgeConfig::default();
    config.input.dir = root.join("input");
    config.output.dir = root.join("output");
    config.charts.enabled = false;
    config
}

fn write_input(root: &Path, name: &str, contents: &str) {
    let input = root.join("input");
    std::fs::create_dir_all(&input).unwrap();
    std::fs::write(input.join(name), contents).unwrap();
}

fn slide_text(deck: &Path, part: &str) -> String {
    let mut archive = zip::ZipArchive::new(std::fs::File::open(deck).unwrap()).unwrap();
    let mut entry = archive.by_name(part).unwrap();
    let mut text = String::new();
    entry.read_to_string(&mut text).unwrap();
    text
}

#[tokio::test]
async fn test_empty_input_halts_without_output() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("input")).unwrap();
    let config = config_for(dir.path());

    let result = Pipeline::new(config.clone()).without_llm().run().await;

    assert!(matches!(
        result,
        Err(ForgeError::Ingest(IngestError::NoData { .. }))
    ));
    assert!(!config.output.dir.exists());
}

#[tokio::test]
async fn test_missing_input_dir_halts() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());

    let result = Pipeline::new(config.clone()).without_llm().run().await;

    assert!(result.is_err());
    assert!(!config.output.dir.exists());
}

#[tokio::test]
async fn test_local_run_writes_all_documents() {
    let dir = tempfile::tempdir().unwrap();
    write_input(dir.path(), "events.csv", EVENTS_CSV);
    let config = config_for(dir.path());

    let report = Pipeline::new(config.clone()).without_llm().run().await.unwrap();

    assert_eq!(report.rows, 5);
    assert_eq!(report.columns, 5);
    assert_eq!(report.sources, 1);
    assert_eq!(report.insight_source, InsightSource::Local);
    assert!(report.charts.is_empty());
    assert!(report.pdf_path.ends_with("InsightForge_Report.pdf"));
    assert!(report.slides_path.ends_with("InsightForge_Report.pptx"));

    let pdf = std::fs::read(&report.pdf_path).unwrap();
    assert!(pdf.starts_with(b"%PDF"));

    let cover = slide_text(&report.slides_path, "ppt/slides/slide1.xml");
    assert!(cover.contains("InsightForge Executive Brief"));
    assert!(cover.contains("Automated insight pack"));

    let csv_path = report.cleaned_csv.unwrap();
    assert_eq!(csv_path, config.output.dir.join(CLEANED_CSV_NAME));
    let cleaned = std::fs::read_to_string(csv_path).unwrap();
    let lines: Vec<&str> = cleaned.lines().collect();
    assert_eq!(lines[0], "category,activity,ad_keywords,event_date,spend");
    assert_eq!(lines[2], "Retail,0,summer sale,2024-01-02,0.0");
    assert_eq!(lines[3], "Travel,1,cheap flights,,8.0");
    assert_eq!(lines[4], "N/A,1,cheap flights,2024-01-04,3.25");
    assert_eq!(lines[5], "Travel,0,N/A,2024-01-05,1.0");
}

#[tokio::test]
async fn test_collaborator_insights_reach_the_deck() {
    let dir = tempfile::tempdir().unwrap();
    write_input(dir.path(), "events.csv", EVENTS_CSV);
    let config = config_for(dir.path());
    let mock = MockTextGenerator::with_response(
        r#"```json
{"overview": ["Travel demand is outpacing retail."], "summary": ["Shift budget to travel."]}
```"#,
    );

    let report = Pipeline::new(config)
        .with_generator(Box::new(mock))
        .run()
        .await
        .unwrap();

    assert_eq!(
        report.insight_source,
        InsightSource::Llm {
            model: "mock-model".into()
        }
    );
    let overview = slide_text(&report.slides_path, "ppt/slides/slide2.xml");
    assert!(overview.contains("Executive Overview"));
    assert!(overview.contains("Travel demand is outpacing retail."));
    let closing = slide_text(&report.slides_path, "ppt/slides/slide3.xml");
    assert!(closing.contains("Closing Summary"));
}

#[tokio::test]
async fn test_unreadable_file_is_skipped_and_sources_combine() {
    let dir = tempfile::tempdir().unwrap();
    write_input(dir.path(), "events.csv", EVENTS_CSV);
    write_input(
        dir.path(),
        "extra.json",
        r#"[{"category": "Food", "activity": 1, "ad_keywords": "lunch deals"}]"#,
    );
    write_input(dir.path(), "broken.json", "{ not json");
    let mut config = config_for(dir.path());
    config.output.export_cleaned_csv = false;

    let report = Pipeline::new(config).without_llm().run().await.unwrap();

    assert_eq!(report.rows, 6);
    assert_eq!(report.sources, 2);
    assert_eq!(report.skipped_sources, 1);
    assert!(report.cleaned_csv.is_none());
    assert!(report.slides_path.exists());
}

#[tokio::test]
async fn test_charts_are_rendered_and_embedded() {
    let dir = tempfile::tempdir().unwrap();
    write_input(dir.path(), "events.csv", EVENTS_CSV);
    let mut config = config_for(dir.path());
    config.charts.enabled = true;
    config.charts.width_px = 640;
    config.charts.height_px = 360;

    let report = Pipeline::new(config.clone()).without_llm().run().await.unwrap();

    let names: Vec<String> = report
        .charts
        .iter()
        .map(|c| c.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert!(names.contains(&"events_by_category.png".to_string()));
    assert!(names.contains(&"time_series.png".to_string()));
    for chart in &report.charts {
        assert!(chart.path.starts_with(config.output.charts_dir()));
        let bytes = std::fs::read(&chart.path).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
    }

    let archive = zip::ZipArchive::new(std::fs::File::open(&report.slides_path).unwrap()).unwrap();
    let media = archive
        .file_names()
        .filter(|name| name.starts_with("ppt/media/"))
        .count();
    assert_eq!(media, report.charts.len());
    assert!(report.pdf_path.exists());
}
