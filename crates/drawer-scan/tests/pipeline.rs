use drawer_scan::{
    CellDefinition, DrawerScanner, LayoutTemplate, ScanConfig, ScanError, SizeClass, TextError,
    TextExtractor,
};
use drawer_scan_aruco::DICT_4X4_50;
use image::{Rgb, RgbImage};

const CELL: u32 = 10;
// Saturated enough not to count as label white.
const BACKGROUND: Rgb<u8> = Rgb([230, 160, 60]);
const LABEL: Rgb<u8> = Rgb([245, 245, 245]);

fn fill(img: &mut RgbImage, x0: u32, y0: u32, w: u32, h: u32, color: Rgb<u8>) {
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            img.put_pixel(x, y, color);
        }
    }
}

/// Upright marker; `(x0, y0)` is the top-left pixel of the black border.
fn draw_marker(img: &mut RgbImage, id: usize, x0: u32, y0: u32) {
    let code = DICT_4X4_50.codes[id];
    for cy in 0..6u32 {
        for cx in 0..6u32 {
            let border = cx == 0 || cy == 0 || cx == 5 || cy == 5;
            let black = border || (code >> ((cy - 1) * 4 + (cx - 1))) & 1 == 1;
            let color = if black { Rgb([15, 15, 15]) } else { Rgb([240, 240, 240]) };
            fill(img, x0 + cx * CELL, y0 + cy * CELL, CELL, CELL, color);
        }
    }
}

/// 1000×700 photo; the case corners land at (79.5, 79.5), (919.5, 79.5),
/// (919.5, 619.5) and (79.5, 619.5).
fn case_photo() -> RgbImage {
    let mut img = RgbImage::from_pixel(1000, 700, BACKGROUND);
    draw_marker(&mut img, 1, 20, 20);
    draw_marker(&mut img, 3, 920, 20);
    draw_marker(&mut img, 4, 20, 620);
    draw_marker(&mut img, 2, 920, 620);
    // Labels for drawers (1,1) and (1,2); drawer (2,1) is empty.
    fill(&mut img, 190, 180, 200, 50, LABEL);
    fill(&mut img, 610, 180, 200, 50, LABEL);
    img
}

fn layout() -> LayoutTemplate {
    let cell = |row, col| CellDefinition {
        row,
        col,
        size: "standard".to_string(),
    };
    LayoutTemplate {
        name: "Bench 2x2".to_string(),
        columns: 2,
        rows: 2,
        cells: vec![cell(1, 1), cell(1, 2), cell(2, 1)],
    }
}

fn sizes() -> Vec<SizeClass> {
    vec![SizeClass {
        name: "standard".to_string(),
        width_units: 1,
        height_units: 1,
    }]
}

/// Answers with the crop size.
struct SizeReader;

impl TextExtractor for SizeReader {
    fn name(&self) -> &str {
        "size-reader"
    }

    fn extract_text(&self, crop: &RgbImage) -> Result<String, TextError> {
        Ok(format!("  {}x{}  ", crop.width(), crop.height()))
    }
}

struct Offline;

impl TextExtractor for Offline {
    fn name(&self) -> &str {
        "offline"
    }

    fn extract_text(&self, _crop: &RgbImage) -> Result<String, TextError> {
        Err(TextError::Status(503))
    }
}

struct NoisyEngine;

impl TextExtractor for NoisyEngine {
    fn name(&self) -> &str {
        "noisy"
    }

    fn extract_text(&self, _crop: &RgbImage) -> Result<String, TextError> {
        Ok("| M3  screws |\n".to_string())
    }

    fn needs_cleanup(&self) -> bool {
        true
    }
}

#[test]
fn scan_reads_labels_in_layout_order_and_writes_artifacts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("run");
    let scanner =
        DrawerScanner::new(ScanConfig::default(), Box::new(SizeReader)).expect("scanner");

    let outcome = scanner
        .scan(&case_photo(), &layout(), &sizes(), Some(&out))
        .expect("scan");

    let w = outcome.rectified.image.width();
    let h = outcome.rectified.image.height();
    assert!((839..=841).contains(&w), "width {w}");
    assert!((539..=541).contains(&h), "height {h}");

    let cells: Vec<(u32, u32)> = outcome.results().iter().map(|r| (r.row, r.col)).collect();
    assert_eq!(cells, vec![(1, 1), (1, 2), (2, 1)]);
    assert!(outcome.results()[0].has_text());
    assert!(outcome.results()[1].has_text());
    assert_eq!(outcome.results()[2].text, "");
    // Trimmed backend output.
    assert!(!outcome.results()[0].text.starts_with(' '));
    assert_eq!(outcome.summary_line(), "2 of 3 cells have detected text");

    for name in [
        "rectified.png",
        "debug_detection.png",
        "label_r1_c1.png",
        "label_r1_c2.png",
        "ocr_results.json",
        "scan_report.json",
    ] {
        assert!(out.join(name).is_file(), "{name} missing");
    }
    assert!(!out.join("label_r2_c1.png").exists());
    assert!(!out.join("debug_mask_1.png").exists());

    let raw = std::fs::read_to_string(out.join("ocr_results.json")).expect("results");
    let records: Vec<serde_json::Value> = serde_json::from_str(&raw).expect("json");
    assert_eq!(records.len(), 3);
    assert_eq!(records[2], serde_json::json!({"row": 2, "col": 1, "text": ""}));

    let report: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(out.join("scan_report.json")).expect("report"),
    )
    .expect("json");
    assert_eq!(report["layout"], "Bench 2x2");
    assert_eq!(report["mapping"]["policy"], "variable_size");
    assert_eq!(report["summary"]["cells_with_text"], 2);
}

#[test]
fn crops_are_padded_label_boxes() {
    let scanner = DrawerScanner::new(ScanConfig::default(), Box::new(SizeReader)).expect("scanner");
    let outcome = scanner
        .scan(&case_photo(), &layout(), &sizes(), None)
        .expect("scan");
    assert_eq!(outcome.report.candidates.len(), 2);
    assert_eq!(outcome.report.mapping.assignments.len(), 2);
    // Labels are 200×50; the padded crop loses 3 px per side.
    let text = &outcome.results()[0].text;
    let (cw, ch) = text.split_once('x').expect("size text");
    let (cw, ch): (u32, u32) = (cw.parse().expect("w"), ch.parse().expect("h"));
    assert!((192..=196).contains(&cw), "crop width {cw}");
    assert!((42..=46).contains(&ch), "crop height {ch}");
}

#[test]
fn text_failures_leave_cells_empty() {
    let scanner = DrawerScanner::new(ScanConfig::default(), Box::new(Offline)).expect("scanner");
    let outcome = scanner
        .scan(&case_photo(), &layout(), &sizes(), None)
        .expect("scan continues");
    assert_eq!(outcome.results().len(), 3);
    assert!(outcome.results().iter().all(|r| r.text.is_empty()));
    assert_eq!(outcome.summary_line(), "0 of 3 cells have detected text");
}

#[test]
fn engine_output_is_cleaned_when_requested() {
    let scanner = DrawerScanner::new(ScanConfig::default(), Box::new(NoisyEngine)).expect("scanner");
    let outcome = scanner
        .scan(&case_photo(), &layout(), &sizes(), None)
        .expect("scan");
    assert_eq!(outcome.results()[0].text, "M3 screws");
}

#[test]
fn uniform_policy_without_size_metadata() {
    let scanner =
        DrawerScanner::new(ScanConfig::default(), Box::new(SizeReader)).expect("scanner");
    let outcome = scanner
        .scan(&case_photo(), &layout(), &[], None)
        .expect("scan");
    assert_eq!(
        outcome.report.mapping.policy,
        drawer_scan::MappingPolicy::Uniform
    );
    assert_eq!(outcome.summary().cells_with_text, 2);
}

#[test]
fn debug_masks_are_written_when_kept() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = ScanConfig::default();
    config.candidates.keep_masks = true;
    let scanner = DrawerScanner::new(config, Box::new(SizeReader)).expect("scanner");
    scanner
        .scan(&case_photo(), &layout(), &sizes(), Some(dir.path()))
        .expect("scan");
    for i in 1..=3 {
        assert!(dir.path().join(format!("debug_mask_{i}.png")).is_file());
    }
}

#[test]
fn photo_without_markers_is_fatal() {
    let scanner =
        DrawerScanner::new(ScanConfig::default(), Box::new(SizeReader)).expect("scanner");
    let blank = RgbImage::from_pixel(400, 300, BACKGROUND);
    let err = scanner
        .scan(&blank, &layout(), &sizes(), None)
        .expect_err("no fiducials");
    assert!(matches!(err, ScanError::Fiducial(_)));
    assert!(err.to_string().contains("missing case corners"));
}
