//! Model analysis through the pipeline with stub models.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use image::RgbImage;
use structpdf::{
    Analyzer, AnalyzerConfig, BBox, BlockCategory, DiagnosticKind, Document, LayoutBlock,
    LayoutDetector, MemoryWriter, Page, ParseMode, Pipeline, Recognition, Result, TextRecognizer,
};

/// Detects one paragraph in the upper half of the raster.
struct HalfPageLayout;

impl LayoutDetector for HalfPageLayout {
    fn detect_layout(&self, image: &RgbImage) -> Result<Vec<LayoutBlock>> {
        let (w, h) = (image.width() as f32, image.height() as f32);
        Ok(vec![LayoutBlock::new(
            BBox::new(0.1 * w, 0.1 * h, 0.9 * w, 0.5 * h),
            BlockCategory::PlainText,
        )])
    }
}

struct CountingOcr {
    calls: AtomicUsize,
}

impl TextRecognizer for CountingOcr {
    fn recognize_text(&self, _image: &RgbImage, _region: &BBox) -> Result<Recognition> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Recognition::new(format!("recognized text {}", n), 0.93))
    }
}

struct HangingOcr;

impl TextRecognizer for HangingOcr {
    fn recognize_text(&self, _image: &RgbImage, _region: &BBox) -> Result<Recognition> {
        thread::sleep(Duration::from_millis(300));
        Ok(Recognition::new("too late", 1.0))
    }
}

fn scanned_page() -> Page {
    Page::new(300.0, 400.0)
        .with_image_region(BBox::new(0.0, 0.0, 300.0, 400.0))
        .with_raster(RgbImage::new(600, 800))
}

#[test]
fn test_scanned_document_analyzed_and_recognized() {
    let ocr = Arc::new(CountingOcr {
        calls: AtomicUsize::new(0),
    });
    let analyzer = Analyzer::new(AnalyzerConfig::default())
        .with_layout_detector(Arc::new(HalfPageLayout))
        .with_text_recognizer(ocr.clone());

    let result = Pipeline::new()
        .with_analyzer(analyzer)
        .sequential()
        .process(Document::new(vec![scanned_page()]))
        .unwrap();

    assert_eq!(result.middle().parse_mode(), ParseMode::Ocr);
    assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
    assert!(result.diagnostics().is_empty());

    let page = &result.middle().pages()[0];
    assert_eq!(page.blocks.len(), 1);
    assert_eq!(page.blocks[0].bbox, BBox::new(30.0, 40.0, 270.0, 200.0));
    assert_eq!(result.get_markdown("images").unwrap(), "recognized text 0");
}

#[test]
fn test_model_timeout_degrades_without_failing() {
    let config = AnalyzerConfig::default().with_ocr_timeout(Duration::from_millis(30));
    let analyzer = Analyzer::new(config)
        .with_layout_detector(Arc::new(HalfPageLayout))
        .with_text_recognizer(Arc::new(HangingOcr));

    let result = Pipeline::new()
        .with_analyzer(analyzer)
        .process(Document::new(vec![scanned_page(), scanned_page()]))
        .unwrap();

    let timeouts: Vec<usize> = result
        .diagnostics()
        .iter()
        .filter(|d| d.kind == DiagnosticKind::ModelTimeout)
        .map(|d| d.page_idx)
        .collect();
    assert_eq!(timeouts, vec![0, 1]);
    assert_eq!(result.get_markdown("images").unwrap(), "");
    assert_eq!(result.middle().page_count(), 2);
}

#[test]
fn test_existing_model_output_is_kept() {
    let page = scanned_page()
        .with_block(LayoutBlock::new(BBox::new(10.0, 10.0, 290.0, 60.0), BlockCategory::Title))
        .with_detection(structpdf::OcrDetection::new(
            "Given title",
            BBox::new(20.0, 20.0, 200.0, 50.0),
            0.99,
        ));
    let ocr = Arc::new(CountingOcr {
        calls: AtomicUsize::new(0),
    });
    let analyzer = Analyzer::new(AnalyzerConfig::default())
        .with_layout_detector(Arc::new(HalfPageLayout))
        .with_text_recognizer(ocr.clone());

    let analyzed = analyzer.analyze(Document::new(vec![page]), true);
    assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    assert_eq!(analyzed.document().pages()[0].layout_blocks.len(), 1);

    let writer = MemoryWriter::new();
    analyzed.draw_model(&writer, "doc_model.pdf").unwrap();
    assert!(writer.get("doc_model.pdf").unwrap().starts_with(b"%PDF"));

    let result = analyzed.pipe_ocr_mode(&Default::default());
    assert_eq!(result.get_markdown("images").unwrap(), "# Given title");
}
