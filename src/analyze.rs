//! Model analysis: fill pages with layout detections and OCR results from
//! external models, under a time budget.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError};
use image::RgbImage;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::model::{BBox, Diagnostic, DiagnosticKind, Document, LayoutBlock, OcrDetection, Page};
use crate::pipeline::PipelineConfig;
use crate::render::{model_boxes, render_overlay_pdf};
use crate::writer::DataWriter;
use crate::{classify, ClassifierConfig, ParseMode, PipeResult};

/// Layout detection model.
pub trait LayoutDetector: Send + Sync {
    /// Detect layout regions on a page raster. Boxes are in raster pixels.
    fn detect_layout(&self, image: &RgbImage) -> Result<Vec<LayoutBlock>>;
}

/// Text recognized in one region.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    /// Recognized text
    pub text: String,
    /// Confidence in `[0, 1]`
    pub confidence: f32,
}

impl Recognition {
    /// Create a new recognition result.
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// OCR model.
pub trait TextRecognizer: Send + Sync {
    /// Recognize the text inside `region` (raster pixels) of a page raster.
    fn recognize_text(&self, image: &RgbImage, region: &BBox) -> Result<Recognition>;
}

/// Options for model analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// Time budget for a single model call
    pub ocr_timeout: Duration,

    /// Whether to analyze pages in parallel
    pub parallel: bool,
}

impl AnalyzerConfig {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model call time budget.
    pub fn with_ocr_timeout(mut self, timeout: Duration) -> Self {
        self.ocr_timeout = timeout;
        self
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            ocr_timeout: Duration::from_secs(30),
            parallel: true,
        }
    }
}

/// Runs the layout and OCR models over the pages that need them.
///
/// Pages that already carry layout blocks are not re-detected; pages that
/// already carry OCR detections are not re-recognized.
pub struct Analyzer {
    config: AnalyzerConfig,
    layout: Option<Arc<dyn LayoutDetector>>,
    recognizer: Option<Arc<dyn TextRecognizer>>,
}

impl Analyzer {
    /// Create an analyzer without models.
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            layout: None,
            recognizer: None,
        }
    }

    /// Use a layout detection model.
    pub fn with_layout_detector(mut self, detector: Arc<dyn LayoutDetector>) -> Self {
        self.layout = Some(detector);
        self
    }

    /// Use an OCR model.
    pub fn with_text_recognizer(mut self, recognizer: Arc<dyn TextRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    /// Analyze a document. OCR runs only when `ocr` is set.
    ///
    /// Model timeouts and failures degrade the affected page and are
    /// recorded as diagnostics; analysis itself never fails.
    pub fn analyze(&self, document: Document, ocr: bool) -> AnalyzeResult {
        let pages = document.into_pages();
        let run = |page: Page| self.analyze_page(page, ocr);
        let results: Vec<(Page, Vec<Diagnostic>)> = if self.config.parallel {
            pages.into_par_iter().map(run).collect()
        } else {
            pages.into_iter().map(run).collect()
        };

        let mut pages = Vec::with_capacity(results.len());
        let mut diagnostics = Vec::new();
        for (page, diags) in results {
            pages.push(page);
            diagnostics.extend(diags);
        }
        log::info!(
            "Analyzed {} pages (ocr={}, {} diagnostics)",
            pages.len(),
            ocr,
            diagnostics.len()
        );

        AnalyzeResult {
            document: Document::new(pages),
            diagnostics,
            ocr,
        }
    }

    fn analyze_page(&self, mut page: Page, ocr: bool) -> (Page, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let needs_layout = page.layout_blocks.is_empty() && self.layout.is_some();
        let needs_ocr = ocr && page.ocr_detections.is_empty() && self.recognizer.is_some();
        if !needs_layout && !needs_ocr {
            return (page, diagnostics);
        }

        let Some(raster) = page.raster.clone() else {
            diagnostics.push(
                Diagnostic::new(
                    page.index,
                    DiagnosticKind::MissingRaster,
                    "page has no raster for model analysis",
                )
                .logged(),
            );
            return (page, diagnostics);
        };
        let scale = page.raster_scale();

        if needs_layout {
            if let Some(detector) = self.layout.clone() {
                let image = Arc::clone(&raster);
                let detected = call_with_timeout(self.config.ocr_timeout, move || {
                    detector.detect_layout(&image)
                });
                match detected {
                    Ok(blocks) => {
                        page.layout_blocks = blocks
                            .into_iter()
                            .map(|mut b| {
                                b.bbox = b.bbox.scale(1.0 / scale);
                                b
                            })
                            .collect();
                        log::debug!(
                            "Page {}: detected {} layout blocks",
                            page.index,
                            page.layout_blocks.len()
                        );
                    }
                    Err(e) => {
                        diagnostics.push(model_diagnostic(page.index, None, "layout detection", &e))
                    }
                }
            }
        }

        if needs_ocr {
            if let Some(recognizer) = self.recognizer.clone() {
                let regions: Vec<(usize, BBox)> = page
                    .layout_blocks
                    .iter()
                    .enumerate()
                    .filter(|(_, b)| b.category.is_text_bearing() && b.bbox.is_valid())
                    .map(|(i, b)| (i, b.bbox))
                    .collect();
                for (idx, region) in regions {
                    let image = Arc::clone(&raster);
                    let recognizer = Arc::clone(&recognizer);
                    let pixels = region.scale(scale);
                    match call_with_timeout(self.config.ocr_timeout, move || {
                        recognizer.recognize_text(&image, &pixels)
                    }) {
                        Ok(rec) => {
                            if !rec.text.trim().is_empty() {
                                page.ocr_detections
                                    .push(OcrDetection::new(rec.text, region, rec.confidence));
                            }
                        }
                        Err(e) => {
                            diagnostics.push(model_diagnostic(
                                page.index,
                                Some(idx),
                                "text recognition",
                                &e,
                            ));
                            // A timed-out model is likely to time out again on this page
                            if matches!(e, Error::Timeout(_)) {
                                break;
                            }
                        }
                    }
                }
            }
        }

        (page, diagnostics)
    }
}

fn model_diagnostic(
    page_idx: usize,
    block_idx: Option<usize>,
    what: &str,
    error: &Error,
) -> Diagnostic {
    let kind = match error {
        Error::Timeout(_) => DiagnosticKind::ModelTimeout,
        _ => DiagnosticKind::ModelFailure,
    };
    let diagnostic = Diagnostic::new(page_idx, kind, format!("{}: {}", what, error));
    match block_idx {
        Some(b) => diagnostic.with_block(b).logged(),
        None => diagnostic.logged(),
    }
}

/// Run `f` on a worker thread and wait at most `timeout` for its result.
///
/// On timeout the worker is left to finish on its own; its result is dropped.
pub fn call_with_timeout<T, F>(timeout: Duration, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let (tx, rx) = bounded(1);
    thread::Builder::new()
        .name("structpdf-model".to_string())
        .spawn(move || {
            let _ = tx.send(f());
        })?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(Error::Timeout(timeout.as_millis())),
        Err(RecvTimeoutError::Disconnected) => {
            Err(Error::Model("model worker exited without a result".to_string()))
        }
    }
}

/// A document after model analysis, ready for structuring.
#[derive(Debug, Clone)]
pub struct AnalyzeResult {
    document: Document,
    diagnostics: Vec<Diagnostic>,
    ocr: bool,
}

impl AnalyzeResult {
    /// Wrap a document that needs no model analysis.
    pub fn from_document(document: Document) -> Self {
        Self {
            document,
            diagnostics: Vec::new(),
            ocr: false,
        }
    }

    /// The analyzed document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Degradations recorded during analysis.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Whether OCR was run.
    pub fn ocr_applied(&self) -> bool {
        self.ocr
    }

    /// Classify the analyzed document.
    pub fn classify(&self, config: &ClassifierConfig) -> Result<ParseMode> {
        classify(&self.document, config)
    }

    /// Overlay of the raw layout detections, as PDF bytes.
    pub fn model_overlay(&self) -> Result<Vec<u8>> {
        render_overlay_pdf(self.document.pages(), &model_boxes(self.document.pages()))
    }

    /// Write the raw layout detections overlay to `path`.
    pub fn draw_model(&self, writer: &dyn DataWriter, path: &str) -> Result<()> {
        writer.write(path, &self.model_overlay()?)
    }

    /// Structure the document from its native text layer.
    pub fn pipe_txt_mode(&self, config: &PipelineConfig) -> PipeResult {
        PipeResult::build(self, ParseMode::Text, config)
    }

    /// Structure the document from its OCR detections.
    pub fn pipe_ocr_mode(&self, config: &PipelineConfig) -> PipeResult {
        PipeResult::build(self, ParseMode::Ocr, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockCategory;

    struct FixedLayout;

    impl LayoutDetector for FixedLayout {
        fn detect_layout(&self, _image: &RgbImage) -> Result<Vec<LayoutBlock>> {
            Ok(vec![LayoutBlock::new(BBox::new(20.0, 20.0, 180.0, 60.0), BlockCategory::PlainText)])
        }
    }

    struct EchoOcr;

    impl TextRecognizer for EchoOcr {
        fn recognize_text(&self, _image: &RgbImage, region: &BBox) -> Result<Recognition> {
            Ok(Recognition::new(format!("w{}", region.width() as u32), 0.9))
        }
    }

    struct SlowOcr;

    impl TextRecognizer for SlowOcr {
        fn recognize_text(&self, _image: &RgbImage, _region: &BBox) -> Result<Recognition> {
            thread::sleep(Duration::from_millis(500));
            Ok(Recognition::new("late", 1.0))
        }
    }

    struct FailingLayout;

    impl LayoutDetector for FailingLayout {
        fn detect_layout(&self, _image: &RgbImage) -> Result<Vec<LayoutBlock>> {
            Err(Error::Model("weights missing".into()))
        }
    }

    fn scanned_doc() -> Document {
        Document::new(vec![Page::new(100.0, 50.0).with_raster(RgbImage::new(200, 100))])
    }

    #[test]
    fn test_layout_and_ocr_filled() {
        let analyzer = Analyzer::new(AnalyzerConfig::default())
            .with_layout_detector(Arc::new(FixedLayout))
            .with_text_recognizer(Arc::new(EchoOcr));
        let result = analyzer.analyze(scanned_doc(), true);
        let page = &result.document().pages()[0];
        assert!(result.diagnostics().is_empty());
        assert_eq!(page.layout_blocks[0].bbox, BBox::new(10.0, 10.0, 90.0, 30.0));
        assert_eq!(page.ocr_detections.len(), 1);
        assert_eq!(page.ocr_detections[0].text, "w160");
        assert_eq!(page.ocr_detections[0].bbox, BBox::new(10.0, 10.0, 90.0, 30.0));
    }

    #[test]
    fn test_timeout_degrades_page() {
        let config = AnalyzerConfig::default().with_ocr_timeout(Duration::from_millis(20));
        let analyzer = Analyzer::new(config)
            .with_layout_detector(Arc::new(FixedLayout))
            .with_text_recognizer(Arc::new(SlowOcr));
        let result = analyzer.analyze(scanned_doc(), true);
        assert_eq!(result.diagnostics().len(), 1);
        assert_eq!(result.diagnostics()[0].kind, DiagnosticKind::ModelTimeout);
        assert!(result.document().pages()[0].ocr_detections.is_empty());
    }

    #[test]
    fn test_failure_and_missing_raster() {
        let analyzer = Analyzer::new(AnalyzerConfig::default().with_parallel(false))
            .with_layout_detector(Arc::new(FailingLayout));
        let doc = Document::new(vec![
            Page::new(100.0, 50.0).with_raster(RgbImage::new(100, 50)),
            Page::new(100.0, 50.0),
        ]);
        let result = analyzer.analyze(doc, false);
        let kinds: Vec<DiagnosticKind> = result.diagnostics().iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiagnosticKind::ModelFailure, DiagnosticKind::MissingRaster]);
    }

    #[test]
    fn test_call_with_timeout() {
        assert_eq!(call_with_timeout(Duration::from_secs(1), || Ok(7)).unwrap(), 7);
        let slow = call_with_timeout(Duration::from_millis(10), || {
            thread::sleep(Duration::from_millis(200));
            Ok(())
        });
        assert!(matches!(slow, Err(Error::Timeout(10))));
    }
}
