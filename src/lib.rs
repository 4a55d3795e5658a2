//! # structpdf
//!
//! Document structuring engine for parsed PDF pages.
//!
//! This library takes pages delivered by a PDF container parser (native text
//! runs, OCR detections and layout-model blocks), builds a reading-ordered
//! intermediate representation (the *middle document*) and renders it to
//! Markdown, a JSON content list, the middle JSON and debug overlays.
//!
//! ## Quick Start
//!
//! ```no_run
//! use structpdf::{Document, FileWriter, Pipeline};
//!
//! fn main() -> structpdf::Result<()> {
//!     let json = std::fs::read_to_string("pages.json")?;
//!     let doc = Document::from_json(&json)?;
//!
//!     // Classify, extract and assemble
//!     let result = Pipeline::new().process(doc)?;
//!
//!     // Render and write
//!     let writer = FileWriter::new("output");
//!     result.write_assets(&writer, "images")?;
//!     result.dump_md(&writer, "doc.md", "images")?;
//!     result.dump_middle_json(&writer, "doc_middle.json")?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Page classification**: native text layer or OCR, decided per document
//! - **Reading order**: multi-column layouts with spanning blocks
//! - **Captions and footnotes**: nested under their image, table or formula
//! - **Script-aware text**: CJK joining, hyphenation repair, bidi lines
//! - **Parallel processing**: Uses Rayon for multi-page documents
//! - **Model timeouts**: layout and OCR model calls degrade, never abort

pub mod analyze;
pub mod assets;
pub mod classify;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod writer;

// Re-export commonly used types
pub use analyze::{
    AnalyzeResult, Analyzer, AnalyzerConfig, LayoutDetector, Recognition, TextRecognizer,
};
pub use classify::{classify, ClassifierConfig, PageCoverage};
pub use error::{Error, Result};
pub use model::{
    BBox, Block, BlockCategory, BlockLevel, Diagnostic, DiagnosticKind, Document, LayoutBlock,
    Line, MiddleDocument, MiddlePage, OcrDetection, Page, ParseMode, Severity, Span, SpanKind,
    SpanSource, StructuredContent, TextRun,
};
pub use pipeline::{InlineOrder, PipelineConfig, RegionExtractor, StructureAssembler};
pub use render::{
    ContentRecord, ContentType, JsonFormat, MarkdownMode, PageSelection, RenderOptions,
    TableFallback,
};
pub use writer::{DataWriter, FileWriter, MemoryWriter};

#[cfg(feature = "async")]
pub use writer::AsyncFileWriter;

/// Builder for structuring a parsed document.
///
/// # Example
///
/// ```no_run
/// use structpdf::{Document, Pipeline, PipelineConfig, TableFallback};
///
/// # let doc = Document::new(vec![]);
/// let markdown = Pipeline::new()
///     .with_config(PipelineConfig::new().with_caption_max_distance(40.0))
///     .with_table_fallback(TableFallback::RawText)
///     .sequential()
///     .process(doc)?
///     .get_markdown("images")?;
/// # Ok::<(), structpdf::Error>(())
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    classifier: ClassifierConfig,
    render_options: RenderOptions,
    analyzer: Option<Analyzer>,
    forced_mode: Option<ParseMode>,
}

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            classifier: ClassifierConfig::default(),
            render_options: RenderOptions::default(),
            analyzer: None,
            forced_mode: None,
        }
    }

    /// Set the structuring options.
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the classification options.
    pub fn with_classifier_config(mut self, config: ClassifierConfig) -> Self {
        self.classifier = config;
        self
    }

    /// Set the render options used by the result.
    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.render_options = options;
        self
    }

    /// Set table fallback mode.
    pub fn with_table_fallback(mut self, fallback: TableFallback) -> Self {
        self.render_options = self.render_options.with_table_fallback(fallback);
        self
    }

    /// Set page selection for rendering.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.render_options = self.render_options.with_pages(pages);
        self
    }

    /// Run layout detection and OCR models on pages that lack their output.
    pub fn with_analyzer(mut self, analyzer: Analyzer) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Skip classification and use the given mode.
    pub fn with_parse_mode(mut self, mode: ParseMode) -> Self {
        self.forced_mode = Some(mode);
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.config = self.config.sequential();
        self
    }

    /// Classify, analyze and structure a document.
    pub fn process(self, document: Document) -> Result<PipeResult> {
        let mode = match self.forced_mode {
            Some(mode) if !document.is_empty() => mode,
            Some(_) => return Err(Error::EmptyDocument),
            None => classify(&document, &self.classifier)?,
        };

        let analyzed = match &self.analyzer {
            Some(analyzer) => analyzer.analyze(document, mode == ParseMode::Ocr),
            None => AnalyzeResult::from_document(document),
        };

        let result = match mode {
            ParseMode::Text => analyzed.pipe_txt_mode(&self.config),
            ParseMode::Ocr => analyzed.pipe_ocr_mode(&self.config),
        };
        Ok(result.with_render_options(self.render_options))
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// A structured document with its source pages, ready for rendering.
pub struct PipeResult {
    middle: MiddleDocument,
    pages: Vec<Page>,
    render_options: RenderOptions,
}

impl PipeResult {
    pub(crate) fn build(
        analyzed: &AnalyzeResult,
        mode: ParseMode,
        config: &PipelineConfig,
    ) -> Self {
        let assembler = StructureAssembler::new(config.clone());
        let middle = assembler
            .assemble_document(analyzed.document(), mode)
            .with_leading_diagnostics(analyzed.diagnostics().to_vec());
        Self {
            middle,
            pages: analyzed.document().pages().to_vec(),
            render_options: RenderOptions::default(),
        }
    }

    /// Set the render options.
    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.render_options = options;
        self
    }

    /// The middle document.
    pub fn middle(&self) -> &MiddleDocument {
        &self.middle
    }

    /// Consume the result, returning the middle document.
    pub fn into_middle(self) -> MiddleDocument {
        self.middle
    }

    /// Recorded degradations.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.middle.diagnostics()
    }

    /// Convert to Markdown, with image links under `image_dir`.
    pub fn get_markdown(&self, image_dir: &str) -> Result<String> {
        render::render_markdown(&self.middle, image_dir, &self.render_options)
    }

    /// Write the Markdown to `path`.
    pub fn dump_md(&self, writer: &dyn DataWriter, path: &str, image_dir: &str) -> Result<()> {
        writer.write_string(path, &self.get_markdown(image_dir)?)
    }

    /// Convert to plain text.
    pub fn to_text(&self) -> String {
        render::to_text(&self.middle, &self.render_options)
    }

    /// Flat content list.
    pub fn get_content_list(&self, image_dir: &str) -> Vec<ContentRecord> {
        render::render_content_list(&self.middle, image_dir)
    }

    /// Write the content list JSON to `path`.
    pub fn dump_content_list(
        &self,
        writer: &dyn DataWriter,
        path: &str,
        image_dir: &str,
    ) -> Result<()> {
        let records = self.get_content_list(image_dir);
        let json = render::to_content_list_json(&records, JsonFormat::Pretty)?;
        writer.write_string(path, &json)
    }

    /// Serialize the middle document.
    pub fn get_middle_json(&self, format: JsonFormat) -> Result<String> {
        render::to_middle_json(&self.middle, format)
    }

    /// Write the middle JSON to `path`.
    pub fn dump_middle_json(&self, writer: &dyn DataWriter, path: &str) -> Result<()> {
        writer.write_string(path, &self.get_middle_json(JsonFormat::Pretty)?)
    }

    /// Write the assembled blocks overlay to `path`.
    pub fn draw_layout(&self, writer: &dyn DataWriter, path: &str) -> Result<()> {
        let bytes = render::render_overlay_pdf(&self.pages, &render::layout_boxes(&self.middle))?;
        writer.write(path, &bytes)
    }

    /// Write the spans overlay to `path`.
    pub fn draw_span(&self, writer: &dyn DataWriter, path: &str) -> Result<()> {
        let bytes = render::render_overlay_pdf(&self.pages, &render::span_boxes(&self.middle))?;
        writer.write(path, &bytes)
    }

    /// Crop image and table assets from the page rasters into `image_dir`.
    pub fn write_assets(&self, writer: &dyn DataWriter, image_dir: &str) -> Result<usize> {
        assets::export_assets(&self.middle, &self.pages, writer, image_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_doc() -> Document {
        let run = |text: &str, bbox: BBox, size: f32| TextRun::new(text, bbox).with_font_size(size);
        let page = Page::new(600.0, 800.0)
            .with_block(LayoutBlock::new(
                BBox::new(50.0, 40.0, 550.0, 80.0),
                BlockCategory::Title,
            ))
            .with_block(LayoutBlock::new(
                BBox::new(50.0, 100.0, 550.0, 300.0),
                BlockCategory::PlainText,
            ))
            .with_run(run("Introduction", BBox::new(60.0, 45.0, 300.0, 75.0), 24.0))
            .with_run(run("Body text here.", BBox::new(60.0, 110.0, 500.0, 130.0), 10.0))
            .with_run(run("More body text.", BBox::new(60.0, 135.0, 500.0, 155.0), 10.0));
        Document::new(vec![page])
    }

    #[test]
    fn test_pipeline_builder_default() {
        let builder = Pipeline::default();
        assert!(builder.config.parallel);
        assert!(builder.analyzer.is_none());
        assert!(builder.forced_mode.is_none());
    }

    #[test]
    fn test_pipeline_builder_chained() {
        let builder = Pipeline::new()
            .with_table_fallback(TableFallback::RawText)
            .with_pages(PageSelection::Range(1..=2))
            .with_parse_mode(ParseMode::Ocr)
            .sequential();
        assert!(!builder.config.parallel);
        assert_eq!(builder.render_options.table_fallback, TableFallback::RawText);
        assert_eq!(builder.forced_mode, Some(ParseMode::Ocr));
    }

    #[test]
    fn test_process_text_document() {
        let result = Pipeline::new().process(text_doc()).unwrap();
        assert_eq!(result.middle().parse_mode(), ParseMode::Text);
        let md = result.get_markdown("images").unwrap();
        assert_eq!(md, "# Introduction\n\nBody text here. More body text.");
        assert_eq!(result.to_text(), "Introduction\n\nBody text here. More body text.");
    }

    #[test]
    fn test_process_empty_document() {
        assert!(matches!(
            Pipeline::new().process(Document::new(vec![])),
            Err(Error::EmptyDocument)
        ));
        assert!(matches!(
            Pipeline::new().with_parse_mode(ParseMode::Text).process(Document::new(vec![])),
            Err(Error::EmptyDocument)
        ));
    }

    #[test]
    fn test_dump_outputs() {
        let result = Pipeline::new().sequential().process(text_doc()).unwrap();
        let writer = MemoryWriter::new();
        result.dump_md(&writer, "out/doc.md", "images").unwrap();
        result.dump_content_list(&writer, "out/doc_content_list.json", "images").unwrap();
        result.dump_middle_json(&writer, "out/doc_middle.json").unwrap();
        result.draw_layout(&writer, "out/doc_layout.pdf").unwrap();
        result.draw_span(&writer, "out/doc_spans.pdf").unwrap();
        assert_eq!(writer.len(), 5);

        let middle = String::from_utf8(writer.get("out/doc_middle.json").unwrap()).unwrap();
        let parsed = render::from_middle_json(&middle).unwrap();
        assert_eq!(&parsed, result.middle());
        assert_eq!(render::to_middle_json(&parsed, JsonFormat::Pretty).unwrap(), middle);
        assert_eq!(
            render::render_markdown(&parsed, "images", &RenderOptions::default()).unwrap(),
            result.get_markdown("images").unwrap()
        );
        assert!(writer.get("out/doc_spans.pdf").unwrap().starts_with(b"%PDF"));
    }
}
