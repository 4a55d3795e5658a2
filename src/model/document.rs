//! Input document types: pages as delivered by the container parser.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use super::{BBox, LayoutBlock};
use crate::error::{Error, Result};

/// A native text run extracted from the PDF text layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    /// The text content
    pub text: String,

    /// Run geometry in page coordinates
    pub bbox: BBox,

    /// Font size in points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,

    /// Font name (e.g., "Helvetica-Bold")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_name: Option<String>,
}

impl TextRun {
    /// Create a new text run.
    pub fn new(text: impl Into<String>, bbox: BBox) -> Self {
        Self {
            text: text.into(),
            bbox,
            font_size: None,
            font_name: None,
        }
    }

    /// Set the font size.
    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = Some(size);
        self
    }
}

/// A text region found by the OCR model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrDetection {
    /// Recognized text
    pub text: String,

    /// Region in page coordinates
    pub bbox: BBox,

    /// Recognition confidence in `[0, 1]`
    pub confidence: f32,
}

impl OcrDetection {
    /// Create a new detection.
    pub fn new(text: impl Into<String>, bbox: BBox, confidence: f32) -> Self {
        Self {
            text: text.into(),
            bbox,
            confidence,
        }
    }
}

/// A single page as produced by the container parser and the layout model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Page index (0-based); reassigned by [`Document::new`]
    #[serde(default)]
    pub index: usize,

    /// Page width in page units
    pub width: f32,

    /// Page height in page units
    pub height: f32,

    /// Native text runs (empty for scanned pages)
    #[serde(default)]
    pub text_runs: Vec<TextRun>,

    /// OCR detections (empty unless OCR was run)
    #[serde(default)]
    pub ocr_detections: Vec<OcrDetection>,

    /// Layout blocks from the detection model
    #[serde(default)]
    pub layout_blocks: Vec<LayoutBlock>,

    /// Placements of embedded raster images that carry no text layer
    #[serde(default)]
    pub image_regions: Vec<BBox>,

    /// Path of the rasterized page, resolved by the caller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raster_path: Option<PathBuf>,

    /// Decoded page raster
    #[serde(skip)]
    pub raster: Option<Arc<RgbImage>>,
}

impl Page {
    /// Create a new empty page with the given dimensions.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            index: 0,
            width,
            height,
            text_runs: Vec::new(),
            ocr_detections: Vec::new(),
            layout_blocks: Vec::new(),
            image_regions: Vec::new(),
            raster_path: None,
            raster: None,
        }
    }

    /// Create a new page with standard A4 size in points.
    pub fn a4() -> Self {
        Self::new(595.0, 842.0)
    }

    /// Add a native text run.
    pub fn with_run(mut self, run: TextRun) -> Self {
        self.text_runs.push(run);
        self
    }

    /// Add an OCR detection.
    pub fn with_detection(mut self, detection: OcrDetection) -> Self {
        self.ocr_detections.push(detection);
        self
    }

    /// Add a layout block.
    pub fn with_block(mut self, block: LayoutBlock) -> Self {
        self.layout_blocks.push(block);
        self
    }

    /// Add an embedded raster image placement.
    pub fn with_image_region(mut self, region: BBox) -> Self {
        self.image_regions.push(region);
        self
    }

    /// Attach a decoded raster.
    pub fn with_raster(mut self, raster: RgbImage) -> Self {
        self.raster = Some(Arc::new(raster));
        self
    }

    /// Page bounds as a box.
    pub fn bounds(&self) -> BBox {
        BBox::new(0.0, 0.0, self.width, self.height)
    }

    /// Page area.
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Ratio of raster pixels to page units, 1.0 without raster.
    pub fn raster_scale(&self) -> f32 {
        match &self.raster {
            Some(img) if self.width > 0.0 => img.width() as f32 / self.width,
            _ => 1.0,
        }
    }
}

/// A parsed document: an ordered, immutable sequence of pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pages: Vec<Page>,
}

impl Document {
    /// Create a document, assigning page indices in order.
    pub fn new(mut pages: Vec<Page>) -> Self {
        for (i, page) in pages.iter_mut().enumerate() {
            page.index = i;
        }
        Self { pages }
    }

    /// Load a document from the page-input JSON format.
    ///
    /// Raster paths stay unresolved; see [`Document::load_rasters`].
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: Document = serde_json::from_str(json)?;
        Ok(Self::new(doc.pages))
    }

    /// Decode the rasters referenced by `raster_path`, relative to `base_dir`.
    ///
    /// Pages whose raster cannot be read keep `raster = None`; a warning is logged.
    pub fn load_rasters(mut self, base_dir: &Path) -> Self {
        for page in &mut self.pages {
            let Some(rel) = page.raster_path.clone() else {
                continue;
            };
            let path = base_dir.join(rel);
            match image::open(&path) {
                Ok(img) => page.raster = Some(Arc::new(img.to_rgb8())),
                Err(e) => log::warn!(
                    "Failed to load raster for page {} from {}: {}",
                    page.index,
                    path.display(),
                    e
                ),
            }
        }
        self
    }

    /// Get the number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// All pages in order.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Get a page by index (0-based).
    pub fn page(&self, index: usize) -> Result<&Page> {
        self.pages
            .get(index)
            .ok_or(Error::PageOutOfRange(index, self.pages.len()))
    }

    /// Check if the document has any pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Consume the document, returning its pages.
    pub(crate) fn into_pages(self) -> Vec<Page> {
        self.pages
    }
}
