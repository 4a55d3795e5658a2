//! Page classification: decide once per document whether to read the native
//! text layer or to run OCR.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{BBox, Document, Page, ParseMode};
use crate::pipeline::normalize::garbled_ratio;

/// Options for the page classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Maximum number of pages inspected
    pub sample_size: usize,

    /// Pages with less native text coverage than this lack usable text
    pub min_text_coverage: f32,

    /// Pages with more raster coverage than this lack usable text when their
    /// text coverage is also below `scanned_text_coverage`
    pub max_raster_coverage: f32,

    /// Text coverage under which a mostly-raster page counts as scanned
    pub scanned_text_coverage: f32,

    /// Pages whose native text has a larger share of garbled characters lack
    /// usable text
    pub max_garbled_ratio: f32,

    /// Fraction of sampled pages lacking text above which OCR is chosen
    pub ocr_page_ratio: f32,

    /// Cells per side of the occupancy grid
    pub grid_resolution: usize,
}

impl ClassifierConfig {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sample size.
    pub fn with_sample_size(mut self, size: usize) -> Self {
        self.sample_size = size;
        self
    }

    /// Set the minimum text coverage.
    pub fn with_min_text_coverage(mut self, coverage: f32) -> Self {
        self.min_text_coverage = coverage;
        self
    }

    /// Set the maximum raster coverage.
    pub fn with_max_raster_coverage(mut self, coverage: f32) -> Self {
        self.max_raster_coverage = coverage;
        self
    }

    /// Set the OCR page ratio.
    pub fn with_ocr_page_ratio(mut self, ratio: f32) -> Self {
        self.ocr_page_ratio = ratio;
        self
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            sample_size: 10,
            min_text_coverage: 0.01,
            max_raster_coverage: 0.8,
            scanned_text_coverage: 0.1,
            max_garbled_ratio: 0.5,
            ocr_page_ratio: 0.5,
            grid_resolution: 100,
        }
    }
}

/// Coverage measurements for one page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageCoverage {
    /// Fraction of the page covered by native text runs
    pub text: f32,
    /// Fraction of the page covered by raster images without text on top
    pub raster: f32,
    /// Share of garbled characters in the native text
    pub garbled: f32,
}

impl PageCoverage {
    /// Whether the page lacks usable native text under `config`.
    pub fn lacks_text(&self, config: &ClassifierConfig) -> bool {
        self.text < config.min_text_coverage
            || (self.raster > config.max_raster_coverage
                && self.text < config.scanned_text_coverage)
            || self.garbled > config.max_garbled_ratio
    }
}

/// Choose the extraction mode for a whole document.
///
/// Inspects at most `sample_size` evenly strided pages; the document is read
/// with OCR when more than `ocr_page_ratio` of them lack usable native text.
pub fn classify(document: &Document, config: &ClassifierConfig) -> Result<ParseMode> {
    if document.is_empty() {
        return Err(Error::EmptyDocument);
    }

    let sample = sample_indices(document.page_count(), config.sample_size);
    let lacking = sample
        .iter()
        .filter(|&&idx| {
            let page = &document.pages()[idx];
            let coverage = measure_page(page, config.grid_resolution);
            let lacks = coverage.lacks_text(config);
            log::debug!(
                "Page {}: text={:.3} raster={:.3} garbled={:.2} lacks_text={}",
                idx,
                coverage.text,
                coverage.raster,
                coverage.garbled,
                lacks
            );
            lacks
        })
        .count();

    let ratio = lacking as f32 / sample.len() as f32;
    let mode = if ratio > config.ocr_page_ratio {
        ParseMode::Ocr
    } else {
        ParseMode::Text
    };
    log::info!(
        "Classified document as {} ({}/{} sampled pages lack native text)",
        mode.as_str(),
        lacking,
        sample.len()
    );
    Ok(mode)
}

/// Deterministic, evenly strided page sample.
fn sample_indices(page_count: usize, sample_size: usize) -> Vec<usize> {
    let sample_size = sample_size.max(1);
    if page_count <= sample_size {
        return (0..page_count).collect();
    }
    (0..sample_size)
        .map(|i| i * page_count / sample_size)
        .collect()
}

/// Measure text and raster coverage of a page on an occupancy grid.
///
/// A cell is covered by a box when its center lies inside the box; a box too
/// small to contain any center still marks the cell holding its own center.
pub fn measure_page(page: &Page, resolution: usize) -> PageCoverage {
    let garbled = garbled_ratio(
        &page
            .text_runs
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join(" "),
    );

    if page.width <= 0.0 || page.height <= 0.0 {
        return PageCoverage {
            text: 0.0,
            raster: 0.0,
            garbled,
        };
    }

    let grid = OccupancyGrid::new(page.width, page.height, resolution.max(1));
    let text_cells = grid.mark(
        page.text_runs
            .iter()
            .filter(|r| r.bbox.is_valid() && !r.text.trim().is_empty())
            .map(|r| &r.bbox),
    );
    let raster_cells = grid.mark(page.image_regions.iter().filter(|b| b.is_valid()));

    let total = grid.cell_count() as f32;
    let text = text_cells.iter().filter(|&&c| c).count() as f32 / total;
    let raster = raster_cells
        .iter()
        .zip(text_cells.iter())
        .filter(|(&r, &t)| r && !t)
        .count() as f32
        / total;

    PageCoverage {
        text,
        raster,
        garbled,
    }
}

struct OccupancyGrid {
    cols: usize,
    rows: usize,
    cell_w: f32,
    cell_h: f32,
}

impl OccupancyGrid {
    fn new(width: f32, height: f32, resolution: usize) -> Self {
        Self {
            cols: resolution,
            rows: resolution,
            cell_w: width / resolution as f32,
            cell_h: height / resolution as f32,
        }
    }

    fn cell_count(&self) -> usize {
        self.cols * self.rows
    }

    fn col_of(&self, x: f32) -> usize {
        ((x / self.cell_w).floor().max(0.0) as usize).min(self.cols - 1)
    }

    fn row_of(&self, y: f32) -> usize {
        ((y / self.cell_h).floor().max(0.0) as usize).min(self.rows - 1)
    }

    fn mark<'a, I>(&self, boxes: I) -> Vec<bool>
    where
        I: IntoIterator<Item = &'a BBox>,
    {
        let mut cells = vec![false; self.cell_count()];
        for b in boxes {
            let mut any = false;
            // Cells whose center lies inside the box
            let c0 = ((b.x0 / self.cell_w) - 0.5).ceil().max(0.0) as usize;
            let c1 = ((b.x1 / self.cell_w) - 0.5).floor();
            let r0 = ((b.y0 / self.cell_h) - 0.5).ceil().max(0.0) as usize;
            let r1 = ((b.y1 / self.cell_h) - 0.5).floor();
            if c1 >= 0.0 && r1 >= 0.0 {
                let c1 = (c1 as usize).min(self.cols - 1);
                let r1 = (r1 as usize).min(self.rows - 1);
                for row in r0..=r1 {
                    for col in c0..=c1 {
                        cells[row * self.cols + col] = true;
                        any = true;
                    }
                }
            }
            if !any {
                let col = self.col_of(b.center_x());
                let row = self.row_of(b.center_y());
                cells[row * self.cols + col] = true;
            }
        }
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TextRun;

    fn text_page() -> Page {
        let mut page = Page::new(100.0, 100.0);
        for i in 0..10 {
            let y = 10.0 + i as f32 * 8.0;
            page = page.with_run(TextRun::new("Some body text", BBox::new(10.0, y, 90.0, y + 6.0)));
        }
        page
    }

    fn scanned_page() -> Page {
        Page::new(100.0, 100.0).with_image_region(BBox::new(0.0, 0.0, 100.0, 100.0))
    }

    #[test]
    fn test_empty_document() {
        let doc = Document::new(vec![]);
        assert!(matches!(
            classify(&doc, &ClassifierConfig::default()),
            Err(Error::EmptyDocument)
        ));
    }

    #[test]
    fn test_text_document() {
        let doc = Document::new(vec![text_page(), text_page()]);
        assert_eq!(classify(&doc, &ClassifierConfig::default()).unwrap(), ParseMode::Text);
    }

    #[test]
    fn test_scanned_document() {
        let doc = Document::new(vec![scanned_page(), scanned_page(), text_page()]);
        assert_eq!(classify(&doc, &ClassifierConfig::default()).unwrap(), ParseMode::Ocr);
    }

    #[test]
    fn test_half_scanned_stays_text() {
        // Exactly half lacking text does not exceed the 0.5 ratio
        let doc = Document::new(vec![scanned_page(), text_page()]);
        assert_eq!(classify(&doc, &ClassifierConfig::default()).unwrap(), ParseMode::Text);
    }

    #[test]
    fn test_garbled_text_needs_ocr() {
        let mut page = Page::new(100.0, 100.0);
        page = page.with_run(TextRun::new(
            "\u{E000}\u{E001}\u{E002}\u{FFFD}",
            BBox::new(0.0, 0.0, 100.0, 50.0),
        ));
        let coverage = measure_page(&page, 100);
        assert!(coverage.text > 0.4);
        assert!(coverage.lacks_text(&ClassifierConfig::default()));
    }

    #[test]
    fn test_overlapping_runs_not_double_counted() {
        let page = Page::new(100.0, 100.0)
            .with_run(TextRun::new("a", BBox::new(0.0, 0.0, 50.0, 100.0)))
            .with_run(TextRun::new("b", BBox::new(0.0, 0.0, 50.0, 100.0)));
        let coverage = measure_page(&page, 100);
        assert!((coverage.text - 0.5).abs() < 0.02);
    }

    #[test]
    fn test_sample_indices() {
        assert_eq!(sample_indices(3, 10), vec![0, 1, 2]);
        assert_eq!(sample_indices(100, 4), vec![0, 25, 50, 75]);
    }

    #[test]
    fn test_classify_does_not_mutate() {
        let doc = Document::new(vec![text_page()]);
        let before = serde_json::to_string(&doc).unwrap();
        classify(&doc, &ClassifierConfig::default()).unwrap();
        assert_eq!(serde_json::to_string(&doc).unwrap(), before);
    }
}
