//! Structure assembly: spans to lines, lines to blocks, blocks to an ordered
//! page tree.

use std::collections::BTreeMap;

use rayon::prelude::*;
use unicode_bidi::BidiInfo;

use super::caption::attach_captions;
use super::extract::{Extraction, RegionExtractor};
use super::headings::assign_heading_levels;
use super::options::{InlineOrder, PipelineConfig};
use super::reading_order::{compare_position, order_blocks};
use crate::model::{
    BBox, Block, BlockCategory, Diagnostic, DiagnosticKind, Document, Line, MiddleDocument,
    MiddlePage, Page, ParseMode, Span,
};

/// A page tree together with the degradations found while building it.
#[derive(Debug, Clone)]
pub struct AssembledPage {
    /// The assembled page
    pub page: MiddlePage,
    /// Extraction and assembly diagnostics for this page
    pub diagnostics: Vec<Diagnostic>,
}

/// Builds middle pages from extracted spans.
pub struct StructureAssembler {
    config: PipelineConfig,
}

impl StructureAssembler {
    /// Create a new assembler.
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Assemble one page. A page without spans yields an empty page.
    pub fn assemble(&self, page: &Page, extraction: Extraction) -> AssembledPage {
        let Extraction {
            spans,
            retained_blocks,
            mut diagnostics,
        } = extraction;

        let mut groups: BTreeMap<usize, Vec<Span>> = BTreeMap::new();
        for span in spans {
            groups.entry(span.block_index).or_default().push(span);
        }

        let mut top_level = Vec::new();
        let mut discarded = Vec::new();
        for idx in retained_blocks {
            let Some(layout) = page.layout_blocks.get(idx) else {
                continue;
            };
            if layout.category == BlockCategory::InlineFormula {
                continue;
            }
            let Some(spans) = groups.remove(&idx) else {
                continue;
            };
            let lines = self.cluster_lines(spans);
            let block = Block::new(layout.category, layout.bbox, idx, lines);
            if block.category == BlockCategory::Abandon {
                discarded.push(block);
            } else {
                top_level.push(block);
            }
        }
        discarded.sort_by(|a, b| compare_position(&(a.bbox, a.index), &(b.bbox, b.index)));

        let (blocks, caption_diagnostics) = attach_captions(top_level, &self.config, page.index);
        diagnostics.extend(caption_diagnostics);

        let keys: Vec<(BBox, usize)> = blocks.iter().map(|b| (b.bbox, b.index)).collect();
        let order = order_blocks(&keys, &self.config);
        if let Some(reason) = &order.ambiguity {
            diagnostics.push(
                Diagnostic::new(page.index, DiagnosticKind::AmbiguousColumns, reason.clone())
                    .logged(),
            );
        }
        let mut slots: Vec<Option<Block>> = blocks.into_iter().map(Some).collect();
        let blocks: Vec<Block> = order
            .order
            .iter()
            .filter_map(|&pos| slots[pos].take())
            .collect();

        let middle = MiddlePage {
            page_idx: page.index,
            page_size: [page.width, page.height],
            blocks,
            discarded_blocks: discarded,
            columns: order.columns,
        };

        if let Err(e) = middle.validate() {
            diagnostics.push(
                Diagnostic::new(page.index, DiagnosticKind::InvariantViolation, e.to_string())
                    .logged(),
            );
        }

        log::debug!(
            "Page {}: assembled {} blocks ({} discarded) in {} column(s)",
            page.index,
            middle.blocks.len(),
            middle.discarded_blocks.len(),
            middle.columns
        );

        AssembledPage {
            page: middle,
            diagnostics,
        }
    }

    /// Extract and assemble every page, then assign document-wide heading
    /// levels. Pages run in parallel when `parallel` is set; results are
    /// merged by page index.
    pub fn assemble_document(&self, document: &Document, mode: ParseMode) -> MiddleDocument {
        let extractor = RegionExtractor::new(self.config.clone());
        let run = |page: &Page| self.assemble(page, extractor.extract(page, mode));

        let mut results: Vec<AssembledPage> = if self.config.parallel {
            document.pages().par_iter().map(run).collect()
        } else {
            document.pages().iter().map(run).collect()
        };
        results.sort_by_key(|r| r.page.page_idx);

        let mut pages = Vec::with_capacity(results.len());
        let mut diagnostics = Vec::new();
        for result in results {
            pages.push(result.page);
            diagnostics.extend(result.diagnostics);
        }
        assign_heading_levels(&mut pages);

        log::info!(
            "Assembled {} pages ({} mode, {} diagnostics)",
            pages.len(),
            mode.as_str(),
            diagnostics.len()
        );
        MiddleDocument::new(pages, mode, diagnostics)
    }

    /// Group the spans of one block into lines.
    ///
    /// Spans are visited by top edge in a single pass; a span joins the
    /// current line when its vertical overlap with the line band exceeds
    /// `line_overlap_threshold` of the smaller height.
    fn cluster_lines(&self, mut spans: Vec<Span>) -> Vec<Line> {
        spans.sort_by(|a, b| {
            a.bbox
                .y0
                .total_cmp(&b.bbox.y0)
                .then(a.bbox.x0.total_cmp(&b.bbox.x0))
        });

        let mut lines = Vec::new();
        let mut current: Vec<Span> = Vec::new();
        let mut band: Option<BBox> = None;

        for span in spans {
            match band {
                Some(b) if self.joins_band(&b, &span.bbox) => {
                    band = Some(b.union(&span.bbox));
                    current.push(span);
                }
                _ => {
                    if !current.is_empty() {
                        lines.push(self.make_line(std::mem::take(&mut current)));
                    }
                    band = Some(span.bbox);
                    current.push(span);
                }
            }
        }
        if !current.is_empty() {
            lines.push(self.make_line(current));
        }
        lines
    }

    fn joins_band(&self, band: &BBox, bbox: &BBox) -> bool {
        let min_height = band.height().min(bbox.height());
        if min_height <= 0.0 {
            // Degenerate heights: join when one center lies in the other
            let cy = bbox.center_y();
            let by = band.center_y();
            return (cy >= band.y0 && cy <= band.y1) || (by >= bbox.y0 && by <= bbox.y1);
        }
        band.vertical_overlap(bbox) > self.config.line_overlap_threshold * min_height
    }

    fn make_line(&self, mut spans: Vec<Span>) -> Line {
        let order = match self.config.inline_order {
            InlineOrder::Auto => detect_direction(&mut spans),
            other => other,
        };
        match order {
            InlineOrder::RightToLeft => spans.sort_by(|a, b| {
                b.bbox
                    .x1
                    .total_cmp(&a.bbox.x1)
                    .then(a.bbox.y0.total_cmp(&b.bbox.y0))
            }),
            InlineOrder::TopToBottom => spans.sort_by(|a, b| {
                a.bbox
                    .y0
                    .total_cmp(&b.bbox.y0)
                    .then(a.bbox.x0.total_cmp(&b.bbox.x0))
            }),
            _ => sort_left_to_right(&mut spans),
        }
        Line::from_spans(spans)
    }
}

fn sort_left_to_right(spans: &mut [Span]) {
    spans.sort_by(|a, b| {
        a.bbox
            .x0
            .total_cmp(&b.bbox.x0)
            .then(a.bbox.y0.total_cmp(&b.bbox.y0))
    });
}

/// Base direction of the line text, read left to right.
fn detect_direction(spans: &mut [Span]) -> InlineOrder {
    sort_left_to_right(spans);
    let text: String = spans
        .iter()
        .map(|s| s.content.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let info = BidiInfo::new(&text, None);
    match info.paragraphs.first() {
        Some(para) if para.level.is_rtl() => InlineOrder::RightToLeft,
        _ => InlineOrder::LeftToRight,
    }
}
