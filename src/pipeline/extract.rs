//! Region extraction: turn a page's runs or OCR detections into spans
//! attached to layout blocks.

use std::collections::BTreeMap;

use super::normalize::TextNormalizer;
use super::PipelineConfig;
use crate::assets::asset_name;
use crate::model::{
    join_fragments, BBox, BlockCategory, Diagnostic, DiagnosticKind, LayoutBlock, Page, ParseMode,
    Span, SpanKind, SpanSource, StructuredContent,
};

/// Spans extracted from one page.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Spans, each tagged with the detection index of its layout block
    pub spans: Vec<Span>,

    /// Detection indices of layout blocks with a well-formed box
    pub retained_blocks: Vec<usize>,

    /// Degradations found while extracting
    pub diagnostics: Vec<Diagnostic>,
}

impl Extraction {
    /// Spans belonging to one layout block.
    pub fn spans_of(&self, block_index: usize) -> impl Iterator<Item = &Span> {
        self.spans.iter().filter(move |s| s.block_index == block_index)
    }
}

/// A text fragment before it becomes a span.
struct Fragment {
    text: String,
    bbox: BBox,
    source: SpanSource,
    score: Option<f32>,
    font_size: Option<f32>,
}

/// Extracts spans from pages under a fixed configuration.
pub struct RegionExtractor {
    config: PipelineConfig,
    normalizer: TextNormalizer,
}

impl RegionExtractor {
    /// Create a new extractor.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            normalizer: TextNormalizer::new(),
        }
    }

    /// Extract the spans of one page. Never fails; problems become diagnostics.
    pub fn extract(&self, page: &Page, mode: ParseMode) -> Extraction {
        let mut diagnostics = Vec::new();

        let blocks: Vec<(usize, &LayoutBlock)> = page
            .layout_blocks
            .iter()
            .enumerate()
            .filter(|(idx, block)| {
                if block.bbox.is_valid() {
                    true
                } else {
                    diagnostics.push(
                        Diagnostic::new(
                            page.index,
                            DiagnosticKind::MalformedBoundingBox,
                            format!("{} block has box {:?}", block.category.as_str(), block.bbox),
                        )
                        .with_block(*idx)
                        .logged(),
                    );
                    false
                }
            })
            .collect();

        let fragments = match mode {
            ParseMode::Text => self.native_fragments(page, &mut diagnostics),
            ParseMode::Ocr => self.ocr_fragments(page, &mut diagnostics),
        };

        // Inline formulas are re-homed into the text block that contains them
        let hosts: BTreeMap<usize, usize> = blocks
            .iter()
            .filter(|(_, b)| b.category == BlockCategory::InlineFormula)
            .filter_map(|(idx, formula)| {
                let host = best_block(&formula.bbox, &blocks, self.config.span_block_overlap, |c| {
                    c.is_text_bearing() && c != BlockCategory::Abandon
                });
                if host.is_none() {
                    diagnostics.push(
                        Diagnostic::new(
                            page.index,
                            DiagnosticKind::OrphanInlineFormula,
                            "inline formula is not inside any text block",
                        )
                        .with_block(*idx)
                        .logged(),
                    );
                }
                host.map(|h| (*idx, h))
            })
            .collect();

        // Assign every fragment to at most one block
        let mut assigned: BTreeMap<usize, Vec<Fragment>> = BTreeMap::new();
        for fragment in fragments {
            let formula = best_block(&fragment.bbox, &blocks, self.config.span_block_overlap, |c| {
                c == BlockCategory::InlineFormula
            });
            let target = match formula {
                Some(idx) if hosts.contains_key(&idx) => Some(idx),
                _ => best_block(&fragment.bbox, &blocks, self.config.span_block_overlap, |c| {
                    c != BlockCategory::InlineFormula
                }),
            };
            match target {
                Some(idx) => assigned.entry(idx).or_default().push(fragment),
                None => log::debug!(
                    "Page {}: dropped fragment outside all blocks: {:?}",
                    page.index,
                    fragment.text
                ),
            }
        }

        // Text-mode hybrid fill from OCR detections
        if mode == ParseMode::Text && !page.ocr_detections.is_empty() {
            for (idx, block) in &blocks {
                if !block.category.is_text_bearing() || assigned.contains_key(idx) {
                    continue;
                }
                let fill: Vec<Fragment> = page
                    .ocr_detections
                    .iter()
                    .filter(|d| {
                        d.bbox.is_valid()
                            && d.confidence >= self.config.ocr_confidence_floor
                            && !d.text.trim().is_empty()
                            && d.bbox.overlap_ratio_in(&block.bbox)
                                >= self.config.span_block_overlap
                    })
                    .map(|d| Fragment {
                        text: d.text.clone(),
                        bbox: d.bbox,
                        source: SpanSource::Ocr,
                        score: Some(d.confidence),
                        font_size: None,
                    })
                    .collect();
                if !fill.is_empty() {
                    log::debug!(
                        "Page {}: filled block {} from {} OCR detections",
                        page.index,
                        idx,
                        fill.len()
                    );
                    assigned.insert(*idx, fill);
                }
            }
        }

        let mut spans = Vec::new();
        for (idx, block) in &blocks {
            let fragments = assigned.remove(idx).unwrap_or_default();
            match block.category {
                BlockCategory::Image => {
                    let mut span = Span::new(SpanKind::Image, "", block.bbox, source_of(mode));
                    span.image_path = Some(asset_name(page.index, &block.bbox));
                    spans.push(span.in_block(*idx));
                }
                BlockCategory::Table => {
                    spans.push(self.table_span(page, *idx, block, mode, fragments))
                }
                BlockCategory::Formula => {
                    spans.push(self.formula_span(SpanKind::Formula, *idx, block, mode, fragments))
                }
                BlockCategory::InlineFormula => {
                    if let Some(host) = hosts.get(idx) {
                        spans.push(
                            self.formula_span(SpanKind::InlineFormula, *idx, block, mode, fragments)
                                .in_block(*host),
                        );
                    }
                }
                _ => {
                    for fragment in fragments {
                        let text = self.clean(&fragment.text);
                        if text.is_empty() {
                            continue;
                        }
                        let mut span = Span::text(text, fragment.bbox, fragment.source);
                        span.score = fragment.score;
                        span.font_size = fragment.font_size;
                        spans.push(span.in_block(*idx));
                    }
                }
            }
        }

        log::debug!(
            "Page {}: extracted {} spans from {} blocks ({} mode)",
            page.index,
            spans.len(),
            blocks.len(),
            mode.as_str()
        );

        Extraction {
            spans,
            retained_blocks: blocks.iter().map(|(idx, _)| *idx).collect(),
            diagnostics,
        }
    }

    fn native_fragments(&self, page: &Page, diagnostics: &mut Vec<Diagnostic>) -> Vec<Fragment> {
        page.text_runs
            .iter()
            .filter(|run| {
                if run.bbox.is_valid() {
                    return true;
                }
                diagnostics.push(
                    Diagnostic::new(
                        page.index,
                        DiagnosticKind::MalformedBoundingBox,
                        format!("text run {:?} has box {:?}", run.text, run.bbox),
                    )
                    .logged(),
                );
                false
            })
            .filter(|run| !run.text.trim().is_empty())
            .map(|run| Fragment {
                text: run.text.clone(),
                bbox: run.bbox,
                source: SpanSource::Native,
                score: None,
                font_size: run.font_size,
            })
            .collect()
    }

    fn ocr_fragments(&self, page: &Page, diagnostics: &mut Vec<Diagnostic>) -> Vec<Fragment> {
        let floor = self.config.ocr_confidence_floor;
        page.ocr_detections
            .iter()
            .filter(|det| {
                if !det.bbox.is_valid() {
                    diagnostics.push(
                        Diagnostic::new(
                            page.index,
                            DiagnosticKind::MalformedBoundingBox,
                            format!("OCR detection {:?} has box {:?}", det.text, det.bbox),
                        )
                        .logged(),
                    );
                    return false;
                }
                if det.confidence < floor {
                    diagnostics.push(
                        Diagnostic::new(
                            page.index,
                            DiagnosticKind::LowConfidence,
                            format!(
                                "discarded OCR detection {:?} with confidence {:.2} < {:.2}",
                                det.text, det.confidence, floor
                            ),
                        )
                        .logged(),
                    );
                    return false;
                }
                !det.text.trim().is_empty()
            })
            .map(|det| Fragment {
                text: det.text.clone(),
                bbox: det.bbox,
                source: SpanSource::Ocr,
                score: Some(det.confidence),
                font_size: None,
            })
            .collect()
    }

    fn table_span(
        &self,
        page: &Page,
        idx: usize,
        block: &LayoutBlock,
        mode: ParseMode,
        fragments: Vec<Fragment>,
    ) -> Span {
        let mut span = Span::new(SpanKind::Table, "", block.bbox, source_of(mode));
        span.image_path = Some(asset_name(page.index, &block.bbox));
        match &block.structured_content {
            Some(StructuredContent::Cells(rows)) => {
                span.cells = Some(
                    rows.iter()
                        .map(|row| row.iter().map(|cell| self.clean(cell)).collect())
                        .collect(),
                );
            }
            Some(StructuredContent::Html(html)) => span.html = Some(html.clone()),
            _ => span.content = self.raw_text(fragments),
        }
        span.in_block(idx)
    }

    fn formula_span(
        &self,
        kind: SpanKind,
        idx: usize,
        block: &LayoutBlock,
        mode: ParseMode,
        fragments: Vec<Fragment>,
    ) -> Span {
        let mut span = Span::new(kind, "", block.bbox, source_of(mode));
        match &block.structured_content {
            Some(StructuredContent::Latex(latex)) => {
                span.content = latex.trim().to_string();
                span.latex = Some(span.content.clone());
            }
            _ => span.content = self.raw_text(fragments),
        }
        span.in_block(idx)
    }

    /// Degraded content: the covered fragments in top-to-bottom,
    /// left-to-right order.
    fn raw_text(&self, mut fragments: Vec<Fragment>) -> String {
        fragments.sort_by(|a, b| {
            a.bbox
                .y0
                .total_cmp(&b.bbox.y0)
                .then(a.bbox.x0.total_cmp(&b.bbox.x0))
        });
        let cleaned: Vec<String> = fragments.iter().map(|f| self.clean(&f.text)).collect();
        join_fragments(cleaned.iter().map(|s| s.as_str()))
    }

    fn clean(&self, text: &str) -> String {
        if self.config.normalize_text {
            self.normalizer.normalize(text)
        } else {
            text.trim().to_string()
        }
    }
}

fn source_of(mode: ParseMode) -> SpanSource {
    match mode {
        ParseMode::Text => SpanSource::Native,
        ParseMode::Ocr => SpanSource::Ocr,
    }
}

/// The block holding the largest share of `bbox`, at least `threshold`.
/// Ties go to the lower detection index.
fn best_block<F>(
    bbox: &BBox,
    blocks: &[(usize, &LayoutBlock)],
    threshold: f32,
    accept: F,
) -> Option<usize>
where
    F: Fn(BlockCategory) -> bool,
{
    let mut best: Option<(usize, f32)> = None;
    for (idx, block) in blocks {
        if !accept(block.category) {
            continue;
        }
        let ratio = bbox.overlap_ratio_in(&block.bbox);
        if ratio < threshold {
            continue;
        }
        match best {
            Some((_, r)) if r >= ratio => {}
            _ => best = Some((*idx, ratio)),
        }
    }
    best.map(|(idx, _)| idx)
}
