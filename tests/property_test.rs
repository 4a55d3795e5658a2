//! Property-Based Tests
//!
//! Invariants of the assembled page tree over random geometries:
//! - Block boxes contain their lines, line boxes contain their spans
//! - Reading order is a strict total order
//! - Assembly never records an invariant violation

use std::cmp::Ordering;

use proptest::prelude::*;
use structpdf::pipeline::compare_position;
use structpdf::{
    BBox, Block, BlockCategory, DiagnosticKind, LayoutBlock, OcrDetection, Page, ParseMode,
    PipelineConfig, RegionExtractor, StructureAssembler, TextRun,
};

const CATEGORIES: [BlockCategory; 8] = [
    BlockCategory::Title,
    BlockCategory::PlainText,
    BlockCategory::Image,
    BlockCategory::ImageCaption,
    BlockCategory::Table,
    BlockCategory::TableFootnote,
    BlockCategory::Formula,
    BlockCategory::Abandon,
];

fn rect() -> impl Strategy<Value = BBox> {
    (0.0f32..550.0, 0.0f32..750.0, 1.0f32..250.0, 1.0f32..120.0)
        .prop_map(|(x, y, w, h)| BBox::new(x, y, x + w, y + h))
}

fn layout_block() -> impl Strategy<Value = LayoutBlock> {
    (rect(), 0..CATEGORIES.len()).prop_map(|(bbox, c)| LayoutBlock::new(bbox, CATEGORIES[c]))
}

fn text_page() -> impl Strategy<Value = Page> {
    (
        prop::collection::vec(layout_block(), 0..12),
        prop::collection::vec(rect(), 0..40),
    )
        .prop_map(|(blocks, runs)| {
            let mut page = Page::new(800.0, 900.0);
            page.layout_blocks = blocks;
            page.text_runs = runs
                .into_iter()
                .enumerate()
                .map(|(i, b)| TextRun::new(format!("w{}", i), b))
                .collect();
            page
        })
}

fn ocr_page() -> impl Strategy<Value = Page> {
    (
        prop::collection::vec(layout_block(), 0..12),
        prop::collection::vec((rect(), 0.0f32..1.0), 0..40),
    )
        .prop_map(|(blocks, detections)| {
            let mut page = Page::new(800.0, 900.0);
            page.layout_blocks = blocks;
            page.ocr_detections = detections
                .into_iter()
                .enumerate()
                .map(|(i, (b, c))| OcrDetection::new(format!("d{}", i), b, c))
                .collect();
            page
        })
}

fn assemble(page: &Page, mode: ParseMode) -> structpdf::pipeline::AssembledPage {
    let config = PipelineConfig::default();
    let extraction = RegionExtractor::new(config.clone()).extract(page, mode);
    StructureAssembler::new(config).assemble(page, extraction)
}

fn check_contained(block: &Block) -> Result<(), TestCaseError> {
    for line in &block.lines {
        prop_assert!(
            block.bbox.contains(&line.bbox),
            "block {:?} vs line {:?}",
            block.bbox,
            line.bbox
        );
        for span in &line.spans {
            prop_assert!(
                line.bbox.contains(&span.bbox),
                "line {:?} vs span {:?}",
                line.bbox,
                span.bbox
            );
        }
    }
    if let Some(caption) = &block.caption {
        check_contained(caption)?;
    }
    for footnote in &block.footnotes {
        check_contained(footnote)?;
    }
    Ok(())
}

// ============================================================================
// Containment Properties
// ============================================================================

/// Property: every parent box contains its children in TEXT mode
#[test]
fn proptest_containment_text_mode() {
    proptest!(|(page in text_page())| {
        let assembled = assemble(&page, ParseMode::Text);
        for block in assembled.page.blocks.iter().chain(&assembled.page.discarded_blocks) {
            check_contained(block)?;
        }
        prop_assert!(assembled.page.validate().is_ok());
        prop_assert!(assembled
            .diagnostics
            .iter()
            .all(|d| d.kind != DiagnosticKind::InvariantViolation));
    });
}

/// Property: every parent box contains its children in OCR mode
#[test]
fn proptest_containment_ocr_mode() {
    proptest!(|(page in ocr_page())| {
        let assembled = assemble(&page, ParseMode::Ocr);
        for block in assembled.page.blocks.iter().chain(&assembled.page.discarded_blocks) {
            check_contained(block)?;
        }
        prop_assert!(assembled.page.validate().is_ok());
    });
}

// ============================================================================
// Reading Order Properties
// ============================================================================

/// Property: no two top-level blocks share an index, and assembly is deterministic
#[test]
fn proptest_reading_order_total() {
    proptest!(|(page in text_page())| {
        let first = assemble(&page, ParseMode::Text);
        let second = assemble(&page, ParseMode::Text);
        prop_assert_eq!(&first.page, &second.page);

        let mut indices: Vec<usize> = first.page.blocks.iter().map(|b| b.index).collect();
        indices.sort_unstable();
        indices.dedup();
        prop_assert_eq!(indices.len(), first.page.blocks.len());

        // Single-column pages follow the positional order exactly
        if first.page.columns == 1 {
            for pair in first.page.blocks.windows(2) {
                let a = (pair[0].bbox, pair[0].index);
                let b = (pair[1].bbox, pair[1].index);
                let ord = compare_position(&a, &b);
                prop_assert_eq!(ord, Ordering::Less);
            }
        }
    });
}

/// Property: the position comparator is a strict total order on distinct indices
#[test]
fn proptest_compare_position_antisymmetric() {
    proptest!(|(a in rect(), b in rect(), i in 0usize..50, j in 0usize..50)| {
        prop_assume!(i != j);
        let ab = compare_position(&(a, i), &(b, j));
        let ba = compare_position(&(b, j), &(a, i));
        prop_assert_ne!(ab, Ordering::Equal);
        prop_assert_eq!(ab, ba.reverse());
    });
}
