//! Caption and footnote attachment.

use std::collections::BTreeMap;

use super::reading_order::compare_position;
use super::PipelineConfig;
use crate::model::{Block, BlockLevel, Diagnostic, DiagnosticKind};

/// Nest captions and footnotes under the image, table or formula they
/// describe.
///
/// Each caption or footnote is matched to the nearest block of its anchor
/// category lying directly above or below it (horizontal overlap, vertical
/// gap within `caption_max_distance`); ties go to the lower detection index.
/// Several captions matched to one anchor are merged into a single caption
/// block. Unmatched ones stay top-level with a diagnostic.
pub fn attach_captions(
    blocks: Vec<Block>,
    config: &PipelineConfig,
    page_idx: usize,
) -> (Vec<Block>, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();

    // position of caption -> position of anchor
    let mut matches: BTreeMap<usize, usize> = BTreeMap::new();
    for (pos, block) in blocks.iter().enumerate() {
        let Some(anchor_category) = block.category.anchor_category() else {
            continue;
        };
        let nearest = blocks
            .iter()
            .enumerate()
            .filter(|(_, a)| a.category == anchor_category)
            .filter(|(_, a)| a.bbox.horizontal_overlap(&block.bbox) > 0.0)
            .map(|(apos, a)| (apos, a.bbox.vertical_gap(&block.bbox), a.index))
            .filter(|(_, gap, _)| *gap <= config.caption_max_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.2.cmp(&b.2)));

        match nearest {
            Some((apos, gap, _)) => {
                log::debug!(
                    "Page {}: {} block {} attached to block {} (gap {:.1})",
                    page_idx,
                    block.category.as_str(),
                    block.index,
                    blocks[apos].index,
                    gap
                );
                matches.insert(pos, apos);
            }
            None => diagnostics.push(
                Diagnostic::new(
                    page_idx,
                    DiagnosticKind::UnmatchedCaption,
                    format!(
                        "no {} within {:.1} of {} block",
                        anchor_category.as_str(),
                        config.caption_max_distance,
                        block.category.as_str()
                    ),
                )
                .with_block(block.index)
                .logged(),
            ),
        }
    }

    if matches.is_empty() {
        return (blocks, diagnostics);
    }

    let mut slots: Vec<Option<Block>> = blocks.into_iter().map(Some).collect();
    let mut captions: BTreeMap<usize, Vec<Block>> = BTreeMap::new();
    let mut footnotes: BTreeMap<usize, Vec<Block>> = BTreeMap::new();
    for (&cpos, &apos) in &matches {
        if let Some(mut nested) = slots[cpos].take() {
            nested.level = BlockLevel::Nested;
            if nested.category.is_caption() {
                captions.entry(apos).or_default().push(nested);
            } else {
                footnotes.entry(apos).or_default().push(nested);
            }
        }
    }

    for (apos, group) in captions {
        if let Some(anchor) = slots[apos].as_mut() {
            anchor.caption = merge_captions(group).map(Box::new);
        }
    }
    for (apos, mut group) in footnotes {
        group.sort_by(|a, b| compare_position(&(a.bbox, a.index), &(b.bbox, b.index)));
        if let Some(anchor) = slots[apos].as_mut() {
            anchor.footnotes = group;
        }
    }

    (slots.into_iter().flatten().collect(), diagnostics)
}

/// Merge caption blocks into one, top to bottom; keeps the lowest index.
fn merge_captions(mut group: Vec<Block>) -> Option<Block> {
    group.sort_by(|a, b| compare_position(&(a.bbox, a.index), &(b.bbox, b.index)));
    let mut iter = group.into_iter();
    let mut merged = iter.next()?;
    for other in iter {
        merged.bbox = merged.bbox.union(&other.bbox);
        merged.index = merged.index.min(other.index);
        merged.lines.extend(other.lines);
    }
    Some(merged)
}
