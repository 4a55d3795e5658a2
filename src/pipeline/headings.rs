//! Heading levels from document-wide font statistics.

use std::collections::BTreeMap;

use crate::model::{Block, BlockCategory, MiddlePage, SpanKind};

/// Font statistics for heading detection.
#[derive(Debug, Clone, Default)]
pub struct FontStatistics {
    /// Body text font size (most common)
    pub body_size: f32,
    /// Font sizes larger than body (potential headings), largest first
    pub heading_sizes: Vec<f32>,
    /// All observed font sizes with frequency, keyed in tenths
    pub size_histogram: BTreeMap<i32, usize>,
}

impl FontStatistics {
    /// Collect the sizes of every text span of title and body blocks.
    pub fn from_pages(pages: &[MiddlePage]) -> Self {
        let mut stats = Self::default();
        for block in pages.iter().flat_map(|p| p.blocks.iter()) {
            if matches!(block.category, BlockCategory::Title | BlockCategory::PlainText) {
                for span in block.spans().filter(|s| s.kind == SpanKind::Text) {
                    stats.add_size(span.effective_font_size());
                }
            }
        }
        stats.analyze();
        stats
    }

    /// Add a font size observation.
    pub fn add_size(&mut self, size: f32) {
        if !size.is_finite() || size <= 0.0 {
            return;
        }
        let key = (size * 10.0).round() as i32; // Round to 0.1 precision
        *self.size_histogram.entry(key).or_insert(0) += 1;
    }

    /// Calculate body size and heading sizes.
    pub fn analyze(&mut self) {
        // Most common size; the smaller size wins a tie
        let body = self
            .size_histogram
            .iter()
            .fold(None, |best: Option<(i32, usize)>, (&key, &count)| match best {
                Some((_, c)) if c >= count => best,
                _ => Some((key, count)),
            });
        let Some((body_key, _)) = body else {
            self.body_size = 12.0;
            self.heading_sizes.clear();
            return;
        };
        self.body_size = body_key as f32 / 10.0;

        self.heading_sizes = self
            .size_histogram
            .keys()
            .rev()
            .map(|k| *k as f32 / 10.0)
            .filter(|s| *s > self.body_size + 0.5)
            .collect();
    }

    /// Get heading level for a font size (1-6, or 0 for body text).
    pub fn get_heading_level(&self, font_size: f32) -> u8 {
        // Headings must be noticeably larger than body text
        if font_size <= self.body_size + 0.5 {
            return 0;
        }
        for (i, &heading_size) in self.heading_sizes.iter().enumerate() {
            if font_size >= heading_size - 0.5 {
                return (i + 1).min(6) as u8;
            }
        }
        (self.heading_sizes.len() + 1).min(6) as u8
    }

    /// Level for a title block; titles no larger than body text rank below
    /// every detected heading size.
    pub fn title_level(&self, block: &Block) -> u8 {
        let size = block
            .spans()
            .filter(|s| s.kind == SpanKind::Text)
            .map(|s| s.effective_font_size())
            .fold(0.0f32, f32::max);
        match self.get_heading_level(size) {
            0 => (self.heading_sizes.len() + 1).min(6) as u8,
            level => level,
        }
    }
}

/// Assign heading levels to every title block of the document.
pub fn assign_heading_levels(pages: &mut [MiddlePage]) {
    let stats = FontStatistics::from_pages(pages);
    log::debug!(
        "Font statistics: body={:.1}, headings={:?}",
        stats.body_size,
        stats.heading_sizes
    );
    for block in pages.iter_mut().flat_map(|p| p.blocks.iter_mut()) {
        if block.category == BlockCategory::Title {
            block.heading_level = Some(stats.title_level(block));
        }
    }
}
