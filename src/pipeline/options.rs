//! Structuring options and configuration.

use serde::{Deserialize, Serialize};

/// Direction in which spans of a line are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InlineOrder {
    /// Left edge ascending
    #[default]
    LeftToRight,
    /// Right edge descending (Arabic, Hebrew)
    RightToLeft,
    /// Top edge ascending (vertical CJK)
    TopToBottom,
    /// Pick LTR or RTL per line from the Unicode bidi base direction
    Auto,
}

/// Options for extracting and assembling pages.
///
/// Thresholds are fractions unless stated otherwise; distances are in page
/// units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum vertical overlap, as a fraction of the smaller height, for a
    /// span to join a line
    pub line_overlap_threshold: f32,

    /// OCR detections below this confidence are discarded
    pub ocr_confidence_floor: f32,

    /// Minimum fraction of a run's area inside a block for it to belong there
    pub span_block_overlap: f32,

    /// Maximum vertical distance between a caption and its anchor
    pub caption_max_distance: f32,

    /// Minimum empty horizontal gap separating two columns
    pub column_gap_threshold: f32,

    /// Blocks wider than this fraction of the content width span all columns
    pub spanning_width_ratio: f32,

    /// Column bands narrower than this fraction of the content width make the
    /// layout ambiguous
    pub min_column_width_ratio: f32,

    /// More bands than this make the layout ambiguous
    pub max_columns: usize,

    /// Span order within a line
    pub inline_order: InlineOrder,

    /// Whether to normalize span text (NFKC, ligatures, control characters)
    pub normalize_text: bool,

    /// Whether to process pages in parallel
    pub parallel: bool,
}

impl PipelineConfig {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the line overlap threshold.
    pub fn with_line_overlap_threshold(mut self, threshold: f32) -> Self {
        self.line_overlap_threshold = threshold;
        self
    }

    /// Set the OCR confidence floor.
    pub fn with_ocr_confidence_floor(mut self, floor: f32) -> Self {
        self.ocr_confidence_floor = floor;
        self
    }

    /// Set the run-to-block overlap threshold.
    pub fn with_span_block_overlap(mut self, ratio: f32) -> Self {
        self.span_block_overlap = ratio;
        self
    }

    /// Set the caption search distance.
    pub fn with_caption_max_distance(mut self, distance: f32) -> Self {
        self.caption_max_distance = distance;
        self
    }

    /// Set the minimum column gutter width.
    pub fn with_column_gap_threshold(mut self, gap: f32) -> Self {
        self.column_gap_threshold = gap;
        self
    }

    /// Set the spanning block width ratio.
    pub fn with_spanning_width_ratio(mut self, ratio: f32) -> Self {
        self.spanning_width_ratio = ratio;
        self
    }

    /// Set the maximum number of columns.
    pub fn with_max_columns(mut self, max: usize) -> Self {
        self.max_columns = max;
        self
    }

    /// Set the inline order.
    pub fn with_inline_order(mut self, order: InlineOrder) -> Self {
        self.inline_order = order;
        self
    }

    /// Enable or disable text normalization.
    pub fn with_normalize_text(mut self, normalize: bool) -> Self {
        self.normalize_text = normalize;
        self
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            line_overlap_threshold: 0.5,
            ocr_confidence_floor: 0.5,
            span_block_overlap: 0.5,
            caption_max_distance: 50.0,
            column_gap_threshold: 20.0,
            spanning_width_ratio: 0.6,
            min_column_width_ratio: 0.1,
            max_columns: 4,
            inline_order: InlineOrder::LeftToRight,
            normalize_text: true,
            parallel: true,
        }
    }
}
