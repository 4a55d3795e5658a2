//! Layout detection results.

use serde::{Deserialize, Serialize};

use super::BBox;

/// Semantic category assigned to a region by the layout detection model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockCategory {
    /// Section or document title
    Title,
    /// Body text
    #[serde(alias = "text", alias = "plain-text")]
    PlainText,
    /// Figure or picture
    Image,
    /// Caption belonging to an image
    #[serde(alias = "image-caption")]
    ImageCaption,
    /// Footnote belonging to an image
    #[serde(alias = "image-footnote")]
    ImageFootnote,
    /// Table region
    Table,
    /// Caption belonging to a table
    #[serde(alias = "table-caption")]
    TableCaption,
    /// Footnote belonging to a table
    #[serde(alias = "table-footnote")]
    TableFootnote,
    /// Display (interline) formula
    #[serde(alias = "interline_equation")]
    Formula,
    /// Caption or number belonging to a display formula
    #[serde(alias = "formula-caption")]
    FormulaCaption,
    /// Formula embedded in a line of text
    #[serde(alias = "inline-formula", alias = "inline_equation")]
    InlineFormula,
    /// Header, footer, page number or other discarded content
    #[serde(alias = "discarded")]
    Abandon,
}

impl BlockCategory {
    /// Categories whose content is made of text lines.
    pub fn is_text_bearing(&self) -> bool {
        matches!(
            self,
            BlockCategory::Title
                | BlockCategory::PlainText
                | BlockCategory::ImageCaption
                | BlockCategory::ImageFootnote
                | BlockCategory::TableCaption
                | BlockCategory::TableFootnote
                | BlockCategory::FormulaCaption
                | BlockCategory::Abandon
        )
    }

    /// Whether this is a caption category.
    pub fn is_caption(&self) -> bool {
        matches!(
            self,
            BlockCategory::ImageCaption
                | BlockCategory::TableCaption
                | BlockCategory::FormulaCaption
        )
    }

    /// Whether this is a footnote category.
    pub fn is_footnote(&self) -> bool {
        matches!(self, BlockCategory::ImageFootnote | BlockCategory::TableFootnote)
    }

    /// Category of the block a caption or footnote attaches to.
    pub fn anchor_category(&self) -> Option<BlockCategory> {
        match self {
            BlockCategory::ImageCaption | BlockCategory::ImageFootnote => {
                Some(BlockCategory::Image)
            }
            BlockCategory::TableCaption | BlockCategory::TableFootnote => {
                Some(BlockCategory::Table)
            }
            BlockCategory::FormulaCaption => Some(BlockCategory::Formula),
            _ => None,
        }
    }

    /// Short stable name used in logs and diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockCategory::Title => "title",
            BlockCategory::PlainText => "text",
            BlockCategory::Image => "image",
            BlockCategory::ImageCaption => "image_caption",
            BlockCategory::ImageFootnote => "image_footnote",
            BlockCategory::Table => "table",
            BlockCategory::TableCaption => "table_caption",
            BlockCategory::TableFootnote => "table_footnote",
            BlockCategory::Formula => "formula",
            BlockCategory::FormulaCaption => "formula_caption",
            BlockCategory::InlineFormula => "inline_formula",
            BlockCategory::Abandon => "abandon",
        }
    }
}

/// Output of a specialized table or formula recognizer for one block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StructuredContent {
    /// Table as a grid of cell texts, first row is the header
    Cells(Vec<Vec<String>>),
    /// Table as HTML markup
    Html(String),
    /// Formula as LaTeX source
    Latex(String),
}

/// A region on a page tagged with a semantic category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutBlock {
    /// Region in page coordinates
    pub bbox: BBox,

    /// Semantic category
    pub category: BlockCategory,

    /// Detection confidence
    #[serde(default = "default_score")]
    pub score: f32,

    /// Recognizer output for tables and formulas
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<StructuredContent>,
}

fn default_score() -> f32 {
    1.0
}

impl LayoutBlock {
    /// Create a new layout block with full confidence.
    pub fn new(bbox: BBox, category: BlockCategory) -> Self {
        Self {
            bbox,
            category,
            score: 1.0,
            structured_content: None,
        }
    }

    /// Set the detection score.
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    /// Attach recognizer output.
    pub fn with_structured_content(mut self, content: StructuredContent) -> Self {
        self.structured_content = Some(content);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_aliases() {
        let c: BlockCategory = serde_json::from_str("\"plain-text\"").unwrap();
        assert_eq!(c, BlockCategory::PlainText);
        let c: BlockCategory = serde_json::from_str("\"interline_equation\"").unwrap();
        assert_eq!(c, BlockCategory::Formula);
        let c: BlockCategory = serde_json::from_str("\"table_caption\"").unwrap();
        assert_eq!(c, BlockCategory::TableCaption);
    }

    #[test]
    fn test_anchor_category() {
        assert_eq!(
            BlockCategory::ImageCaption.anchor_category(),
            Some(BlockCategory::Image)
        );
        assert_eq!(
            BlockCategory::TableFootnote.anchor_category(),
            Some(BlockCategory::Table)
        );
        assert_eq!(BlockCategory::Title.anchor_category(), None);
        assert!(BlockCategory::Abandon.is_text_bearing());
        assert!(!BlockCategory::Image.is_text_bearing());
    }

    #[test]
    fn test_layout_block_defaults() {
        let json = r#"{"bbox":[0,0,10,10],"category":"title"}"#;
        let block: LayoutBlock = serde_json::from_str(json).unwrap();
        assert_eq!(block.score, 1.0);
        assert!(block.structured_content.is_none());
    }
}
