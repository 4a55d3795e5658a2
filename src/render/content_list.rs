//! Flat content list: one record per top-level block.

use serde::{Deserialize, Serialize};

use crate::assets::join_path;
use crate::model::{BBox, Block, BlockCategory, MiddleDocument, SpanKind};

use super::markdown::{block_text, table_markdown};

/// Record type in the content list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Title or paragraph
    Text,
    /// Image with caption and footnotes
    Image,
    /// Table with caption, footnotes and body
    Table,
    /// Display formula
    Equation,
}

/// One entry of the content list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Record type
    #[serde(rename = "type")]
    pub kind: ContentType,

    /// Text content (text and equation records)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Heading level for titles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_level: Option<u8>,

    /// Format of `text` when not plain ("latex")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_format: Option<String>,

    /// Image path (image and table records)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_path: Option<String>,

    /// Image caption lines
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub img_caption: Vec<String>,

    /// Image footnotes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub img_footnote: Vec<String>,

    /// Table caption lines
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub table_caption: Vec<String>,

    /// Table footnotes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub table_footnote: Vec<String>,

    /// Table body: HTML, a pipe table, or raw text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_body: Option<String>,

    /// Block geometry in page units
    pub bbox: BBox,

    /// Page index (0-based)
    pub page_idx: usize,
}

impl ContentRecord {
    fn new(kind: ContentType, bbox: BBox, page_idx: usize) -> Self {
        Self {
            kind,
            text: None,
            text_level: None,
            text_format: None,
            img_path: None,
            img_caption: Vec::new(),
            img_footnote: Vec::new(),
            table_caption: Vec::new(),
            table_footnote: Vec::new(),
            table_body: None,
            bbox,
            page_idx,
        }
    }
}

/// Flatten a middle document into content records, in reading order.
pub fn render_content_list(doc: &MiddleDocument, image_dir: &str) -> Vec<ContentRecord> {
    doc.pages()
        .iter()
        .flat_map(|page| {
            page.blocks
                .iter()
                .filter_map(move |block| block_record(block, page.page_idx, image_dir))
        })
        .collect()
}

fn block_record(block: &Block, page_idx: usize, image_dir: &str) -> Option<ContentRecord> {
    let image_path = |kind: SpanKind| {
        block
            .first_span(kind)
            .and_then(|s| s.image_path.as_deref())
            .map(|p| join_path(image_dir, p))
    };

    match block.category {
        BlockCategory::Abandon | BlockCategory::InlineFormula => None,
        BlockCategory::Image => {
            let mut record = ContentRecord::new(ContentType::Image, block.bbox, page_idx);
            record.img_path = image_path(SpanKind::Image);
            record.img_caption = caption_lines(block);
            record.img_footnote = footnote_texts(block);
            Some(record)
        }
        BlockCategory::Table => {
            let mut record = ContentRecord::new(ContentType::Table, block.bbox, page_idx);
            record.img_path = image_path(SpanKind::Table);
            record.table_caption = caption_lines(block);
            record.table_footnote = footnote_texts(block);
            record.table_body = block.first_span(SpanKind::Table).and_then(|span| {
                if let Some(html) = &span.html {
                    Some(html.clone())
                } else if let Some(cells) = span.cells.as_ref().filter(|c| !c.is_empty()) {
                    Some(table_markdown(cells))
                } else if !span.content.is_empty() {
                    Some(span.content.clone())
                } else {
                    None
                }
            });
            Some(record)
        }
        BlockCategory::Formula => {
            let mut record = ContentRecord::new(ContentType::Equation, block.bbox, page_idx);
            let source = block
                .first_span(SpanKind::Formula)
                .map(|s| s.formula_source().trim().to_string())
                .unwrap_or_default();
            record.text = Some(format!("$$\n{}\n$$", source));
            record.text_format = Some("latex".to_string());
            Some(record)
        }
        _ => {
            let mut record = ContentRecord::new(ContentType::Text, block.bbox, page_idx);
            record.text = Some(block_text(block, false));
            if block.category == BlockCategory::Title {
                record.text_level = Some(block.heading_level.unwrap_or(1));
            }
            Some(record)
        }
    }
}

fn caption_lines(block: &Block) -> Vec<String> {
    block
        .caption
        .as_ref()
        .map(|c| c.lines.iter().map(|l| l.text()).filter(|t| !t.is_empty()).collect())
        .unwrap_or_default()
}

fn footnote_texts(block: &Block) -> Vec<String> {
    block
        .footnotes
        .iter()
        .map(|f| block_text(f, false))
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Line, MiddlePage, ParseMode, Span, SpanSource};

    #[test]
    fn test_records() {
        let title_span = Span::text("Intro", BBox::new(0.0, 0.0, 50.0, 20.0), SpanSource::Native);
        let mut title = Block::new(
            BlockCategory::Title,
            BBox::new(0.0, 0.0, 50.0, 20.0),
            0,
            vec![Line::from_spans(vec![title_span])],
        );
        title.heading_level = Some(1);

        let mut latex = Span::new(
            SpanKind::Formula,
            "E=mc^2",
            BBox::new(0.0, 30.0, 50.0, 50.0),
            SpanSource::Native,
        );
        latex.latex = Some("E=mc^2".into());
        let formula = Block::new(
            BlockCategory::Formula,
            BBox::new(0.0, 30.0, 50.0, 50.0),
            1,
            vec![Line::from_spans(vec![latex])],
        );

        let mut page = MiddlePage::empty(2, 100.0, 100.0);
        page.blocks = vec![title, formula];
        let doc = MiddleDocument::new(vec![page], ParseMode::Text, vec![]);

        let records = render_content_list(&doc, "images");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, ContentType::Text);
        assert_eq!(records[0].text_level, Some(1));
        assert_eq!(records[0].page_idx, 2);
        assert_eq!(records[1].kind, ContentType::Equation);
        assert_eq!(records[1].text.as_deref(), Some("$$\nE=mc^2\n$$"));

        let json = serde_json::to_string(&records[0]).unwrap();
        assert!(json.contains("\"type\":\"text\""));
        assert!(!json.contains("img_path"));
    }
}
