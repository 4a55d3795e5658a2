//! Markdown rendering for middle documents.

use crate::assets::join_path;
use crate::error::Result;
use crate::model::{join_fragments, Block, BlockCategory, MiddleDocument, MiddlePage, SpanKind};

use super::{MarkdownMode, RenderOptions, TableFallback};

/// Render a middle document to Markdown.
///
/// Image paths are written as `image_dir/<asset name>`. Output is a pure
/// function of the document and options.
pub fn render_markdown(
    doc: &MiddleDocument,
    image_dir: &str,
    options: &RenderOptions,
) -> Result<String> {
    let renderer = MarkdownRenderer::new(options.clone(), image_dir);
    renderer.render(doc)
}

/// Markdown renderer.
pub struct MarkdownRenderer {
    options: RenderOptions,
    image_dir: String,
}

impl MarkdownRenderer {
    /// Create a new Markdown renderer.
    pub fn new(options: RenderOptions, image_dir: impl Into<String>) -> Self {
        Self {
            options,
            image_dir: image_dir.into(),
        }
    }

    /// Render a document to Markdown.
    pub fn render(&self, doc: &MiddleDocument) -> Result<String> {
        let mut output = String::new();
        for page in doc.pages() {
            if self.options.page_selection.includes_index(page.page_idx) {
                self.render_page(&mut output, page);
            }
        }
        Ok(output.trim().to_string())
    }

    fn render_page(&self, output: &mut String, page: &MiddlePage) {
        for block in &page.blocks {
            self.render_block(output, block);
        }
    }

    fn render_block(&self, output: &mut String, block: &Block) {
        match block.category {
            BlockCategory::Title => {
                let text = block_text(block, self.options.escape_special_chars);
                if text.is_empty() {
                    return;
                }
                let level = block
                    .heading_level
                    .unwrap_or(1)
                    .min(self.options.max_heading_level)
                    .max(1);
                push_paragraph(output, &format!("{} {}", "#".repeat(level as usize), text));
            }
            BlockCategory::Image => {
                if self.options.markdown_mode == MarkdownMode::Full {
                    let path = block
                        .first_span(SpanKind::Image)
                        .and_then(|s| s.image_path.as_deref());
                    if let Some(path) = path {
                        let link = format!("![]({})", join_path(&self.image_dir, path));
                        push_paragraph(output, &link);
                    }
                }
                self.render_attachments(output, block);
            }
            BlockCategory::Table => self.render_table(output, block),
            BlockCategory::Formula => {
                if let Some(span) = block.first_span(SpanKind::Formula) {
                    let source = span.formula_source().trim();
                    if !source.is_empty() {
                        push_paragraph(output, &format!("$$\n{}\n$$", source));
                    }
                }
                self.render_attachments(output, block);
            }
            BlockCategory::Abandon | BlockCategory::InlineFormula => {}
            _ => {
                let text = block_text(block, self.options.escape_special_chars);
                push_paragraph(output, &text);
            }
        }
    }

    fn render_table(&self, output: &mut String, block: &Block) {
        if let Some(caption) = &block.caption {
            push_paragraph(output, &block_text(caption, self.options.escape_special_chars));
        }

        if let Some(span) = block.first_span(SpanKind::Table) {
            if let Some(cells) = span.cells.as_ref().filter(|c| !c.is_empty()) {
                push_paragraph(output, &table_markdown(cells));
            } else if let Some(html) = span.html.as_deref().filter(|h| !h.trim().is_empty()) {
                push_paragraph(output, html.trim());
            } else {
                let use_image = self.options.table_fallback == TableFallback::Image
                    && self.options.markdown_mode == MarkdownMode::Full;
                match span.image_path.as_deref() {
                    Some(path) if use_image => push_paragraph(
                        output,
                        &format!("![]({})", join_path(&self.image_dir, path)),
                    ),
                    _ => push_paragraph(output, &self.escape(&span.content)),
                }
            }
        }

        for footnote in &block.footnotes {
            push_paragraph(output, &block_text(footnote, self.options.escape_special_chars));
        }
    }

    /// Caption and footnotes following an image or formula.
    fn render_attachments(&self, output: &mut String, block: &Block) {
        if let Some(caption) = &block.caption {
            push_paragraph(output, &block_text(caption, self.options.escape_special_chars));
        }
        for footnote in &block.footnotes {
            push_paragraph(output, &block_text(footnote, self.options.escape_special_chars));
        }
    }

    fn escape(&self, text: &str) -> String {
        if self.options.escape_special_chars {
            escape_markdown(text)
        } else {
            text.to_string()
        }
    }
}

fn push_paragraph(output: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    output.push_str(text);
    output.push_str("\n\n");
}

/// Text of a block with inline formulas as `$…$`, lines merged with
/// hyphenation and CJK spacing rules.
pub(crate) fn block_text(block: &Block, escape: bool) -> String {
    let lines: Vec<String> = block
        .lines
        .iter()
        .map(|line| {
            let fragments: Vec<String> = line
                .spans
                .iter()
                .map(|span| match span.kind {
                    SpanKind::InlineFormula => format!("${}$", span.formula_source().trim()),
                    SpanKind::Formula => format!("$$\n{}\n$$", span.formula_source().trim()),
                    _ if escape => escape_markdown(&span.content),
                    _ => span.content.clone(),
                })
                .collect();
            join_fragments(fragments.iter().map(|s| s.as_str()))
        })
        .collect();
    join_fragments(lines.iter().map(|s| s.as_str()))
}

/// Render a grid of cells as a pipe table; the first row is the header.
pub(crate) fn table_markdown(cells: &[Vec<String>]) -> String {
    let col_count = cells.iter().map(|r| r.len()).max().unwrap_or(0);
    if col_count == 0 {
        return String::new();
    }

    let mut output = String::new();
    for (i, row) in cells.iter().enumerate() {
        output.push('|');
        for c in 0..col_count {
            let content = row.get(c).map(|s| s.as_str()).unwrap_or("");
            let content = content.replace('\n', " ").replace('|', "\\|");
            output.push_str(&format!(" {} |", content.trim()));
        }
        output.push('\n');

        // Add separator after header row
        if i == 0 {
            output.push('|');
            for _ in 0..col_count {
                output.push_str(" --- |");
            }
            output.push('\n');
        }
    }
    output.trim_end().to_string()
}

/// Escape special Markdown characters.
/// Only escape characters that could be misinterpreted as Markdown syntax.
pub(crate) fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            // Core formatting that must be escaped
            '\\' | '`' | '*' | '_' |
            // Brackets for links/images, pipe for tables
            '[' | ']' | '|' => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BBox, Line, MiddlePage, ParseMode, Span, SpanSource};

    fn text_block(category: BlockCategory, index: usize, text: &str, y: f32) -> Block {
        let span = Span::text(text, BBox::new(10.0, y, 200.0, y + 10.0), SpanSource::Native);
        Block::new(
            category,
            BBox::new(10.0, y, 200.0, y + 10.0),
            index,
            vec![Line::from_spans(vec![span])],
        )
    }

    fn doc(blocks: Vec<Block>) -> MiddleDocument {
        let mut page = MiddlePage::empty(0, 600.0, 800.0);
        page.blocks = blocks;
        MiddleDocument::new(vec![page], ParseMode::Text, vec![])
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("Hello *world*"), "Hello \\*world\\*");
        assert_eq!(escape_markdown("[link]"), "\\[link\\]");
    }

    #[test]
    fn test_render_heading_and_paragraph() {
        let mut title = text_block(BlockCategory::Title, 0, "Chapter 1", 10.0);
        title.heading_level = Some(2);
        let doc = doc(vec![title, text_block(BlockCategory::PlainText, 1, "Hello, world!", 30.0)]);
        let md = render_markdown(&doc, "images", &RenderOptions::default()).unwrap();
        assert_eq!(md, "## Chapter 1\n\nHello, world!");
    }

    #[test]
    fn test_inline_formula() {
        let mut block = text_block(BlockCategory::PlainText, 0, "Let", 10.0);
        let mut formula = Span::new(
            SpanKind::InlineFormula,
            "x^2",
            BBox::new(60.0, 10.0, 90.0, 20.0),
            SpanSource::Native,
        );
        formula.latex = Some("x^2".into());
        block.lines[0].spans.push(formula);
        let md = render_markdown(&doc(vec![block]), "images", &RenderOptions::default()).unwrap();
        assert_eq!(md, "Let $x^2$");
    }

    #[test]
    fn test_table_cells() {
        let mut span = Span::new(
            SpanKind::Table,
            "",
            BBox::new(0.0, 0.0, 100.0, 50.0),
            SpanSource::Native,
        );
        span.cells = Some(vec![
            vec!["Name".into(), "Age".into()],
            vec!["Alice".into(), "30".into()],
        ]);
        let block = Block::new(
            BlockCategory::Table,
            BBox::new(0.0, 0.0, 100.0, 50.0),
            0,
            vec![Line::from_spans(vec![span])],
        );
        let md = render_markdown(&doc(vec![block]), "images", &RenderOptions::default()).unwrap();
        assert_eq!(md, "| Name | Age |\n| --- | --- |\n| Alice | 30 |");
    }

    #[test]
    fn test_table_fallbacks() {
        let mut span = Span::new(
            SpanKind::Table,
            "a b c",
            BBox::new(0.0, 0.0, 100.0, 50.0),
            SpanSource::Native,
        );
        span.image_path = Some("t.jpg".into());
        let block = Block::new(
            BlockCategory::Table,
            BBox::new(0.0, 0.0, 100.0, 50.0),
            0,
            vec![Line::from_spans(vec![span])],
        );
        let doc = doc(vec![block]);
        let md = render_markdown(&doc, "images", &RenderOptions::default()).unwrap();
        assert_eq!(md, "![](images/t.jpg)");
        let md = render_markdown(
            &doc,
            "images",
            &RenderOptions::default().with_table_fallback(TableFallback::RawText),
        )
        .unwrap();
        assert_eq!(md, "a b c");
        let md = render_markdown(&doc, "images", &RenderOptions::default().text_only()).unwrap();
        assert_eq!(md, "a b c");
    }

    #[test]
    fn test_image_with_caption() {
        let mut span = Span::new(
            SpanKind::Image,
            "",
            BBox::new(0.0, 0.0, 100.0, 50.0),
            SpanSource::Native,
        );
        span.image_path = Some("abc.jpg".into());
        let mut image = Block::new(
            BlockCategory::Image,
            BBox::new(0.0, 0.0, 100.0, 50.0),
            0,
            vec![Line::from_spans(vec![span])],
        );
        let caption = text_block(BlockCategory::ImageCaption, 1, "Figure 1", 55.0);
        image.caption = Some(Box::new(caption));
        let doc = doc(vec![image]);
        let md = render_markdown(&doc, "images", &RenderOptions::default()).unwrap();
        assert_eq!(md, "![](images/abc.jpg)\n\nFigure 1");
        let md = render_markdown(&doc, "images", &RenderOptions::default().text_only()).unwrap();
        assert_eq!(md, "Figure 1");
    }
}
