//! Plain text rendering for middle documents.

use crate::model::{BlockCategory, MiddleDocument, SpanKind};

use super::RenderOptions;

/// Convert a middle document to plain text: one paragraph per block, image
/// blocks contribute only their captions.
pub fn to_text(doc: &MiddleDocument, options: &RenderOptions) -> String {
    let mut paragraphs: Vec<String> = Vec::new();
    for page in doc.pages() {
        if !options.page_selection.includes_index(page.page_idx) {
            continue;
        }
        for block in &page.blocks {
            let body = match block.category {
                BlockCategory::Image => String::new(),
                BlockCategory::Table => block
                    .first_span(SpanKind::Table)
                    .map(|s| match &s.cells {
                        Some(cells) => cells
                            .iter()
                            .map(|row| row.join("\t"))
                            .collect::<Vec<_>>()
                            .join("\n"),
                        None => s.content.clone(),
                    })
                    .unwrap_or_default(),
                _ => block.text(),
            };
            let caption = block.caption.as_ref().map(|c| c.text());
            for text in caption
                .into_iter()
                .chain(std::iter::once(body))
                .chain(block.footnotes.iter().map(|f| f.text()))
            {
                if !text.trim().is_empty() {
                    paragraphs.push(text.trim().to_string());
                }
            }
        }
    }
    paragraphs.join("\n\n")
}
