//! The middle document: canonical structured representation of a document.
//!
//! Ownership is a strict tree: a [`MiddleDocument`] owns its [`MiddlePage`]s,
//! a page owns its [`Block`]s, a block owns its [`Line`]s and nested caption
//! and footnote blocks, and a line owns its [`Span`]s. Renderers only ever
//! receive shared references to it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{BBox, BlockCategory, Diagnostic};
use crate::error::{Error, Result};

/// How page content is extracted, decided once per document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ParseMode {
    /// Native text layer
    #[default]
    #[serde(rename = "txt")]
    Text,
    /// Optical character recognition
    #[serde(rename = "ocr")]
    Ocr,
}

impl ParseMode {
    /// Short name ("txt" or "ocr").
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseMode::Text => "txt",
            ParseMode::Ocr => "ocr",
        }
    }
}

/// Content type of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    /// Running text
    Text,
    /// Image region (no text)
    Image,
    /// Table region
    Table,
    /// Display formula
    #[serde(rename = "interline_equation")]
    Formula,
    /// Formula embedded in text
    #[serde(rename = "inline_equation")]
    InlineFormula,
}

/// Where the content of a span came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanSource {
    /// PDF text layer
    Native,
    /// OCR model
    Ocr,
}

/// Smallest content unit with geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    /// Span geometry
    pub bbox: BBox,

    /// Text content, empty for images
    #[serde(default)]
    pub content: String,

    /// Content type
    #[serde(rename = "type")]
    pub kind: SpanKind,

    /// Content source
    pub source: SpanSource,

    /// OCR confidence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,

    /// Font size (native runs) or line height proxy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,

    /// Asset file name for image and table spans
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,

    /// Table cells from a table recognizer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cells: Option<Vec<Vec<String>>>,

    /// Table HTML from a table recognizer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,

    /// LaTeX from a formula recognizer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latex: Option<String>,

    /// Detection index of the layout block the span was extracted for
    #[serde(skip)]
    pub(crate) block_index: usize,
}

// The originating block index is extraction bookkeeping; it is not
// serialized and does not take part in equality.
impl PartialEq for Span {
    fn eq(&self, other: &Self) -> bool {
        self.bbox == other.bbox
            && self.content == other.content
            && self.kind == other.kind
            && self.source == other.source
            && self.score == other.score
            && self.font_size == other.font_size
            && self.image_path == other.image_path
            && self.cells == other.cells
            && self.html == other.html
            && self.latex == other.latex
    }
}

impl Span {
    /// Create a text span.
    pub fn text(content: impl Into<String>, bbox: BBox, source: SpanSource) -> Self {
        Self::new(SpanKind::Text, content, bbox, source)
    }

    /// Create a span of any kind.
    pub fn new(kind: SpanKind, content: impl Into<String>, bbox: BBox, source: SpanSource) -> Self {
        Self {
            bbox,
            content: content.into(),
            kind,
            source,
            score: None,
            font_size: None,
            image_path: None,
            cells: None,
            html: None,
            latex: None,
            block_index: 0,
        }
    }

    /// Tag the span with its originating layout block.
    pub fn in_block(mut self, block_index: usize) -> Self {
        self.block_index = block_index;
        self
    }

    /// Detection index of the originating layout block.
    pub fn block_index(&self) -> usize {
        self.block_index
    }

    /// Formula source: LaTeX when recognized, raw text otherwise.
    pub fn formula_source(&self) -> &str {
        self.latex.as_deref().unwrap_or(&self.content)
    }

    /// Font size, falling back to the box height.
    pub fn effective_font_size(&self) -> f32 {
        self.font_size.unwrap_or_else(|| self.bbox.height())
    }
}

/// Spans sharing a horizontal reading band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Union of the span boxes
    pub bbox: BBox,

    /// Spans in reading order
    pub spans: Vec<Span>,
}

impl Line {
    /// Build a line whose box is the union of its spans.
    pub fn from_spans(spans: Vec<Span>) -> Self {
        let bbox = BBox::union_all(spans.iter().map(|s| &s.bbox)).unwrap_or_default();
        Self { bbox, spans }
    }

    /// Text of the line, spans joined with script-aware spacing.
    pub fn text(&self) -> String {
        join_fragments(self.spans.iter().map(|s| match s.kind {
            SpanKind::InlineFormula | SpanKind::Formula => s.formula_source(),
            _ => s.content.as_str(),
        }))
    }
}

/// Whether a block is part of the reading order or nested in another block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockLevel {
    /// Member of the page's reading-order sequence
    #[default]
    TopLevel,
    /// Caption or footnote nested under an anchor block
    Nested,
}

/// A structured block: a layout region with its assembled lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Category inherited from the layout block
    #[serde(rename = "type")]
    pub category: BlockCategory,

    /// Block geometry; contains every line box
    pub bbox: BBox,

    /// Detection order index of the originating layout block
    pub index: usize,

    /// Nesting level
    #[serde(default)]
    pub level: BlockLevel,

    /// Lines in reading order
    pub lines: Vec<Line>,

    /// Heading level for titles (1 = top)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_level: Option<u8>,

    /// Nested caption (image, table and formula blocks)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<Box<Block>>,

    /// Nested footnotes (image and table blocks)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub footnotes: Vec<Block>,
}

impl Block {
    /// Build a top-level block from lines; the box grows to contain them.
    pub fn new(category: BlockCategory, bbox: BBox, index: usize, lines: Vec<Line>) -> Self {
        let bbox = lines.iter().fold(bbox, |acc, l| acc.union(&l.bbox));
        Self {
            category,
            bbox,
            index,
            level: BlockLevel::TopLevel,
            lines,
            heading_level: None,
            caption: None,
            footnotes: Vec::new(),
        }
    }

    /// All spans of the block in reading order.
    pub fn spans(&self) -> impl Iterator<Item = &Span> {
        self.lines.iter().flat_map(|l| l.spans.iter())
    }

    /// Text of the block, lines merged with hyphenation and CJK rules.
    pub fn text(&self) -> String {
        let lines: Vec<String> = self.lines.iter().map(|l| l.text()).collect();
        join_fragments(lines.iter().map(|s| s.as_str()))
    }

    /// First span of the given kind.
    pub fn first_span(&self, kind: SpanKind) -> Option<&Span> {
        self.spans().find(|s| s.kind == kind)
    }

    /// Check that this block and its nested blocks contain their children.
    fn check_containment(&self, page_idx: usize) -> Result<()> {
        for line in &self.lines {
            if !self.bbox.contains(&line.bbox) {
                return Err(Error::Invariant {
                    page_idx,
                    message: format!("block {} does not contain one of its lines", self.index),
                });
            }
            for span in &line.spans {
                if !line.bbox.contains(&span.bbox) {
                    return Err(Error::Invariant {
                        page_idx,
                        message: format!(
                            "a line of block {} does not contain its span",
                            self.index
                        ),
                    });
                }
            }
        }
        if let Some(caption) = &self.caption {
            caption.check_containment(page_idx)?;
        }
        for footnote in &self.footnotes {
            footnote.check_containment(page_idx)?;
        }
        Ok(())
    }
}

/// One page of the middle document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiddlePage {
    /// Page index (0-based)
    pub page_idx: usize,

    /// Page width and height
    pub page_size: [f32; 2],

    /// Top-level blocks in reading order
    #[serde(rename = "para_blocks")]
    pub blocks: Vec<Block>,

    /// Abandoned blocks, kept for debugging
    #[serde(default)]
    pub discarded_blocks: Vec<Block>,

    /// Number of column bands used for ordering
    #[serde(default = "default_columns")]
    pub columns: usize,
}

fn default_columns() -> usize {
    1
}

impl MiddlePage {
    /// Create an empty page.
    pub fn empty(page_idx: usize, width: f32, height: f32) -> Self {
        Self {
            page_idx,
            page_size: [width, height],
            blocks: Vec::new(),
            discarded_blocks: Vec::new(),
            columns: 1,
        }
    }

    /// Whether the page has no top-level blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Every block of the page: top-level, nested, and discarded.
    pub fn all_blocks(&self) -> Vec<&Block> {
        let mut out = Vec::new();
        for block in self.blocks.iter().chain(self.discarded_blocks.iter()) {
            out.push(block);
            if let Some(c) = &block.caption {
                out.push(c.as_ref());
            }
            out.extend(block.footnotes.iter());
        }
        out
    }

    /// Check the containment and ordering invariants.
    ///
    /// Every block contains its lines, every line its spans, and no two
    /// blocks share a detection index (so the reading order is total).
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for block in self.all_blocks() {
            block.check_containment(self.page_idx)?;
            if !seen.insert(block.index) {
                return Err(Error::Invariant {
                    page_idx: self.page_idx,
                    message: format!("duplicate block index {}", block.index),
                });
            }
        }
        for block in &self.blocks {
            if block.level != BlockLevel::TopLevel {
                return Err(Error::Invariant {
                    page_idx: self.page_idx,
                    message: format!("nested block {} in reading order", block.index),
                });
            }
        }
        Ok(())
    }
}

/// The canonical intermediate representation of a whole document.
///
/// Immutable once built: content is only reachable through shared references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiddleDocument {
    #[serde(rename = "pdf_info")]
    pages: Vec<MiddlePage>,

    #[serde(rename = "_parse_type")]
    parse_mode: ParseMode,

    #[serde(rename = "_version_name")]
    version: String,

    #[serde(default)]
    diagnostics: Vec<Diagnostic>,
}

impl MiddleDocument {
    /// Create a middle document stamped with the crate version.
    pub fn new(
        pages: Vec<MiddlePage>,
        parse_mode: ParseMode,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        Self {
            pages,
            parse_mode,
            version: env!("CARGO_PKG_VERSION").to_string(),
            diagnostics,
        }
    }

    /// Pages in order.
    pub fn pages(&self) -> &[MiddlePage] {
        &self.pages
    }

    /// Extraction mode used for every page.
    pub fn parse_mode(&self) -> ParseMode {
        self.parse_mode
    }

    /// Version of the library that produced the document.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Recorded degradations.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Put degradations recorded before structuring (model analysis) ahead
    /// of the assembler's own.
    pub(crate) fn with_leading_diagnostics(mut self, mut leading: Vec<Diagnostic>) -> Self {
        leading.append(&mut self.diagnostics);
        self.diagnostics = leading;
        self
    }

    /// Validate every page.
    pub fn validate(&self) -> Result<()> {
        self.pages.iter().try_for_each(|p| p.validate())
    }
}

/// Join text fragments with script-aware spacing.
///
/// A trailing hyphen followed by a lowercase letter is treated as a
/// hyphenated line break and removed; no space is inserted between
/// characters of scripts that do not use word spaces.
pub(crate) fn join_fragments<'a, I>(fragments: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut result = String::new();
    for fragment in fragments {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }
        if result.is_empty() {
            result.push_str(fragment);
            continue;
        }

        let prev_last = result.chars().last();
        let curr_first = fragment.chars().next();

        if let (Some('-'), Some(c)) = (prev_last, curr_first) {
            let before_hyphen = result.chars().rev().nth(1);
            if c.is_lowercase() && before_hyphen.map(|b| b.is_alphabetic()).unwrap_or(false) {
                result.pop();
                result.push_str(fragment);
                continue;
            }
        }

        let spaceless = prev_last.map(is_spaceless_script_char).unwrap_or(false)
            && curr_first.map(is_spaceless_script_char).unwrap_or(false);
        if !spaceless {
            result.push(' ');
        }
        result.push_str(fragment);
    }
    result
}

/// Check if character is from a script that doesn't use word spaces.
/// Chinese and Japanese don't use spaces between words, but Korean does.
pub(crate) fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs and Extension A
    (0x4E00..=0x9FFF).contains(&code)
    || (0x3400..=0x4DBF).contains(&code)
    // CJK Unified Ideographs Extension B-F
    || (0x20000..=0x2EBEF).contains(&code)
    // Hiragana and Katakana
    || (0x3040..=0x30FF).contains(&code)
    // CJK Symbols and Punctuation
    || (0x3000..=0x303F).contains(&code)
    // Fullwidth punctuation
    || (0xFF01..=0xFF0F).contains(&code)
}
