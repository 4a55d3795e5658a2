//! Rendering options and configuration.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Options for rendering a middle document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// What the Markdown output contains
    pub markdown_mode: MarkdownMode,

    /// How to render tables without recognized cells or HTML
    pub table_fallback: TableFallback,

    /// Maximum heading level (1-6)
    pub max_heading_level: u8,

    /// Escape special Markdown characters in text
    pub escape_special_chars: bool,

    /// Page selection (1-indexed)
    #[serde(skip)]
    pub page_selection: PageSelection,
}

impl RenderOptions {
    /// Create new render options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the Markdown mode.
    pub fn with_markdown_mode(mut self, mode: MarkdownMode) -> Self {
        self.markdown_mode = mode;
        self
    }

    /// Omit images from the Markdown output.
    pub fn text_only(mut self) -> Self {
        self.markdown_mode = MarkdownMode::TextOnly;
        self
    }

    /// Set the table fallback mode.
    pub fn with_table_fallback(mut self, fallback: TableFallback) -> Self {
        self.table_fallback = fallback;
        self
    }

    /// Set the maximum heading level.
    pub fn with_max_heading(mut self, level: u8) -> Self {
        self.max_heading_level = level.clamp(1, 6);
        self
    }

    /// Enable or disable Markdown escaping.
    pub fn with_escaping(mut self, escape: bool) -> Self {
        self.escape_special_chars = escape;
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, selection: PageSelection) -> Self {
        self.page_selection = selection;
        self
    }

    /// Set specific page range.
    pub fn with_page_range(mut self, range: RangeInclusive<u32>) -> Self {
        self.page_selection = PageSelection::Range(range);
        self
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            markdown_mode: MarkdownMode::Full,
            table_fallback: TableFallback::Image,
            max_heading_level: 6,
            escape_special_chars: true,
            page_selection: PageSelection::All,
        }
    }
}

/// Content of the Markdown output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkdownMode {
    /// Text, images, tables and formulas
    #[default]
    Full,
    /// Images omitted; tables fall back to their text
    TextOnly,
}

/// How to render a table that has neither cells nor HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableFallback {
    /// Link the cropped table image
    #[default]
    Image,
    /// Emit the raw text covered by the table
    RawText,
}

/// Page selection for rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PageSelection {
    /// Render all pages
    #[default]
    All,
    /// Render a range of pages (inclusive, 1-indexed)
    Range(RangeInclusive<u32>),
    /// Render specific pages (1-indexed)
    Pages(Vec<u32>),
}

impl PageSelection {
    /// Check if a page number should be included.
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&page),
            PageSelection::Pages(pages) => pages.contains(&page),
        }
    }

    /// Check a 0-based page index.
    pub fn includes_index(&self, page_idx: usize) -> bool {
        self.includes(page_idx as u32 + 1)
    }

    /// Parse a page selection string (e.g., "1-10", "1,3,5,7-10").
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();

        if s.is_empty() || s == "all" {
            return Ok(PageSelection::All);
        }

        let parse_num = |p: &str| -> Result<u32, String> {
            p.trim()
                .parse()
                .map_err(|_| format!("Invalid page number: {}", p.trim()))
        };

        if let Some((start, end)) = s.split_once('-') {
            if !start.contains(',') && !end.contains(',') {
                return Ok(PageSelection::Range(parse_num(start)?..=parse_num(end)?));
            }
        }

        let mut pages = Vec::new();
        for part in s.split(',') {
            match part.split_once('-') {
                Some((start, end)) => pages.extend(parse_num(start)?..=parse_num(end)?),
                None => pages.push(parse_num(part)?),
            }
        }
        pages.sort_unstable();
        pages.dedup();
        Ok(PageSelection::Pages(pages))
    }
}
