//! Document model: input pages, layout detections, and the middle document.

mod diagnostic;
mod document;
mod geometry;
mod layout;
mod middle;

pub use diagnostic::{Diagnostic, DiagnosticKind, Severity};
pub use document::{Document, OcrDetection, Page, TextRun};
pub use geometry::BBox;
pub use layout::{BlockCategory, LayoutBlock, StructuredContent};
pub use middle::{
    Block, BlockLevel, Line, MiddleDocument, MiddlePage, ParseMode, Span, SpanKind, SpanSource,
};

pub(crate) use middle::{is_spaceless_script_char, join_fragments};
