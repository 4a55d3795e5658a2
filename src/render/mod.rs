//! Rendering module: pure functions from a middle document to output formats.

mod content_list;
mod json;
mod markdown;
mod options;
pub mod overlay;
mod text;

pub use content_list::{render_content_list, ContentRecord, ContentType};
pub use json::{from_middle_json, to_content_list_json, to_middle_json, JsonFormat};
pub use markdown::{render_markdown, MarkdownRenderer};
pub use options::{MarkdownMode, PageSelection, RenderOptions, TableFallback};
pub use overlay::{
    draw_overlays, layout_boxes, model_boxes, render_overlay_pdf, span_boxes, OverlayBox,
};
pub use text::to_text;
