//! Recoverable degradations recorded while structuring a document.

use serde::{Deserialize, Serialize};

/// How much of the output a degradation affected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Part of a page was skipped or processed with a simpler policy
    PageDegraded,
    /// A single block or detection was skipped
    BlockDegraded,
}

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A layout block, run or detection had an inverted or non-finite box
    MalformedBoundingBox,
    /// An OCR detection fell below the confidence floor
    LowConfidence,
    /// An OCR or layout model call exceeded its time budget
    ModelTimeout,
    /// An OCR or layout model call returned an error
    ModelFailure,
    /// A model call needed a page raster that was not available
    MissingRaster,
    /// Column detection was ambiguous; single-column order was used
    AmbiguousColumns,
    /// A caption had no image/table/formula within reach
    UnmatchedCaption,
    /// An inline formula was not inside any text block
    OrphanInlineFormula,
    /// A geometric or ordering invariant did not hold
    InvariantViolation,
}

impl DiagnosticKind {
    /// Severity implied by the kind.
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticKind::LowConfidence
            | DiagnosticKind::UnmatchedCaption
            | DiagnosticKind::OrphanInlineFormula => Severity::BlockDegraded,
            DiagnosticKind::MalformedBoundingBox
            | DiagnosticKind::ModelTimeout
            | DiagnosticKind::ModelFailure
            | DiagnosticKind::MissingRaster
            | DiagnosticKind::AmbiguousColumns
            | DiagnosticKind::InvariantViolation => Severity::PageDegraded,
        }
    }
}

/// A warning attached to the middle document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Page the degradation happened on
    pub page_idx: usize,

    /// Detection index of the affected layout block, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_idx: Option<usize>,

    /// What went wrong
    pub kind: DiagnosticKind,

    /// Severity
    pub severity: Severity,

    /// Human-readable detail
    pub message: String,
}

impl Diagnostic {
    /// Create a page-scoped diagnostic.
    pub fn new(page_idx: usize, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            page_idx,
            block_idx: None,
            kind,
            severity: kind.severity(),
            message: message.into(),
        }
    }

    /// Scope the diagnostic to a layout block.
    pub fn with_block(mut self, block_idx: usize) -> Self {
        self.block_idx = Some(block_idx);
        self
    }

    /// Emit the diagnostic through the `log` facade and return it.
    pub(crate) fn logged(self) -> Self {
        match self.block_idx {
            Some(b) => log::warn!(
                "page {} block {}: {:?}: {}",
                self.page_idx,
                b,
                self.kind,
                self.message
            ),
            None => log::warn!("page {}: {:?}: {}", self.page_idx, self.kind, self.message),
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_from_kind() {
        let d = Diagnostic::new(0, DiagnosticKind::LowConfidence, "score 0.2");
        assert_eq!(d.severity, Severity::BlockDegraded);
        let d = Diagnostic::new(3, DiagnosticKind::ModelTimeout, "ocr").with_block(4);
        assert_eq!(d.severity, Severity::PageDegraded);
        assert_eq!(d.block_idx, Some(4));
    }

    #[test]
    fn test_serialized_shape() {
        let d = Diagnostic::new(1, DiagnosticKind::AmbiguousColumns, "narrow band");
        let json = serde_json::to_string(&d).unwrap();
        assert!(json.contains("\"kind\":\"ambiguous_columns\""));
        assert!(json.contains("\"severity\":\"page_degraded\""));
        assert!(!json.contains("block_idx"));
    }
}
