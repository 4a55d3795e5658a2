//! Page structuring: region extraction and structure assembly.

mod assemble;
mod caption;
mod extract;
mod headings;
pub(crate) mod normalize;
mod options;
mod reading_order;

pub use assemble::{AssembledPage, StructureAssembler};
pub use caption::attach_captions;
pub use extract::{Extraction, RegionExtractor};
pub use headings::{assign_heading_levels, FontStatistics};
pub use normalize::TextNormalizer;
pub use options::{InlineOrder, PipelineConfig};
pub use reading_order::{compare_position, detect_columns, order_blocks, ColumnBand, PageOrder};
