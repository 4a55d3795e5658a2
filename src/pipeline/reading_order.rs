//! Reading order: column detection and block sequencing.

use std::cmp::Ordering;

use super::PipelineConfig;
use crate::model::BBox;

/// A vertical column band in page units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnBand {
    /// Left boundary
    pub left: f32,
    /// Right boundary
    pub right: f32,
}

impl ColumnBand {
    /// Check if an x coordinate falls within this band.
    pub fn contains(&self, x: f32) -> bool {
        x >= self.left && x < self.right
    }
}

/// Result of ordering the blocks of one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageOrder {
    /// Positions into the input slice, in reading order
    pub order: Vec<usize>,
    /// Column bands used (one band when single-column)
    pub columns: usize,
    /// Why column detection fell back to single-column order, if it did
    pub ambiguity: Option<String>,
}

/// Total order used everywhere a tie must be broken: top edge, left edge,
/// detection index.
pub fn compare_position(a: &(BBox, usize), b: &(BBox, usize)) -> Ordering {
    a.0.y0
        .total_cmp(&b.0.y0)
        .then(a.0.x0.total_cmp(&b.0.x0))
        .then(a.1.cmp(&b.1))
}

/// Order blocks given as `(bbox, detection index)`.
///
/// Narrow blocks are split into column bands at empty horizontal gaps of at
/// least `column_gap_threshold`. Blocks wider than `spanning_width_ratio` of
/// the content width span all columns and cut the page into sections; each
/// section is read column by column, and a spanning block follows the section
/// above it.
pub fn order_blocks(blocks: &[(BBox, usize)], config: &PipelineConfig) -> PageOrder {
    let single = |ambiguity: Option<String>| {
        let mut order: Vec<usize> = (0..blocks.len()).collect();
        order.sort_by(|&a, &b| compare_position(&blocks[a], &blocks[b]));
        PageOrder {
            order,
            columns: 1,
            ambiguity,
        }
    };

    let Some(content) = BBox::union_all(blocks.iter().map(|(b, _)| b)) else {
        return single(None);
    };
    let content_width = content.width();
    if content_width <= 0.0 {
        return single(None);
    }

    let spanning_limit = config.spanning_width_ratio * content_width;
    let (spanning, narrow): (Vec<usize>, Vec<usize>) =
        (0..blocks.len()).partition(|&i| blocks[i].0.width() > spanning_limit);

    let bands = detect_columns(&narrow.iter().map(|&i| blocks[i].0).collect::<Vec<_>>(), config);
    log::debug!("Detected {} column bands", bands.len());
    for (i, band) in bands.iter().enumerate() {
        log::debug!("  Band {}: left={:.1}, right={:.1}", i, band.left, band.right);
    }

    if bands.len() > config.max_columns {
        return single(Some(format!(
            "{} column bands exceed the maximum of {}",
            bands.len(),
            config.max_columns
        )));
    }
    if bands.len() > 1 {
        let min_width = config.min_column_width_ratio * content_width;
        for band in &bands {
            let occupied = BBox::union_all(
                narrow
                    .iter()
                    .map(|&i| &blocks[i].0)
                    .filter(|b| band.contains(b.center_x())),
            )
            .map(|b| b.width())
            .unwrap_or(0.0);
            if occupied < min_width {
                return single(Some(format!(
                    "column band at x={:.1}..{:.1} is {:.1} wide, below {:.1}",
                    band.left, band.right, occupied, min_width
                )));
            }
        }
    }
    if bands.len() <= 1 {
        return single(None);
    }

    // Spanning blocks in top-to-bottom order delimit the sections
    let mut spanning = spanning;
    spanning.sort_by(|&a, &b| compare_position(&blocks[a], &blocks[b]));

    let mut sections: Vec<Vec<usize>> = vec![Vec::new(); spanning.len() + 1];
    for &i in &narrow {
        let cy = blocks[i].0.center_y();
        let section = spanning
            .iter()
            .take_while(|&&s| blocks[s].0.center_y() <= cy)
            .count();
        sections[section].push(i);
    }

    let band_of = |i: usize| {
        let cx = blocks[i].0.center_x();
        bands
            .iter()
            .position(|b| b.contains(cx))
            .unwrap_or(bands.len() - 1)
    };

    let mut order = Vec::with_capacity(blocks.len());
    for (k, mut section) in sections.into_iter().enumerate() {
        section.sort_by(|&a, &b| {
            band_of(a)
                .cmp(&band_of(b))
                .then_with(|| compare_position(&blocks[a], &blocks[b]))
        });
        order.extend(section);
        if let Some(&s) = spanning.get(k) {
            order.push(s);
        }
    }

    PageOrder {
        order,
        columns: bands.len(),
        ambiguity: None,
    }
}

/// Detect column bands from vertical gutters between narrow blocks.
///
/// Divides the horizontal extent into slices, counts how many boxes occupy
/// each slice, and splits at every empty run at least
/// `column_gap_threshold` wide that has blocks side by side across it.
/// Returns bands sorted left to right.
pub fn detect_columns(boxes: &[BBox], config: &PipelineConfig) -> Vec<ColumnBand> {
    let Some(extent) = BBox::union_all(boxes.iter()) else {
        return vec![];
    };
    let (min_x, max_x) = (extent.x0, extent.x1);
    let width = max_x - min_x;
    let whole = vec![ColumnBand {
        left: f32::NEG_INFINITY,
        right: f32::INFINITY,
    }];
    if width <= config.column_gap_threshold {
        return whole;
    }

    let slice_width = (width / 2000.0).max(1.0);
    let num_slices = (width / slice_width) as usize + 1;
    let mut slice_occupancy = vec![0usize; num_slices];

    for b in boxes {
        let start_slice = ((b.x0 - min_x) / slice_width) as usize;
        let end_slice = ((b.x1 - min_x) / slice_width) as usize;
        for slot in slice_occupancy
            .iter_mut()
            .take(end_slice.min(num_slices - 1) + 1)
            .skip(start_slice)
        {
            *slot += 1;
        }
    }

    let mut gutters = Vec::new();
    let mut gap_start = 0;
    let mut gap_len = 0;
    for (i, &occupancy) in slice_occupancy.iter().enumerate() {
        if occupancy == 0 {
            if gap_len == 0 {
                gap_start = i;
            }
            gap_len += 1;
            continue;
        }
        if gap_len > 0 {
            // An empty run of n slices spans n - 1 slice widths between the
            // occupied neighbours, plus the partial slices on either side
            let gap_width = (gap_len + 1) as f32 * slice_width;
            log::debug!(
                "Gap: width~{:.1} at x={:.1}",
                gap_width,
                min_x + gap_start as f32 * slice_width
            );
            let gutter = min_x + (gap_start as f32 + gap_len as f32 / 2.0) * slice_width;
            if gap_width >= config.column_gap_threshold && has_side_by_side(boxes, gutter) {
                gutters.push(gutter);
            }
        }
        gap_len = 0;
    }

    if gutters.is_empty() {
        return whole;
    }

    let mut bands = Vec::with_capacity(gutters.len() + 1);
    let mut left = f32::NEG_INFINITY;
    for g in gutters {
        bands.push(ColumnBand { left, right: g });
        left = g;
    }
    bands.push(ColumnBand {
        left,
        right: f32::INFINITY,
    });
    bands
}

/// A gutter separates columns only when some block on its left shares
/// vertical extent with some block on its right.
fn has_side_by_side(boxes: &[BBox], gutter: f32) -> bool {
    boxes.iter().filter(|l| l.x1 <= gutter).any(|l| {
        boxes
            .iter()
            .any(|r| r.x0 >= gutter && l.vertical_overlap(r) > 0.0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PipelineConfig {
        PipelineConfig::default()
    }

    #[test]
    fn test_two_columns_with_spanning_image() {
        let blocks = vec![
            (BBox::new(320.0, 100.0, 550.0, 200.0), 0), // right top
            (BBox::new(50.0, 100.0, 280.0, 200.0), 1),  // left top
            (BBox::new(50.0, 600.0, 550.0, 780.0), 2),  // spanning image
            (BBox::new(50.0, 220.0, 280.0, 500.0), 3),  // left bottom
            (BBox::new(320.0, 220.0, 550.0, 500.0), 4), // right bottom
        ];
        let result = order_blocks(&blocks, &config());
        assert_eq!(result.columns, 2);
        assert!(result.ambiguity.is_none());
        let ids: Vec<usize> = result.order.iter().map(|&p| blocks[p].1).collect();
        assert_eq!(ids, vec![1, 3, 0, 4, 2]);
    }

    #[test]
    fn test_spanning_title_cuts_sections() {
        let blocks = vec![
            (BBox::new(50.0, 50.0, 550.0, 80.0), 0),    // title
            (BBox::new(50.0, 100.0, 280.0, 300.0), 1),  // left
            (BBox::new(320.0, 100.0, 550.0, 300.0), 2), // right
        ];
        let ids: Vec<usize> = order_blocks(&blocks, &config())
            .order
            .iter()
            .map(|&p| blocks[p].1)
            .collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_single_column_ties() {
        let blocks = vec![
            (BBox::new(50.0, 100.0, 550.0, 120.0), 2),
            (BBox::new(50.0, 100.0, 550.0, 120.0), 1),
            (BBox::new(50.0, 50.0, 550.0, 80.0), 0),
        ];
        let result = order_blocks(&blocks, &config());
        assert_eq!(result.columns, 1);
        assert_eq!(result.order, vec![2, 1, 0]);
    }

    #[test]
    fn test_narrow_band_is_ambiguous() {
        let blocks = vec![
            (BBox::new(50.0, 100.0, 330.0, 200.0), 0),
            (BBox::new(50.0, 220.0, 330.0, 400.0), 1),
            (BBox::new(530.0, 100.0, 545.0, 110.0), 2),
        ];
        let result = order_blocks(&blocks, &config());
        assert_eq!(result.columns, 1);
        assert!(result.ambiguity.is_some());
        assert_eq!(result.order, vec![0, 2, 1]);
    }

    #[test]
    fn test_too_many_columns_is_ambiguous() {
        let blocks: Vec<(BBox, usize)> = (0..6)
            .map(|i| {
                let x = 10.0 + i as f32 * 100.0;
                (BBox::new(x, 100.0, x + 60.0, 400.0), i)
            })
            .collect();
        let result = order_blocks(&blocks, &config());
        assert_eq!(result.columns, 1);
        assert!(result.ambiguity.unwrap().contains("exceed"));
    }

    #[test]
    fn test_stacked_narrow_blocks_stay_single_column() {
        let blocks = vec![
            (BBox::new(200.0, 50.0, 400.0, 80.0), 0),  // centred title
            (BBox::new(50.0, 100.0, 130.0, 120.0), 1), // left heading
            (BBox::new(50.0, 130.0, 550.0, 300.0), 2), // body
        ];
        let result = order_blocks(&blocks, &config());
        assert_eq!(result.columns, 1);
        assert!(result.ambiguity.is_none());
        assert_eq!(result.order, vec![0, 1, 2]);

        let narrow = [blocks[0].0, blocks[1].0];
        assert_eq!(detect_columns(&narrow, &config()).len(), 1);
    }

    #[test]
    fn test_detect_columns_small_gap() {
        let boxes = vec![
            BBox::new(0.0, 0.0, 100.0, 10.0),
            BBox::new(105.0, 0.0, 200.0, 10.0),
        ];
        assert_eq!(detect_columns(&boxes, &config()).len(), 1);
        assert!(detect_columns(&[], &config()).is_empty());
    }
}
