//! Axis-aligned bounding boxes in page coordinates.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle `(x0, y0, x1, y1)` in page coordinates.
///
/// The origin is the top-left corner of the page and `y` grows downward,
/// matching the coordinate system of the layout detection model.
/// Serialized as a four-element array.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BBox {
    /// Left edge
    pub x0: f32,
    /// Top edge
    pub y0: f32,
    /// Right edge
    pub x1: f32,
    /// Bottom edge
    pub y1: f32,
}

impl From<[f32; 4]> for BBox {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BBox> for [f32; 4] {
    fn from(b: BBox) -> Self {
        [b.x0, b.y0, b.x1, b.y1]
    }
}

impl BBox {
    /// Create a new box. No normalization is applied; see [`BBox::is_valid`].
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Whether all coordinates are finite and the box is not inverted.
    ///
    /// Degenerate (zero width or height) boxes are valid.
    pub fn is_valid(&self) -> bool {
        self.x0.is_finite()
            && self.y0.is_finite()
            && self.x1.is_finite()
            && self.y1.is_finite()
            && self.x1 >= self.x0
            && self.y1 >= self.y0
    }

    /// Box width.
    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    /// Box height.
    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }

    /// Box area.
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Horizontal center.
    pub fn center_x(&self) -> f32 {
        (self.x0 + self.x1) / 2.0
    }

    /// Vertical center.
    pub fn center_y(&self) -> f32 {
        (self.y0 + self.y1) / 2.0
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox::new(
            self.x0.min(other.x0),
            self.y0.min(other.y0),
            self.x1.max(other.x1),
            self.y1.max(other.y1),
        )
    }

    /// Union of an iterator of boxes, `None` when empty.
    pub fn union_all<'a, I>(boxes: I) -> Option<BBox>
    where
        I: IntoIterator<Item = &'a BBox>,
    {
        boxes.into_iter().fold(None, |acc, b| match acc {
            None => Some(*b),
            Some(u) => Some(u.union(b)),
        })
    }

    /// Overlapping region, `None` when the boxes do not intersect.
    pub fn intersection(&self, other: &BBox) -> Option<BBox> {
        let x0 = self.x0.max(other.x0);
        let y0 = self.y0.max(other.y0);
        let x1 = self.x1.min(other.x1);
        let y1 = self.y1.min(other.y1);
        if x1 >= x0 && y1 >= y0 {
            Some(BBox::new(x0, y0, x1, y1))
        } else {
            None
        }
    }

    /// Area of the overlapping region.
    pub fn intersection_area(&self, other: &BBox) -> f32 {
        self.intersection(other).map(|b| b.area()).unwrap_or(0.0)
    }

    /// Fraction of this box's area that lies inside `other`.
    ///
    /// A degenerate box counts as fully inside when its center lies in
    /// `other`, so zero-height runs still attach to their block.
    pub fn overlap_ratio_in(&self, other: &BBox) -> f32 {
        let area = self.area();
        if area <= 0.0 {
            return if other.contains_point(self.center_x(), self.center_y()) {
                1.0
            } else {
                0.0
            };
        }
        self.intersection_area(other) / area
    }

    /// Length of the overlap between the vertical extents.
    pub fn vertical_overlap(&self, other: &BBox) -> f32 {
        (self.y1.min(other.y1) - self.y0.max(other.y0)).max(0.0)
    }

    /// Length of the overlap between the horizontal extents.
    pub fn horizontal_overlap(&self, other: &BBox) -> f32 {
        (self.x1.min(other.x1) - self.x0.max(other.x0)).max(0.0)
    }

    /// Vertical distance between the boxes, 0 when their extents overlap.
    pub fn vertical_gap(&self, other: &BBox) -> f32 {
        if self.y1 <= other.y0 {
            other.y0 - self.y1
        } else if other.y1 <= self.y0 {
            self.y0 - other.y1
        } else {
            0.0
        }
    }

    /// Whether the point lies inside the box (edges inclusive).
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    /// Whether `other` lies entirely inside this box (edges inclusive).
    pub fn contains(&self, other: &BBox) -> bool {
        other.x0 >= self.x0 && other.y0 >= self.y0 && other.x1 <= self.x1 && other.y1 <= self.y1
    }

    /// Scale all coordinates by a factor.
    pub fn scale(&self, factor: f32) -> BBox {
        BBox::new(
            self.x0 * factor,
            self.y0 * factor,
            self.x1 * factor,
            self.y1 * factor,
        )
    }

    /// Clamp the box to `[0, width] x [0, height]`.
    pub fn clamp_to(&self, width: f32, height: f32) -> BBox {
        BBox::new(
            self.x0.clamp(0.0, width),
            self.y0.clamp(0.0, height),
            self.x1.clamp(0.0, width),
            self.y1.clamp(0.0, height),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity() {
        assert!(BBox::new(0.0, 0.0, 10.0, 10.0).is_valid());
        assert!(BBox::new(5.0, 5.0, 5.0, 5.0).is_valid());
        assert!(!BBox::new(10.0, 0.0, 0.0, 10.0).is_valid());
        assert!(!BBox::new(0.0, 10.0, 10.0, 0.0).is_valid());
        assert!(!BBox::new(f32::NAN, 0.0, 1.0, 1.0).is_valid());
    }

    #[test]
    fn test_union_and_intersection() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(5.0, 5.0, 20.0, 15.0);
        assert_eq!(a.union(&b), BBox::new(0.0, 0.0, 20.0, 15.0));
        assert_eq!(a.intersection(&b), Some(BBox::new(5.0, 5.0, 10.0, 10.0)));
        assert_eq!(a.intersection_area(&b), 25.0);

        let c = BBox::new(30.0, 30.0, 40.0, 40.0);
        assert!(a.intersection(&c).is_none());
        assert_eq!(BBox::union_all([a, b, c].iter()), Some(BBox::new(0.0, 0.0, 40.0, 40.0)));
        assert_eq!(BBox::union_all(std::iter::empty()), None);
    }

    #[test]
    fn test_overlap_ratio() {
        let run = BBox::new(0.0, 0.0, 10.0, 10.0);
        let block = BBox::new(5.0, 0.0, 100.0, 100.0);
        assert!((run.overlap_ratio_in(&block) - 0.5).abs() < 1e-6);

        let flat = BBox::new(10.0, 10.0, 20.0, 10.0);
        assert_eq!(flat.overlap_ratio_in(&block), 1.0);
    }

    #[test]
    fn test_vertical_gap() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let below = BBox::new(0.0, 25.0, 10.0, 30.0);
        assert_eq!(a.vertical_gap(&below), 15.0);
        assert_eq!(below.vertical_gap(&a), 15.0);
        assert_eq!(a.vertical_gap(&BBox::new(0.0, 5.0, 10.0, 20.0)), 0.0);
    }

    #[test]
    fn test_serde_as_array() {
        let b = BBox::new(1.0, 2.0, 3.0, 4.0);
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, "[1.0,2.0,3.0,4.0]");
        let back: BBox = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
    }
}
