//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

/// An axis-aligned box in map or screen coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    ///
    /// Corners are normalized so that `min <= max` on both axes.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            min_x: x0.min(x1),
            min_y: y0.min(y1),
            max_x: x0.max(x1),
            max_y: y0.max(y1),
        }
    }

    /// A box of the given size centred on the origin.
    pub fn centered(width: f64, height: f64) -> Self {
        Self::new(-width / 2.0, -height / 2.0, width / 2.0, height / 2.0)
    }

    /// Box that covers every point in `points`, or `None` when empty.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut iter = points.into_iter();
        let (x, y) = iter.next()?;
        let mut bbox = Self::new(x, y, x, y);
        for (x, y) in iter {
            bbox.expand_to_include(x, y);
        }
        Some(bbox)
    }

    /// Parse "minx miny maxx maxy"; commas and whitespace are both accepted.
    pub fn from_string(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let mut values = [0.0; 4];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part
                .parse()
                .map_err(|_| BboxParseError::InvalidNumber(part.to_string()))?;
        }
        Ok(Self::new(values[0], values[1], values[2], values[3]))
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Check if this bbox intersects another.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    /// Compute the intersection of two bounding boxes.
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        if !self.intersects(other) {
            return None;
        }

        Some(BoundingBox {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        })
    }

    /// Check if a point is contained within this bbox (edges inclusive).
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Check if `other` lies entirely within this bbox.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.contains_point(other.min_x, other.min_y) && self.contains_point(other.max_x, other.max_y)
    }

    pub fn expand_to_include(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Grow (or shrink, for negative `amount`) every side by `amount`.
    pub fn pad(&self, amount: f64) -> BoundingBox {
        BoundingBox::new(
            self.min_x - amount,
            self.min_y - amount,
            self.max_x + amount,
            self.max_y + amount,
        )
    }

    /// Scale width and height by `factor` around the box centre.
    pub fn scaled(&self, factor: f64) -> BoundingBox {
        let (cx, cy) = self.center();
        let half_w = self.width() * factor / 2.0;
        let half_h = self.height() * factor / 2.0;
        BoundingBox::new(cx - half_w, cy - half_h, cx + half_w, cy + half_h)
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid BBOX format: {0}. Expected 'minx miny maxx maxy'")]
    InvalidFormat(String),

    #[error("Invalid number in BBOX: {0}")]
    InvalidNumber(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bbox_separators() {
        let expected = BoundingBox::new(100.0, 100.0, 200.0, 200.0);
        assert_eq!(BoundingBox::from_string("100 100 200 200").unwrap(), expected);
        assert_eq!(BoundingBox::from_string("100,100,200,200").unwrap(), expected);
        assert_eq!(
            BoundingBox::from_string("100 , 100 , 200 , 200").unwrap(),
            expected
        );
        assert!(BoundingBox::from_string("100 100 200").is_err());
        assert!(BoundingBox::from_string("a b c d").is_err());
    }

    #[test]
    fn test_intersection() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
        let c = BoundingBox::new(20.0, 20.0, 30.0, 30.0);

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));

        let intersection = a.intersection(&b).unwrap();
        assert_eq!(intersection, BoundingBox::new(5.0, 5.0, 10.0, 10.0));
    }

    #[test]
    fn test_scaled_about_center() {
        let e = BoundingBox::new(100.0, 100.0, 200.0, 200.0).scaled(2.0);
        assert_eq!(e, BoundingBox::new(50.0, 50.0, 250.0, 250.0));

        // no width then no impact of scaling
        let p = BoundingBox::new(100.0, 100.0, 100.0, 100.0).scaled(5.0);
        assert_eq!(p, BoundingBox::new(100.0, 100.0, 100.0, 100.0));
    }

    #[test]
    fn test_contains_box() {
        let outer = BoundingBox::new(0.0, 0.0, 256.0, 256.0);
        assert!(outer.contains(&BoundingBox::new(10.0, 10.0, 20.0, 20.0)));
        assert!(outer.contains(&outer));
        assert!(!outer.contains(&BoundingBox::new(250.0, 10.0, 260.0, 20.0)));
    }
}
