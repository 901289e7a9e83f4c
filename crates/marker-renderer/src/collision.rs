//! Collision detection for marker placements.

use map_common::BoundingBox;

/// Tracks occupied regions of the output image.
///
/// Owned by a single render pass and mutated as placements are accepted.
pub trait CollisionDetector {
    /// Area placements must stay inside when edge avoidance is on.
    fn extent(&self) -> BoundingBox;

    /// Whether `bbox` is free of previously reserved regions.
    fn has_placement(&self, bbox: &BoundingBox) -> bool;

    /// Reserve `bbox`.
    fn insert(&mut self, bbox: BoundingBox);
}

/// Linear list of reserved boxes.
#[derive(Debug, Clone)]
pub struct LabelCollisionDetector {
    extent: BoundingBox,
    boxes: Vec<BoundingBox>,
}

impl LabelCollisionDetector {
    pub fn new(extent: BoundingBox) -> Self {
        Self {
            extent,
            boxes: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn boxes(&self) -> &[BoundingBox] {
        &self.boxes
    }

    pub fn clear(&mut self) {
        self.boxes.clear();
    }
}

impl CollisionDetector for LabelCollisionDetector {
    fn extent(&self) -> BoundingBox {
        self.extent
    }

    fn has_placement(&self, bbox: &BoundingBox) -> bool {
        !self.boxes.iter().any(|b| b.intersects(bbox))
    }

    fn insert(&mut self, bbox: BoundingBox) {
        self.boxes.push(bbox);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_box_blocks_overlap() {
        let mut detector = LabelCollisionDetector::new(BoundingBox::new(0.0, 0.0, 100.0, 100.0));
        let a = BoundingBox::new(10.0, 10.0, 20.0, 20.0);
        assert!(detector.has_placement(&a));
        detector.insert(a);

        assert!(!detector.has_placement(&BoundingBox::new(15.0, 15.0, 25.0, 25.0)));
        // touching edges do not collide
        assert!(detector.has_placement(&BoundingBox::new(20.0, 10.0, 30.0, 20.0)));
        assert_eq!(detector.len(), 1);
    }
}
