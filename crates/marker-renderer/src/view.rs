//! Map-to-pixel coordinate mapping.

use map_common::{BoundingBox, Coord};

/// Coordinate projection applied before the view transform.
///
/// Reprojection itself is out of scope; implementations wrap whatever
/// projection library the caller uses.
pub trait Projection: Send + Sync {
    /// Project a source coordinate into map coordinates.
    fn forward(&self, coord: Coord) -> Coord;
}

/// Projection that leaves coordinates untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityProjection;

impl Projection for IdentityProjection {
    fn forward(&self, coord: Coord) -> Coord {
        coord
    }
}

/// Maps a map extent onto a `width` x `height` pixel grid, y pointing down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    extent: BoundingBox,
    width: u32,
    height: u32,
    sx: f64,
    sy: f64,
}

impl ViewTransform {
    pub fn new(width: u32, height: u32, extent: BoundingBox) -> Self {
        let sx = if extent.width() > 0.0 {
            width as f64 / extent.width()
        } else {
            1.0
        };
        let sy = if extent.height() > 0.0 {
            height as f64 / extent.height()
        } else {
            1.0
        };
        Self {
            extent,
            width,
            height,
            sx,
            sy,
        }
    }

    /// A view where map units are pixels (extent `0 0 width height`).
    pub fn pixel_space(width: u32, height: u32) -> Self {
        Self::new(
            width,
            height,
            BoundingBox::new(0.0, 0.0, width as f64, height as f64),
        )
    }

    pub fn extent(&self) -> BoundingBox {
        self.extent
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel box covering the whole view.
    pub fn screen_box(&self) -> BoundingBox {
        BoundingBox::new(0.0, 0.0, self.width as f64, self.height as f64)
    }

    pub fn forward(&self, (x, y): Coord) -> Coord {
        (
            (x - self.extent.min_x) * self.sx,
            (self.extent.max_y - y) * self.sy,
        )
    }

    pub fn backward(&self, (px, py): Coord) -> Coord {
        (
            self.extent.min_x + px / self.sx,
            self.extent.max_y - py / self.sy,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_coords_approx_eq;

    #[test]
    fn test_forward_flips_y() {
        let view = ViewTransform::new(100, 50, BoundingBox::new(-10.0, -5.0, 10.0, 5.0));
        assert_eq!(view.forward((-10.0, 5.0)), (0.0, 0.0));
        assert_eq!(view.forward((10.0, -5.0)), (100.0, 50.0));
        assert_eq!(view.forward((0.0, 0.0)), (50.0, 25.0));
    }

    #[test]
    fn test_backward_inverts_forward() {
        let view = ViewTransform::new(256, 256, BoundingBox::new(0.0, 0.0, 1000.0, 1000.0));
        let (x, y) = view.backward(view.forward((123.0, 456.0)));
        assert_coords_approx_eq!((x, y), (123.0, 456.0), 1e-9);
    }
}
