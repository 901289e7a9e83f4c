//! Inspection helpers for rendered framebuffers.

use map_common::BoundingBox;
use tiny_skia::Pixmap;

/// Number of pixels with non-zero alpha.
pub fn count_painted(pixmap: &Pixmap) -> usize {
    pixmap.pixels().iter().filter(|p| p.alpha() > 0).count()
}

/// Whether nothing has been drawn.
pub fn is_blank(pixmap: &Pixmap) -> bool {
    pixmap.data().iter().all(|b| *b == 0)
}

/// Straight-alpha RGBA of one pixel; `None` outside the image.
pub fn rgba_at(pixmap: &Pixmap, x: u32, y: u32) -> Option<[u8; 4]> {
    let c = pixmap.pixel(x, y)?.demultiply();
    Some([c.red(), c.green(), c.blue(), c.alpha()])
}

/// Pixel-space box covering every painted pixel.
pub fn painted_bounds(pixmap: &Pixmap) -> Option<BoundingBox> {
    let width = pixmap.width() as usize;
    let mut bounds: Option<BoundingBox> = None;
    for (i, p) in pixmap.pixels().iter().enumerate() {
        if p.alpha() == 0 {
            continue;
        }
        let (x, y) = ((i % width) as f64, (i / width) as f64);
        match bounds.as_mut() {
            Some(b) => {
                b.expand_to_include(x, y);
                b.expand_to_include(x + 1.0, y + 1.0);
            }
            None => bounds = Some(BoundingBox::new(x, y, x + 1.0, y + 1.0)),
        }
    }
    bounds
}

/// Number of differing bytes between two equally sized images.
pub fn diff_bytes(a: &Pixmap, b: &Pixmap) -> usize {
    assert_eq!(
        (a.width(), a.height()),
        (b.width(), b.height()),
        "images differ in size"
    );
    a.data()
        .iter()
        .zip(b.data().iter())
        .filter(|(x, y)| x != y)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_painted_bounds() {
        let mut pixmap = Pixmap::new(20, 20).unwrap();
        assert!(is_blank(&pixmap));
        assert_eq!(painted_bounds(&pixmap), None);

        let rect = tiny_skia::Rect::from_xywh(4.0, 6.0, 3.0, 2.0).unwrap();
        let mut paint = tiny_skia::Paint::default();
        paint.set_color_rgba8(255, 0, 0, 255);
        pixmap.fill_rect(rect, &paint, tiny_skia::Transform::identity(), None);

        assert_eq!(count_painted(&pixmap), 6);
        assert_eq!(painted_bounds(&pixmap), Some(BoundingBox::new(4.0, 6.0, 7.0, 8.0)));
        assert_eq!(rgba_at(&pixmap, 5, 7), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_diff_bytes() {
        let a = Pixmap::new(4, 4).unwrap();
        let mut b = a.clone();
        assert_eq!(diff_bytes(&a, &b), 0);
        b.fill(tiny_skia::Color::WHITE);
        assert_eq!(diff_bytes(&a, &b), 64);
    }
}
