use super::dimensions::Dimensions;

/// Axis-aligned face box in the pixel space of some image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Integer pixel rectangle fully inside a frame: `(x, y, width, height)`.
pub type PixelRect = (u32, u32, u32, u32);

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a box from corner coordinates `(x1, y1, x2, y2)`.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }

    pub fn corners(&self) -> [f64; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Scales position and size independently per axis.
    pub fn scale(&self, sx: f64, sy: f64) -> Self {
        Self::new(self.x * sx, self.y * sy, self.width * sx, self.height * sy)
    }

    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let [ax1, ay1, ax2, ay2] = self.corners();
        let [bx1, by1, bx2, by2] = other.corners();

        let inter = (ax2.min(bx2) - ax1.max(bx1)).max(0.0) * (ay2.min(by2) - ay1.max(by1)).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }

    /// Rounds the box to whole pixels and clips it to the image borders.
    ///
    /// Returns `None` when nothing of the box lies inside the image.
    pub fn clip_to(&self, bounds: Dimensions) -> Option<PixelRect> {
        let [x1, y1, x2, y2] = self.corners();
        let x1 = x1.round().clamp(0.0, bounds.width as f64) as u32;
        let y1 = y1.round().clamp(0.0, bounds.height as f64) as u32;
        let x2 = x2.round().clamp(0.0, bounds.width as f64) as u32;
        let y2 = y2.round().clamp(0.0, bounds.height as f64) as u32;

        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some((x1, y1, x2 - x1, y2 - y1))
    }
}
