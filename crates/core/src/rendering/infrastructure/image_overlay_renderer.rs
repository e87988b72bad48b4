use std::sync::{Arc, Mutex, MutexGuard};

use image::{imageops, DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::detection::domain::detection::DetectionWithLandmarks;
use crate::rendering::domain::overlay_renderer::OverlayRenderer;
use crate::shared::dimensions::Dimensions;
use crate::shared::frame::Frame;

const BOX_COLOR: Rgba<u8> = Rgba([0, 0, 255, 255]);
const LANDMARK_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);
const BOX_THICKNESS: i32 = 2;
const LANDMARK_RADIUS: i32 = 2;

/// Read handle on the overlay pixels, shared with whoever displays them.
#[derive(Clone)]
pub struct OverlaySurface {
    image: Arc<Mutex<RgbaImage>>,
}

impl OverlaySurface {
    pub fn new(size: Dimensions) -> Self {
        Self {
            image: Arc::new(Mutex::new(RgbaImage::from_pixel(
                size.width,
                size.height,
                TRANSPARENT,
            ))),
        }
    }

    pub fn size(&self) -> Dimensions {
        let (w, h) = self.lock().dimensions();
        Dimensions::new(w, h)
    }

    pub fn snapshot(&self) -> RgbaImage {
        self.lock().clone()
    }

    /// Makes every pixel transparent, keeping the size.
    pub fn clear(&self) {
        for pixel in self.lock().pixels_mut() {
            *pixel = TRANSPARENT;
        }
    }

    /// Scales `frame` to the surface size and blends the overlay on top,
    /// giving the annotated picture the user sees.
    pub fn composite_over(&self, frame: &Frame) -> Option<image::RgbImage> {
        let overlay = self.snapshot();
        let base = DynamicImage::ImageRgb8(frame.to_rgb_image()?);
        let mut base = base
            .resize_exact(overlay.width(), overlay.height(), imageops::FilterType::Triangle)
            .to_rgba8();
        imageops::overlay(&mut base, &overlay, 0, 0);
        Some(DynamicImage::ImageRgba8(base).to_rgb8())
    }

    fn lock(&self) -> MutexGuard<'_, RgbaImage> {
        self.image.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Renders boxes as hollow rectangles and landmarks as dots on an RGBA surface.
pub struct ImageOverlayRenderer {
    surface: OverlaySurface,
}

impl ImageOverlayRenderer {
    pub fn new(surface: OverlaySurface) -> Self {
        Self { surface }
    }

    pub fn surface(&self) -> OverlaySurface {
        self.surface.clone()
    }
}

impl OverlayRenderer for ImageOverlayRenderer {
    fn resize(&mut self, size: Dimensions) {
        *self.surface.lock() = RgbaImage::from_pixel(size.width, size.height, TRANSPARENT);
    }

    fn clear(&mut self) {
        self.surface.clear();
    }

    fn draw(&mut self, batch: &[DetectionWithLandmarks]) {
        let mut image = self.surface.lock();
        for item in batch {
            let bbox = &item.detection.bbox;
            for inset in 0..BOX_THICKNESS {
                let w = bbox.width.round() as i32 - 2 * inset;
                let h = bbox.height.round() as i32 - 2 * inset;
                if w <= 0 || h <= 0 {
                    break;
                }
                let rect = Rect::at(bbox.x.round() as i32 + inset, bbox.y.round() as i32 + inset)
                    .of_size(w as u32, h as u32);
                draw_hollow_rect_mut(&mut *image, rect, BOX_COLOR);
            }

            for &(x, y) in item.landmarks.points() {
                draw_filled_circle_mut(
                    &mut *image,
                    (x.round() as i32, y.round() as i32),
                    LANDMARK_RADIUS,
                    LANDMARK_COLOR,
                );
            }
        }
    }
}
