use ndarray::ArrayView3;

use super::dimensions::Dimensions;

/// A single camera/image sample: contiguous pixel bytes in row-major order.
///
/// Frames are immutable once captured. Format conversion happens at I/O
/// boundaries only; the domain layer treats pixel data as opaque.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn from_rgb_image(image: image::RgbImage, index: usize) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, 3, index)
    }

    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        if self.channels != 3 {
            return None;
        }
        image::RgbImage::from_raw(self.width, self.height, self.data.clone())
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Capture sequence number assigned by the source.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies the pixel rectangle `[x, x + w) × [y, y + h)` into a new frame.
    ///
    /// The caller guarantees the rectangle lies inside the frame.
    pub fn crop(&self, x: u32, y: u32, w: u32, h: u32) -> Frame {
        debug_assert!(x + w <= self.width && y + h <= self.height);
        let channels = self.channels as usize;
        let row_len = w as usize * channels;
        let stride = self.width as usize * channels;
        let mut data = Vec::with_capacity(row_len * h as usize);

        for row in y as usize..(y + h) as usize {
            let start = row * stride + x as usize * channels;
            data.extend_from_slice(&self.data[start..start + row_len]);
        }

        Frame::new(data, w, h, self.channels, self.index)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
