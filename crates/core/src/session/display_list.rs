use std::sync::Arc;

use crate::pipeline::extract_faces_use_case::ExtractedImage;

/// Append-only list of extracted faces, in the order they were produced.
#[derive(Debug, Default)]
pub struct DisplayList {
    items: Vec<Arc<ExtractedImage>>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend<I>(&mut self, images: I)
    where
        I: IntoIterator<Item = Arc<ExtractedImage>>,
    {
        self.items.extend(images);
    }

    pub fn items(&self) -> &[Arc<ExtractedImage>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
