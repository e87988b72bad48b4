//! Ordered facial keypoints in the pixel space of the detection they belong to.
//!
//! The order is defined by the backend (the shipped ONNX model emits
//! left eye, right eye, nose, left mouth corner, right mouth corner).

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FaceLandmarks {
    points: Vec<(f64, f64)>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn scale(&self, sx: f64, sy: f64) -> Self {
        Self::new(self.points.iter().map(|(x, y)| (x * sx, y * sy)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_scale_preserves_order() {
        let lm = FaceLandmarks::new(vec![(10.0, 20.0), (30.0, 40.0)]);
        let scaled = lm.scale(2.0, 0.5);
        assert_eq!(scaled.len(), 2);
        assert_relative_eq!(scaled.points()[0].0, 20.0);
        assert_relative_eq!(scaled.points()[0].1, 10.0);
        assert_relative_eq!(scaled.points()[1].0, 60.0);
        assert_relative_eq!(scaled.points()[1].1, 20.0);
    }

    #[test]
    fn test_default_is_empty() {
        assert!(FaceLandmarks::default().is_empty());
    }
}
