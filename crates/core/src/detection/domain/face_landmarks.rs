//! Five facial keypoints as reported by the pose detector.
//!
//! Order: left eye, right eye, nose tip, left mouth corner, right mouth corner.
//! A point with `x <= 0` was below the keypoint confidence threshold and is
//! treated as invisible.

pub const LANDMARK_NAMES: [&str; 5] = [
    "left_eye",
    "right_eye",
    "nose",
    "left_mouth",
    "right_mouth",
];

#[derive(Clone, Debug, PartialEq)]
pub struct FaceLandmarks {
    points: [(f64, f64); 5],
}

impl FaceLandmarks {
    pub fn new(points: [(f64, f64); 5]) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[(f64, f64); 5] {
        &self.points
    }

    pub fn has_visible(&self) -> bool {
        self.visible().next().is_some()
    }

    /// Visible points paired with their name.
    pub fn visible(&self) -> impl Iterator<Item = (&'static str, (f64, f64))> + '_ {
        LANDMARK_NAMES
            .iter()
            .zip(self.points.iter())
            .filter(|(_, (x, _))| *x > 0.0)
            .map(|(name, pt)| (*name, *pt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frontal() -> FaceLandmarks {
        FaceLandmarks::new([
            (440.0, 350.0),
            (560.0, 350.0),
            (500.0, 420.0),
            (460.0, 470.0),
            (540.0, 470.0),
        ])
    }

    #[test]
    fn test_all_visible() {
        let lm = frontal();
        assert!(lm.has_visible());
        assert_eq!(lm.visible().count(), 5);
    }

    #[test]
    fn test_none_visible() {
        let lm = FaceLandmarks::new([(0.0, 0.0); 5]);
        assert!(!lm.has_visible());
        assert_eq!(lm.visible().count(), 0);
    }

    #[test]
    fn test_visible_skips_hidden_points_and_keeps_names() {
        let mut pts = [(0.0, 0.0); 5];
        pts[2] = (300.0, 400.0);
        let lm = FaceLandmarks::new(pts);
        let visible: Vec<_> = lm.visible().collect();
        assert_eq!(visible, vec![("nose", (300.0, 400.0))]);
    }
}
