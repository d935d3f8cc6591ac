//! Post-preprocessing value clipping

use crate::error::{Result, ServeError};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Cap applied to transformed features unless the artifact says otherwise
pub const DEFAULT_CLIP_CAP: f64 = 8.0;

fn default_cap() -> f64 {
    DEFAULT_CLIP_CAP
}

/// Clamps every transformed value into `[-cap, cap]`.
///
/// Keeps extreme standardized values from dominating a linear classifier.
/// NaN passes through untouched so that missing inputs are still rejected later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clipper {
    #[serde(default = "default_cap")]
    cap: f64,
}

impl Default for Clipper {
    fn default() -> Self {
        Self { cap: DEFAULT_CLIP_CAP }
    }
}

impl Clipper {
    pub fn new(cap: f64) -> Result<Self> {
        let clipper = Self { cap };
        clipper.validate()?;
        Ok(clipper)
    }

    pub fn cap(&self) -> f64 {
        self.cap
    }

    /// Check the cap is usable; deserialized clippers skip `new`
    pub fn validate(&self) -> Result<()> {
        if self.cap.is_nan() || self.cap < 0.0 {
            return Err(ServeError::InvalidArtifact(format!(
                "clip cap must be a non-negative number, got {}",
                self.cap
            )));
        }
        Ok(())
    }

    pub fn apply(&self, x: &mut Array2<f64>) {
        let cap = self.cap;
        x.mapv_inplace(|v| if v.is_nan() { v } else { v.clamp(-cap, cap) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_default_cap() {
        let clipper: Clipper = serde_json::from_str("{}").unwrap();
        assert_eq!(clipper.cap(), 8.0);
    }

    #[test]
    fn test_clip_values() {
        let clipper = Clipper::new(8.0).unwrap();
        let mut x = array![[-12.0, 0.5], [9.0, f64::NAN]];
        clipper.apply(&mut x);

        assert_eq!(x[[0, 0]], -8.0);
        assert_eq!(x[[0, 1]], 0.5);
        assert_eq!(x[[1, 0]], 8.0);
        assert!(x[[1, 1]].is_nan());
    }

    #[test]
    fn test_negative_cap_rejected() {
        assert!(Clipper::new(-1.0).is_err());
    }
}
