//! Face descriptor comparison
//!
//! Descriptors are 128-number embeddings produced client-side. Two descriptors
//! belong to the same person when their Euclidean distance is at most the
//! match threshold.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Number of components in a face descriptor
pub const DESCRIPTOR_LEN: usize = 128;

/// Default match threshold
///
/// Stricter than the usual 0.6 "same person" cut-off for this embedding model,
/// to reduce false accepts.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.55;

/// Fixed-length face embedding
///
/// Always exactly [`DESCRIPTOR_LEN`] finite numbers. Replaced wholesale, never
/// partially updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct FaceDescriptor(Vec<f64>);

impl FaceDescriptor {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Euclidean distance to another descriptor
    pub fn distance(&self, other: &FaceDescriptor) -> f64 {
        euclidean_distance(&self.0, &other.0)
    }
}

impl TryFrom<Vec<f64>> for FaceDescriptor {
    type Error = Error;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        if values.len() != DESCRIPTOR_LEN {
            return Err(Error::Validation(format!(
                "A valid {}-number face descriptor is required (got {} numbers)",
                DESCRIPTOR_LEN,
                values.len()
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::Validation(
                "Face descriptor contains non-finite numbers".to_string(),
            ));
        }
        Ok(Self(values))
    }
}

impl From<FaceDescriptor> for Vec<f64> {
    fn from(descriptor: FaceDescriptor) -> Self {
        descriptor.0
    }
}

/// Euclidean distance over the first 128 components
///
/// Missing components on either side count as 0.
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    (0..DESCRIPTOR_LEN)
        .map(|i| {
            let diff = a.get(i).copied().unwrap_or(0.0) - b.get(i).copied().unwrap_or(0.0);
            diff * diff
        })
        .sum::<f64>()
        .sqrt()
}

/// Match verdict for a computed distance
pub fn is_match(distance: f64, threshold: f64) -> bool {
    distance <= threshold
}
