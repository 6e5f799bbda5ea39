// One aggregation time slot.

use serde::{Deserialize, Serialize};

/// Average of the samples that fell into `label`'s bucket (0 for zero-filled gaps).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub label: String,
    pub average: f64,
}

impl Bucket {
    pub fn new(label: impl Into<String>, average: f64) -> Self {
        Self {
            label: label.into(),
            average,
        }
    }
}
