use serde::{Deserialize, Serialize};

/// Identifier the tile source assigns to a rendered feature.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(pub u64);

impl FeatureId {
    /// The engine compares ids as numbers inside expressions.
    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }
}

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
