//! Construction parameters.

use serde::{Deserialize, Serialize};

use crate::error::{BuildError, Result};

/// Parameters controlling hierarchy construction.
///
/// Deserializes from partial tables; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Seed of the split-axis generator. Equal seeds give identical
    /// hierarchies over the same primitive list.
    pub seed: u64,
    /// A primitive range becomes a leaf once it holds at most this many
    /// primitives.
    pub max_leaf_primitives: usize,
    /// Run the integrity check after flattening and fail the build on any
    /// error.
    pub validate: bool,
    /// Store leaf runs directly in their parent's slots instead of giving
    /// each leaf its own node. Fewer nodes and one less level to walk.
    pub inline_leaves: bool,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            max_leaf_primitives: 1,
            validate: true,
            inline_leaves: false,
        }
    }
}

impl BuildSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.max_leaf_primitives == 0 {
            return Err(BuildError::InvalidSettings(
                "max_leaf_primitives must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
