use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier for one campaign run across all of its environments.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CampaignId(Uuid);

impl CampaignId {
    /// Create a new unique campaign ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Short form used in container names.
    #[must_use]
    pub fn short(&self) -> String {
        self.0.simple().to_string().chars().take(12).collect()
    }
}

impl Default for CampaignId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
