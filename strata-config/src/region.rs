use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RegionConfig {
    /// Decode and encode slots on the rayon pool.
    pub parallel: bool,
    /// Replace slot timestamps with the current time on write instead of keeping the ones
    /// that were read.
    pub stamp_written_chunks: bool,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            stamp_written_chunks: false,
        }
    }
}
