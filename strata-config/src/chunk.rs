use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Default, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ChunkConfig {
    pub compression: ChunkCompression,
}

impl ChunkConfig {
    pub(crate) fn validate(&mut self) {
        self.compression.validate();
    }
}

/// Region payloads are always written with Zlib; only the level is tunable.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ChunkCompression {
    /// 0 (store) to 9 (smallest)
    pub level: u32,
}

impl ChunkCompression {
    pub const MAX_LEVEL: u32 = 9;

    fn validate(&mut self) {
        if self.level > Self::MAX_LEVEL {
            log::warn!(
                "Compression level {} is out of range, using {}",
                self.level,
                Self::MAX_LEVEL
            );
            self.level = Self::MAX_LEVEL;
        }
    }
}

impl Default for ChunkCompression {
    fn default() -> Self {
        Self { level: 6 }
    }
}
