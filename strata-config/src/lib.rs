use log::warn;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use std::{fs, io, path::Path};
#[cfg(not(feature = "test_helper"))]
use std::{env, sync::LazyLock};

pub mod chunk;
pub mod region;

pub use chunk::{ChunkCompression, ChunkConfig};
pub use region::RegionConfig;

const CONFIG_ROOT_FOLDER: &str = "config/";

#[cfg(not(feature = "test_helper"))]
static CODEC_CONFIG: LazyLock<CodecConfiguration> = LazyLock::new(|| match env::current_dir() {
    Ok(exec_dir) => CodecConfiguration::load(&exec_dir),
    Err(err) => {
        warn!("Couldn't resolve the working directory ({err}), using default codec config");
        CodecConfiguration::default()
    }
});

#[cfg(not(feature = "test_helper"))]
pub fn codec_config() -> &'static CodecConfiguration {
    &CODEC_CONFIG
}

#[cfg(feature = "test_helper")]
use std::cell::RefCell;

// Leaked on purpose so the accessor can hand out `&'static` just like the real global
#[cfg(feature = "test_helper")]
thread_local! {
    // Thread local so parallel tests don't see each other's overrides
    static CODEC_CONFIG: RefCell<&'static CodecConfiguration> = RefCell::new(Box::leak(Box::new(CodecConfiguration::default())));
}

#[cfg(feature = "test_helper")]
pub fn override_config_for_testing(config: CodecConfiguration) {
    CODEC_CONFIG.with_borrow_mut(|ref_config| {
        *ref_config = Box::leak(Box::new(config));
    });
}

#[cfg(feature = "test_helper")]
pub fn codec_config() -> &'static CodecConfiguration {
    CODEC_CONFIG.with_borrow(|config| *config)
}

/// Tuning knobs for the chunk and region codecs. Defaults match what the game writes.
#[derive(Deserialize, Serialize, Default, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CodecConfiguration {
    pub chunk: ChunkConfig,
    pub region: RegionConfig,
}

impl CodecConfiguration {
    /// Parses a configuration document, then clamps out of range values.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(content)?;
        config.validate();
        Ok(config)
    }
}

#[cfg_attr(feature = "test_helper", allow(dead_code))]
trait LoadConfiguration {
    fn load(exec_dir: &Path) -> Self
    where
        Self: Sized + Default + Serialize + DeserializeOwned,
    {
        let path = exec_dir.join(CONFIG_ROOT_FOLDER).join(Self::get_path());

        let mut config = match fs::read_to_string(&path) {
            Ok(file_content) => toml::from_str(&file_content).unwrap_or_else(|err| {
                warn!(
                    "Couldn't parse config at {:?}. Reason: {}. Falling back to defaults",
                    &path,
                    err.message()
                );
                Self::default()
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("No config at {:?}, using defaults", &path);
                Self::default()
            }
            Err(err) => {
                warn!(
                    "Couldn't read configuration file at {:?}. Reason: {}. Falling back to defaults",
                    &path, err
                );
                Self::default()
            }
        };

        config.validate();
        config
    }

    fn get_path() -> &'static Path;

    fn validate(&mut self);
}

impl LoadConfiguration for CodecConfiguration {
    fn get_path() -> &'static Path {
        Path::new("strata.toml")
    }

    fn validate(&mut self) {
        self.chunk.validate();
    }
}
