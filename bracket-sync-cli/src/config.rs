use std::env;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! from_environment {
    ($config:expr, $($key:expr, $name:tt),*$(,)?) => {{
        $(
            {
                if let Ok(value) = env::var($key) {
                    if let Ok(value) = value.parse() {
                        $config.$name = value;
                    }
                }
            }
        )*
    }};
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub loglevel: LevelFilter,
    /// Directory containing the bracket map files.
    pub map_dir: PathBuf,
}

impl Config {
    pub fn from_file<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let buf = fs::read(path)?;

        Ok(toml::from_slice(&buf)?)
    }

    /// Loads the config file at `path` and applies the environment on top of it. A missing file
    /// falls back to the defaults.
    pub fn load<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let config = match Self::from_file(path.as_ref()) {
            Ok(config) => config,
            Err(ConfigError::Io(err)) if err.kind() == ErrorKind::NotFound => {
                Self::default()
            }
            Err(err) => return Err(err),
        };

        Ok(config.with_environment())
    }

    pub fn with_environment(mut self) -> Self {
        from_environment!(self, "BS_LOGLEVEL", loglevel, "BS_MAP_DIR", map_dir);

        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            loglevel: LevelFilter::Info,
            map_dir: PathBuf::from("bracket-maps"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}
