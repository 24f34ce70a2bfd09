//! Repository configuration, mirroring the reference daemon's own
//! `toml` + `serde` config-file layer: a plain struct with a `Default`
//! impl, optionally deserialized from a config file.

use std::path::PathBuf;

/// Capacity of the in-memory LRU cache of recently read block rows.
///
/// Tuned the same way the reference store tunes its own header/index
/// caches: large enough to absorb a hot working set, small enough not to
/// dominate the process's memory budget.
pub const DEFAULT_BLOCK_CACHE_CAPACITY: usize = 16_000;

/// How often `ReIndex` emits a progress log line, in blocks scanned.
pub const DEFAULT_REINDEX_PROGRESS_INTERVAL: u64 = 1_000;

#[cfg_attr(feature = "config-toml", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct RepoConfig {
    /// Where the backing store's files live. Must be writable and
    /// exclusive to this process while the repository is open.
    pub data_dir: PathBuf,

    /// Capacity of the in-memory block-row cache (§10.5). A performance
    /// knob only; `0` disables the cache entirely.
    pub block_cache_capacity: usize,

    /// How often `ReIndex` reports progress, in blocks.
    pub reindex_progress_interval: u64,
}

impl RepoConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        RepoConfig {
            data_dir: data_dir.into(),
            ..RepoConfig::default_without_dir()
        }
    }

    fn default_without_dir() -> Self {
        RepoConfig {
            data_dir: PathBuf::new(),
            block_cache_capacity: DEFAULT_BLOCK_CACHE_CAPACITY,
            reindex_progress_interval: DEFAULT_REINDEX_PROGRESS_INTERVAL,
        }
    }
}

impl Default for RepoConfig {
    fn default() -> Self {
        RepoConfig::default_without_dir()
    }
}

#[cfg(feature = "config-toml")]
mod toml_config {
    use std::fmt;
    use std::path::Path;

    use super::RepoConfig;

    #[derive(Debug)]
    pub enum ConfigError {
        Io(std::io::Error),
        Parse(toml::de::Error),
    }

    impl fmt::Display for ConfigError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                ConfigError::Io(err) => write!(f, "failed to read config file: {err}"),
                ConfigError::Parse(err) => write!(f, "failed to parse config file: {err}"),
            }
        }
    }

    impl std::error::Error for ConfigError {}

    impl RepoConfig {
        /// Loads a config from a TOML file, falling back to [`RepoConfig::default`]
        /// for any field the file doesn't set.
        pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
            let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&contents).map_err(ConfigError::Parse)
        }
    }
}

#[cfg(feature = "config-toml")]
pub use toml_config::ConfigError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_uses_documented_constants() {
        let cfg = RepoConfig::new("/tmp/does-not-matter");
        assert_eq!(cfg.block_cache_capacity, DEFAULT_BLOCK_CACHE_CAPACITY);
        assert_eq!(
            cfg.reindex_progress_interval,
            DEFAULT_REINDEX_PROGRESS_INTERVAL
        );
    }

    #[cfg(feature = "config-toml")]
    #[test]
    fn round_trips_through_json_the_same_as_toml() {
        let cfg = RepoConfig::new("/tmp/does-not-matter");

        let json = serde_json::to_string(&cfg).unwrap();
        let back: RepoConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(back.data_dir, cfg.data_dir);
        assert_eq!(back.block_cache_capacity, cfg.block_cache_capacity);
        assert_eq!(back.reindex_progress_interval, cfg.reindex_progress_interval);
    }
}
