use crate::groups;

lazy_static::lazy_static! {
    static ref GLOBAL_HASH_CONFIG: HashConfig = HashConfig::new();
}

/// The process-wide configuration, loaded from the environment on first use.
pub fn hash_config() -> &'static HashConfig {
    &GLOBAL_HASH_CONFIG
}

/// Primary configuration struct containing all config sections
#[derive(Debug, Clone, Default)]
pub struct HashConfig {
    pub reassembly: groups::reassembly::ConfigValues,
    pub log: groups::log::ConfigValues,
}

impl HashConfig {
    /// Create a new HashConfig instance with default values and apply environment variable overrides.
    /// This is equivalent to `HashConfig::default().with_env_overrides()`.
    pub fn new() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply environment variable overrides to all configuration sections.
    /// Environment variables follow the pattern: CHUNKHASH_{GROUP_NAME}_{FIELD_NAME}
    pub fn with_env_overrides(mut self) -> Self {
        self.reassembly.apply_env_overrides();
        self.log.apply_env_overrides();
        self
    }
}
