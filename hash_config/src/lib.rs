mod aliases;
pub use aliases::ENVIRONMENT_NAME_ALIASES;

pub mod macros;

pub mod groups;

pub mod hash_config;

// Used by the config_group! macro expansion.
#[doc(hidden)]
pub use const_str;
#[doc(hidden)]
pub use konst;
pub use hash_config::{HashConfig, hash_config};
pub use utils::configuration_utils::ParsableConfigValue;

pub type ReassemblyConfig = groups::reassembly::ConfigValues;
pub type LogConfig = groups::log::ConfigValues;
