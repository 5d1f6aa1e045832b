/// Macro to create a configuration value group struct.
///
/// Usage:
/// ```rust
/// mod sample {
///     hash_config::config_group!({
///         ref test_int: usize = 42;
///         ref test_string: String = "default".to_string();
///     });
/// }
/// ```
///
/// This creates a `ConfigValueGroup` struct with the specified fields. Values can be overridden from
/// environment variables named `CHUNKHASH_{MODULE}_{FIELD}`, where `MODULE` is the last segment of
/// the module path the macro is invoked in.
#[macro_export]
macro_rules! config_group {
    ({
        $(
            $(#[$meta:meta])*
            ref $name:ident : $type:ty = $value:expr;
        )+
    }) => {
        #[allow(unused_imports)]
        use $crate::ParsableConfigValue;

        /// ConfigValueGroup struct containing all configurable values
        #[derive(Debug, Clone)]
        pub struct ConfigValueGroup {
            $(
                $(#[$meta])*
                #[allow(non_snake_case)]
                pub $name: $type,
            )+
        }

        impl Default for ConfigValueGroup {
            /// Create a new instance with default values only (no environment variable overrides).
            fn default() -> Self {
                Self {
                    $(
                        $name: {
                            let v: $type = $value;
                            v
                        },
                    )+
                }
            }
        }

        impl AsRef<ConfigValueGroup> for ConfigValueGroup {
            fn as_ref(&self) -> &ConfigValueGroup {
                self
            }
        }

        impl ConfigValueGroup {
            /// Create a new instance with default values only (no environment variable overrides).
            pub fn new() -> Self {
                Self::default()
            }

            /// Apply environment variable overrides to this configuration group.
            ///
            /// For a field `chunk_size` in module `hash_config::groups::reassembly` the variable is
            /// `CHUNKHASH_REASSEMBLY_CHUNK_SIZE`; aliases from `ENVIRONMENT_NAME_ALIASES` are
            /// consulted when the primary name is unset.
            pub fn apply_env_overrides(&mut self) {
                $(
                    {
                        const ENV_VAR_NAME: &str = $crate::const_str::concat!(
                            "CHUNKHASH_",
                            $crate::const_str::convert_ascii_case!(upper, $crate::konst::string::rsplit_once(module_path!(), "::").unwrap().1),
                            "_",
                            $crate::const_str::convert_ascii_case!(upper, stringify!($name)));

                        let mut maybe_env_value = std::env::var(ENV_VAR_NAME).ok();

                        if maybe_env_value.is_none() {
                            for &(primary_name, alias_name) in $crate::ENVIRONMENT_NAME_ALIASES {
                                if primary_name == ENV_VAR_NAME {
                                    let alt_env_value = std::env::var(alias_name).ok();
                                    if alt_env_value.is_some() {
                                        maybe_env_value = alt_env_value;
                                        break;
                                    }
                                }
                            }
                        }

                        let current_value: $type = self.$name.clone();
                        self.$name = <$type>::parse(stringify!($name), maybe_env_value, current_value);
                    }
                )+
            }
        }

        /// Type alias for easier reference in config aggregation.
        pub(crate) type ConfigValues = ConfigValueGroup;
    };
}
