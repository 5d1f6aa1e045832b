/// Alternative environment variable names, as `(primary, alias)` pairs.
/// The alias is only read when the primary variable is unset.
pub const ENVIRONMENT_NAME_ALIASES: &[(&str, &str)] = &[
    ("CHUNKHASH_REASSEMBLY_CHUNK_SIZE", "CHUNKHASH_CHUNK_SIZE"),
    ("CHUNKHASH_REASSEMBLY_MAX_RETRIES", "CHUNKHASH_MAX_RETRIES"),
    ("CHUNKHASH_LOG_LEVEL", "CHUNKHASH_LOG"),
];
