crate::config_group!({

    /// The default log filter, in `tracing_subscriber::EnvFilter` syntax.  `RUST_LOG` takes precedence when set.
    ///
    /// The default value is "warn".
    ///
    /// Use the environment variable `CHUNKHASH_LOG_LEVEL` to set this value.
    ref level: String = "warn".to_string();

    /// The output format of log lines: "compact", "pretty" or "full".
    ///
    /// The default value is "compact".
    ///
    /// Use the environment variable `CHUNKHASH_LOG_FORMAT` to set this value.
    ref format: String = "compact".to_string();
});
