use std::time::Duration;

use tracing::{info, warn};

use crate::ByteSize;

/// A value that can be read from an environment variable, falling back to a default.
pub trait ParsableConfigValue: Sized {
    fn parse_user_value(value: &str) -> Option<Self>;

    /// Parse `value` if present, logging and keeping `default` when it is malformed.
    fn parse(variable_name: &str, value: Option<String>, default: Self) -> Self {
        let Some(v) = value else {
            return default;
        };

        match Self::parse_user_value(&v) {
            Some(parsed) => {
                info!("Config: {variable_name} = {v} (user set)");
                parsed
            },
            None => {
                warn!("Configuration value {v} for {variable_name} cannot be parsed into correct type; ignoring.");
                default
            },
        }
    }
}

macro_rules! impl_parsable_from_str {
    ($($t:ty),+) => {
        $(
            impl ParsableConfigValue for $t {
                fn parse_user_value(value: &str) -> Option<Self> {
                    value.trim().parse::<$t>().ok()
                }
            }
        )+
    };
}

impl_parsable_from_str!(usize, u64, u32, i64, f64, ByteSize);

impl ParsableConfigValue for bool {
    fn parse_user_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "y" | "on" => Some(true),
            "0" | "false" | "no" | "n" | "off" => Some(false),
            _ => None,
        }
    }
}

impl ParsableConfigValue for String {
    fn parse_user_value(value: &str) -> Option<Self> {
        Some(value.to_string())
    }
}

impl ParsableConfigValue for Duration {
    fn parse_user_value(value: &str) -> Option<Self> {
        parse_duration(value)
    }
}

/// Parses durations like `250ms`, `30s`, `5m` or `1h`.  A bare number is taken as seconds.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim().to_ascii_lowercase();
    let split = value.find(|c: char| !c.is_ascii_digit()).unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);
    let n: u64 = digits.parse().ok()?;

    match unit.trim() {
        "ms" => Some(Duration::from_millis(n)),
        "" | "s" | "sec" => Some(Duration::from_secs(n)),
        "m" | "min" => n.checked_mul(60).map(Duration::from_secs),
        "h" => n.checked_mul(3600).map(Duration::from_secs),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert!(bool::parse("X", Some("yes".to_owned()), false));
        assert!(!bool::parse("X", Some("OFF".to_owned()), true));
        assert!(bool::parse("X", Some("maybe".to_owned()), true));
        assert!(!bool::parse("X", None, false));
    }

    #[test]
    fn test_parse_numbers_and_sizes() {
        assert_eq!(usize::parse("X", Some(" 12 ".to_owned()), 3), 12);
        assert_eq!(usize::parse("X", Some("twelve".to_owned()), 3), 3);
        assert_eq!(ByteSize::parse("X", Some("2mib".to_owned()), ByteSize::new(1)), ByteSize::mib(2));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("7"), Some(Duration::from_secs(7)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("fast"), None);
        assert_eq!(parse_duration("10 parsecs"), None);
    }
}
