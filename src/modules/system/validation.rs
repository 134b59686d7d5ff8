use crate::models::{FreeGamesOptions, GameIdentifier, OPTIONS_VERSION};
use std::fmt;

pub const MIN_RECHECK_INTERVAL_MS: i64 = 60 * 1000;

#[derive(Debug, Clone)]
pub struct ConfigError {
    pub field: String,
    pub message: String,
    pub actual_value: Option<String>,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.actual_value {
            Some(val) => write!(f, "  • {}: {} (got: {})", self.field, self.message, val),
            None => write!(f, "  • {}: {}", self.field, self.message),
        }
    }
}

impl ConfigError {
    fn with_value(
        field: impl Into<String>,
        message: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            actual_value: Some(value.to_string()),
        }
    }
}

pub fn validate_options(options: &FreeGamesOptions) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if options.version > OPTIONS_VERSION {
        errors.push(ConfigError::with_value(
            "version",
            format!("is newer than supported version {}", OPTIONS_VERSION),
            options.version,
        ));
    }
    if options.recheck_interval_ms < MIN_RECHECK_INTERVAL_MS {
        errors.push(ConfigError::with_value(
            "recheck_interval_ms",
            format!("must be at least {} ms", MIN_RECHECK_INTERVAL_MS),
            options.recheck_interval_ms,
        ));
    }
    for entry in &options.blacklist {
        if !is_valid_blacklist_entry(entry) {
            errors.push(ConfigError::with_value(
                "blacklist",
                "entries must be `bot/<name>`, `s/<id>` or `a/<id>`",
                entry,
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_valid_blacklist_entry(entry: &str) -> bool {
    if let Some((prefix, name)) = entry.split_once('/') {
        if prefix.eq_ignore_ascii_case("bot") {
            return !name.trim().is_empty();
        }
    }
    GameIdentifier::try_parse(entry).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_default_options() {
        assert!(validate_options(&FreeGamesOptions::new()).is_ok());
    }

    #[test]
    fn test_recheck_interval_too_short() {
        let mut options = FreeGamesOptions::new();
        options.recheck_interval_ms = 500;
        let errors = validate_options(&options).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "recheck_interval_ms");
        assert!(errors[0].to_string().contains("got: 500"));
    }

    #[test]
    fn test_blacklist_entries() {
        let mut options = FreeGamesOptions::new();
        options.blacklist.insert("bot/main".to_string());
        options.blacklist.insert("a/10".to_string());
        assert!(validate_options(&options).is_ok());

        options.blacklist.insert("bot/".to_string());
        options.blacklist.insert("x/1".to_string());
        let errors = validate_options(&options).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_future_version_rejected() {
        let mut options = FreeGamesOptions::new();
        options.version = OPTIONS_VERSION + 1;
        assert!(validate_options(&options).is_err());
    }
}
