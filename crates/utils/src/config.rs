//! Flat key-value configuration: dotted keys with bracketed indices for
//! multi-instance sections (`iface.cache.host[0].name`), typed accessors
//! with defaults, and startup validation for required keys that lack
//! one (`config.new_build_error(key, err)` records a validation failure
//! without aborting parsing early).

use std::{collections::BTreeMap, fmt, str::FromStr};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub key: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

#[derive(Debug, Default, Clone)]
pub struct Config {
    keys: BTreeMap<String, String>,
    pub errors: Vec<ConfigError>,
}

impl Config {
    /// Parses `key = value` lines. Blank lines and lines starting with `#`
    /// are ignored. Keys and values are trimmed of surrounding whitespace.
    pub fn parse(text: &str) -> Self {
        let mut keys = BTreeMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                keys.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        Config {
            keys,
            errors: Vec::new(),
        }
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.keys.get(key).map(|s| s.as_str())
    }

    /// Like [`Config::value`], but records a validation error when the key
    /// is absent: required keys without defaults fail startup validation.
    pub fn value_require(&mut self, key: &str) -> Option<String> {
        match self.keys.get(key) {
            Some(value) => Some(value.clone()),
            None => {
                self.new_build_error(key, "required key is missing");
                None
            }
        }
    }

    pub fn property<T: FromStr>(&self, key: &str) -> Option<T> {
        self.keys.get(key).and_then(|v| v.parse().ok())
    }

    pub fn property_or<T: FromStr>(&self, key: &str, default: T) -> T {
        self.property(key).unwrap_or(default)
    }

    pub fn property_require<T: FromStr>(&mut self, key: &str) -> Option<T> {
        match self.keys.get(key).and_then(|v| v.parse().ok()) {
            Some(value) => Some(value),
            None => {
                self.new_build_error(key, "required key is missing or has the wrong type");
                None
            }
        }
    }

    pub fn new_build_error(&mut self, key: impl Into<String>, message: impl fmt::Display) {
        self.errors.push(ConfigError {
            key: key.into(),
            message: message.to_string(),
        });
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterates the distinct numeric indices used under a bracketed prefix,
    /// e.g. for keys `iface.cache.host[0].name` and `iface.cache.host[1].name`
    /// called with `prefix = "iface.cache.host"` returns `[0, 1]`.
    pub fn indices(&self, prefix: &str) -> Vec<u32> {
        let needle = format!("{prefix}[");
        let mut found = Vec::new();
        for key in self.keys.keys() {
            if let Some(rest) = key.strip_prefix(&needle) {
                if let Some(end) = rest.find(']') {
                    if let Ok(index) = rest[..end].parse::<u32>() {
                        if !found.contains(&index) {
                            found.push(index);
                        }
                    }
                }
            }
        }
        found.sort_unstable();
        found
    }

    pub fn indexed_key(prefix: &str, index: u32, suffix: &str) -> String {
        format!("{prefix}[{index}].{suffix}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_keys() {
        let config = Config::parse(
            "\
            # comment\n\
            spool.path = /var/spool/magma\n\
            storage.tank.count = 4\n\
            ",
        );
        assert_eq!(config.value("spool.path"), Some("/var/spool/magma"));
        assert_eq!(config.property::<u32>("storage.tank.count"), Some(4));
    }

    #[test]
    fn missing_required_key_records_error() {
        let mut config = Config::parse("");
        assert!(config.value_require("secure.salt").is_none());
        assert!(!config.is_valid());
        assert_eq!(config.errors[0].key, "secure.salt");
    }

    #[test]
    fn indexed_keys_are_discovered_in_order() {
        let config = Config::parse(
            "\
            iface.cache.host[0].name = cache-a\n\
            iface.cache.host[0].weight = 1\n\
            iface.cache.host[2].name = cache-c\n\
            ",
        );
        assert_eq!(config.indices("iface.cache.host"), vec![0, 2]);
        assert_eq!(
            config.value(&Config::indexed_key("iface.cache.host", 0, "name")),
            Some("cache-a")
        );
    }
}
