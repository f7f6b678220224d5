use regex::Regex;

use crate::config::NormalizerConfig;
use crate::error::Error;

lazy_static::lazy_static! {
    static ref DEFAULT_COMPONENT_PATTERN: Regex =
        Regex::new(r"KM\d+").expect("default component pattern is valid");
}

/// Canonicalizes component codes and material identifiers.
#[derive(Debug, Clone)]
pub struct Normalizer {
    pattern: Regex,
    separators: Vec<char>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_COMPONENT_PATTERN.clone(),
            separators: vec!['/'],
        }
    }
}

impl Normalizer {
    pub fn new(pattern: &str, separators: &str) -> Result<Self, Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            separators: separators.chars().collect(),
        })
    }

    pub fn from_config(config: &NormalizerConfig) -> Result<Self, Error> {
        Self::new(&config.component_pattern, &config.separators)
    }

    /// Pattern match if present, else everything before the first separator.
    /// Always trimmed and upper-cased.
    pub fn component(&self, raw: &str) -> String {
        let raw = raw.trim();
        let key = match self.pattern.find(raw) {
            Some(found) => found.as_str(),
            None => match raw.find(self.separators.as_slice()) {
                Some(idx) => &raw[..idx],
                None => raw,
            },
        };
        key.trim().to_uppercase()
    }

    pub fn material(&self, raw: &str) -> String {
        raw.trim().to_uppercase()
    }
}
