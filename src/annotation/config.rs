//! Annotator configuration.
//!
//! Configuration arrives as property-style keys, optionally prefixed with the
//! annotator name (`regexner.mapping` falls back to `mapping`). The raw
//! [`Properties`] store is parsed once into an immutable [`AnnotatorConfig`];
//! nothing configuration-shaped is consulted after construction.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::annotation::models::PosMatchType;
use crate::errors::{RegexNerError, Result};

/// A flat string key/value store in the style of a properties file.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    entries: HashMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Properties::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Look up `key` under the annotator name prefix first, then bare.
    pub fn lookup(&self, name: &str, key: &str) -> Option<&str> {
        self.get(&format!("{}.{}", name, key)).or_else(|| self.get(key))
    }

    /// Parse a `key = value` properties file. `#` and `!` start comment
    /// lines; blank lines are skipped.
    pub fn from_file(path: &Path) -> Result<Properties> {
        let content = fs::read_to_string(path)?;
        let mut props = Properties::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                RegexNerError::config(format!(
                    "malformed property line '{}' in {}",
                    line,
                    path.display()
                ))
            })?;
            props.set(key.trim(), value.trim());
        }
        Ok(props)
    }

    fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Immutable, fully-parsed configuration for one annotator instance.
#[derive(Debug, Clone)]
pub struct AnnotatorConfig {
    /// Mapping source spec string: `[opt=val, ...] path [; ...]`
    pub mapping: String,

    /// Explicit header (from `mapping.header`), used by sources that do not
    /// read their header from the file's first line
    pub default_header: Option<Vec<String>>,

    /// `mapping.field.<column>` bindings: column name to fully-qualified
    /// annotation identifier, resolved against the field registry at load time
    pub field_bindings: HashMap<String, String>,

    /// Global default for per-source `ignorecase`
    pub ignore_case: bool,

    /// Global default for per-source `validpospattern`
    pub valid_pos_pattern: Option<String>,

    /// Global default for per-source `posmatchtype`
    pub pos_match_type: PosMatchType,

    /// NER values treated as "no entity yet"; first entry is the primary
    /// symbol assumed for unlabeled tokens
    pub background_symbols: Vec<String>,

    /// Labels denied the default background-overwrite allowance
    pub no_default_overwrite_labels: HashSet<String>,

    /// Newline-delimited blacklist of single-token texts
    pub common_words: Option<PathBuf>,
}

pub const DEFAULT_BACKGROUND_SYMBOL: &str = "O";

impl AnnotatorConfig {
    /// Build a config for the annotator called `name` from raw properties.
    ///
    /// Fails fast on a missing mapping or an unparseable option value.
    pub fn from_properties(name: &str, props: &Properties) -> Result<AnnotatorConfig> {
        let mapping = props
            .lookup(name, "mapping")
            .ok_or_else(|| {
                RegexNerError::config(format!("no mapping configured for annotator '{}'", name))
            })?
            .to_string();

        let default_header = props.lookup(name, "mapping.header").map(|h| {
            h.split(',')
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect()
        });

        let ignore_case = match props.lookup(name, "ignorecase") {
            Some(v) => parse_bool(v)
                .ok_or_else(|| RegexNerError::config(format!("Invalid ignorecase '{}'", v)))?,
            None => false,
        };

        let valid_pos_pattern = props
            .lookup(name, "validpospattern")
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        let pos_match_type = match props.lookup(name, "posmatchtype") {
            Some(v) => PosMatchType::from_str(v)
                .map_err(|_| RegexNerError::config(format!("Invalid posmatchtype '{}'", v)))?,
            None => PosMatchType::default(),
        };

        let background_symbols = match props.lookup(name, "backgroundSymbol") {
            Some(v) => v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => vec![DEFAULT_BACKGROUND_SYMBOL.to_string()],
        };

        let no_default_overwrite_labels = props
            .lookup(name, "noDefaultOverwriteLabels")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let common_words = props.lookup(name, "commonWords").map(PathBuf::from);

        let prefixed = format!("{}.mapping.field.", name);
        let mut field_bindings = HashMap::new();
        // Bare keys first so prefixed ones win on overlap
        for (key, value) in props.iter() {
            if let Some(column) = key.strip_prefix("mapping.field.") {
                field_bindings.insert(column.to_string(), value.to_string());
            }
        }
        for (key, value) in props.iter() {
            if let Some(column) = key.strip_prefix(&prefixed) {
                field_bindings.insert(column.to_string(), value.to_string());
            }
        }

        Ok(AnnotatorConfig {
            mapping,
            default_header,
            field_bindings,
            ignore_case,
            valid_pos_pattern,
            pos_match_type,
            background_symbols,
            no_default_overwrite_labels,
            common_words,
        })
    }

    /// Minimal config over a mapping spec string, with all defaults.
    pub fn from_mapping(mapping: impl Into<String>) -> AnnotatorConfig {
        AnnotatorConfig {
            mapping: mapping.into(),
            default_header: None,
            field_bindings: HashMap::new(),
            ignore_case: false,
            valid_pos_pattern: None,
            pos_match_type: PosMatchType::default(),
            background_symbols: vec![DEFAULT_BACKGROUND_SYMBOL.to_string()],
            no_default_overwrite_labels: HashSet::new(),
            common_words: None,
        }
    }
}

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}
