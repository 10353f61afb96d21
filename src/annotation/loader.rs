//! Parse mapping sources into compiled rules.
//!
//! A mapping source is a tab-separated file whose columns are named by a
//! header, either the file's own first line or an explicitly configured one.
//! Each data row becomes one [`Rule`], in file order; sources are
//! concatenated in the order they appear in the mapping spec, and this load
//! order is the matcher's final tie-break.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::annotation::config::{parse_bool, AnnotatorConfig};
use crate::annotation::models::{PosMatchType, Rule, SourceOptions};
use crate::annotation::pattern::CompiledPattern;
use crate::errors::{RegexNerError, Result};

/// Static registry mapping fully-qualified annotation identifiers to token
/// auxiliary-field slots. `mapping.field.<column>` bindings are resolved
/// against this at load time; an unknown identifier fails construction.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    slots: HashMap<String, String>,
}

static BUILTIN_FIELDS: &[(&str, &str)] = &[
    ("token::normalized_ner", "normalized_ner"),
    ("token::entity_link", "entity_link"),
    ("token::entity_class", "entity_class"),
    ("token::gender", "gender"),
];

impl Default for FieldRegistry {
    fn default() -> Self {
        let slots = BUILTIN_FIELDS
            .iter()
            .map(|(id, slot)| (id.to_string(), slot.to_string()))
            .collect();
        FieldRegistry { slots }
    }
}

impl FieldRegistry {
    /// Register an additional identifier before the annotator is built.
    pub fn register(&mut self, identifier: impl Into<String>, slot: impl Into<String>) {
        self.slots.insert(identifier.into(), slot.into());
    }

    fn resolve(&self, identifier: &str, column: &str, source: &str) -> Result<String> {
        self.slots.get(identifier).cloned().ok_or_else(|| {
            RegexNerError::config(format!(
                "Not recognized annotation class field '{}' bound to column '{}' in {}",
                identifier, column, source
            ))
        })
    }
}

/// One entry of the mapping spec string: a path plus local option overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceSpec {
    pub path: PathBuf,
    pub header_from_file: Option<bool>,
    pub ignore_case: Option<bool>,
    pub valid_pos_pattern: Option<String>,
    pub pos_match_type: Option<PosMatchType>,
}

/// Parse a mapping spec: `[opt=val, ...] path [; [opt=val, ...] path]*`.
pub fn parse_source_specs(mapping: &str) -> Result<Vec<SourceSpec>> {
    let mut specs = Vec::new();

    for entry in mapping.split(';') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let mut spec = SourceSpec::default();
        let mut path: Option<&str> = None;

        for part in entry.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if let Some((key, value)) = part.split_once('=') {
                let key = key.trim().to_lowercase();
                let value = value.trim();
                match key.as_str() {
                    "header" => {
                        spec.header_from_file = Some(parse_bool(value).ok_or_else(|| {
                            RegexNerError::config(format!("Invalid header option '{}'", value))
                        })?);
                    }
                    "ignorecase" => {
                        spec.ignore_case = Some(parse_bool(value).ok_or_else(|| {
                            RegexNerError::config(format!("Invalid ignorecase option '{}'", value))
                        })?);
                    }
                    "validpospattern" => {
                        spec.valid_pos_pattern = Some(value.to_string());
                    }
                    "posmatchtype" => {
                        spec.pos_match_type =
                            Some(PosMatchType::from_str(value).map_err(|_| {
                                RegexNerError::config(format!(
                                    "Invalid posmatchtype option '{}'",
                                    value
                                ))
                            })?);
                    }
                    other => {
                        return Err(RegexNerError::config(format!(
                            "Unknown mapping option '{}' in '{}'",
                            other, entry
                        )));
                    }
                }
            } else if path.is_some() {
                return Err(RegexNerError::config(format!(
                    "Multiple paths in mapping entry '{}'",
                    entry
                )));
            } else {
                path = Some(part);
            }
        }

        match path {
            Some(p) => spec.path = PathBuf::from(p),
            None => {
                return Err(RegexNerError::config(format!(
                    "No path in mapping entry '{}'",
                    entry
                )));
            }
        }
        specs.push(spec);
    }

    if specs.is_empty() {
        return Err(RegexNerError::config(format!(
            "Empty mapping spec '{}'",
            mapping
        )));
    }
    Ok(specs)
}

/// Semantic role of one header column.
#[derive(Debug, Clone, PartialEq)]
enum ColumnKind {
    Pattern,
    Label,
    Overwrite,
    Priority,
    Weight,
    Group,
    /// Extra annotation column, already resolved to a token field slot
    Extra { slot: String },
    /// Unbound column: values are parsed but otherwise ignored
    Ignored,
}

static LABEL_FIELD_NAMES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["ner", "netype"].into_iter().collect());

/// Resolve header field names to column roles, validating the schema.
fn resolve_header(
    names: &[String],
    cfg: &AnnotatorConfig,
    registry: &FieldRegistry,
    source: &str,
) -> Result<Vec<ColumnKind>> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut columns = Vec::with_capacity(names.len());
    let mut have_pattern = false;
    let mut have_label = false;

    for name in names {
        let name = name.as_str();
        if !seen.insert(name) {
            return Err(RegexNerError::config(format!(
                "Duplicate header field '{}' in {}",
                name, source
            )));
        }

        let kind = match name {
            "pattern" => {
                have_pattern = true;
                ColumnKind::Pattern
            }
            _ if LABEL_FIELD_NAMES.contains(name) => {
                if have_label {
                    warn!(
                        "Multiple label fields in header of {}; ignoring column '{}'",
                        source, name
                    );
                    ColumnKind::Ignored
                } else {
                    have_label = true;
                    ColumnKind::Label
                }
            }
            "overwrite" => ColumnKind::Overwrite,
            "priority" => ColumnKind::Priority,
            "weight" => ColumnKind::Weight,
            "group" => ColumnKind::Group,
            other => match cfg.field_bindings.get(other) {
                Some(identifier) => ColumnKind::Extra {
                    slot: registry.resolve(identifier, other, source)?,
                },
                None => {
                    warn!(
                        "Unrecognized header field '{}' in {}; column will be ignored",
                        other, source
                    );
                    ColumnKind::Ignored
                }
            },
        };
        columns.push(kind);
    }

    if !have_pattern {
        return Err(RegexNerError::config(format!(
            "Header of {} has no 'pattern' field",
            source
        )));
    }
    if !have_label {
        return Err(RegexNerError::config(format!(
            "Header of {} has no label field ('ner' or 'netype')",
            source
        )));
    }
    Ok(columns)
}

/// Load and compile all rules named by the config's mapping spec.
pub fn load_rules(cfg: &AnnotatorConfig, registry: &FieldRegistry) -> Result<Vec<Rule>> {
    let specs = parse_source_specs(&cfg.mapping)?;
    let mut rules = Vec::new();
    for spec in &specs {
        load_source(spec, cfg, registry, &mut rules)?;
    }
    Ok(rules)
}

fn load_source(
    spec: &SourceSpec,
    cfg: &AnnotatorConfig,
    registry: &FieldRegistry,
    rules: &mut Vec<Rule>,
) -> Result<()> {
    let source_name = spec.path.display().to_string();

    let valid_pos_pattern = spec
        .valid_pos_pattern
        .as_deref()
        .or(cfg.valid_pos_pattern.as_deref())
        .filter(|p| !p.is_empty())
        .map(|p| {
            Regex::new(&format!("^(?:{})$", p)).map_err(|e| {
                RegexNerError::config(format!(
                    "Invalid validpospattern '{}' for {}: {}",
                    p, source_name, e
                ))
            })
        })
        .transpose()?;

    let options = Arc::new(SourceOptions {
        name: source_name.clone(),
        ignore_case: spec.ignore_case.unwrap_or(cfg.ignore_case),
        valid_pos_pattern,
        pos_match_type: spec.pos_match_type.unwrap_or(cfg.pos_match_type),
    });

    let file = File::open(&spec.path).map_err(|e| {
        RegexNerError::config(format!("Cannot open mapping file {}: {}", source_name, e))
    })?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines().enumerate();

    // The effective header is the file's first line unless an explicit
    // mapping.header is configured (or header=false names one as required).
    let header_from_file = spec
        .header_from_file
        .unwrap_or(cfg.default_header.is_none());

    let columns = if header_from_file {
        let (_, first) = lines.next().ok_or_else(|| {
            RegexNerError::config(format!("Mapping file {} is empty", source_name))
        })?;
        let first = first?;
        let names: Vec<String> = first.split('\t').map(|f| f.trim().to_string()).collect();
        resolve_header(&names, cfg, registry, &source_name)?
    } else {
        let names = cfg.default_header.clone().ok_or_else(|| {
            RegexNerError::config(format!(
                "Source {} has header=false but no mapping.header is configured",
                source_name
            ))
        })?;
        resolve_header(&names, cfg, registry, &source_name)?
    };

    for (line_idx, line) in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let rule = parse_row(&line, line_idx + 1, &columns, &options)?;
        rules.push(rule);
    }

    Ok(())
}

fn parse_row(
    line: &str,
    line_no: usize,
    columns: &[ColumnKind],
    options: &Arc<SourceOptions>,
) -> Result<Rule> {
    let fields: Vec<&str> = line.split('\t').collect();
    let source = options.name.as_str();

    if fields.len() < columns.len() {
        return Err(RegexNerError::config(format!(
            "Provided mapping file is in wrong format: too few tab-separated columns \
             ({} expected, {} found) at line {} of {}",
            columns.len(),
            fields.len(),
            line_no,
            source
        )));
    }
    if fields.len() > columns.len() {
        return Err(RegexNerError::config(format!(
            "Provided mapping file is in wrong format: extra tab-separated columns \
             ({} expected, {} found) at line {} of {}",
            columns.len(),
            fields.len(),
            line_no,
            source
        )));
    }

    let mut pattern_text = "";
    let mut label = String::new();
    let mut overwrite = Vec::new();
    let mut priority = 0.0;
    let mut weight = 0.0;
    let mut group = 0usize;
    let mut extra_fields = Vec::new();

    for (kind, value) in columns.iter().zip(&fields) {
        let value = value.trim();
        match kind {
            ColumnKind::Pattern => pattern_text = value,
            ColumnKind::Label => {
                // A comma-separated label cell keeps only its first segment.
                let mut segments = value.split(',');
                label = segments.next().unwrap_or_default().trim().to_string();
                if segments.next().is_some() {
                    warn!(
                        "Multiple labels '{}' at line {} of {}; using '{}'",
                        value, line_no, source, label
                    );
                }
            }
            ColumnKind::Overwrite => {
                overwrite = value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
            ColumnKind::Priority => {
                priority = value.parse::<f64>().map_err(|_| {
                    RegexNerError::config(format!(
                        "Invalid priority '{}' at line {} of {}",
                        value, line_no, source
                    ))
                })?;
            }
            ColumnKind::Weight => {
                weight = value.parse::<f64>().map_err(|_| {
                    RegexNerError::config(format!(
                        "Invalid weight '{}' at line {} of {}",
                        value, line_no, source
                    ))
                })?;
            }
            ColumnKind::Group => {
                group = value.parse::<usize>().map_err(|_| {
                    RegexNerError::config(format!(
                        "Invalid group '{}' at line {} of {}",
                        value, line_no, source
                    ))
                })?;
            }
            ColumnKind::Extra { slot } => {
                extra_fields.push((slot.clone(), value.to_string()));
            }
            ColumnKind::Ignored => {}
        }
    }

    let pattern = CompiledPattern::compile(pattern_text, options.ignore_case, source)?;
    if group > pattern.group_count() {
        return Err(RegexNerError::invalid_pattern(
            pattern_text,
            source,
            format!(
                "Invalid match group {} (pattern has {} capturing groups)",
                group,
                pattern.group_count()
            ),
        ));
    }

    Ok(Rule {
        pattern_text: pattern_text.to_string(),
        pattern,
        label,
        overwrite,
        priority,
        weight,
        group,
        extra_fields,
        source: Arc::clone(options),
    })
}

/// Load a newline-delimited, case-sensitive common-word blacklist.
pub fn load_common_words(path: &Path) -> Result<HashSet<String>> {
    let file = File::open(path).map_err(|e| {
        RegexNerError::config(format!(
            "Cannot open commonWords file {}: {}",
            path.display(),
            e
        ))
    })?;
    let mut words = HashSet::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let word = line.trim_end_matches(['\r', '\n']);
        if !word.is_empty() {
            words.insert(word.to_string());
        }
    }
    Ok(words)
}
