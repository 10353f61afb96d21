//! Overwrite policy: may a winning match replace the labels already present?
//!
//! The policy only ever sees the annotated sub-span's existing labels; a
//! rejected match is dropped silently and the prior labels stand.

use std::collections::HashSet;

use crate::annotation::config::DEFAULT_BACKGROUND_SYMBOL;
use crate::annotation::models::Rule;

/// Immutable policy knobs, fixed at annotator construction.
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    /// NER values meaning "no entity yet"; the first entry is assumed for
    /// tokens with no label at all
    background_symbols: Vec<String>,

    /// Labels that lose the default permission to overwrite background
    no_default_overwrite_labels: HashSet<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig::new(Vec::new(), HashSet::new())
    }
}

impl PolicyConfig {
    pub fn new(
        background_symbols: Vec<String>,
        no_default_overwrite_labels: HashSet<String>,
    ) -> Self {
        let background_symbols = if background_symbols.is_empty() {
            vec![DEFAULT_BACKGROUND_SYMBOL.to_string()]
        } else {
            background_symbols
        };
        PolicyConfig {
            background_symbols,
            no_default_overwrite_labels,
        }
    }

    /// The symbol assumed for tokens carrying no NER label.
    pub fn primary_background(&self) -> &str {
        &self.background_symbols[0]
    }

    pub fn is_background(&self, label: &str) -> bool {
        self.background_symbols.iter().any(|s| s == label)
    }

    /// Decide whether `rule` may write its label over `existing`, the NER
    /// labels currently on the annotated sub-span (unlabeled tokens reported
    /// as the primary background symbol).
    ///
    /// - Non-uniform existing labels: allowed, there is no single coherent
    ///   prior entity to protect.
    /// - Uniform background: allowed by default; a rule whose label is in the
    ///   no-default-overwrite set must list that background symbol in its own
    ///   overwrite column.
    /// - Uniform non-background: allowed only via the rule's overwrite column.
    pub fn may_apply(&self, rule: &Rule, existing: &[&str]) -> bool {
        let first = match existing.first() {
            Some(first) => *first,
            None => return true,
        };
        if existing.iter().any(|l| *l != first) {
            return true;
        }

        if self.is_background(first) {
            if self.no_default_overwrite_labels.contains(&rule.label) {
                rule.may_overwrite(first)
            } else {
                true
            }
        } else {
            rule.may_overwrite(first)
        }
    }
}
