//! Rule-based token-sequence NER annotation.
//!
//! The engine loads ordered, prioritized entity-mapping rules from one or
//! more tab-separated sources, compiles each into a token-sequence pattern,
//! scans input tokens for candidate matches, resolves overlaps
//! deterministically, and applies labels subject to a POS/common-word filter
//! and a layered overwrite policy.

pub mod config;
pub mod filters;
pub mod loader;
mod matcher;
#[cfg(test)]
mod matcher_test;
pub mod models;
mod pattern;
pub mod policy;
mod sequence;

use std::collections::HashSet;

use log::info;

use crate::errors::{RegexNerError, Result};

pub use config::{AnnotatorConfig, Properties, DEFAULT_BACKGROUND_SYMBOL};
pub use loader::{load_common_words, load_rules, parse_source_specs, FieldRegistry, SourceSpec};
pub use models::{Annotation, PosMatchType, Rule, SourceOptions, Token, TokenMatch};
pub use pattern::{CompiledPattern, PhrasePattern};
pub use sequence::SequencePattern;
pub use policy::PolicyConfig;

/// Rule-based NER annotator over caller-supplied token sequences.
///
/// Construction is one-shot and fail-fast: all sources are read, parsed, and
/// compiled before the annotator exists; any error aborts with no partial
/// state. After construction the annotator is immutable and may be shared
/// read-only across threads; each `annotate` call owns its token list.
#[derive(Debug)]
pub struct RegexNerAnnotator {
    rules: Vec<Rule>,
    common_words: HashSet<String>,
    policy: PolicyConfig,
}

impl RegexNerAnnotator {
    /// Build from raw properties under the annotator name prefix.
    pub fn from_properties(name: &str, props: &Properties) -> Result<RegexNerAnnotator> {
        let cfg = AnnotatorConfig::from_properties(name, props)?;
        RegexNerAnnotator::from_config(&cfg, &FieldRegistry::default())
    }

    /// Build from a parsed config and an annotation-field registry.
    pub fn from_config(cfg: &AnnotatorConfig, registry: &FieldRegistry) -> Result<RegexNerAnnotator> {
        let common_words = match &cfg.common_words {
            Some(path) => loader::load_common_words(path)?,
            None => HashSet::new(),
        };

        let rules = loader::load_rules(cfg, registry)?;
        info!("Loaded {} entity-mapping rules from {}", rules.len(), cfg.mapping);

        let policy = PolicyConfig::new(
            cfg.background_symbols.clone(),
            cfg.no_default_overwrite_labels.clone(),
        );

        Ok(RegexNerAnnotator {
            rules,
            common_words,
            policy,
        })
    }

    /// Annotate a document in place: sentence by sentence when sentences are
    /// present, over the flat token list otherwise.
    pub fn annotate(&self, annotation: &mut Annotation) -> Result<()> {
        if let Some(sentences) = &mut annotation.sentences {
            for sentence in sentences {
                self.annotate_tokens(sentence);
            }
            Ok(())
        } else if let Some(tokens) = &mut annotation.tokens {
            self.annotate_tokens(tokens);
            Ok(())
        } else {
            Err(RegexNerError::MissingInput)
        }
    }

    /// Annotate one token sequence in place.
    pub fn annotate_tokens(&self, tokens: &mut [Token]) {
        matcher::annotate_tokens(&self.rules, &self.common_words, &self.policy, tokens);
    }

    /// The loaded rules, in load order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }
}
