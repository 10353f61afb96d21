//! Core data structures for rule-based NER annotation.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::annotation::pattern::CompiledPattern;

/// A single token of caller-produced text.
///
/// Tokens are owned by the caller; the engine mutates `ner` and `fields` in
/// place during an annotation call and reads everything else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Surface text of the token
    pub text: String,

    /// Part-of-speech tag, if a tagger ran upstream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,

    /// Current NER label; `None` is treated as the background symbol
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ner: Option<String>,

    /// Auxiliary annotation slots written via `mapping.field.<name>` bindings
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub fields: HashMap<String, String>,
}

impl Token {
    pub fn new(text: impl Into<String>) -> Self {
        Token {
            text: text.into(),
            ..Token::default()
        }
    }

    pub fn with_pos(text: impl Into<String>, pos: impl Into<String>) -> Self {
        Token {
            text: text.into(),
            pos: Some(pos.into()),
            ..Token::default()
        }
    }
}

/// How the valid-POS pattern is applied to a candidate match span.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
pub enum PosMatchType {
    /// Every token in the span must have a POS tag matching the pattern
    #[strum(serialize = "MATCH_ALL_TOKENS")]
    MatchAllTokens,

    /// At least one token in the span must match
    #[default]
    #[strum(serialize = "MATCH_AT_LEAST_ONE_TOKEN")]
    MatchAtLeastOneToken,

    /// The POS check applies only to single-token spans; longer spans pass
    #[strum(serialize = "MATCH_ONE_TOKEN_PHRASE_ONLY")]
    MatchOneTokenPhraseOnly,
}

/// Options local to one mapping source, shared by all rules loaded from it.
#[derive(Debug)]
pub struct SourceOptions {
    /// Source path, used in error and log messages
    pub name: String,

    /// Compile patterns case-insensitively
    pub ignore_case: bool,

    /// Whole-tag regex a POS tag must match for the POS filter to accept it
    pub valid_pos_pattern: Option<Regex>,

    /// How `valid_pos_pattern` is applied across a match span
    pub pos_match_type: PosMatchType,
}

/// One entity-mapping rule, immutable once loaded.
#[derive(Debug)]
pub struct Rule {
    /// Raw pattern text as it appeared in the mapping file
    pub pattern_text: String,

    /// Compiled token-sequence pattern
    pub pattern: CompiledPattern,

    /// Primary NER label this rule writes
    pub label: String,

    /// Existing labels this rule is explicitly permitted to replace.
    /// Empty means "default policy only".
    pub overwrite: Vec<String>,

    /// Higher priority wins over longer matches
    pub priority: f64,

    /// Advisory weight; carried through but does not affect matching order
    pub weight: f64,

    /// Capturing-group index whose token span receives the label (0 = whole match)
    pub group: usize,

    /// Resolved extra annotation writes: (token field slot, value)
    pub extra_fields: Vec<(String, String)>,

    /// Options of the mapping source this rule came from
    pub source: Arc<SourceOptions>,
}

impl Rule {
    /// True if `label` is listed in this rule's explicit overwrite set.
    pub fn may_overwrite(&self, label: &str) -> bool {
        self.overwrite.iter().any(|o| o == label)
    }
}

/// A candidate rule match over a token sequence. Transient: created and
/// discarded within a single annotation call.
#[derive(Debug, Clone, Copy)]
pub struct TokenMatch {
    /// Index of the owning rule in load order
    pub rule_index: usize,

    /// Start of the full matched span (inclusive)
    pub start: usize,

    /// End of the full matched span (exclusive)
    pub end: usize,

    /// Start of the group-selected sub-span that receives the label
    pub annotate_start: usize,

    /// End of the group-selected sub-span (exclusive)
    pub annotate_end: usize,
}

impl TokenMatch {
    /// Number of tokens in the full matched span.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A caller-supplied document: tokens, optionally grouped into sentences.
///
/// When sentences are present the engine annotates each sentence
/// independently; otherwise it operates over the flat token list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentences: Option<Vec<Vec<Token>>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<Token>>,
}

impl Annotation {
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        Annotation {
            sentences: None,
            tokens: Some(tokens),
        }
    }

    pub fn from_sentences(sentences: Vec<Vec<Token>>) -> Self {
        Annotation {
            sentences: Some(sentences),
            tokens: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_pos_match_type_from_str() {
        assert_eq!(
            PosMatchType::from_str("MATCH_ALL_TOKENS").unwrap(),
            PosMatchType::MatchAllTokens
        );
        assert_eq!(
            PosMatchType::from_str("MATCH_AT_LEAST_ONE_TOKEN").unwrap(),
            PosMatchType::MatchAtLeastOneToken
        );
        assert_eq!(
            PosMatchType::from_str("MATCH_ONE_TOKEN_PHRASE_ONLY").unwrap(),
            PosMatchType::MatchOneTokenPhraseOnly
        );
        assert!(PosMatchType::from_str("MATCH_SOMETHING").is_err());
    }

    #[test]
    fn test_token_defaults() {
        let token = Token::new("Tesla");
        assert_eq!(token.text, "Tesla");
        assert!(token.pos.is_none());
        assert!(token.ner.is_none());
        assert!(token.fields.is_empty());

        let tagged = Token::with_pos("Tesla", "NNP");
        assert_eq!(tagged.pos.as_deref(), Some("NNP"));
    }

    #[test]
    fn test_token_match_len() {
        let m = TokenMatch {
            rule_index: 0,
            start: 2,
            end: 5,
            annotate_start: 3,
            annotate_end: 4,
        };
        assert_eq!(m.len(), 3);
        assert!(!m.is_empty());
    }
}
