//! Pattern compilation for mapping rules.
//!
//! A rule pattern compiles into one of two dialects, detected structurally:
//! a trimmed pattern whose first character is `(` is a token-sequence
//! expression (see [`crate::annotation::sequence`]); anything else is a
//! simple multi-token phrase where each whitespace-separated chunk is a
//! whole-token regex.

use std::ops::Range;

use regex::Regex;

use crate::annotation::models::Token;
use crate::annotation::sequence::SequencePattern;
use crate::errors::{RegexNerError, Result};

/// A compiled rule pattern over token sequences.
#[derive(Debug)]
pub enum CompiledPattern {
    Phrase(PhrasePattern),
    Sequence(SequencePattern),
}

impl CompiledPattern {
    /// Compile `pattern_text` in one of the two dialects.
    ///
    /// `source` names the mapping file for error messages.
    pub fn compile(pattern_text: &str, ignore_case: bool, source: &str) -> Result<CompiledPattern> {
        if pattern_text.trim_start().starts_with('(') {
            Ok(CompiledPattern::Sequence(SequencePattern::compile(
                pattern_text,
                ignore_case,
                source,
            )?))
        } else {
            Ok(CompiledPattern::Phrase(PhrasePattern::compile(
                pattern_text,
                ignore_case,
                source,
            )?))
        }
    }

    /// Total number of capturing groups, excluding group 0.
    pub fn group_count(&self) -> usize {
        match self {
            CompiledPattern::Phrase(p) => p.group_count(),
            CompiledPattern::Sequence(p) => p.group_count(),
        }
    }

    /// Try to match this pattern against `tokens` starting exactly at `start`.
    ///
    /// On success returns one token range per group index; entry 0 is always
    /// the full matched span. A group that did not participate in the match
    /// is `None`.
    pub fn match_at(&self, tokens: &[Token], start: usize) -> Option<Vec<Option<Range<usize>>>> {
        match self {
            CompiledPattern::Phrase(p) => p.match_at(tokens, start),
            CompiledPattern::Sequence(p) => p.match_at(tokens, start),
        }
    }
}

/// Simple phrase dialect: N whitespace-separated chunks, each a whole-token
/// regex, matching exactly N consecutive tokens.
#[derive(Debug)]
pub struct PhrasePattern {
    chunks: Vec<Regex>,
    /// Capturing groups contributed by each chunk, in order
    chunk_groups: Vec<usize>,
    group_count: usize,
}

impl PhrasePattern {
    pub fn compile(pattern_text: &str, ignore_case: bool, source: &str) -> Result<PhrasePattern> {
        let chunk_texts = split_unescaped_whitespace(pattern_text);
        if chunk_texts.is_empty() {
            return Err(RegexNerError::invalid_pattern(
                pattern_text,
                source,
                "empty pattern",
            ));
        }

        let mut chunks = Vec::with_capacity(chunk_texts.len());
        let mut chunk_groups = Vec::with_capacity(chunk_texts.len());
        let mut group_count = 0;

        for chunk in &chunk_texts {
            let anchored = if ignore_case {
                format!("(?i)^(?:{})$", chunk)
            } else {
                format!("^(?:{})$", chunk)
            };
            let regex = Regex::new(&anchored).map_err(|e| {
                RegexNerError::invalid_pattern(pattern_text, source, e.to_string())
            })?;
            let groups = regex.captures_len() - 1;
            chunk_groups.push(groups);
            group_count += groups;
            chunks.push(regex);
        }

        Ok(PhrasePattern {
            chunks,
            chunk_groups,
            group_count,
        })
    }

    pub fn group_count(&self) -> usize {
        self.group_count
    }

    /// Number of consecutive tokens this pattern consumes.
    pub fn token_len(&self) -> usize {
        self.chunks.len()
    }

    pub fn match_at(&self, tokens: &[Token], start: usize) -> Option<Vec<Option<Range<usize>>>> {
        let end = start + self.chunks.len();
        if end > tokens.len() {
            return None;
        }

        let mut spans: Vec<Option<Range<usize>>> = vec![None; self.group_count + 1];
        spans[0] = Some(start..end);

        let mut group_offset = 0;
        for (i, (regex, &groups)) in self.chunks.iter().zip(&self.chunk_groups).enumerate() {
            let captures = regex.captures(&tokens[start + i].text)?;
            // An inner group's token span is its owning chunk's single token.
            for local in 1..=groups {
                if captures.get(local).is_some() {
                    spans[group_offset + local] = Some(start + i..start + i + 1);
                }
            }
            group_offset += groups;
        }

        Some(spans)
    }
}

/// Split on runs of unescaped whitespace. A whitespace character preceded by
/// a backslash (e.g. `\ `) stays inside its chunk, so a single chunk can
/// match a token whose text contains a space.
fn split_unescaped_whitespace(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut escaped = false;

    for ch in text.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
        } else if ch == '\\' {
            current.push(ch);
            escaped = true;
        } else if ch.is_whitespace() {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
