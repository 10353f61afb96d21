//! Token-sequence expression patterns.
//!
//! This is the structured pattern dialect: a parenthesized sequence of
//! per-token terms with optional nested grouping, e.g.
//! `( /Hello/ (/World/) )`. Each term consumes exactly one token, so
//! matching is a deterministic linear walk with no backtracking.
//!
//! Terms:
//! - `/regex/` — the token's full text must match the regex
//! - `"literal"` or a bare word — the token's text must equal the literal
//! - `( term ... )` — a capturing group over consecutive tokens
//!
//! Nested groups are numbered by order of opening parenthesis, starting at 1;
//! group 0 is the whole sequence. Capturing groups written inside a `/regex/`
//! term do not count toward the pattern's group numbering — only token
//! groups capture in this dialect.

use std::ops::Range;

use regex::Regex;

use crate::annotation::models::Token;
use crate::errors::{RegexNerError, Result};

#[derive(Debug)]
enum SeqElem {
    /// Whole-token regex term
    Regex(Regex),
    /// Whole-token literal term; stored case-folded when ignore_case is set
    Literal { text: String, fold_case: bool },
    /// Capturing group over consecutive tokens
    Group { index: usize, elems: Vec<SeqElem> },
}

/// A compiled token-sequence expression.
#[derive(Debug)]
pub struct SequencePattern {
    elems: Vec<SeqElem>,
    group_count: usize,
}

impl SequencePattern {
    pub fn compile(pattern_text: &str, ignore_case: bool, source: &str) -> Result<SequencePattern> {
        let mut parser = Parser {
            chars: pattern_text.char_indices().peekable(),
            text: pattern_text,
            source,
            ignore_case,
            next_group: 1,
        };

        parser.skip_whitespace();
        if !parser.eat('(') {
            return Err(parser.error("expected '(' at start of token-sequence expression"));
        }
        let elems = parser.parse_elems()?;
        parser.skip_whitespace();
        if parser.chars.next().is_some() {
            return Err(parser.error("unexpected text after closing ')'"));
        }
        if elems.is_empty() {
            return Err(parser.error("empty token-sequence expression"));
        }

        Ok(SequencePattern {
            elems,
            group_count: parser.next_group - 1,
        })
    }

    pub fn group_count(&self) -> usize {
        self.group_count
    }

    pub fn match_at(&self, tokens: &[Token], start: usize) -> Option<Vec<Option<Range<usize>>>> {
        let mut spans: Vec<Option<Range<usize>>> = vec![None; self.group_count + 1];
        let end = match match_elems(&self.elems, tokens, start, &mut spans) {
            Some(end) => end,
            None => return None,
        };
        spans[0] = Some(start..end);
        Some(spans)
    }
}

/// Match each element in order, consuming one token per term. Returns the
/// position just past the last consumed token.
fn match_elems(
    elems: &[SeqElem],
    tokens: &[Token],
    mut pos: usize,
    spans: &mut [Option<Range<usize>>],
) -> Option<usize> {
    for elem in elems {
        match elem {
            SeqElem::Regex(regex) => {
                let token = tokens.get(pos)?;
                if !regex.is_match(&token.text) {
                    return None;
                }
                pos += 1;
            }
            SeqElem::Literal { text, fold_case } => {
                let token = tokens.get(pos)?;
                let matched = if *fold_case {
                    token.text.to_lowercase() == *text
                } else {
                    token.text == *text
                };
                if !matched {
                    return None;
                }
                pos += 1;
            }
            SeqElem::Group { index, elems } => {
                let group_start = pos;
                pos = match_elems(elems, tokens, pos, spans)?;
                spans[*index] = Some(group_start..pos);
            }
        }
    }
    Some(pos)
}

struct Parser<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    text: &'a str,
    source: &'a str,
    ignore_case: bool,
    next_group: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, reason: impl Into<String>) -> RegexNerError {
        RegexNerError::invalid_pattern(self.text, self.source, reason)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some((_, c)) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if matches!(self.chars.peek(), Some((_, c)) if *c == expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    /// Parse terms up to and including the closing ')'.
    fn parse_elems(&mut self) -> Result<Vec<SeqElem>> {
        let mut elems = Vec::new();
        loop {
            self.skip_whitespace();
            match self.chars.peek().map(|(_, c)| *c) {
                None => return Err(self.error("unterminated group, expected ')'")),
                Some(')') => {
                    self.chars.next();
                    return Ok(elems);
                }
                Some('(') => {
                    self.chars.next();
                    let index = self.next_group;
                    self.next_group += 1;
                    let inner = self.parse_elems()?;
                    if inner.is_empty() {
                        return Err(self.error("empty capturing group"));
                    }
                    elems.push(SeqElem::Group { index, elems: inner });
                }
                Some('/') => {
                    self.chars.next();
                    elems.push(self.parse_regex_term()?);
                }
                Some('"') => {
                    self.chars.next();
                    elems.push(self.parse_quoted_literal()?);
                }
                Some(_) => elems.push(self.parse_bare_literal()),
            }
        }
    }

    fn parse_regex_term(&mut self) -> Result<SeqElem> {
        let mut body = String::new();
        loop {
            match self.chars.next() {
                None => return Err(self.error("unterminated /regex/ term")),
                Some((_, '\\')) => {
                    // \/ becomes a literal slash; any other escape passes through
                    match self.chars.next() {
                        Some((_, '/')) => body.push('/'),
                        Some((_, c)) => {
                            body.push('\\');
                            body.push(c);
                        }
                        None => return Err(self.error("dangling escape in /regex/ term")),
                    }
                }
                Some((_, '/')) => break,
                Some((_, c)) => body.push(c),
            }
        }

        let anchored = if self.ignore_case {
            format!("(?i)^(?:{})$", body)
        } else {
            format!("^(?:{})$", body)
        };
        let regex = Regex::new(&anchored)
            .map_err(|e| self.error(e.to_string()))?;
        Ok(SeqElem::Regex(regex))
    }

    fn parse_quoted_literal(&mut self) -> Result<SeqElem> {
        let mut text = String::new();
        loop {
            match self.chars.next() {
                None => return Err(self.error("unterminated quoted literal")),
                Some((_, '"')) => break,
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, c)) => text.push(c),
                    None => return Err(self.error("dangling escape in quoted literal")),
                },
                Some((_, c)) => text.push(c),
            }
        }
        Ok(self.literal(text))
    }

    fn parse_bare_literal(&mut self) -> SeqElem {
        let mut text = String::new();
        while let Some((_, c)) = self.chars.peek() {
            if c.is_whitespace() || *c == '(' || *c == ')' {
                break;
            }
            text.push(*c);
            self.chars.next();
        }
        self.literal(text)
    }

    fn literal(&self, text: String) -> SeqElem {
        if self.ignore_case {
            SeqElem::Literal {
                text: text.to_lowercase(),
                fold_case: true,
            }
        } else {
            SeqElem::Literal {
                text,
                fold_case: false,
            }
        }
    }
}
