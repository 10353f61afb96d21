//! Left-to-right scan resolving overlapping rule matches into a maximal
//! non-overlapping assignment.
//!
//! At each uncovered position every rule is tried; the best candidate wins by
//! priority, then full-span length, then load order. An accepted match writes
//! its label over the group-selected sub-span and consumes the full span, so
//! nothing re-matches inside an already-decided region. This is equivalent to
//! longest-match-with-priority lexing.

use std::collections::HashSet;

use log::debug;

use crate::annotation::filters::{is_common_word_match, passes_pos_filter};
use crate::annotation::models::{Rule, Token, TokenMatch};
use crate::annotation::policy::PolicyConfig;

/// Annotate one token sequence in place.
pub fn annotate_tokens(
    rules: &[Rule],
    common_words: &HashSet<String>,
    policy: &PolicyConfig,
    tokens: &mut [Token],
) {
    let mut pos = 0;
    while pos < tokens.len() {
        let best = best_match_at(rules, tokens, pos);

        let m = match best {
            Some(m) => m,
            None => {
                pos += 1;
                continue;
            }
        };
        let rule = &rules[m.rule_index];

        // Filter rejections give shorter matches at nearby positions a
        // chance; policy rejections consume the span (no default overwrite
        // means the region is decided, just not re-labeled).
        if is_common_word_match(common_words, tokens, &m)
            || !passes_pos_filter(&rule.source, tokens, &m)
        {
            debug!(
                "match '{}' at {}..{} rejected by filter",
                rule.pattern_text, m.start, m.end
            );
            pos += 1;
            continue;
        }

        let existing: Vec<&str> = tokens[m.annotate_start..m.annotate_end]
            .iter()
            .map(|t| t.ner.as_deref().unwrap_or(policy.primary_background()))
            .collect();
        if !policy.may_apply(rule, &existing) {
            debug!(
                "match '{}' at {}..{} rejected by overwrite policy",
                rule.pattern_text, m.start, m.end
            );
            pos = m.end;
            continue;
        }

        for token in &mut tokens[m.annotate_start..m.annotate_end] {
            token.ner = Some(rule.label.clone());
            for (slot, value) in &rule.extra_fields {
                token.fields.insert(slot.clone(), value.clone());
            }
        }
        pos = m.end;
    }
}

/// Find the best rule match starting exactly at `pos`: highest priority,
/// then longest full span, then earliest load order (iteration order makes
/// the first-loaded rule win all ties).
fn best_match_at(rules: &[Rule], tokens: &[Token], pos: usize) -> Option<TokenMatch> {
    let mut best: Option<(TokenMatch, f64)> = None;

    for (rule_index, rule) in rules.iter().enumerate() {
        let spans = match rule.pattern.match_at(tokens, pos) {
            Some(spans) => spans,
            None => continue,
        };
        let full = spans[0].clone().expect("group 0 is always present");

        // A rule whose annotate group did not participate in this particular
        // match has nothing to label; skip the candidate.
        let annotate = match spans[rule.group].clone() {
            Some(range) if !range.is_empty() => range,
            _ => continue,
        };

        let candidate = TokenMatch {
            rule_index,
            start: full.start,
            end: full.end,
            annotate_start: annotate.start,
            annotate_end: annotate.end,
        };

        let replace = match &best {
            None => true,
            Some((current, current_priority)) => {
                rule.priority > *current_priority
                    || (rule.priority == *current_priority && candidate.len() > current.len())
            }
        };
        if replace {
            best = Some((candidate, rule.priority));
        }
    }

    best.map(|(m, _)| m)
}
