//! POS and common-word gates applied to a candidate match before the
//! overwrite policy sees it.

use std::collections::HashSet;

use crate::annotation::models::{PosMatchType, SourceOptions, Token, TokenMatch};

/// Check the source's valid-POS pattern against the full matched span.
///
/// A token with no POS tag fails any POS requirement it is checked against.
/// With no pattern configured, everything passes.
pub fn passes_pos_filter(options: &SourceOptions, tokens: &[Token], m: &TokenMatch) -> bool {
    let pattern = match &options.valid_pos_pattern {
        Some(p) => p,
        None => return true,
    };
    let span = &tokens[m.start..m.end];
    let tag_matches =
        |token: &Token| token.pos.as_deref().is_some_and(|pos| pattern.is_match(pos));

    match options.pos_match_type {
        PosMatchType::MatchAllTokens => span.iter().all(tag_matches),
        PosMatchType::MatchAtLeastOneToken => span.iter().any(tag_matches),
        PosMatchType::MatchOneTokenPhraseOnly => {
            if span.len() == 1 {
                tag_matches(&span[0])
            } else {
                true
            }
        }
    }
}

/// True when the match is a single token whose text is blacklisted.
/// Common-word rejection ignores priority entirely.
pub fn is_common_word_match(
    common_words: &HashSet<String>,
    tokens: &[Token],
    m: &TokenMatch,
) -> bool {
    m.len() == 1 && common_words.contains(&tokens[m.start].text)
}
