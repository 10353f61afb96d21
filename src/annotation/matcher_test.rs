//! End-to-end matcher behavior: candidate ranking, span consumption,
//! filtering, and overwrite decisions, driven through real mapping files.

use std::fs;
use std::path::Path;

use tempfile::tempdir;

use crate::annotation::models::Token;
use crate::annotation::{Properties, RegexNerAnnotator};

fn annotator(dir: &Path, mapping: &str, extra_props: &[(&str, &str)]) -> RegexNerAnnotator {
    let path = dir.join("mapping.tsv");
    fs::write(&path, mapping).unwrap();

    let mut props = Properties::new();
    props.set("ner.mapping", path.display().to_string());
    for (key, value) in extra_props {
        props.set(format!("ner.{}", key), *value);
    }
    RegexNerAnnotator::from_properties("ner", &props).unwrap()
}

fn tokens(texts: &[&str]) -> Vec<Token> {
    texts.iter().map(|t| Token::new(*t)).collect()
}

fn labels(tokens: &[Token]) -> Vec<Option<&str>> {
    tokens.iter().map(|t| t.ner.as_deref()).collect()
}

#[test]
fn test_higher_priority_wins_over_same_span() {
    let dir = tempdir().unwrap();
    let ner = annotator(
        dir.path(),
        "pattern\tner\tpriority\nTesla\tCAR_BRAND\t0.5\nTesla\tCOMPANY\t5.0\n",
        &[],
    );

    let mut toks = tokens(&["Tesla"]);
    ner.annotate_tokens(&mut toks);
    assert_eq!(labels(&toks), vec![Some("COMPANY")]);
}

#[test]
fn test_longer_match_wins_on_priority_tie() {
    let dir = tempdir().unwrap();
    let ner = annotator(
        dir.path(),
        "pattern\tner\tpriority\nMachine\tTERM\t1.0\nMachine Learning\tPHRASE\t1.0\n",
        &[],
    );

    let mut toks = tokens(&["Machine", "Learning"]);
    ner.annotate_tokens(&mut toks);
    assert_eq!(labels(&toks), vec![Some("PHRASE"), Some("PHRASE")]);
}

#[test]
fn test_first_loaded_rule_wins_full_tie() {
    let dir = tempdir().unwrap();
    let ner = annotator(
        dir.path(),
        "pattern\tner\nStanford\tUNIV\nStanford\tSCHOOL\n",
        &[],
    );

    let mut toks = tokens(&["Stanford"]);
    ner.annotate_tokens(&mut toks);
    assert_eq!(labels(&toks), vec![Some("UNIV")]);
}

#[test]
fn test_reannotation_is_idempotent() {
    let dir = tempdir().unwrap();
    let ner = annotator(
        dir.path(),
        "pattern\tner\tpriority\nNew York\tCITY\t1.0\nTesla\tCOMPANY\t0.0\n",
        &[],
    );

    let mut toks = tokens(&["Tesla", "opened", "in", "New", "York"]);
    ner.annotate_tokens(&mut toks);
    let first_pass = toks.clone();

    ner.annotate_tokens(&mut toks);
    assert_eq!(toks, first_pass);
    assert_eq!(
        labels(&toks),
        vec![Some("COMPANY"), None, None, Some("CITY"), Some("CITY")]
    );
}

#[test]
fn test_group_annotates_only_sub_span() {
    let dir = tempdir().unwrap();
    let ner = annotator(
        dir.path(),
        "pattern\tner\tgroup\n( /Hello/ (/World/) )\tPLANET\t1\n",
        &[],
    );

    let mut toks = tokens(&["Hello", "World"]);
    ner.annotate_tokens(&mut toks);
    assert_eq!(labels(&toks), vec![None, Some("PLANET")]);
}

#[test]
fn test_full_span_is_consumed_even_outside_annotate_group() {
    let dir = tempdir().unwrap();
    // Second rule could label "Hello", but the first rule's full span
    // consumes it.
    let ner = annotator(
        dir.path(),
        "pattern\tner\tgroup\tpriority\n\
         ( /Hello/ (/World/) )\tPLANET\t1\t1.0\n\
         Hello\tGREETING\t0\t0.5\n",
        &[],
    );

    let mut toks = tokens(&["Hello", "World"]);
    ner.annotate_tokens(&mut toks);
    assert_eq!(labels(&toks), vec![None, Some("PLANET")]);
}

#[test]
fn test_empty_overwrite_never_replaces_uniform_entity() {
    let dir = tempdir().unwrap();
    let ner = annotator(
        dir.path(),
        "pattern\tner\tpriority\nIBM\tCOMPANY\t10.0\n",
        &[],
    );

    let mut toks = tokens(&["IBM"]);
    toks[0].ner = Some("ORG".to_string());
    ner.annotate_tokens(&mut toks);
    assert_eq!(labels(&toks), vec![Some("ORG")]);
}

#[test]
fn test_explicit_overwrite_replaces_listed_label() {
    let dir = tempdir().unwrap();
    let ner = annotator(
        dir.path(),
        "pattern\tner\toverwrite\nIBM\tCOMPANY\tORG\n",
        &[],
    );

    let mut toks = tokens(&["IBM"]);
    toks[0].ner = Some("ORG".to_string());
    ner.annotate_tokens(&mut toks);
    assert_eq!(labels(&toks), vec![Some("COMPANY")]);
}

#[test]
fn test_background_tokens_get_labeled() {
    let dir = tempdir().unwrap();
    let ner = annotator(
        dir.path(),
        "pattern\tner\tpriority\nNew York\tCITY\t1.0\n",
        &[],
    );

    let mut toks = tokens(&["New", "York"]);
    toks[0].ner = Some("O".to_string());
    toks[1].ner = Some("O".to_string());
    ner.annotate_tokens(&mut toks);
    assert_eq!(labels(&toks), vec![Some("CITY"), Some("CITY")]);
}

#[test]
fn test_uniform_prior_entity_is_preserved() {
    let dir = tempdir().unwrap();
    let ner = annotator(
        dir.path(),
        "pattern\tner\tpriority\nNew York\tCITY\t1.0\n",
        &[("noDefaultOverwriteLabels", "CITY")],
    );

    let mut toks = tokens(&["New", "York"]);
    toks[0].ner = Some("PLACE".to_string());
    toks[1].ner = Some("PLACE".to_string());
    ner.annotate_tokens(&mut toks);
    assert_eq!(labels(&toks), vec![Some("PLACE"), Some("PLACE")]);
}

#[test]
fn test_no_default_overwrite_label_leaves_background_alone() {
    let dir = tempdir().unwrap();
    let ner = annotator(
        dir.path(),
        "pattern\tner\nNew York\tCITY\n",
        &[("noDefaultOverwriteLabels", "CITY")],
    );

    let mut toks = tokens(&["New", "York"]);
    ner.annotate_tokens(&mut toks);
    assert_eq!(labels(&toks), vec![None, None]);
}

#[test]
fn test_no_default_overwrite_restored_by_rule_overwrite_column() {
    let dir = tempdir().unwrap();
    let ner = annotator(
        dir.path(),
        "pattern\tner\toverwrite\nNew York\tCITY\tO\n",
        &[("noDefaultOverwriteLabels", "CITY")],
    );

    let mut toks = tokens(&["New", "York"]);
    ner.annotate_tokens(&mut toks);
    assert_eq!(labels(&toks), vec![Some("CITY"), Some("CITY")]);
}

#[test]
fn test_policy_rejection_consumes_full_span() {
    let dir = tempdir().unwrap();
    // The higher-priority two-token rule is rejected by the policy; its span
    // is consumed, so the lower-ranked single-token rule never runs.
    let ner = annotator(
        dir.path(),
        "pattern\tner\toverwrite\tpriority\n\
         New York\tCITY\t\t5.0\n\
         York\tTOWN\tORG\t1.0\n",
        &[],
    );

    let mut toks = tokens(&["New", "York"]);
    toks[0].ner = Some("ORG".to_string());
    toks[1].ner = Some("ORG".to_string());
    ner.annotate_tokens(&mut toks);
    assert_eq!(labels(&toks), vec![Some("ORG"), Some("ORG")]);
}

#[test]
fn test_mixed_prior_labels_allow_overwrite() {
    let dir = tempdir().unwrap();
    let ner = annotator(dir.path(), "pattern\tner\nNew York\tCITY\n", &[]);

    let mut toks = tokens(&["New", "York"]);
    toks[0].ner = Some("ORG".to_string());
    // second token unlabeled: span is not uniform, no entity to protect
    ner.annotate_tokens(&mut toks);
    assert_eq!(labels(&toks), vec![Some("CITY"), Some("CITY")]);
}

#[test]
fn test_common_word_blocks_single_token_match() {
    let dir = tempdir().unwrap();
    let words_path = dir.path().join("common.txt");
    fs::write(&words_path, "General\nthe\n").unwrap();

    let ner = annotator(
        dir.path(),
        "pattern\tner\tpriority\nGeneral\tTITLE\t9.0\nGeneral Motors\tCOMPANY\t1.0\n",
        &[("commonWords", &words_path.display().to_string())],
    );

    // Single-token "General" is blacklisted regardless of priority...
    let mut single = tokens(&["General"]);
    ner.annotate_tokens(&mut single);
    assert_eq!(labels(&single), vec![None]);

    // ...but a multi-token match containing it is unaffected. The blocked
    // single-token candidate advances by one, then scanning resumes.
    let mut phrase = tokens(&["General", "Motors"]);
    ner.annotate_tokens(&mut phrase);
    // At position 0 the TITLE rule has priority 9.0 and wins ranking, but is
    // common-word rejected; position advances by one and Motors alone has no
    // rule, so nothing is labeled.
    assert_eq!(labels(&phrase), vec![None, None]);
}

#[test]
fn test_pos_filter_gates_match() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pos.tsv");
    fs::write(&path, "pattern\tner\nWashington\tPERSON\n").unwrap();

    let mut props = Properties::new();
    props.set(
        "ner.mapping",
        format!("validpospattern=NNP, posmatchtype=MATCH_ALL_TOKENS, {}", path.display()),
    );
    let ner = RegexNerAnnotator::from_properties("ner", &props).unwrap();

    let mut proper = vec![Token::with_pos("Washington", "NNP")];
    ner.annotate_tokens(&mut proper);
    assert_eq!(labels(&proper), vec![Some("PERSON")]);

    let mut verb = vec![Token::with_pos("Washington", "VBG")];
    ner.annotate_tokens(&mut verb);
    assert_eq!(labels(&verb), vec![None]);

    let mut untagged = vec![Token::new("Washington")];
    ner.annotate_tokens(&mut untagged);
    assert_eq!(labels(&untagged), vec![None]);
}

#[test]
fn test_filter_rejection_advances_one_token() {
    let dir = tempdir().unwrap();
    let words_path = dir.path().join("common.txt");
    fs::write(&words_path, "the\n").unwrap();

    let ner = annotator(
        dir.path(),
        "pattern\tner\tpriority\nthe\tDET\t5.0\nthe city\tPLACE\t1.0\n",
        &[("commonWords", &words_path.display().to_string())],
    );

    // "the" is rejected as a common word; advancing by one still lets no
    // other rule start mid-phrase, so only the rejection outcome is visible.
    let mut toks = tokens(&["the", "city"]);
    ner.annotate_tokens(&mut toks);
    assert_eq!(labels(&toks), vec![None, None]);
}

#[test]
fn test_extra_fields_written_to_annotated_span() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("extra.tsv");
    fs::write(
        &path,
        "pattern\tner\tnormalized\nNYC\tCITY\tNew York City\n",
    )
    .unwrap();

    let mut props = Properties::new();
    props.set("ner.mapping", path.display().to_string());
    props.set("ner.mapping.field.normalized", "token::normalized_ner");
    let ner = RegexNerAnnotator::from_properties("ner", &props).unwrap();

    let mut toks = tokens(&["NYC"]);
    ner.annotate_tokens(&mut toks);
    assert_eq!(labels(&toks), vec![Some("CITY")]);
    assert_eq!(
        toks[0].fields.get("normalized_ner").map(String::as_str),
        Some("New York City")
    );
}

#[test]
fn test_sentence_grouped_annotation() {
    let dir = tempdir().unwrap();
    let ner = annotator(dir.path(), "pattern\tner\nTesla\tCOMPANY\n", &[]);

    let mut annotation = crate::annotation::Annotation::from_sentences(vec![
        tokens(&["Tesla", "cars"]),
        tokens(&["I", "like", "Tesla"]),
    ]);
    ner.annotate(&mut annotation).unwrap();

    let sentences = annotation.sentences.unwrap();
    assert_eq!(labels(&sentences[0]), vec![Some("COMPANY"), None]);
    assert_eq!(labels(&sentences[1]), vec![None, None, Some("COMPANY")]);
}
