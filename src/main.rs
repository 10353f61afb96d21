use std::fs::File;
use std::io::{self, BufReader, Read};

use anyhow::{Context, Result};
use clap::Parser;

use regexner::{Properties, RegexNerAnnotator, Token};

use crate::cli::Cli;

mod cli;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut props = match &cli.properties {
        Some(path) => Properties::from_file(path)
            .with_context(|| format!("loading properties from {}", path.display()))?,
        None => Properties::new(),
    };
    props.set("regexner.mapping", &cli.mapping);
    if cli.ignorecase {
        props.set("regexner.ignorecase", "true");
    }

    let annotator = RegexNerAnnotator::from_properties("regexner", &props)?;

    let input = read_input(&cli)?;
    for line in input.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let mut tokens = tokenize_line(line, cli.pos);
        annotator.annotate_tokens(&mut tokens);
        print_tokens(&tokens, cli.json)?;
    }
    Ok(())
}

fn read_input(cli: &Cli) -> Result<String> {
    let mut buf = String::new();
    match &cli.input {
        Some(path) => {
            BufReader::new(
                File::open(path).with_context(|| format!("opening {}", path.display()))?,
            )
            .read_to_string(&mut buf)?;
        }
        None => {
            io::stdin().lock().read_to_string(&mut buf)?;
        }
    }
    Ok(buf)
}

/// Whitespace tokenization; with `--pos`, each token is split on its last
/// slash into word/POS.
fn tokenize_line(line: &str, with_pos: bool) -> Vec<Token> {
    line.split_whitespace()
        .map(|raw| {
            if with_pos {
                if let Some((word, pos)) = raw.rsplit_once('/') {
                    return Token::with_pos(word, pos);
                }
            }
            Token::new(raw)
        })
        .collect()
}

fn print_tokens(tokens: &[Token], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(tokens)?);
    } else {
        let rendered: Vec<String> = tokens
            .iter()
            .map(|t| format!("{}/{}", t.text, t.ner.as_deref().unwrap_or("O")))
            .collect();
        println!("{}", rendered.join(" "));
    }
    Ok(())
}
