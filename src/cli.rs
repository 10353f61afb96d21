use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Mapping source spec: "[opt=val, ...] path [; [opt=val, ...] path]*"
    pub mapping: String,

    /// Input text file (default: stdin), one sentence per line
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Properties file with additional annotator configuration
    #[arg(short, long)]
    pub properties: Option<PathBuf>,

    /// Compile patterns case-insensitively
    #[arg(long)]
    pub ignorecase: bool,

    /// Input tokens carry POS tags in word/POS form
    #[arg(long)]
    pub pos: bool,

    /// Emit annotated tokens as JSON, one sentence per line
    #[arg(long)]
    pub json: bool,
}
