use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate Rust bindings from Sketch file format schemas")]
pub struct CodegenArgs {
    /// Directory containing the JSON Schema bundle
    #[arg(short = 'i', long)]
    pub input: Option<PathBuf>,

    /// Rust file to write the generated bindings to
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Also write the compiled type catalog as JSON
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Path to KDL config file, used for anything not given on the command line
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short = 'v', long)]
    pub verbose: bool,
}
