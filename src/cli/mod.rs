mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{doc, html, parse};

#[derive(Parser)]
#[command(name = "c-docgen")]
#[command(about = "Extract documentation from C headers and render it to HTML")]
#[command(version)]
#[command(after_long_help = r#"
EXAMPLES:
    # Extract the model of one header
    c-docgen parse include/test.h -o build/test.json -- -Iinclude

    # Render every model in a directory
    c-docgen html --input-dir build --output-dir site --project-name libtest

    # Both at once
    c-docgen doc include/test.h --output-dir site -- -Iinclude
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log every step of the extraction
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to ./c-docgen.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract the documentation model of a translation unit as JSON
    Parse {
        /// Source file to extract
        file: PathBuf,

        /// Write the JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Compiler arguments, after `--`
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Render a directory of JSON models to HTML
    Html {
        /// Directory containing `.json` models
        #[arg(long)]
        input_dir: PathBuf,

        /// Directory to write the pages into
        #[arg(long)]
        output_dir: PathBuf,

        /// Project name shown on every page
        #[arg(long)]
        project_name: Option<String>,
    },

    /// Extract a translation unit and render it in one step
    Doc {
        /// Source file to extract
        file: PathBuf,

        /// Directory to write the page into
        #[arg(long)]
        output_dir: PathBuf,

        /// Project name shown on the page
        #[arg(long)]
        project_name: Option<String>,

        /// Compiler arguments, after `--`
        #[arg(last = true)]
        args: Vec<String>,
    },
}
