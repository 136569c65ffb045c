use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// How `build` renders the manuscript.
#[derive(ValueEnum, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Engine {
    /// Standalone HTML with the stylesheet inlined
    #[default]
    Html,
    /// PDF typeset by pandoc's XeLaTeX engine
    Xelatex,
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Output format
    #[clap(long, value_enum, default_value_t = Engine::Html)]
    pub engine: Engine,
}

#[derive(Args, Debug)]
pub struct ImagesArgs {
    /// Gemini API key
    #[clap(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// List what would be generated without calling the API
    #[clap(long)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generates an ebook.toml config file
    Config,
    /// Merges the manuscript and renders it with pandoc
    Build(BuildArgs),
    /// Generates missing illustrations with the Gemini image API
    Images(ImagesArgs),
    /// Checks that every image referenced by the manuscript exists
    Verify,
}

#[derive(Parser, Debug)]
#[clap(author, version, about)]
pub struct Cli {
    /// Project root containing manuscript/, images/, styles/ and output/
    #[clap(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Configuration file [default: <root>/ebook.toml]
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}
