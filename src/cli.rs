use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "pypad", about = "Terminal Python code pad with a sandboxed interpreter", version)]
pub struct Cli {
    /// Open this .py or .txt file in the editor.
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Python interpreter used for the execution context.
    #[arg(long, global = true)]
    pub python: Option<PathBuf>,

    /// Stop a run after this many seconds (0 disables the limit).
    #[arg(long, global = true, value_parser = clap::value_parser!(u64))]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run a file without the editor and stream its output.
    Run {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
