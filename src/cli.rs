use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Interpreter for the E# command language")]
pub struct Args {
    // Runs the built-in demo program when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a source file, or the built-in demo program if none is given
    Run {
        /// Path to the source file
        file: Option<PathBuf>,
    },

    /// Check a source file for syntax errors and dump its tokens and statements
    Check {
        /// Path to the source file to check
        file: PathBuf,
    },

    /// Start an interactive REPL session
    Repl,
}
