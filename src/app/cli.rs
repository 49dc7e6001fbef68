//! Command-Line Interface

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// testflow - Derive diagrams, coverage and test scripts from recorded browser operations
#[derive(Parser, Debug)]
#[command(name = "testflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show windows, screens and transitions of an exported test result
    History {
        /// Exported test result (JSON)
        input: PathBuf,
    },

    /// Show per-screen element coverage
    Coverage {
        /// Exported test result (JSON)
        input: PathBuf,

        /// Only count elements with this tag name (repeatable)
        #[arg(short = 't', long = "include-tag")]
        include_tags: Vec<String>,
    },

    /// Print diagram markup
    Diagram {
        /// Exported test result (JSON)
        input: PathBuf,

        /// Kind of diagram
        #[arg(short, long, value_enum, default_value = "sequence")]
        kind: DiagramKind,
    },

    /// Generate WebdriverIO test scripts
    Generate {
        /// Exported test results, one suite per file
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Share page methods between identical sections
        #[arg(long)]
        optimize: bool,

        /// Emit data-driven suites
        #[arg(long)]
        data_driven: bool,

        /// Maximum rows per data set (0 = unlimited)
        #[arg(short, long)]
        max_generation: Option<usize>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fetch a test result from the service and summarize it
    Resume {
        /// Test result id
        test_result_id: String,
    },

    /// View or initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Diagram kinds
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramKind {
    /// One sequence diagram per window
    Sequence,
    /// Screen-transition diagram across windows
    Transition,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write the default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Default output directory for generated scripts
    pub fn scripts_dir() -> PathBuf {
        PathBuf::from("testflow-scripts")
    }
}
