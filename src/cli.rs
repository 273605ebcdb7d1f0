// SPDX-License-Identifier: BSD-3-Clause
use std::fmt;
use std::path::PathBuf;

#[derive(Clone, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum Check {
    Default,
    None,
    Strict,
}

impl std::fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::Default => write!(f, "default"),
            Check::None => write!(f, "none"),
            Check::Strict => write!(f, "strict"),
        }
    }
}

/// Points-to analysis for object-oriented programs
#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Check assertions: report failures (default), skip them (none), or
    /// fail when one does not hold (strict)
    #[arg(long, default_value_t = Check::Default)]
    pub check: Check,

    /// Context sensitivity: ci, <k>-call, <k>-obj or <k>-type, optionally
    /// followed by :<heap depth>
    #[arg(short, long)]
    pub context: Option<String>,

    /// Debug
    #[arg(long)]
    pub debug: bool,

    /// Regular expressions over method signatures selecting the entry
    /// methods
    #[arg(short, long)]
    pub entry: Vec<String>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    /// Collect and report precision metrics
    #[arg(long)]
    pub metrics: bool,

    /// Disable reflection inference
    #[arg(long)]
    pub no_reflection: bool,

    /// Analysis options (JSON)
    #[arg(short, long)]
    pub options: Option<PathBuf>,

    /// Program (JSON)
    #[arg()]
    pub program: PathBuf,

    /// Quiet
    #[arg(long)]
    pub quiet: bool,

    /// Tracing
    #[arg(long)]
    pub tracing: bool,
}
