use clap::Parser;
use clap::Subcommand;

use crate::commands::config::ConfigArgs;
use crate::commands::decide::DecideArgs;
use crate::commands::notebook::NotebookArgs;
use crate::commands::report::ReportArgs;
use crate::commands::templates::TemplatesArgs;

#[derive(Parser, Debug)]
#[command(name = "research")]
#[command(version, about = "Drive and inspect autonomous research runs")]
pub struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate one controller decision against a saved plan
    Decide(DecideArgs),

    /// List experiment templates
    Templates(TemplatesArgs),

    /// Render analysis code as a notebook
    Notebook(NotebookArgs),

    /// Load, override and validate a run configuration
    Config(ConfigArgs),

    /// Render a saved run report
    Report(ReportArgs),
}
