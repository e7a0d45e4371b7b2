use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "hoist", version, about = "Upload whole directory trees to object storage, concurrently")]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true, value_name = "FILE", env = "HOIST_CONFIG")]
    pub config: Option<PathBuf>,
    /// More output; repeat for more still
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload every file beneath a directory
    Upload(UploadArgs),
    /// Print the effective configuration
    Config,
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Directory to upload; its name becomes the top-level folder
    pub directory: PathBuf,
    /// Upload into a local directory instead of the configured target
    #[arg(long, value_name = "DIR")]
    pub to: Option<PathBuf>,
    /// Read the directory as a flat file list instead of walking it page by page
    #[arg(long)]
    pub flat: bool,
    /// Upload images as they are
    #[arg(long)]
    pub no_compress: bool,
    /// Do everything except write to the target
    #[arg(long)]
    pub dry_run: bool,
    /// Keep going after a failed upload and report every file's outcome
    #[arg(long)]
    pub settle: bool,
}

impl Cli {
    /// Default log level for the given number of `-v` flags.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
