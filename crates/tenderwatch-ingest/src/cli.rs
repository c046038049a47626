//! Command line definitions for `tenderwatch-ingest`

use clap::{Parser, Subcommand};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Tenderwatch - procurement registry feed watcher
#[derive(Parser, Debug)]
#[command(name = "tenderwatch-ingest")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file
    #[arg(
        short,
        long,
        env = "TENDERWATCH_CONFIG",
        default_value = crate::config::DEFAULT_CONFIG_FILE,
        global = true
    )]
    pub config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll feeds and print new orders as JSON lines
    Sync {
        /// Feed to poll as URL=PATH (PATH `-` reads stdin); repeatable
        #[arg(short, long = "feed", required = true)]
        feeds: Vec<FeedArg>,
    },

    /// Inspect or repair the filter file
    Filter {
        #[command(subcommand)]
        command: FilterCommand,
    },

    /// Inspect or remove the checkpoint cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },

    /// Show or save the effective configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Filter subcommands
#[derive(Subcommand, Debug)]
pub enum FilterCommand {
    /// Report invalid and duplicate patterns
    Verify,

    /// Remove invalid and duplicate patterns and save the file
    Clear,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// List stored checkpoints
    Show,

    /// Remove every checkpoint
    Clear,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the configuration after environment overrides
    Show,

    /// Write the effective configuration to the config file
    ///
    /// A configuration equal to the defaults removes the file.
    Save,
}

/// Where a feed body is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedInput {
    Stdin,
    File(PathBuf),
}

/// One `--feed URL=PATH` argument
///
/// The URL is the checkpoint identity; PATH holds the downloaded body.
/// Split at the last `=`, since query strings contain `=` themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedArg {
    pub url: String,
    pub input: FeedInput,
}

impl FromStr for FeedArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (url, path) = s
            .rsplit_once('=')
            .ok_or_else(|| format!("expected URL=PATH, got '{}'", s))?;
        if url.is_empty() || path.is_empty() {
            return Err(format!("expected URL=PATH, got '{}'", s));
        }

        let input = if path == "-" {
            FeedInput::Stdin
        } else {
            FeedInput::File(PathBuf::from(path))
        };
        Ok(Self {
            url: url.to_string(),
            input,
        })
    }
}

impl fmt::Display for FeedArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.input {
            FeedInput::Stdin => write!(f, "{}=-", self.url),
            FeedInput::File(path) => write!(f, "{}={}", self.url, path.display()),
        }
    }
}
