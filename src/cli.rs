use crate::config::{CliOverrides, Config};
use crate::corpus::assembler::AssembleOptions;
use crate::error::Result;
use crate::orchestrator::ExtractionMode;
use crate::ui::OutputMode;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gitcorpus")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Flatten GitHub repositories into a single text corpus")]
#[command(
    long_about = "GitCorpus walks the content tree of a repository through the GitHub API, \
                  keeps every text file and concatenates them into one output file. \
                  With --user it does the same for every repository of an owner."
)]
#[command(before_help = "📚 GitCorpus - Repository Text Extraction Tool")]
#[command(after_help = "EXAMPLES:\n  \
    gitcorpus https://github.com/rust-lang/log -o log.txt\n  \
    gitcorpus rust-lang/log -o log.txt --compact\n  \
    gitcorpus octocat --user -o octocat.txt --concurrency 8\n  \
    gitcorpus https://github.com/tokio-rs/mio -o mio.txt --true-string\n\n\
    Set GITHUB_TOKEN to raise the API rate limit.")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Repository URL, or an owner name with --user
    #[arg(required_unless_present = "generate_config")]
    pub input: Option<String>,

    /// File the corpus is written to
    #[arg(short, long, required_unless_present = "generate_config")]
    pub output: Option<PathBuf>,

    /// Treat INPUT as an owner and extract all of their repositories
    #[arg(short, long)]
    pub user: bool,

    /// Strip all whitespace from the result
    #[arg(long)]
    pub compact: bool,

    /// Plain concatenation of file contents without banners
    #[arg(long)]
    pub no_frame: bool,

    /// Unframed and compact: one continuous string
    #[arg(long, help = "No formatting and no whitespace (same as --no-frame --compact)")]
    pub true_string: bool,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, help = "Timeout for each API request (seconds)")]
    pub timeout: Option<u64>,

    /// Maximum number of API requests in flight
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..=64))]
    pub concurrency: Option<u16>,

    /// Base URL of the contents API
    #[arg(long, help = "API base URL (default: https://api.github.com)")]
    pub api_url: Option<String>,

    /// API token, read from GITHUB_TOKEN when not given
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Output format for status messages
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Debug logging to stderr
    #[arg(long)]
    pub debug: bool,

    /// Write log records to stderr as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Write a sample configuration file (to --config, or gitcorpus.toml)
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl From<OutputFormat> for OutputMode {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        }
    }
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        let framed = (self.no_frame || self.true_string).then_some(false);
        let compact = (self.compact || self.true_string).then_some(true);

        CliOverrides::new()
            .with_api_url(self.api_url.clone())
            .with_timeout(self.timeout)
            .with_token(self.token.clone())
            .with_concurrency(self.concurrency.map(usize::from))
            .with_framed(framed)
            .with_compact(compact)
            .with_debug(self.debug)
            .with_json_logs(self.log_json.then_some(true))
    }

    pub fn mode(&self) -> ExtractionMode {
        if self.user {
            ExtractionMode::AllForOwner
        } else {
            ExtractionMode::Single
        }
    }

    pub fn input(&self) -> &str {
        self.input.as_deref().unwrap_or_default()
    }

    pub fn assemble_options(config: &Config) -> AssembleOptions {
        AssembleOptions {
            framed: config.output.framed,
            compact: config.output.compact,
        }
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}
