pub mod cli;
pub mod config;
pub mod corpus;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod remote;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{ApiConfig, CliOverrides, Config, LogConfig, OutputConfig, WalkConfig};
pub use error::{GitCorpusError, Result, UserFriendlyError};

// Core functionality re-exports
pub use corpus::{
    classify, compact, AssembleOptions, ContentKind, CorpusAssembler, CorpusItem, RepoCorpus,
    RepoWalker, RunHeader,
};
pub use orchestrator::{ExtractionMode, ExtractionOrchestrator, ExtractionOutcome, ExtractionResult};
pub use remote::{
    parse_owner, parse_repo_url, ApiClient, HttpResponse, RepoListFetcher, RepositoryRef,
    ReqwestTransport, StaticTransport, Transport, TreeFetcher,
};
pub use ui::{
    GracefulShutdown, MemorySink, OutputFormatter, OutputMode, ProgressManager, ProgressSink,
    SpinnerSink,
};

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Main library interface for GitCorpus functionality
pub struct GitCorpus {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
}

impl GitCorpus {
    /// Create a new GitCorpus instance; installs the Ctrl+C handler
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let shutdown = GracefulShutdown::new()?;
        Ok(Self::with_shutdown(config, output_mode, verbose, quiet, shutdown))
    }

    /// Create a new GitCorpus instance for testing (no signal handler conflicts)
    pub fn new_for_test(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        Self::with_shutdown(config, output_mode, verbose, quiet, GracefulShutdown::new_for_test())
    }

    fn with_shutdown(
        config: Config,
        output_mode: OutputMode,
        verbose: u8,
        quiet: bool,
        shutdown: GracefulShutdown,
    ) -> Self {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(output_mode == OutputMode::Human && !quiet);

        Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
        }
    }

    /// Create GitCorpus instance from CLI arguments
    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        Self::new(
            config,
            cli_args.output_format.into(),
            cli_args.verbose,
            cli_args.quiet,
        )
    }

    /// Run an extraction against the configured API.
    pub async fn extract(&self, mode: ExtractionMode, input: &str) -> Result<ExtractionResult> {
        let transport = ReqwestTransport::from_config(&self.config)?;
        Ok(self
            .extract_with_transport(mode, input, Arc::new(transport))
            .await)
    }

    /// Run an extraction over any transport, reporting progress through the formatter.
    pub async fn extract_with_transport(
        &self,
        mode: ExtractionMode,
        input: &str,
        transport: Arc<dyn Transport>,
    ) -> ExtractionResult {
        let start_time = Instant::now();
        let options = self.assemble_options();

        self.output_formatter.start_operation(match mode {
            ExtractionMode::Single => "Extracting repository",
            ExtractionMode::AllForOwner => "Extracting all repositories of user",
        });

        let spinner = self.progress_manager.create_spinner("Starting extraction");
        let sink: Arc<dyn ProgressSink> = if self.progress_manager.is_enabled() {
            Arc::new(SpinnerSink::new(spinner.clone()))
        } else {
            Arc::new(self.output_formatter.clone())
        };

        let orchestrator = ExtractionOrchestrator::new(&self.config, transport, sink)
            .with_shutdown(self.shutdown.clone());
        let result = orchestrator.run(mode, input, options).await;

        ui::progress::finish_progress_with_summary(&spinner, &result.message, start_time.elapsed());
        self.progress_manager.clear();

        result
    }

    pub fn assemble_options(&self) -> AssembleOptions {
        Cli::assemble_options(&self.config)
    }

    /// Persist a successful result. The core never touches the filesystem.
    pub fn save_output<P: AsRef<Path>>(&self, result: &ExtractionResult, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &result.text)?;

        self.output_formatter.success(&format!(
            "Saved {} to {}",
            ui::output::format_bytes(result.text.len() as u64),
            path.display()
        ));
        Ok(())
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config)?;
        Ok(())
    }

    /// Get configuration reference
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get output formatter reference
    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &GitCorpusError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

/// Get version information
pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Get build information
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: version_info(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
        build_date: option_env!("BUILD_DATE").unwrap_or("unknown"),
        target: std::env::consts::ARCH.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_date: &'static str,
    pub target: String,
}

impl std::fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "GitCorpus {} ({}) built on {} for {}",
            self.version, self.git_hash, self.build_date, self.target
        )
    }
}
