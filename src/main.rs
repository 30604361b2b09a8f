use clap::Parser;
use gitcorpus::{
    build_info, logging, Cli, ExtractionOutcome, ExtractionResult, GitCorpus, GitCorpusError,
    OutputFormatter, OutputMode, UserFriendlyError,
};
use std::process;
use tracing::debug;

#[tokio::main]
async fn main() {
    let exit_code = run().await;
    process::exit(exit_code);
}

async fn run() -> i32 {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Handle special commands first
    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let gitcorpus = match GitCorpus::from_cli(&cli) {
        Ok(gitcorpus) => gitcorpus,
        Err(e) => {
            print_startup_error(&e);
            return 1;
        }
    };

    logging::init(&gitcorpus.config().logging, cli.verbosity_level());
    debug!(build = %build_info(), "starting");

    match gitcorpus.extract(cli.mode(), cli.input()).await {
        Ok(result) => finish(&gitcorpus, &cli, &result),
        Err(e) => {
            gitcorpus.handle_error(&e);
            1
        }
    }
}

/// Writes the corpus when there is one and maps the outcome to an exit code.
fn finish(gitcorpus: &GitCorpus, cli: &Cli, result: &ExtractionResult) -> i32 {
    let formatter = gitcorpus.output_formatter();

    if result.success {
        if let Some(ref path) = cli.output {
            if let Err(e) = gitcorpus.save_output(result, path) {
                gitcorpus.handle_error(&e);
                return 1;
            }
        }
    }

    formatter.print_result_summary(result);
    exit_code(result, formatter)
}

fn exit_code(result: &ExtractionResult, formatter: &OutputFormatter) -> i32 {
    match result.outcome {
        ExtractionOutcome::Completed => 0,
        ExtractionOutcome::NothingToSave => {
            formatter.warning("No textual content found to save.");
            4
        }
        ExtractionOutcome::InvalidInput => {
            formatter.error(&result.message);
            2
        }
        ExtractionOutcome::ListingFailed => {
            formatter.error(&result.message);
            3
        }
        ExtractionOutcome::Cancelled => 130, // Interrupted (SIGINT)
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "gitcorpus.toml".to_string());

    match GitCorpus::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  gitcorpus <repository-url> -o corpus.txt --config {}", config_path);
            println!("\nEdit the file to customize settings for your needs.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn print_startup_error(error: &GitCorpusError) {
    // Create a basic formatter for startup errors
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}
