use crate::error::{GitCorpusError, UserFriendlyError};
use crate::orchestrator::{ExtractionOutcome, ExtractionResult};
use crate::ui::progress::ProgressSink;
use console::{style, Emoji, Term};
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

// Emojis with text fallbacks
static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");
static ROCKET: Emoji = Emoji("🚀 ", "> ");

/// Where formatted lines end up. Failed writes, such as a closed pipe, are
/// dropped and never reach the caller.
#[derive(Clone, Default)]
enum Target {
    #[default]
    Stdio,
    Writer(Arc<Mutex<Box<dyn Write + Send>>>),
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Stdio => f.write_str("Stdio"),
            Target::Writer(_) => f.write_str("Writer"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputFormatter {
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
    target: Target,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let use_colors = match mode {
            OutputMode::Human => Term::stdout().features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
            target: Target::Stdio,
        }
    }

    /// Send every line, errors included, to `writer` instead of stdout and stderr.
    pub fn with_writer<W: Write + Send + 'static>(mut self, writer: W) -> Self {
        self.use_colors = false;
        self.target = Target::Writer(Arc::new(Mutex::new(Box::new(writer))));
        self
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    // Core messaging methods
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Success, message),
            OutputMode::Json => self.print_json_message("success", message),
            OutputMode::Plain => self.out(&format!("SUCCESS: {}", message)),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => self.err(&format!("ERROR: {}", message)),
        }
    }

    pub fn warning(&self, message: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Warning, message),
                OutputMode::Json => self.print_json_message("warning", message),
                OutputMode::Plain => self.out(&format!("WARNING: {}", message)),
            }
        }
    }

    pub fn start_operation(&self, operation: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        self.out(&format!("{}{}", ROCKET, style(operation).bold()));
                    } else {
                        self.out(&format!("> {}", operation));
                    }
                }
                OutputMode::Json => self.print_json_message("operation_start", operation),
                OutputMode::Plain => self.out(&format!("STARTING: {}", operation)),
            }
        }
    }

    /// A status line from the extraction core.
    pub fn progress(&self, message: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        self.out(&format!("  {}", style(message).dim()));
                    } else {
                        self.out(&format!("  {}", message));
                    }
                }
                OutputMode::Json => self.print_json_message("progress", message),
                OutputMode::Plain => self.out(&format!("PROGRESS: {}", message)),
            }
        }
    }

    // User-friendly error handling
    pub fn print_user_friendly_error(&self, error: &GitCorpusError) {
        let user_message = error.user_message();
        self.error(&user_message);

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    self.out("");
                    if self.use_colors {
                        self.out(&format!(
                            "{}{}",
                            INFO,
                            style(&format!("Suggestion: {}", suggestion)).cyan()
                        ));
                    } else {
                        self.out(&format!("Suggestion: {}", suggestion));
                    }
                }
                OutputMode::Json => {
                    self.print_json_object(&serde_json::json!({
                        "type": "suggestion",
                        "message": suggestion
                    }));
                }
                OutputMode::Plain => {
                    self.out(&format!("SUGGESTION: {}", suggestion));
                }
            }
        }
    }

    /// Final outcome of a run. The corpus text itself is never printed here.
    pub fn print_result_summary(&self, result: &ExtractionResult) {
        match self.mode {
            OutputMode::Human => {
                if self.quiet {
                    return;
                }
                self.print_human_summary(result);
            }
            OutputMode::Json => {
                let summary = serde_json::json!({
                    "type": "summary",
                    "success": result.success,
                    "outcome": result.outcome,
                    "message": result.message,
                    "bytes": result.text.len(),
                    "warnings": result.warnings,
                    "timestamp": chrono::Utc::now().to_rfc3339()
                });
                self.out(
                    &serde_json::to_string_pretty(&summary).unwrap_or_else(|_| "{}".to_string()),
                );
            }
            OutputMode::Plain => {
                if self.quiet {
                    return;
                }
                self.out(&format!("RESULT: {:?}", result.outcome));
                self.out(&format!("Message: {}", result.message));
                self.out(&format!("Size: {} bytes", result.text.len()));
                if !result.warnings.is_empty() {
                    self.out(&format!("Warnings: {}", result.warnings.len()));
                }
            }
        }
    }

    pub fn print_separator(&self) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                if self.use_colors {
                    self.out(&style("─".repeat(60)).dim().to_string());
                } else {
                    self.out(&"-".repeat(60));
                }
            }
            OutputMode::Plain => self.out(&"-".repeat(60)),
            OutputMode::Json => {} // No separator in JSON mode
        }
    }

    // Private helper methods
    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn out(&self, line: &str) {
        self.write_line(line, false);
    }

    fn err(&self, line: &str) {
        self.write_line(line, true);
    }

    fn write_line(&self, line: &str, to_stderr: bool) {
        let written = match &self.target {
            Target::Stdio if to_stderr => writeln!(io::stderr().lock(), "{}", line),
            Target::Stdio => writeln!(io::stdout().lock(), "{}", line),
            Target::Writer(writer) => match writer.lock() {
                Ok(mut writer) => writeln!(writer, "{}", line),
                Err(_) => Ok(()),
            },
        };

        if let Err(e) = written {
            debug!(error = %e, "terminal output dropped");
        }
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        #[allow(clippy::type_complexity)]
        let (emoji, color_fn): (Emoji, Box<dyn Fn(&str) -> console::StyledObject<&str>>) =
            match msg_type {
                MessageType::Success => (CHECKMARK, Box::new(|msg| style(msg).green().bold())),
                MessageType::Error => (CROSS, Box::new(|msg| style(msg).red().bold())),
                MessageType::Warning => (WARNING, Box::new(|msg| style(msg).yellow().bold())),
            };

        let line = if self.use_colors {
            format!("{}{}", emoji, color_fn(message))
        } else {
            let prefix = match msg_type {
                MessageType::Success => "✓",
                MessageType::Error => "✗",
                MessageType::Warning => "!",
            };
            format!("{} {}", prefix, message)
        };

        match msg_type {
            MessageType::Error => self.err(&line),
            _ => self.out(&line),
        }
    }

    fn print_json_message(&self, level: &str, message: &str) {
        self.print_json_object(&serde_json::json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn print_json_object(&self, obj: &serde_json::Value) {
        self.out(&serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string()));
    }

    fn print_human_summary(&self, result: &ExtractionResult) {
        self.out("");
        self.print_separator();

        match result.outcome {
            ExtractionOutcome::Completed => {
                if self.use_colors {
                    self.out(&format!(
                        "{} {}",
                        style("Extraction completed!").green().bold(),
                        CHECKMARK
                    ));
                } else {
                    self.out("✓ Extraction completed!");
                }
            }
            ExtractionOutcome::Cancelled => {
                self.print_human_message(MessageType::Warning, "Extraction cancelled")
            }
            _ => self.print_human_message(MessageType::Warning, &result.message),
        }

        self.out("");
        self.out(&format!(
            "  Output size:     {}",
            self.highlight(format_bytes(result.text.len() as u64))
        ));
        if !result.warnings.is_empty() {
            self.out(&format!(
                "  Warnings:        {}",
                self.highlight(result.warnings.len().to_string())
            ));
            if self.verbose_level >= 1 {
                for warning in &result.warnings {
                    self.out(&format!("    - {}", warning));
                }
            }
        }

        self.print_separator();
    }

    fn highlight(&self, value: String) -> String {
        if self.use_colors {
            style(value).cyan().bold().to_string()
        } else {
            value
        }
    }
}

impl ProgressSink for OutputFormatter {
    fn emit(&self, message: &str) {
        self.progress(message);
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Warning,
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
