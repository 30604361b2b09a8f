pub mod output;
pub mod progress;
pub mod signals;

pub use output::{OutputFormatter, OutputMode};
pub use progress::{MemorySink, ProgressManager, ProgressReporter, ProgressSink, SpinnerSink};
pub use signals::GracefulShutdown;
