use crate::config::LogConfig;
use tracing::Subscriber;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Directive used when `RUST_LOG` is not set.
pub fn default_directive(config: &LogConfig, verbose: u8) -> &'static str {
    if config.debug || verbose >= 2 {
        "gitcorpus=debug"
    } else if verbose == 1 {
        "gitcorpus=info"
    } else {
        "gitcorpus=warn"
    }
}

/// Installs the global subscriber, writing to stderr so stdout stays free for
/// results. `RUST_LOG` wins over the configured level. Calling this twice is a
/// no-op.
pub fn init(config: &LogConfig, verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config, verbose)));

    let _ = subscriber(filter, config.json, std::io::stderr).try_init();
}

fn subscriber<W>(filter: EnvFilter, json: bool, writer: W) -> impl Subscriber + Send + Sync
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = if json {
        fmt::layer().json().with_writer(writer).boxed()
    } else {
        fmt::layer().with_target(false).with_writer(writer).boxed()
    };

    tracing_subscriber::registry().with(filter).with(layer)
}
