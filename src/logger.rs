//! Installs the global `tracing` subscriber.
//!
//! Every line looks like
//!
//! ```text
//! 2024/04/22 23:59:59  INFO src/main.rs:42: Starting Webby v0.2.0
//! ```
//!
//! ERROR events go to standard error, everything else to standard output.
//! DEBUG events are dropped unless debug logging was requested.

use anyhow::Context;
use tracing::{Level, Subscriber};
use tracing_subscriber::fmt::writer::{MakeWriter, MakeWriterExt};

use crate::time;

pub fn init(debug: bool) -> anyhow::Result<()> {
    tracing::subscriber::set_global_default(subscriber(debug, std::io::stderr, std::io::stdout))
        .context("failed to install logger")
}

/// Builds the subscriber without installing it. ERROR events are written to
/// `errors`, all other enabled events to `others`.
pub fn subscriber<E, O>(debug: bool, errors: E, others: O) -> impl Subscriber + Send + Sync
where
    E: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    O: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let level = if debug { Level::DEBUG } else { Level::INFO };

    tracing_subscriber::fmt()
        .with_timer(time::local_timer())
        .with_max_level(level)
        .with_writer(errors.with_max_level(Level::ERROR).or_else(others))
        .with_target(false)
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .finish()
}
