use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub mod cli;
pub mod device;
pub mod error;
pub mod pages;
pub mod report;
pub mod scenario;
pub mod suite;
pub mod trace;
pub mod web;

/// Install the global subscriber. `RUST_LOG` wins over `verbose`.
///
/// Logs go to stderr so reports printed to stdout stay clean.
pub fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "mo_e2e=info",
        1 => "mo_e2e=debug",
        _ => "mo_e2e=trace",
    };

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
