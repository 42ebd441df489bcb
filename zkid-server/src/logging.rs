//! `tracing` initialization: a verbosity-count / `--quiet` convention
//! mapped onto an `EnvFilter`, with `RUST_LOG` still taking priority when
//! set.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::cli::Cli;

pub fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "info,zkid_core=debug,zkid_server=debug",
            2 => "debug",
            _ => "trace",
        }
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = fmt::layer().with_target(cli.verbose >= 2);
    tracing_subscriber::registry().with(env_filter).with(stdout_layer).init();
}
