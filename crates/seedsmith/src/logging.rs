use anyhow::Context;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

const TRACING_ENV: &str = "SEEDSMITH_LOG";

/// `SEEDSMITH_LOG` directives take precedence over the `-v` level
pub fn setup_logger(verbosity: u8) -> anyhow::Result<()> {
    let default_level = match verbosity {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let env_filter = EnvFilter::builder()
        .with_env_var(TRACING_ENV)
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt().compact().with_env_filter(env_filter).finish();

    tracing::subscriber::set_global_default(subscriber).context("error setting a global tracing::subscriber")
}
