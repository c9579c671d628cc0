use anyhow::{anyhow, Result};

/// Install the stderr log subscriber. `TAPE_LOG` overrides `log_level`.
pub fn init_tracing(log_level: &str) -> Result<()> {
    let filter = std::env::var("TAPE_LOG").unwrap_or_else(|_| log_level.to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| anyhow!("invalid log filter: {err}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
