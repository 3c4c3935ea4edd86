use rowsink_telemetry::init_tracing;
use tracing::error;

use crate::config::{DaemonConfig, load_daemon_config};
use crate::core::start_daemon_with_config;

mod config;
mod core;

fn main() -> anyhow::Result<()> {
    let daemon_config = load_daemon_config()?;

    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME"))?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(daemon_config))?;

    Ok(())
}

async fn async_main(daemon_config: DaemonConfig) -> anyhow::Result<()> {
    if let Err(err) = start_daemon_with_config(daemon_config).await {
        error!("an error occurred in the sink daemon: {err}");

        return Err(err);
    }

    Ok(())
}
