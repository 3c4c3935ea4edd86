use std::time::Duration;

use anyhow::anyhow;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use rowsink::decode::{Decoder, JsonDecoder};
use rowsink::pipeline::SinkPipeline;
use rowsink::store::hosts::HostSelector;
use rowsink::store::postgres::PgStoreClient;

use crate::config::DaemonConfig;

/// Fixed drain timeout applied during graceful termination.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs the sink daemon until stdin is exhausted or a termination signal
/// arrives.
///
/// Raw records are read one per line from stdin, decoded, and emitted into
/// the pipeline. On termination the pipeline flushes its partial batch and
/// drains in-flight writer work, bounded by [`SHUTDOWN_TIMEOUT`].
pub async fn start_daemon_with_config(config: DaemonConfig) -> anyhow::Result<()> {
    let sink_config = config.sink;
    sink_config.validate()?;

    let mut selector = HostSelector::from_config(&sink_config.host_selection);
    let host = selector
        .pick(&sink_config.hosts)
        .ok_or_else(|| anyhow!("no store host configured"))?;

    info!(%host, table = %sink_config.table, "starting sink daemon");

    let store = PgStoreClient::new(host);
    let pipeline = SinkPipeline::start(sink_config, &store).await?;

    let decoder = JsonDecoder::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        let event = decoder.decode(line.as_bytes());
                        if let Err(err) = pipeline.emit(event).await {
                            warn!("failed to emit event: {err}");
                        }
                    }
                    Ok(None) => {
                        info!("input exhausted");
                        break;
                    }
                    Err(err) => {
                        warn!("failed to read input line: {err}");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("termination signal received");
                break;
            }
        }
    }

    pipeline.shutdown(SHUTDOWN_TIMEOUT).await?;

    Ok(())
}
