//! Watch command - follow a call until it ends

use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use dealercall_client::CallController;
use dealercall_core::CallStatus;

use crate::output::{colored_state, CallRow, OutputContext, OutputFormat};

/// Poll a call, printing each status change, until it ends
pub async fn watch(
    controller: &CallController,
    call_id: &str,
    interval: Duration,
    timeout: Duration,
    ctx: &OutputContext,
) -> Result<()> {
    ctx.info(&format!("Watching call {} (Ctrl+C to stop)", call_id));

    let start = Instant::now();
    let mut last: Option<CallStatus> = None;

    loop {
        let record = controller.refresh_status(call_id).await?;

        if last != Some(record.status) {
            if ctx.format == OutputFormat::Table {
                ctx.info(&format!(
                    "[{:>4}s] {}",
                    start.elapsed().as_secs(),
                    colored_state(record.state())
                ));
            }
            last = Some(record.status);
        }

        if record.is_terminal() {
            ctx.print_one(&CallRow::from(&record));
            return Ok(());
        }

        if start.elapsed() >= timeout {
            bail!("Call {} still {} after {:?}", call_id, record.status, timeout);
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                ctx.info("\nStopped watching; the call continues");
                return Ok(());
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
