//! Get command - show the current state of one call

use anyhow::Result;
use dealercall_client::CallController;

use crate::output::{colored_state, CallRow, OutputContext, OutputFormat};

/// Fetch a call and print it, with the transcript when asked for
pub async fn get(
    controller: &CallController,
    call_id: &str,
    transcript: bool,
    ctx: &OutputContext,
) -> Result<()> {
    let record = controller.refresh_status(call_id).await?;

    if ctx.format != OutputFormat::Table {
        ctx.print_one(&CallRow::from(&record));
        return Ok(());
    }

    let row = CallRow::from(&record);
    let mut pairs = vec![
        ("ID", row.id),
        ("Status", colored_state(record.state())),
        ("Phone", row.phone),
        ("Duration", row.duration),
        ("Cost", row.cost),
        ("Started", row.started),
        ("Ended reason", row.ended_reason),
    ];
    if let Some(message) = &record.error_message {
        pairs.push(("Message", message.clone()));
    }
    if let Some(url) = &record.recording_url {
        pairs.push(("Recording", url.clone()));
    }
    ctx.print_kv(&pairs);

    if transcript {
        match record.transcript.as_deref().filter(|t| !t.trim().is_empty()) {
            Some(text) => println!("\n{}", text),
            None => ctx.info("\nNo transcript yet"),
        }
    }
    Ok(())
}
