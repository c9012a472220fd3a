//! History command - list a customer's recent calls

use anyhow::Result;
use dealercall_client::CallController;

use crate::output::{CallRow, OutputContext};

/// List the customer's most recent calls, newest first
pub async fn history(
    controller: &CallController,
    customer_id: &str,
    limit: usize,
    ctx: &OutputContext,
) -> Result<()> {
    let calls = controller.call_history(customer_id, limit).await?;

    let rows: Vec<CallRow> = calls.iter().map(CallRow::from).collect();
    ctx.print(&rows);
    Ok(())
}
