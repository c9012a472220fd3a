//! Cancel command - stop a call

use anyhow::Result;
use dealercall_client::CallController;

use crate::output::OutputContext;

/// Ask the provider to stop a call
pub async fn cancel(controller: &CallController, call_id: &str, ctx: &OutputContext) -> Result<()> {
    if controller.cancel(call_id).await? {
        ctx.success(&format!("Call {} cancelled", call_id));
    } else {
        ctx.warn(&format!("Cancellation of call {} was not confirmed", call_id));
    }
    Ok(())
}
