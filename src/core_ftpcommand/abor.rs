use std::time::Duration;

use log::info;

use crate::core_ftpcommand::utils::CommandContext;
use crate::core_transfer::abort;

/// Handles ABOR. Idle sessions answer immediately; an in-flight transfer
/// is force-aborted and ABOR waits (bounded) for its 426 teardown before
/// confirming. Racing ABORs converge on the single teardown.
pub async fn handle_abor_command(ctx: CommandContext, _arg: String) -> Result<(), std::io::Error> {
    let grace = Duration::from_secs(ctx.config.server.data_grace_secs);
    let active = {
        let mut session = ctx.session.lock().await;
        session.reconcile();
        session.active.clone()
    };
    let shared = match active {
        Some(shared) if shared.ctl.is_in_progress() => shared,
        _ => return ctx.responder.send("226 Abort successful.").await,
    };
    info!("ABOR with a transfer in flight");
    if abort::abort_and_wait(&shared, grace).await {
        ctx.responder.send("226 Abort finished.").await
    } else {
        ctx.responder
            .send("426 Abort requested; transfer still draining.")
            .await
    }
}
