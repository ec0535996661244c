use std::time::Duration;

use log::info;

use crate::core_ftpcommand::utils::CommandContext;
use crate::core_transfer::abort;
use crate::session::SessionState;

/// Handles QUIT: aborts any in-flight transfer, waits for its teardown,
/// then says goodbye and marks the session closed so the command loop
/// exits.
pub async fn handle_quit_command(ctx: CommandContext, _arg: String) -> Result<(), std::io::Error> {
    let grace = Duration::from_secs(ctx.config.server.data_grace_secs);
    let active = {
        let mut session = ctx.session.lock().await;
        session.reconcile();
        session.active.take()
    };
    if let Some(shared) = active {
        info!("QUIT with a transfer in flight; aborting first");
        abort::abort_and_wait(&shared, grace).await;
    }
    ctx.responder.send("221 Goodbye.").await?;
    let mut session = ctx.session.lock().await;
    if let Some(identity) = &session.identity {
        info!("user {} logged out", identity.username);
    }
    session.state = SessionState::Closed;
    Ok(())
}
