use log::info;

use crate::core_ftpcommand::utils::CommandContext;
use crate::session::Identity;

/// Handles the PASS command. Credential verification is the embedder's
/// concern; the core accepts any password for a pending USER and
/// transitions the session to authenticated.
pub async fn handle_pass_command(ctx: CommandContext, _arg: String) -> Result<(), std::io::Error> {
    let mut session = ctx.session.lock().await;
    let username = match session.pending_user.take() {
        Some(username) => username,
        None => {
            drop(session);
            return ctx.responder.send("503 Login with USER first.").await;
        }
    };
    session.authenticate(Identity {
        username: username.clone(),
    });
    drop(session);
    info!("user {} logged in", username);
    ctx.responder
        .send(&format!("230 User {} logged in.", username))
        .await
}
