use log::{info, warn};

use crate::core_ftpcommand::utils::{reject_empty_arg, CommandContext};
use crate::session::Identity;

/// Mapped account for sessions authenticated by security context rather
/// than USER/PASS; the credential-to-account mapping happens outside the
/// core.
const MAPPED_USER: &str = ":globus-mapping:";

/// Handles AUTH: establishes the one-shot secure context and marks the
/// session authenticated under the mapped identity. The actual GSSAPI
/// exchange happens outside the core. A second AUTH on an already-secure
/// session is refused.
pub async fn handle_auth_command(ctx: CommandContext, arg: String) -> Result<(), std::io::Error> {
    if reject_empty_arg(&ctx, &arg, "AUTH").await? {
        return Ok(());
    }
    let mut session = ctx.session.lock().await;
    if session.secure {
        drop(session);
        warn!("AUTH on an already-secure session");
        return ctx
            .responder
            .send("534 Re-authentication not supported.")
            .await;
    }
    session.secure = true;
    session.authenticate(Identity {
        username: MAPPED_USER.to_string(),
    });
    drop(session);
    info!("AUTH {} accepted, session mapped to {}", arg.trim(), MAPPED_USER);
    ctx.responder
        .send("234 Security context established.")
        .await
}
