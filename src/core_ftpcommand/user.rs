use log::info;

use crate::core_ftpcommand::utils::{reject_empty_arg, CommandContext};

/// Handles the USER command: records the claimed name and asks for the
/// password. Identity is only established once PASS completes.
pub async fn handle_user_command(ctx: CommandContext, arg: String) -> Result<(), std::io::Error> {
    if reject_empty_arg(&ctx, &arg, "USER").await? {
        return Ok(());
    }
    let username = arg.trim().to_string();
    info!("USER {}", username);
    {
        let mut session = ctx.session.lock().await;
        session.pending_user = Some(username.clone());
    }
    ctx.responder
        .send(&format!("331 Password required for {}.", username))
        .await
}
