use log::info;

use crate::core_ftpcommand::utils::{reject_empty_arg, CommandContext};
use crate::core_vfs::router::normalize;

/// Handles CWD/XCWD: resolves the target against the mount table and
/// adopts the canonical path the backend reports. A backend may redirect
/// during checkdir; the session follows the redirect.
pub async fn handle_cwd_command(ctx: CommandContext, arg: String) -> Result<(), std::io::Error> {
    if reject_empty_arg(&ctx, &arg, "CWD").await? {
        return Ok(());
    }
    change_directory(&ctx, &arg).await
}

pub(crate) async fn change_directory(
    ctx: &CommandContext,
    arg: &str,
) -> Result<(), std::io::Error> {
    let mut session = ctx.session.lock().await;
    let vpath = match normalize(&session.cwd, arg) {
        Ok(vpath) => vpath,
        Err(err) => {
            drop(session);
            return ctx.responder.send(&err.to_ftp_response()).await;
        }
    };
    match session.mounts.checkdir(&vpath).await {
        Ok(canonical) => {
            info!("CWD {} -> {}", vpath, canonical);
            session.cwd = canonical.clone();
            drop(session);
            ctx.responder
                .send(&format!("250 CWD command successful. \"{}\" is current directory.", canonical))
                .await
        }
        Err(err) => {
            drop(session);
            ctx.responder.send(&err.to_ftp_response()).await
        }
    }
}
