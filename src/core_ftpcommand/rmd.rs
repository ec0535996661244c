use log::info;

use crate::core_ftpcommand::utils::{reject_empty_arg, CommandContext};
use crate::core_vfs::router::normalize;

/// Handles RMD/XRMD. Non-empty directories are refused by the backend.
pub async fn handle_rmd_command(ctx: CommandContext, arg: String) -> Result<(), std::io::Error> {
    if reject_empty_arg(&ctx, &arg, "RMD").await? {
        return Ok(());
    }
    let session = ctx.session.lock().await;
    let vpath = match normalize(&session.cwd, &arg) {
        Ok(vpath) => vpath,
        Err(err) => {
            drop(session);
            return ctx.responder.send(&err.to_ftp_response()).await;
        }
    };
    let resolved = session.mounts.resolve(&vpath);
    drop(session);
    let (backend, rel) = match resolved {
        Ok(found) => found,
        Err(err) => return ctx.responder.send(&err.to_ftp_response()).await,
    };
    match backend.removedir(&rel).await {
        Ok(()) => {
            info!("RMD {}", vpath);
            ctx.responder.send("250 RMD command successful.").await
        }
        Err(err) => ctx.responder.send(&err.to_ftp_response(false)).await,
    }
}
