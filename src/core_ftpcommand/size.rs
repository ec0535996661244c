use crate::core_ftpcommand::utils::{reject_empty_arg, CommandContext};
use crate::core_vfs::entry::DetailLevel;
use crate::core_vfs::router::normalize;

/// Handles SIZE. Directories have no transfer size and are refused.
pub async fn handle_size_command(ctx: CommandContext, arg: String) -> Result<(), std::io::Error> {
    if reject_empty_arg(&ctx, &arg, "SIZE").await? {
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
    let stat = session.mounts.stat(&vpath, DetailLevel::Basic).await;
    drop(session);
    match stat {
        Ok(entry) if entry.is_dir => {
            ctx.responder
                .send(&format!("550 {}: not a plain file.", vpath))
                .await
        }
        Ok(entry) => ctx.responder.send(&format!("213 {}", entry.size)).await,
        Err(err) => ctx.responder.send(&err.to_ftp_response()).await,
    }
}
