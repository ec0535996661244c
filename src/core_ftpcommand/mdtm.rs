use crate::core_ftpcommand::utils::{reject_empty_arg, CommandContext};
use crate::core_vfs::entry::DetailLevel;
use crate::core_vfs::router::normalize;

/// Handles MDTM: modification time as `YYYYMMDDHHMMSS` in UTC.
pub async fn handle_mdtm_command(ctx: CommandContext, arg: String) -> Result<(), std::io::Error> {
    if reject_empty_arg(&ctx, &arg, "MDTM").await? {
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
    let stat = session.mounts.stat(&vpath, DetailLevel::Full).await;
    drop(session);
    match stat {
        Ok(entry) => match entry.mtime {
            Some(mtime) => {
                ctx.responder
                    .send(&format!("213 {}", mtime.format("%Y%m%d%H%M%S")))
                    .await
            }
            None => {
                ctx.responder
                    .send(&format!("550 {}: no modification time available.", vpath))
                    .await
            }
        },
        Err(err) => ctx.responder.send(&err.to_ftp_response()).await,
    }
}
