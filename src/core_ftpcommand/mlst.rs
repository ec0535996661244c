use crate::core_ftpcommand::utils::CommandContext;
use crate::core_vfs::entry::DetailLevel;
use crate::core_vfs::router::normalize;

/// Handles MLST: machine-readable facts for a single path, over the
/// control channel. An empty argument means the current directory.
pub async fn handle_mlst_command(ctx: CommandContext, arg: String) -> Result<(), std::io::Error> {
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
        Ok(mut entry) => {
            // MLST facts carry the full virtual path, not the entry name.
            entry.name = vpath.clone();
            let line = entry.format_facts();
            ctx.responder
                .send_block(250, &format!("Listing {}", vpath), &[line], "End.")
                .await
        }
        Err(err) => ctx.responder.send(&err.to_ftp_response()).await,
    }
}
