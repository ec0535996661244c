use crate::core_ftpcommand::utils::CommandContext;

/// Handles PWD/XPWD.
pub async fn handle_pwd_command(ctx: CommandContext, _arg: String) -> Result<(), std::io::Error> {
    let cwd = {
        let session = ctx.session.lock().await;
        session.cwd.clone()
    };
    ctx.responder
        .send(&format!("257 \"{}\" is the current directory.", cwd))
        .await
}
