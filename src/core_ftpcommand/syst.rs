use crate::core_ftpcommand::utils::CommandContext;

/// Handles SYST.
pub async fn handle_syst_command(ctx: CommandContext, _arg: String) -> Result<(), std::io::Error> {
    ctx.responder.send("215 UNIX Type: L8").await
}
