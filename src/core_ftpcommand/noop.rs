use crate::core_ftpcommand::utils::CommandContext;

/// Handles NOOP. Still counts as activity for the idle clock, like every
/// other command.
pub async fn handle_noop_command(ctx: CommandContext, _arg: String) -> Result<(), std::io::Error> {
    ctx.responder.send("200 NOOP command successful.").await
}
