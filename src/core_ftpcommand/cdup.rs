use crate::core_ftpcommand::cwd::change_directory;
use crate::core_ftpcommand::utils::CommandContext;

/// Handles CDUP as `CWD ..`.
pub async fn handle_cdup_command(ctx: CommandContext, _arg: String) -> Result<(), std::io::Error> {
    change_directory(&ctx, "..").await
}
