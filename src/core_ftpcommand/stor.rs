use crate::core_ftpcommand::utils::{
    reject_empty_arg, start_transfer, CommandContext, TransferRequest,
};

/// Handles STOR. The backend stages written data and only publishes it on
/// committed close, so an aborted store leaves nothing behind.
pub async fn handle_stor_command(ctx: CommandContext, arg: String) -> Result<(), std::io::Error> {
    if reject_empty_arg(&ctx, &arg, "STOR").await? {
        return Ok(());
    }
    start_transfer(&ctx, &arg, TransferRequest::Store).await
}
