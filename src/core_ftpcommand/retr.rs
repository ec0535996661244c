use crate::core_ftpcommand::utils::{
    reject_empty_arg, start_transfer, CommandContext, TransferRequest,
};

/// Handles RETR. Any pending REST offset applies to this transfer and is
/// consumed by it.
pub async fn handle_retr_command(ctx: CommandContext, arg: String) -> Result<(), std::io::Error> {
    if reject_empty_arg(&ctx, &arg, "RETR").await? {
        return Ok(());
    }
    start_transfer(&ctx, &arg, TransferRequest::Retrieve).await
}
