use crate::core_ftpcommand::utils::{start_transfer, CommandContext, TransferRequest};
use crate::core_vfs::entry::DetailLevel;

/// Handles LIST: long-format directory listing over the data channel. An
/// empty argument lists the current directory.
pub async fn handle_list_command(ctx: CommandContext, arg: String) -> Result<(), std::io::Error> {
    start_transfer(&ctx, &arg, TransferRequest::Listing(DetailLevel::Basic)).await
}

/// Handles NLST: bare names only.
pub async fn handle_nlst_command(ctx: CommandContext, arg: String) -> Result<(), std::io::Error> {
    start_transfer(&ctx, &arg, TransferRequest::Listing(DetailLevel::NameOnly)).await
}

/// Handles MLSD: machine-readable facts, one entry per line.
pub async fn handle_mlsd_command(ctx: CommandContext, arg: String) -> Result<(), std::io::Error> {
    start_transfer(&ctx, &arg, TransferRequest::Listing(DetailLevel::Full)).await
}
