use crate::core_ftpcommand::utils::{reject_empty_arg, CommandContext};

/// Handles MODE. Only stream mode is carried; extended block mode is
/// explicitly not implemented, the parallel data path works over stream
/// sockets.
pub async fn handle_mode_command(ctx: CommandContext, arg: String) -> Result<(), std::io::Error> {
    if reject_empty_arg(&ctx, &arg, "MODE").await? {
        return Ok(());
    }
    match arg.trim().to_ascii_uppercase().as_str() {
        "S" => ctx.responder.send("200 Mode set to S.").await,
        "E" | "B" | "C" => {
            ctx.responder
                .send(&format!(
                    "504 Mode {} not implemented.",
                    arg.trim().to_ascii_uppercase()
                ))
                .await
        }
        _ => {
            ctx.responder
                .send("501 Syntax error in parameters or arguments.")
                .await
        }
    }
}
