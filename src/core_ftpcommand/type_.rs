use crate::core_ftpcommand::utils::{reject_empty_arg, CommandContext};
use crate::session::TransferType;

/// Handles TYPE. ASCII is accepted as a session attribute only; the data
/// path always moves raw bytes.
pub async fn handle_type_command(ctx: CommandContext, arg: String) -> Result<(), std::io::Error> {
    if reject_empty_arg(&ctx, &arg, "TYPE").await? {
        return Ok(());
    }
    let code = arg.trim();
    match TransferType::from_code(code) {
        Some(kind) => {
            let mut session = ctx.session.lock().await;
            session.transfer_type = kind;
            drop(session);
            let label = match kind {
                TransferType::Ascii => "A",
                TransferType::Image => "I",
            };
            ctx.responder
                .send(&format!("200 Type set to {}.", label))
                .await
        }
        None if code.eq_ignore_ascii_case("E") || code.eq_ignore_ascii_case("L") => {
            ctx.responder
                .send(&format!("504 Type {} not implemented.", code.to_ascii_uppercase()))
                .await
        }
        None => {
            ctx.responder
                .send("501 Syntax error in parameters or arguments.")
                .await
        }
    }
}
