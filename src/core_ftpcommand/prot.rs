use crate::core_ftpcommand::utils::{reject_empty_arg, reject_if_busy, CommandContext};
use crate::session::{DcauMode, ProtectionLevel};

/// Handles PBSZ. The value is recorded as a session attribute; the core
/// moves raw bytes and leaves wrapping to the security layer.
pub async fn handle_pbsz_command(ctx: CommandContext, arg: String) -> Result<(), std::io::Error> {
    if reject_empty_arg(&ctx, &arg, "PBSZ").await? {
        return Ok(());
    }
    if reject_if_busy(&ctx).await? {
        return Ok(());
    }
    let size: u64 = match arg.trim().parse() {
        Ok(size) => size,
        Err(_) => {
            return ctx
                .responder
                .send("501 Syntax error in parameters or arguments.")
                .await
        }
    };
    {
        let mut session = ctx.session.lock().await;
        session.pbsz = size;
    }
    ctx.responder.send(&format!("200 PBSZ={}", size)).await
}

/// Handles PROT: C, S or P, stored as an opaque session attribute.
pub async fn handle_prot_command(ctx: CommandContext, arg: String) -> Result<(), std::io::Error> {
    if reject_empty_arg(&ctx, &arg, "PROT").await? {
        return Ok(());
    }
    if reject_if_busy(&ctx).await? {
        return Ok(());
    }
    match ProtectionLevel::from_code(arg.trim()) {
        Some(level) => {
            let mut session = ctx.session.lock().await;
            session.protection = level;
            drop(session);
            ctx.responder
                .send(&format!(
                    "200 Protection level set to {}.",
                    arg.trim().to_ascii_uppercase()
                ))
                .await
        }
        None => {
            ctx.responder
                .send("536 Requested protection level not supported.")
                .await
        }
    }
}

/// Handles DCAU: data-channel authentication mode (N, A, or `S subject`).
pub async fn handle_dcau_command(ctx: CommandContext, arg: String) -> Result<(), std::io::Error> {
    if reject_empty_arg(&ctx, &arg, "DCAU").await? {
        return Ok(());
    }
    if reject_if_busy(&ctx).await? {
        return Ok(());
    }
    match DcauMode::from_code(arg.trim()) {
        Some(mode) => {
            let mut session = ctx.session.lock().await;
            session.dcau = mode;
            drop(session);
            ctx.responder.send("200 DCAU command successful.").await
        }
        None => {
            ctx.responder
                .send("501 Syntax error in parameters or arguments.")
                .await
        }
    }
}
