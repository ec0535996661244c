use log::info;

use crate::core_ftpcommand::utils::{
    reject_empty_arg, reject_if_busy, start_transfer, CommandContext, TransferRequest,
};

/// Handles REST: records a stream-mode restart offset consumed by the
/// next RETR or STOR.
pub async fn handle_rest_command(ctx: CommandContext, arg: String) -> Result<(), std::io::Error> {
    if reject_empty_arg(&ctx, &arg, "REST").await? {
        return Ok(());
    }
    if reject_if_busy(&ctx).await? {
        return Ok(());
    }
    let offset: u64 = match arg.trim().parse() {
        Ok(offset) => offset,
        Err(_) => {
            return ctx
                .responder
                .send("501 Syntax error in parameters or arguments.")
                .await
        }
    };
    {
        let mut session = ctx.session.lock().await;
        session.restart_offset = offset;
    }
    info!("REST {}", offset);
    ctx.responder
        .send(&format!("350 Restarting at {}. Send STOR or RETR.", offset))
        .await
}

/// Handles ERET `P <offset> <length> <path>`: a partial retrieve with an
/// explicit range, no prior REST needed.
pub async fn handle_eret_command(ctx: CommandContext, arg: String) -> Result<(), std::io::Error> {
    if reject_empty_arg(&ctx, &arg, "ERET").await? {
        return Ok(());
    }
    let (offset, length, path) = match parse_eret_arg(&arg) {
        Some(parsed) => parsed,
        None => {
            return ctx
                .responder
                .send("501 Syntax error in parameters or arguments.")
                .await
        }
    };
    info!("ERET {} +{} {}", offset, length, path);
    start_transfer(
        &ctx,
        &path,
        TransferRequest::RetrieveRange(offset, length),
    )
    .await
}

fn parse_eret_arg(arg: &str) -> Option<(u64, u64, String)> {
    let mut parts = arg.trim().splitn(4, char::is_whitespace);
    let scheme = parts.next()?;
    if !scheme.eq_ignore_ascii_case("P") {
        return None;
    }
    let offset: u64 = parts.next()?.parse().ok()?;
    let length: u64 = parts.next()?.parse().ok()?;
    let path = parts.next()?.trim().to_string();
    if path.is_empty() {
        return None;
    }
    Some((offset, length, path))
}
