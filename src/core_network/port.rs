use log::debug;

use crate::core_ftpcommand::utils::{reject_empty_arg, reject_if_busy, CommandContext};
use crate::core_network::data_channel::{parse_port_arg, DataEndpoint};
use crate::session::SessionState;

/// Handles PORT: records the client's data address; the connection is
/// dialed when a transfer starts.
pub async fn handle_port_command(ctx: CommandContext, arg: String) -> Result<(), std::io::Error> {
    if reject_empty_arg(&ctx, &arg, "PORT").await? {
        return Ok(());
    }
    if reject_if_busy(&ctx).await? {
        return Ok(());
    }
    let addr = match parse_port_arg(arg.trim()) {
        Some(addr) => addr,
        None => {
            return ctx
                .responder
                .send("501 Syntax error in parameters or arguments.")
                .await
        }
    };
    debug!("PORT {}", addr);
    {
        let mut session = ctx.session.lock().await;
        session.endpoint = DataEndpoint::Active { addr };
        if session.state == SessionState::Idle {
            session.state = SessionState::TransferPending;
        }
    }
    ctx.responder.send("200 PORT command successful.").await
}

/// Handles SPOR: striped PORT. A single stripe is accepted; its address
/// list uses the same h,h,h,h,p,p element form, space-separated.
pub async fn handle_spor_command(ctx: CommandContext, arg: String) -> Result<(), std::io::Error> {
    if reject_empty_arg(&ctx, &arg, "SPOR").await? {
        return Ok(());
    }
    if reject_if_busy(&ctx).await? {
        return Ok(());
    }
    let first = arg.trim().split_whitespace().next().unwrap_or("");
    let addr = match parse_port_arg(first) {
        Some(addr) => addr,
        None => {
            return ctx
                .responder
                .send("501 Syntax error in parameters or arguments.")
                .await
        }
    };
    debug!("SPOR {} (single stripe)", addr);
    {
        let mut session = ctx.session.lock().await;
        session.endpoint = DataEndpoint::Active { addr };
        if session.state == SessionState::Idle {
            session.state = SessionState::TransferPending;
        }
    }
    ctx.responder.send("200 SPOR command successful.").await
}
