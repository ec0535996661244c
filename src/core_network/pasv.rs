use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use log::{debug, warn};
use tokio::net::TcpListener;

use crate::config::Config;
use crate::core_ftpcommand::utils::{reject_if_busy, CommandContext};
use crate::core_network::data_channel::{format_pasv_response, DataEndpoint};
use crate::session::SessionState;

/// Handles PASV: binds a one-shot listener and parks it in the session
/// until the next transfer-initiating command consumes it.
pub async fn handle_pasv_command(ctx: CommandContext, _arg: String) -> Result<(), std::io::Error> {
    if reject_if_busy(&ctx).await? {
        return Ok(());
    }
    let local_ip = ctx.session.lock().await.local_ip;
    let (listener, advertised) = match bind_passive(&ctx.config, local_ip).await {
        Ok(bound) => bound,
        Err(err) => {
            warn!("PASV bind failed: {}", err);
            return ctx.responder.send("425 Can't open data connection.").await;
        }
    };
    let response = match format_pasv_response(&advertised) {
        Some(response) => response,
        None => {
            return ctx
                .responder
                .send("522 Network protocol not supported.")
                .await
        }
    };
    park_endpoint(&ctx, listener).await;
    ctx.responder.send(&response).await
}

/// Handles SPAS: striped passive mode. This server presents a single
/// stripe, reported in the 229 block form.
pub async fn handle_spas_command(ctx: CommandContext, _arg: String) -> Result<(), std::io::Error> {
    if reject_if_busy(&ctx).await? {
        return Ok(());
    }
    let local_ip = ctx.session.lock().await.local_ip;
    let (listener, advertised) = match bind_passive(&ctx.config, local_ip).await {
        Ok(bound) => bound,
        Err(err) => {
            warn!("SPAS bind failed: {}", err);
            return ctx.responder.send("425 Can't open data connection.").await;
        }
    };
    let stripe = match advertised {
        SocketAddr::V4(v4) => {
            let ip = v4.ip().octets();
            format!(
                "{},{},{},{},{},{}",
                ip[0],
                ip[1],
                ip[2],
                ip[3],
                v4.port() / 256,
                v4.port() % 256
            )
        }
        SocketAddr::V6(_) => {
            return ctx
                .responder
                .send("522 Network protocol not supported.")
                .await
        }
    };
    park_endpoint(&ctx, listener).await;
    ctx.responder
        .send_block(229, "Entering Striped Passive Mode", &[stripe], "End")
        .await
}

async fn park_endpoint(ctx: &CommandContext, listener: TcpListener) {
    let mut session = ctx.session.lock().await;
    session.endpoint = DataEndpoint::Passive { listener };
    if session.state == SessionState::Idle {
        session.state = SessionState::TransferPending;
    }
}

/// Binds the passive listener and computes the address to advertise. The
/// listener always binds locally; a configured `pasv_address` only
/// substitutes the advertised address, for servers behind NAT. Without an
/// override the control connection's local address is advertised.
async fn bind_passive(
    config: &Config,
    local_ip: IpAddr,
) -> Result<(TcpListener, SocketAddr), std::io::Error> {
    let listener = TcpListener::bind((IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0)).await?;
    let port = listener.local_addr()?.port();
    let advertised_ip: IpAddr = match &config.server.pasv_address {
        Some(addr) => addr
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?,
        None => local_ip,
    };
    let advertised = SocketAddr::new(advertised_ip, port);
    debug!("passive listener on port {}, advertising {}", port, advertised);
    Ok((listener, advertised))
}
