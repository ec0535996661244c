use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::core_network::data_channel::{self, DataEndpoint};
use crate::core_network::responder::Responder;
use crate::core_transfer::plan;
use crate::core_transfer::state::{TransferOp, TransferShared};
use crate::core_transfer::{engine, listing};
use crate::core_vfs::backend::OpenMode;
use crate::core_vfs::entry::DetailLevel;
use crate::core_vfs::router::normalize;
use crate::session::{Session, SessionState, TransferType};

/// Everything a command handler needs; cheap to clone into the dispatch
/// closure.
#[derive(Clone)]
pub struct CommandContext {
    pub responder: Arc<Responder>,
    pub config: Arc<Config>,
    pub session: Arc<Mutex<Session>>,
}

/// Sends `501` and reports true when a required argument is missing.
pub async fn reject_empty_arg(ctx: &CommandContext, arg: &str, verb: &str) -> Result<bool, std::io::Error> {
    if arg.trim().is_empty() {
        warn!("{} command received with no argument", verb);
        ctx.responder
            .send("501 Syntax error in parameters or arguments.")
            .await?;
        return Ok(true);
    }
    Ok(false)
}

/// Sends `421` and reports true when a transfer is in progress. Option
/// negotiation and endpoint setup are rejected mid-transfer.
pub async fn reject_if_busy(ctx: &CommandContext) -> Result<bool, std::io::Error> {
    let busy = {
        let mut session = ctx.session.lock().await;
        session.reconcile();
        session.ctl.is_in_progress()
    };
    if busy {
        ctx.responder
            .send("421 Transfer already in progress.")
            .await?;
    }
    Ok(busy)
}

/// What a transfer-initiating command asked for.
pub enum TransferRequest {
    Retrieve,
    /// ERET partial retrieve: explicit (offset, length).
    RetrieveRange(u64, u64),
    Store,
    Listing(DetailLevel),
}

/// Common initiation path for RETR/STOR/ERET/LIST/NLST/MLSD: validate
/// session state, resolve the path, open the backend handle, connect the
/// data channel, emit the provisional 150, and hand off to the engine.
/// The terminal response always comes from the engine's teardown.
pub async fn start_transfer(
    ctx: &CommandContext,
    arg: &str,
    request: TransferRequest,
) -> Result<(), std::io::Error> {
    let grace = Duration::from_secs(ctx.config.server.data_grace_secs);

    let mut session = ctx.session.lock().await;
    session.reconcile();
    if session.ctl.is_in_progress() {
        drop(session);
        return ctx
            .responder
            .send("421 Transfer already in progress.")
            .await;
    }
    if session.ctl.is_closing() {
        // Previous data channel still tearing down; bounded wait.
        let ctl = Arc::clone(&session.ctl);
        drop(session);
        if !ctl.wait_done(grace).await {
            return ctx
                .responder
                .send("425 Data connection still closing; try again later.")
                .await;
        }
        session = ctx.session.lock().await;
        session.reconcile();
    }

    let vpath = match normalize(&session.cwd, arg) {
        Ok(vpath) => vpath,
        Err(err) => {
            drop(session);
            return ctx.responder.send(&err.to_ftp_response()).await;
        }
    };

    // Resolve and open before touching the data channel so resolution
    // failures leave the session fully idle.
    let (op, io, start_offset, range_length, entries, level) = match request {
        TransferRequest::Listing(level) => {
            let entries = match session.mounts.readdir(&vpath, level).await {
                Ok(entries) => entries,
                Err(err) => {
                    drop(session);
                    return ctx.responder.send(&err.to_ftp_response()).await;
                }
            };
            (TransferOp::Listing, None, 0, None, entries, level)
        }
        TransferRequest::Retrieve | TransferRequest::RetrieveRange(..) => {
            let (backend, rel) = match session.mounts.resolve(&vpath) {
                Ok(found) => found,
                Err(err) => {
                    drop(session);
                    return ctx.responder.send(&err.to_ftp_response()).await;
                }
            };
            let handle = match backend.open(&rel, OpenMode::Retrieve, None).await {
                Ok(handle) => handle,
                Err(err) => {
                    drop(session);
                    return ctx.responder.send(&err.to_ftp_response(false)).await;
                }
            };
            let (start, length) = match request {
                TransferRequest::RetrieveRange(offset, length) => (offset, Some(length)),
                _ => (session.restart_offset, None),
            };
            (
                TransferOp::Retrieve,
                Some((backend, handle)),
                start,
                length,
                Vec::new(),
                DetailLevel::Basic,
            )
        }
        TransferRequest::Store => {
            let (backend, rel) = match session.mounts.resolve(&vpath) {
                Ok(found) => found,
                Err(err) => {
                    drop(session);
                    return ctx.responder.send(&err.to_ftp_response()).await;
                }
            };
            let handle = match backend.open(&rel, OpenMode::Store, None).await {
                Ok(handle) => handle,
                Err(err) => {
                    drop(session);
                    return ctx.responder.send(&err.to_ftp_response(false)).await;
                }
            };
            (
                TransferOp::Store,
                Some((backend, handle)),
                session.restart_offset,
                None,
                Vec::new(),
                DetailLevel::Basic,
            )
        }
    };

    // The REST offset applies to this transfer only.
    session.restart_offset = 0;

    let endpoint = std::mem::replace(&mut session.endpoint, DataEndpoint::None);
    let ctl = Arc::clone(&session.ctl);
    let clock = Arc::clone(&session.clock);
    let parallelism = session.parallelism;
    let transfer_type = session.transfer_type;
    debug!(
        "transfer attributes: dcau {:?}, prot {:?}, pbsz {}, sbuf {:?}",
        session.dcau, session.protection, session.pbsz, session.tcp_buffer
    );
    drop(session);

    if endpoint.is_none() {
        if let Some((backend, handle)) = &io {
            let _ = backend.close(*handle, false).await;
        }
        return ctx.responder.send("425 Use PORT or PASV first.").await;
    }

    let data = match data_channel::establish(endpoint, grace).await {
        Ok(data) => data,
        Err(err) => {
            if let Some((backend, handle)) = &io {
                let _ = backend.close(*handle, false).await;
            }
            warn!("data channel establish failed: {}", err);
            return ctx
                .responder
                .send("425 Can't open data connection.")
                .await;
        }
    };

    if !ctl.begin_transfer() {
        // Lost a race that cannot happen on a well-behaved control
        // channel; refuse rather than queue.
        if let Some((backend, handle)) = &io {
            let _ = backend.close(*handle, false).await;
        }
        return ctx
            .responder
            .send("421 Transfer already in progress.")
            .await;
    }

    let buffer_plan = plan::compute(
        parallelism,
        ctx.config.server.default_buffer_size,
        ctx.config.server.max_aggregate_buffer,
    );
    let shared = TransferShared::new(
        op,
        buffer_plan,
        start_offset,
        range_length,
        ctl,
        io,
        data,
        Arc::clone(&ctx.responder),
        clock,
    );

    {
        let mut session = ctx.session.lock().await;
        session.active = Some(Arc::clone(&shared));
        session.state = SessionState::Transferring;
    }

    info!("150 for {:?} {}", op, vpath);
    let mode_label = match transfer_type {
        TransferType::Ascii => "ASCII",
        TransferType::Image => "BINARY",
    };
    ctx.responder
        .send(&format!("150 Opening {} mode data connection.", mode_label))
        .await?;

    match op {
        TransferOp::Listing => listing::spawn(shared, entries, level),
        _ => engine::spawn(shared),
    }
    Ok(())
}
