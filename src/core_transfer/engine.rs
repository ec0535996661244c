//! Slot-task transfer engine. Up to `plan.slots` operations are in flight
//! per transfer; each slot owns a private, monotonically non-overlapping
//! offset range claimed under the transfer lock, and whichever task
//! decrements the outstanding counter to zero performs teardown.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::core_transfer::abort;
use crate::core_transfer::state::{
    BufferSlot, TransferFailure, TransferOp, TransferShared,
};

/// How often a blocked socket operation rechecks the abort flag.
const ABORT_POLL: Duration = Duration::from_millis(250);

pub(crate) enum SlotIo {
    Done(usize),
    Aborted,
    Failed(std::io::Error),
}

/// Socket write that periodically rechecks the abort flag. A timed-out
/// single `write` has consumed nothing, so retrying is safe.
pub(crate) async fn write_abortable<W: AsyncWrite + Unpin>(
    shared: &TransferShared,
    writer: &mut W,
    buf: &[u8],
) -> SlotIo {
    let mut written = 0;
    while written < buf.len() {
        match timeout(ABORT_POLL, writer.write(&buf[written..])).await {
            Ok(Ok(0)) => {
                return SlotIo::Failed(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "data channel closed",
                ))
            }
            Ok(Ok(n)) => written += n,
            Ok(Err(err)) => return SlotIo::Failed(err),
            Err(_) if shared.ctl.is_aborting() => return SlotIo::Aborted,
            Err(_) => {}
        }
    }
    SlotIo::Done(written)
}

/// Socket read with the same abort polling.
async fn read_abortable<R: AsyncRead + Unpin>(
    shared: &TransferShared,
    reader: &mut R,
    buf: &mut [u8],
) -> SlotIo {
    loop {
        match timeout(ABORT_POLL, reader.read(buf)).await {
            Ok(Ok(n)) => return SlotIo::Done(n),
            Ok(Err(err)) => return SlotIo::Failed(err),
            Err(_) if shared.ctl.is_aborting() => return SlotIo::Aborted,
            Err(_) => {}
        }
    }
}

/// Launches the slot tasks for a retrieve or store transfer. The 150
/// provisional response has already gone out; the terminal response is
/// emitted by teardown.
pub fn spawn(shared: Arc<TransferShared>) {
    let slots = shared.plan.slots;
    shared.outstanding.store(slots, Ordering::SeqCst);
    info!(
        "transfer starting: {:?}, {} slots x {} bytes",
        shared.op, slots, shared.plan.slot_size
    );
    for _ in 0..slots {
        let shared = Arc::clone(&shared);
        tokio::spawn(async move {
            let mut slot = BufferSlot::new(shared.plan.slot_size);
            match shared.op {
                TransferOp::Retrieve => run_retrieve_slot(&shared, &mut slot).await,
                TransferOp::Store => run_store_slot(&shared, &mut slot).await,
                // Listings go through core_transfer::listing.
                TransferOp::Listing => {}
            }
            finish_slot(&shared).await;
        });
    }
}

/// Claims the next offset range for a retrieve slot, or None at
/// end-of-data/abort. Transfer lock first, abort flag second.
async fn claim_read(shared: &TransferShared) -> Option<(u64, usize)> {
    let mut state = shared.state.lock().await;
    if state.eof || state.failed.is_some() || shared.ctl.is_aborting() {
        return None;
    }
    let want = match state.remaining {
        Some(0) => {
            state.eof = true;
            return None;
        }
        Some(left) => shared.plan.slot_size.min(left as usize),
        None => shared.plan.slot_size,
    };
    let offset = state.next_offset;
    state.next_offset += want as u64;
    if let Some(left) = state.remaining.as_mut() {
        *left -= want as u64;
    }
    Some((offset, want))
}

async fn run_retrieve_slot(shared: &Arc<TransferShared>, slot: &mut BufferSlot) {
    let (backend, handle) = match &shared.io {
        Some((backend, handle)) => (Arc::clone(backend), *handle),
        None => return,
    };
    while let Some((offset, want)) = claim_read(shared).await {
        let got = match backend.read(handle, offset, want, &mut slot.buf).await {
            Ok(got) => got,
            Err(err) => {
                fail(shared, TransferFailure::Backend(err.description())).await;
                break;
            }
        };
        if got < want {
            shared.state.lock().await.eof = true;
        }

        // Stream-mode wire order: wait until every earlier range has been
        // written. Abort releases the turnstile to u64::MAX.
        let mut turn = shared.wire.subscribe();
        if turn.wait_for(|next| *next >= offset).await.is_err() {
            break;
        }
        if *turn.borrow() == u64::MAX {
            break;
        }
        if got > 0 {
            let mut writer = shared.data.writer.lock().await;
            match write_abortable(shared, &mut *writer, &slot.buf[..got]).await {
                SlotIo::Done(_) => {}
                SlotIo::Aborted => break,
                SlotIo::Failed(err) => {
                    drop(writer);
                    fail(shared, TransferFailure::Transport(err.to_string())).await;
                    break;
                }
            }
        }
        shared.state.lock().await.bytes_moved += got as u64;
        shared.clock.touch();
        // u64::MAX is the abort release and must never be overwritten.
        shared.wire.send_modify(|next| {
            if *next != u64::MAX {
                *next = offset + want as u64;
            }
        });
    }
}

async fn run_store_slot(shared: &Arc<TransferShared>, slot: &mut BufferSlot) {
    let (backend, handle) = match &shared.io {
        Some((backend, handle)) => (Arc::clone(backend), *handle),
        None => return,
    };
    'outer: loop {
        // The channel read claims the offset while holding the socket
        // lock, so wire order and offset order agree.
        let (offset, got) = {
            let mut reader = shared.data.reader.lock().await;
            {
                let state = shared.state.lock().await;
                if state.eof || state.failed.is_some() || shared.ctl.is_aborting() {
                    break 'outer;
                }
            }
            let got = match read_abortable(shared, &mut *reader, &mut slot.buf).await {
                SlotIo::Done(got) => got,
                SlotIo::Aborted => break 'outer,
                SlotIo::Failed(err) => {
                    drop(reader);
                    fail(shared, TransferFailure::Transport(err.to_string())).await;
                    break 'outer;
                }
            };
            let mut state = shared.state.lock().await;
            let offset = state.next_offset;
            state.next_offset += got as u64;
            if got == 0 {
                state.eof = true;
            }
            (offset, got)
        };
        if got == 0 {
            break;
        }
        if let Err(err) = backend.write(handle, offset, &slot.buf[..got]).await {
            fail(shared, TransferFailure::Backend(err.description())).await;
            break;
        }
        shared.state.lock().await.bytes_moved += got as u64;
        shared.clock.touch();
    }
}

/// Records the first failure and funnels into the single forced-abort
/// path, regardless of where the failure originated.
pub(crate) async fn fail(shared: &Arc<TransferShared>, failure: TransferFailure) {
    {
        let mut state = shared.state.lock().await;
        if state.failed.is_none() {
            warn!("transfer failed: {:?}", failure);
            state.failed = Some(failure);
        }
    }
    abort::force_abort(shared).await;
}

/// Every slot task ends here; the last one out performs teardown.
pub(crate) async fn finish_slot(shared: &Arc<TransferShared>) {
    if shared.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
        teardown(shared).await;
    }
}

/// Closes the backend handle, releases the data channel, emits the single
/// terminal response, and clears the in-progress flags. Runs exactly once
/// per transfer.
async fn teardown(shared: &Arc<TransferShared>) {
    let (failed, bytes_moved) = {
        let state = shared.state.lock().await;
        (state.failed.clone(), state.bytes_moved)
    };
    let aborted = shared.ctl.is_aborting();
    let commit = !aborted && failed.is_none();

    if let Some((backend, handle)) = &shared.io {
        if let Err(err) = backend.close(*handle, commit).await {
            warn!("backend close failed: {}", err);
        }
    }
    shared.data.force_close().await;

    let response = match &failed {
        None if !aborted => {
            debug!("transfer complete, {} bytes", bytes_moved);
            "226 Transfer complete.".to_string()
        }
        None => "426 Transfer aborted; data connection closed.".to_string(),
        Some(TransferFailure::Backend(msg)) => format!("451 Transfer failed: {}.", msg),
        Some(TransferFailure::Transport(msg)) => {
            format!("426 Data connection error: {}.", msg)
        }
    };
    if let Err(err) = shared.responder.send(&response).await {
        warn!("could not send terminal response: {}", err);
    }
    shared.clock.touch();
    shared.ctl.finish_transfer();
}
