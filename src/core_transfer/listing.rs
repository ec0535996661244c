//! Single-slot listing transfers: LIST/NLST/MLSD stream one formatted
//! line per registered write, re-arming until the entry sequence is
//! exhausted.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use log::info;

use crate::core_transfer::engine::{fail, finish_slot, write_abortable, SlotIo};
use crate::core_transfer::state::{BufferSlot, TransferFailure, TransferShared};
use crate::core_vfs::entry::{DetailLevel, DirEntry};

/// Launches the listing task. The terminal response comes from the shared
/// teardown path, exactly as for file transfers.
pub fn spawn(shared: Arc<TransferShared>, entries: Vec<DirEntry>, level: DetailLevel) {
    shared.outstanding.store(1, Ordering::SeqCst);
    info!("listing transfer starting, {} entries", entries.len());
    tokio::spawn(async move {
        let mut slot = BufferSlot::new(shared.plan.slot_size);
        run(&shared, &mut slot, entries, level).await;
        finish_slot(&shared).await;
    });
}

async fn run(
    shared: &Arc<TransferShared>,
    slot: &mut BufferSlot,
    entries: Vec<DirEntry>,
    level: DetailLevel,
) {
    for entry in entries {
        {
            let state = shared.state.lock().await;
            if state.failed.is_some() || shared.ctl.is_aborting() {
                return;
            }
        }
        slot.buf.clear();
        slot.buf.extend_from_slice(entry.format(level).as_bytes());
        slot.buf.extend_from_slice(b"\r\n");
        {
            let mut writer = shared.data.writer.lock().await;
            match write_abortable(shared, &mut *writer, &slot.buf).await {
                SlotIo::Done(_) => {}
                SlotIo::Aborted => return,
                SlotIo::Failed(err) => {
                    drop(writer);
                    fail(shared, TransferFailure::Transport(err.to_string())).await;
                    return;
                }
            }
        }
        let mut state = shared.state.lock().await;
        state.bytes_moved += slot.buf.len() as u64;
        drop(state);
        shared.clock.touch();
    }
    shared.state.lock().await.eof = true;
}
