//! The single abort path. Client `ABOR`, protocol errors, I/O failures,
//! and timeouts all converge here; the first requester performs the
//! forced close and everyone else waits on the completion notify.

use std::sync::Arc;
use std::time::Duration;

use log::info;

use crate::core_transfer::state::TransferShared;

/// Requests a forced abort of the transfer. Only the first caller closes
/// the data channel; returns whether this call was the one that did.
pub async fn force_abort(shared: &Arc<TransferShared>) -> bool {
    if !shared.ctl.request_abort() {
        return false;
    }
    info!("forcing transfer abort");
    // Release the wire turnstile so no retrieve slot stalls waiting for a
    // turn that will never come.
    shared.wire.send_replace(u64::MAX);
    shared.data.force_close().await;
    true
}

/// Abort entry point for the ABOR handler: triggers the forced close and
/// waits (bounded) for the last slot callback to finish teardown.
pub async fn abort_and_wait(shared: &Arc<TransferShared>, limit: Duration) -> bool {
    force_abort(shared).await;
    shared.ctl.wait_done(limit).await
}
