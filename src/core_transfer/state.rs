use std::pin::pin;
use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Mutex as StdMutex, Weak};
use std::time::{Duration, Instant};

use tokio::sync::{watch, Mutex, Notify};

use crate::core_network::data_channel::DataConn;
use crate::core_network::responder::Responder;
use crate::core_transfer::plan::BufferPlan;
use crate::core_vfs::backend::{Backend, BackendHandle};
use crate::core_watchdog::ActivityClock;

/// Per-session transfer/abort flag word. This is the "abort lock" of the
/// two-lock model; the transfer lock (`TransferShared::state`) must be
/// acquired first when both are needed, never the reverse.
pub struct TransferCtl {
    flags: StdMutex<CtlFlags>,
    done: Notify,
    /// The live transfer, reachable by out-of-band cancellers (ABOR on
    /// another task, the idle reaper) without going through the session.
    active: StdMutex<Option<Weak<TransferShared>>>,
}

#[derive(Default)]
struct CtlFlags {
    transfer_in_progress: bool,
    abort_in_progress: bool,
    /// Data-channel endpoint still tearing down from the previous
    /// transfer.
    closing: bool,
}

impl TransferCtl {
    pub fn new() -> Arc<Self> {
        Arc::new(TransferCtl {
            flags: StdMutex::new(CtlFlags::default()),
            done: Notify::new(),
            active: StdMutex::new(None),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CtlFlags> {
        self.flags.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Flips transfer-in-progress on; false if a transfer is already
    /// active.
    pub fn begin_transfer(&self) -> bool {
        let mut flags = self.lock();
        if flags.transfer_in_progress {
            return false;
        }
        flags.transfer_in_progress = true;
        flags.abort_in_progress = false;
        true
    }

    pub fn is_in_progress(&self) -> bool {
        self.lock().transfer_in_progress
    }

    pub fn is_closing(&self) -> bool {
        let flags = self.lock();
        flags.closing
    }

    /// First requester wins and performs the forced close; concurrent
    /// requesters observe `false` and wait instead of double-closing.
    pub fn request_abort(&self) -> bool {
        let mut flags = self.lock();
        if !flags.transfer_in_progress || flags.abort_in_progress {
            return false;
        }
        flags.abort_in_progress = true;
        flags.closing = true;
        true
    }

    pub fn is_aborting(&self) -> bool {
        self.lock().abort_in_progress
    }

    fn set_active(&self, shared: &Arc<TransferShared>) {
        let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        *active = Some(Arc::downgrade(shared));
    }

    /// The transfer currently in flight, if any. A `Weak` is held so a
    /// torn-down transfer cannot be resurrected here.
    pub fn active_transfer(&self) -> Option<Arc<TransferShared>> {
        let active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        active.as_ref().and_then(Weak::upgrade)
    }

    /// Abort-completion/teardown path: clears all flags and wakes any
    /// waiter.
    pub fn finish_transfer(&self) {
        {
            let mut flags = self.lock();
            flags.transfer_in_progress = false;
            flags.abort_in_progress = false;
            flags.closing = false;
        }
        {
            let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());
            *active = None;
        }
        self.done.notify_waiters();
    }

    /// Waits (bounded) until no transfer is in progress. Returns false on
    /// timeout.
    pub async fn wait_done(&self, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        loop {
            let mut notified = pin!(self.done.notified());
            notified.as_mut().enable();
            if !self.is_in_progress() {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            if tokio::time::timeout(remaining, notified).await.is_err() {
                return !self.is_in_progress();
            }
        }
    }
}

/// What one transfer is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOp {
    Retrieve,
    Store,
    Listing,
}

/// Why a transfer died; decides between the 45x and 426 terminal
/// response families.
#[derive(Debug, Clone)]
pub enum TransferFailure {
    Backend(String),
    Transport(String),
}

/// Mutable per-transfer bookkeeping, guarded by the transfer lock.
pub struct TransferState {
    /// Next unclaimed backend offset; advanced by a single incrementing
    /// counter so slot ranges never overlap.
    pub next_offset: u64,
    /// Bytes still claimable under an ERET range restriction.
    pub remaining: Option<u64>,
    pub eof: bool,
    pub failed: Option<TransferFailure>,
    pub bytes_moved: u64,
}

/// One reusable buffer, owned by a single slot task; the pool of these
/// lives exactly as long as its transfer.
pub struct BufferSlot {
    pub buf: Vec<u8>,
}

impl BufferSlot {
    pub fn new(size: usize) -> Self {
        BufferSlot {
            buf: vec![0u8; size],
        }
    }
}

/// Everything the slot tasks of one transfer share. Dropped when the last
/// task finishes teardown.
pub struct TransferShared {
    pub op: TransferOp,
    pub plan: BufferPlan,
    pub state: Mutex<TransferState>,
    /// Live slot-task counter; the task that decrements it to zero
    /// performs teardown, exactly once.
    pub outstanding: AtomicUsize,
    /// Next backend offset allowed onto the wire (retrieve path keeps
    /// stream-mode socket writes in offset order).
    pub wire: watch::Sender<u64>,
    pub ctl: Arc<TransferCtl>,
    /// Backend and open handle; listing transfers stream synthesized
    /// lines and hold neither.
    pub io: Option<(Arc<dyn Backend>, BackendHandle)>,
    pub data: Arc<DataConn>,
    pub responder: Arc<Responder>,
    pub clock: Arc<ActivityClock>,
}

impl TransferShared {
    pub fn new(
        op: TransferOp,
        plan: BufferPlan,
        start_offset: u64,
        range_length: Option<u64>,
        ctl: Arc<TransferCtl>,
        io: Option<(Arc<dyn Backend>, BackendHandle)>,
        data: Arc<DataConn>,
        responder: Arc<Responder>,
        clock: Arc<ActivityClock>,
    ) -> Arc<Self> {
        let (wire, _) = watch::channel(start_offset);
        let shared = Arc::new(TransferShared {
            op,
            plan,
            state: Mutex::new(TransferState {
                next_offset: start_offset,
                remaining: range_length,
                eof: false,
                failed: None,
                bytes_moved: 0,
            }),
            outstanding: AtomicUsize::new(0),
            wire,
            ctl,
            io,
            data,
            responder,
            clock,
        });
        shared.ctl.set_active(&shared);
        shared
    }
}
