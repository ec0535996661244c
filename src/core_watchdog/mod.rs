//! Session registry and idle-timeout reaper. The registry is owned by the
//! server root and sessions add/remove themselves over their lifetime; the
//! reaper wakes on the soonest per-session deadline and force-closes any
//! session whose control channel has gone quiet.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{info, warn};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::core_network::responder::Responder;
use crate::core_transfer::abort;
use crate::core_transfer::state::TransferCtl;

/// How long the reaper waits for an aborted transfer to finish teardown
/// before closing the control channel anyway.
const TEARDOWN_WAIT: Duration = Duration::from_secs(2);

/// Last-activity timestamp, touched on every command and every data
/// callback.
pub struct ActivityClock {
    last: Mutex<Instant>,
}

impl ActivityClock {
    pub fn new() -> Arc<Self> {
        Arc::new(ActivityClock {
            last: Mutex::new(Instant::now()),
        })
    }

    pub fn touch(&self) {
        let mut last = self.last.lock().unwrap_or_else(|p| p.into_inner());
        *last = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        let last = self.last.lock().unwrap_or_else(|p| p.into_inner());
        last.elapsed()
    }
}

pub struct SessionEntry {
    pub peer: String,
    pub clock: Arc<ActivityClock>,
    pub responder: Arc<Responder>,
    pub ctl: Arc<TransferCtl>,
    /// Wakes the command loop out of its blocked read when the reaper
    /// closes the session; the responder only reaches the write half.
    pub hangup: Arc<Notify>,
}

/// Explicit add/remove registry tied to session creation/destruction.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<u64, SessionEntry>>,
    next_id: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(SessionRegistry {
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn add(&self, entry: SessionEntry) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.sessions
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(id, entry);
        id
    }

    pub fn remove(&self, id: u64) {
        self.sessions
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&id);
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .len()
    }

    /// Removes and returns expired sessions, with the duration until the
    /// next deadline.
    fn scan(&self, idle_timeout: Duration) -> (Vec<(u64, SessionEntry)>, Duration) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|p| p.into_inner());
        let mut stale = Vec::new();
        let mut next_wake = idle_timeout;
        for (id, entry) in sessions.iter() {
            let idle = entry.clock.idle_for();
            if idle >= idle_timeout {
                stale.push(*id);
            } else {
                next_wake = next_wake.min(idle_timeout - idle);
            }
        }
        let mut expired = Vec::new();
        for id in stale {
            if let Some(entry) = sessions.remove(&id) {
                expired.push((id, entry));
            }
        }
        (expired, next_wake)
    }
}

/// Spawns the background reaper loop.
pub fn spawn_reaper(
    registry: Arc<SessionRegistry>,
    idle_timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "idle reaper running, timeout {} seconds",
            idle_timeout.as_secs()
        );
        loop {
            let (expired, next_wake) = registry.scan(idle_timeout);
            for (id, entry) in expired {
                warn!(
                    "session {} ({}) idle too long, force-closing",
                    id, entry.peer
                );
                // A stalled transfer is cancelled first, so its slot
                // tasks close the data channel and backend handle and
                // emit their terminal response before the 421.
                if let Some(shared) = entry.ctl.active_transfer() {
                    abort::force_abort(&shared).await;
                    if !entry.ctl.wait_done(TEARDOWN_WAIT).await {
                        warn!("session {}: transfer teardown still pending", id);
                    }
                }
                let _ = entry
                    .responder
                    .send(&format!(
                        "421 Idle timeout ({} seconds): closing control connection.",
                        idle_timeout.as_secs()
                    ))
                    .await;
                entry.responder.shutdown().await;
                entry.hangup.notify_one();
            }
            tokio::time::sleep(next_wake.max(Duration::from_millis(100))).await;
        }
    })
}
