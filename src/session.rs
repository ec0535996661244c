use std::net::IpAddr;
use std::sync::Arc;

use crate::core_network::data_channel::DataEndpoint;
use crate::core_transfer::state::{TransferCtl, TransferShared};
use crate::core_vfs::router::MountTable;
use crate::core_watchdog::ActivityClock;

/// Already-resolved identity; certificate/VOMS processing happens outside
/// the core.
#[derive(Debug, Clone)]
pub struct Identity {
    pub username: String,
}

/// Control-channel state machine position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Idle,
    /// A data-channel endpoint is negotiated but no transfer launched.
    TransferPending,
    Transferring,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferType {
    Ascii,
    Image,
}

impl TransferType {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().as_str() {
            "A" => Some(TransferType::Ascii),
            "I" => Some(TransferType::Image),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Stream,
}

/// PROT level; opaque session attribute for the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionLevel {
    Clear,
    Safe,
    Private,
}

impl ProtectionLevel {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().as_str() {
            "C" => Some(ProtectionLevel::Clear),
            "S" => Some(ProtectionLevel::Safe),
            "P" => Some(ProtectionLevel::Private),
            _ => None,
        }
    }
}

/// DCAU mode; opaque session attribute for the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DcauMode {
    None,
    Auth,
    Subject,
}

impl DcauMode {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().chars().next()? {
            'N' => Some(DcauMode::None),
            'A' => Some(DcauMode::Auth),
            'S' => Some(DcauMode::Subject),
            _ => None,
        }
    }
}

/// One per accepted connection; owned by the command dispatcher, mutated
/// by command handlers and (through `ctl`/`active`) by the transfer
/// engine.
pub struct Session {
    pub state: SessionState,
    pub identity: Option<Identity>,
    pub pending_user: Option<String>,
    /// One-shot secure context established by AUTH.
    pub secure: bool,
    pub cwd: String,
    pub transfer_type: TransferType,
    pub transfer_mode: TransferMode,
    pub protection: ProtectionLevel,
    pub dcau: DcauMode,
    pub pbsz: u64,
    pub parallelism: u32,
    pub tcp_buffer: Option<usize>,
    /// REST offset, consumed by the next transfer.
    pub restart_offset: u64,
    /// Local address of the control connection; PASV advertises it when
    /// no egress override is configured.
    pub local_ip: IpAddr,
    pub endpoint: DataEndpoint,
    pub mounts: Arc<MountTable>,
    pub ctl: Arc<TransferCtl>,
    pub active: Option<Arc<TransferShared>>,
    pub clock: Arc<ActivityClock>,
}

impl Session {
    pub fn new(
        mounts: Arc<MountTable>,
        local_ip: IpAddr,
        ctl: Arc<TransferCtl>,
        clock: Arc<ActivityClock>,
    ) -> Self {
        Session {
            state: SessionState::Unauthenticated,
            identity: None,
            pending_user: None,
            secure: false,
            cwd: "/".to_string(),
            transfer_type: TransferType::Ascii,
            transfer_mode: TransferMode::Stream,
            protection: ProtectionLevel::Clear,
            dcau: DcauMode::None,
            pbsz: 0,
            parallelism: 1,
            tcp_buffer: None,
            restart_offset: 0,
            local_ip,
            endpoint: DataEndpoint::None,
            mounts,
            ctl,
            active: None,
            clock,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// `Transferring -> Idle` happens only once the engine has confirmed
    /// teardown; called at the top of each command cycle.
    pub fn reconcile(&mut self) {
        if self.state == SessionState::Transferring && !self.ctl.is_in_progress() {
            self.state = SessionState::Idle;
            self.active = None;
        }
    }

    /// Marks the authenticated state after identity resolution.
    pub fn authenticate(&mut self, identity: Identity) {
        self.identity = Some(identity);
        if self.state == SessionState::Unauthenticated {
            self.state = SessionState::Idle;
        }
    }
}
