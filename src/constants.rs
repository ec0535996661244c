// src/constants.rs

/// Hard ceiling on the client-negotiated parallelism count.
pub const PARALLELISM_CEILING: u32 = 50;

/// Lower and upper bounds on the buffer-slot count derived from parallelism.
pub const SLOT_FLOOR: usize = 3;
pub const SLOT_CEILING: usize = 41;

/// Seconds of control-channel inactivity before the reaper closes a session.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;

/// Seconds to wait for a data-channel endpoint stuck in a closing state
/// before rejecting a new transfer.
pub const DEFAULT_DATA_GRACE_SECS: u64 = 10;

/// Default per-slot buffer size in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 65536;

/// Default cap on the aggregate buffer memory of one transfer.
pub const DEFAULT_MAX_AGGREGATE: usize = 1_048_576;

/// Longest accepted control-channel command line.
pub const MAX_COMMAND_LINE: usize = 4096;
