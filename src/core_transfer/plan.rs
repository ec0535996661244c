use crate::constants::{SLOT_CEILING, SLOT_FLOOR};

/// Buffer plan for one transfer: how many slots fly concurrently and how
/// large each slot buffer is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPlan {
    pub slots: usize,
    pub slot_size: usize,
}

/// Derives the plan from the negotiated parallelism. The `2P+1` slot
/// formula is kept for compatibility with existing deployments; treat it
/// as a tunable, not a law.
pub fn compute(parallelism: u32, default_size: usize, max_aggregate: usize) -> BufferPlan {
    let p = parallelism.max(1) as usize;
    let slots = (2 * p + 1).clamp(SLOT_FLOOR, SLOT_CEILING);
    let mut slot_size = default_size;
    if slots * slot_size > max_aggregate {
        slot_size = max_aggregate / slots;
    }
    if slot_size == 0 {
        // Degenerate configuration; keep the transfer alive rather than
        // dividing work into nothing.
        slot_size = 1;
    }
    BufferPlan { slots, slot_size }
}
