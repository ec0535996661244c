// Data transfer engine: buffer planning, slot tasks, abort machinery.
pub mod abort;
pub mod engine;
pub mod listing;
pub mod plan;
pub mod state;

#[cfg(test)]
mod test_transfer;
