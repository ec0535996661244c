// Virtual filesystem: backend contract, mount routing, backends.
pub mod backend;
pub mod entry;
pub mod error;
pub mod localfs;
pub mod registry;
pub mod router;

#[cfg(test)]
mod test_router;
