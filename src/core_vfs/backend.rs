use async_trait::async_trait;

use crate::core_vfs::entry::{DetailLevel, DirEntry};
use crate::core_vfs::error::BackendError;

/// Direction of an open file handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Retrieve,
    Store,
}

/// Opaque handle to an open backend file. The backend keeps the real
/// state behind the id; the engine only threads the handle through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendHandle {
    pub id: u64,
    pub mode: OpenMode,
}

/// The capability contract every storage backend implements.
///
/// Paths are backend-relative (the router has already stripped the mount
/// prefix) and absolute within the backend, e.g. "/sub/file.txt".
/// `read`/`write` take explicit offsets so several slot operations may be
/// in flight against one handle; a backend must support that.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn open(
        &self,
        path: &str,
        mode: OpenMode,
        size_hint: Option<u64>,
    ) -> Result<BackendHandle, BackendError>;

    /// Opens by physical path, bypassing virtual-path checks. Used for
    /// backend-internal metadata files.
    async fn open_direct(
        &self,
        physical_path: &str,
        mode: OpenMode,
    ) -> Result<BackendHandle, BackendError>;

    /// `commit=false` signals an aborted transfer; a Store-mode backend
    /// must discard partially written data.
    async fn close(&self, handle: BackendHandle, commit: bool) -> Result<(), BackendError>;

    /// Reads up to `max_len` bytes at `offset` into `buf` (resized as
    /// needed) and returns the byte count. The caller owns `buf` and
    /// reuses it across calls, so a slot allocates once per transfer.
    async fn read(
        &self,
        handle: BackendHandle,
        offset: u64,
        max_len: usize,
        buf: &mut Vec<u8>,
    ) -> Result<usize, BackendError>;

    async fn write(
        &self,
        handle: BackendHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), BackendError>;

    async fn readdir(
        &self,
        path: &str,
        level: DetailLevel,
    ) -> Result<Vec<DirEntry>, BackendError>;

    /// Validates a directory and returns its canonical backend-relative
    /// path. A backend may redirect here (e.g. for credential-renewal
    /// side effects); callers must adopt the returned path.
    async fn checkdir(&self, path: &str) -> Result<String, BackendError>;

    async fn makedir(&self, path: &str) -> Result<(), BackendError>;

    async fn removedir(&self, path: &str) -> Result<(), BackendError>;

    async fn removefile(&self, path: &str) -> Result<(), BackendError>;

    async fn stat(&self, path: &str, level: DetailLevel) -> Result<DirEntry, BackendError>;
}
