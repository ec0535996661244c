use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::FileExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use tokio::task;

use crate::core_vfs::backend::{Backend, BackendHandle, OpenMode};
use crate::core_vfs::entry::{
    DetailLevel, DirEntry, CAP_APPEND, CAP_CREATE, CAP_DELETE, CAP_ENTER, CAP_LIST, CAP_MKDIR,
    CAP_READ, CAP_RENAME, CAP_WRITE,
};
use crate::core_vfs::error::BackendError;

struct OpenFile {
    file: Arc<fs::File>,
    mode: OpenMode,
    /// Store-mode handles write to a staging file; `(staging, final)`.
    staging: Option<(PathBuf, PathBuf)>,
}

/// Plain local-filesystem backend rooted at one physical directory.
pub struct LocalFsBackend {
    root: PathBuf,
    handles: Mutex<HashMap<u64, OpenFile>>,
    next_id: AtomicU64,
}

impl LocalFsBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalFsBackend {
            root: root.into(),
            handles: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn physical(&self, rel: &str) -> Result<PathBuf, BackendError> {
        // The router normalizes paths; a stray ".." here is a contract
        // violation, not a user error.
        if rel.split('/').any(|s| s == "..") {
            return Err(BackendError::PermissionDenied(rel.to_string()));
        }
        Ok(self.root.join(rel.trim_start_matches('/')))
    }

    fn insert_handle(&self, open: OpenFile) -> BackendHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mode = open.mode;
        self.handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id, open);
        BackendHandle { id, mode }
    }

    fn take_handle(&self, handle: BackendHandle) -> Result<OpenFile, BackendError> {
        self.handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&handle.id)
            .ok_or(BackendError::StaleHandle(handle.id))
    }

    fn file_for(&self, handle: BackendHandle) -> Result<Arc<fs::File>, BackendError> {
        self.handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&handle.id)
            .map(|open| Arc::clone(&open.file))
            .ok_or(BackendError::StaleHandle(handle.id))
    }

    async fn open_physical(
        &self,
        display: &str,
        physical: PathBuf,
        mode: OpenMode,
    ) -> Result<BackendHandle, BackendError> {
        let display_owned = display.to_string();
        let open = task::spawn_blocking(move || -> Result<OpenFile, BackendError> {
            match mode {
                OpenMode::Retrieve => {
                    let meta = fs::metadata(&physical)
                        .map_err(|e| BackendError::from_io(&display_owned, &e))?;
                    if meta.is_dir() {
                        return Err(BackendError::IsADirectory(display_owned));
                    }
                    let file = fs::File::open(&physical)
                        .map_err(|e| BackendError::from_io(&display_owned, &e))?;
                    Ok(OpenFile {
                        file: Arc::new(file),
                        mode,
                        staging: None,
                    })
                }
                OpenMode::Store => {
                    let parent = physical
                        .parent()
                        .ok_or_else(|| BackendError::NotFound(display_owned.clone()))?;
                    let name = physical
                        .file_name()
                        .and_then(|n| n.to_str())
                        .ok_or_else(|| BackendError::NotFound(display_owned.clone()))?;
                    let staging = parent.join(format!(".{}.in", name));
                    let file = fs::File::create(&staging)
                        .map_err(|e| BackendError::from_io(&display_owned, &e))?;
                    Ok(OpenFile {
                        file: Arc::new(file),
                        mode,
                        staging: Some((staging, physical.clone())),
                    })
                }
            }
        })
        .await
        .map_err(|e| BackendError::Io(e.to_string()))??;

        Ok(self.insert_handle(open))
    }
}

fn caps_for(meta: &fs::Metadata) -> u32 {
    let mut caps = if meta.is_dir() {
        CAP_LIST | CAP_ENTER
    } else {
        CAP_READ
    };
    if !meta.permissions().readonly() {
        caps |= if meta.is_dir() {
            CAP_CREATE | CAP_MKDIR | CAP_RENAME | CAP_DELETE
        } else {
            CAP_WRITE | CAP_APPEND | CAP_RENAME | CAP_DELETE
        };
    }
    caps
}

fn entry_from_meta(name: &str, meta: &fs::Metadata, level: DetailLevel) -> DirEntry {
    let mtime = if level == DetailLevel::NameOnly {
        None
    } else {
        meta.modified().ok().map(DateTime::<Utc>::from)
    };
    DirEntry {
        name: name.to_string(),
        is_dir: meta.is_dir(),
        size: meta.len(),
        mtime,
        caps: caps_for(meta),
    }
}

#[async_trait]
impl Backend for LocalFsBackend {
    async fn open(
        &self,
        path: &str,
        mode: OpenMode,
        _size_hint: Option<u64>,
    ) -> Result<BackendHandle, BackendError> {
        let physical = self.physical(path)?;
        debug!("localfs open {:?} ({:?})", physical, mode);
        self.open_physical(path, physical, mode).await
    }

    async fn open_direct(
        &self,
        physical_path: &str,
        mode: OpenMode,
    ) -> Result<BackendHandle, BackendError> {
        debug!("localfs open_direct {} ({:?})", physical_path, mode);
        self.open_physical(physical_path, PathBuf::from(physical_path), mode)
            .await
    }

    async fn close(&self, handle: BackendHandle, commit: bool) -> Result<(), BackendError> {
        let open = self.take_handle(handle)?;
        task::spawn_blocking(move || -> Result<(), BackendError> {
            if let Some((staging, final_path)) = open.staging {
                if commit {
                    open.file
                        .sync_all()
                        .map_err(|e| BackendError::Io(e.to_string()))?;
                    drop(open.file);
                    fs::rename(&staging, &final_path)
                        .map_err(|e| BackendError::from_io(&final_path.to_string_lossy(), &e))?;
                } else {
                    drop(open.file);
                    if let Err(e) = fs::remove_file(&staging) {
                        warn!("failed to discard staging file {:?}: {}", staging, e);
                    }
                }
            }
            Ok(())
        })
        .await
        .map_err(|e| BackendError::Io(e.to_string()))?
    }

    async fn read(
        &self,
        handle: BackendHandle,
        offset: u64,
        max_len: usize,
        buf: &mut Vec<u8>,
    ) -> Result<usize, BackendError> {
        let file = self.file_for(handle)?;
        // The buffer moves through spawn_blocking and back, so the caller
        // keeps its allocation across calls.
        let mut scratch = std::mem::take(buf);
        let (scratch, filled) =
            task::spawn_blocking(move || -> Result<(Vec<u8>, usize), BackendError> {
                scratch.resize(max_len, 0);
                let mut filled = 0;
                // read_at may return short counts before real EOF; loop
                // until the buffer is full or the file ends.
                while filled < max_len {
                    match file.read_at(&mut scratch[filled..max_len], offset + filled as u64) {
                        Ok(0) => break,
                        Ok(n) => filled += n,
                        Err(e) => return Err(BackendError::Io(e.to_string())),
                    }
                }
                Ok((scratch, filled))
            })
            .await
            .map_err(|e| BackendError::Io(e.to_string()))??;
        *buf = scratch;
        Ok(filled)
    }

    async fn write(
        &self,
        handle: BackendHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), BackendError> {
        let file = self.file_for(handle)?;
        let data = data.to_vec();
        task::spawn_blocking(move || {
            file.write_all_at(&data, offset)
                .map_err(|e| BackendError::Io(e.to_string()))
        })
        .await
        .map_err(|e| BackendError::Io(e.to_string()))?
    }

    async fn readdir(
        &self,
        path: &str,
        level: DetailLevel,
    ) -> Result<Vec<DirEntry>, BackendError> {
        let display = path.to_string();
        let physical = self.physical(path)?;
        task::spawn_blocking(move || -> Result<Vec<DirEntry>, BackendError> {
            let meta = fs::metadata(&physical)
                .map_err(|e| BackendError::from_io(&display, &e))?;
            if !meta.is_dir() {
                return Err(BackendError::NotADirectory(display));
            }
            let mut entries = Vec::new();
            let iter =
                fs::read_dir(&physical).map_err(|e| BackendError::from_io(&display, &e))?;
            for dirent in iter {
                let dirent = dirent.map_err(|e| BackendError::from_io(&display, &e))?;
                let name = dirent.file_name().to_string_lossy().to_string();
                match dirent.metadata() {
                    Ok(meta) => entries.push(entry_from_meta(&name, &meta, level)),
                    // Entry vanished between readdir and stat; skip it.
                    Err(_) => continue,
                }
            }
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(entries)
        })
        .await
        .map_err(|e| BackendError::Io(e.to_string()))?
    }

    async fn checkdir(&self, path: &str) -> Result<String, BackendError> {
        let display = path.to_string();
        let physical = self.physical(path)?;
        task::spawn_blocking(move || -> Result<String, BackendError> {
            let meta = fs::metadata(&physical)
                .map_err(|e| BackendError::from_io(&display, &e))?;
            if !meta.is_dir() {
                return Err(BackendError::NotADirectory(display));
            }
            // This backend never redirects; the canonical path is the
            // request path.
            Ok(display)
        })
        .await
        .map_err(|e| BackendError::Io(e.to_string()))?
    }

    async fn makedir(&self, path: &str) -> Result<(), BackendError> {
        let display = path.to_string();
        let physical = self.physical(path)?;
        task::spawn_blocking(move || {
            fs::create_dir(&physical).map_err(|e| BackendError::from_io(&display, &e))
        })
        .await
        .map_err(|e| BackendError::Io(e.to_string()))?
    }

    async fn removedir(&self, path: &str) -> Result<(), BackendError> {
        let display = path.to_string();
        let physical = self.physical(path)?;
        task::spawn_blocking(move || {
            fs::remove_dir(&physical).map_err(|e| {
                // ENOTEMPTY deserves its own message instead of a bare
                // io error string.
                if e.raw_os_error() == Some(39) {
                    BackendError::NotEmpty(display.clone())
                } else {
                    BackendError::from_io(&display, &e)
                }
            })
        })
        .await
        .map_err(|e| BackendError::Io(e.to_string()))?
    }

    async fn removefile(&self, path: &str) -> Result<(), BackendError> {
        let display = path.to_string();
        let physical = self.physical(path)?;
        task::spawn_blocking(move || {
            let meta = fs::metadata(&physical)
                .map_err(|e| BackendError::from_io(&display, &e))?;
            if meta.is_dir() {
                return Err(BackendError::IsADirectory(display));
            }
            fs::remove_file(&physical).map_err(|e| BackendError::from_io(&display, &e))
        })
        .await
        .map_err(|e| BackendError::Io(e.to_string()))?
    }

    async fn stat(&self, path: &str, level: DetailLevel) -> Result<DirEntry, BackendError> {
        let display = path.to_string();
        let physical = self.physical(path)?;
        task::spawn_blocking(move || -> Result<DirEntry, BackendError> {
            let meta = fs::metadata(&physical)
                .map_err(|e| BackendError::from_io(&display, &e))?;
            let name = display
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty())
                .unwrap_or("/");
            Ok(entry_from_meta(name, &meta, level))
        })
        .await
        .map_err(|e| BackendError::Io(e.to_string()))?
    }
}
