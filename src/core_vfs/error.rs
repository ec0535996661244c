use thiserror::Error;

/// Errors reported by a storage backend. Every variant carries the
/// human-readable description the backend set for the failing call.
#[derive(Error, Debug, Clone)]
pub enum BackendError {
    #[error("{0}: no such file or directory")]
    NotFound(String),

    #[error("{0}: permission denied")]
    PermissionDenied(String),

    #[error("{0}: not a directory")]
    NotADirectory(String),

    #[error("{0}: is a directory")]
    IsADirectory(String),

    #[error("{0}: directory not empty")]
    NotEmpty(String),

    #[error("{0}: already exists")]
    AlreadyExists(String),

    #[error("stale backend handle {0}")]
    StaleHandle(u64),

    #[error("{0}")]
    Io(String),
}

impl BackendError {
    pub fn from_io(path: &str, err: &std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::NotFound => BackendError::NotFound(path.to_string()),
            ErrorKind::PermissionDenied => BackendError::PermissionDenied(path.to_string()),
            ErrorKind::AlreadyExists => BackendError::AlreadyExists(path.to_string()),
            _ => BackendError::Io(format!("{}: {}", path, err)),
        }
    }

    /// Human-readable description of the last failure, per the capability
    /// contract.
    pub fn description(&self) -> String {
        self.to_string()
    }

    /// Maps the failure to a wire response. Metadata failures draw the
    /// 55x family, failures during an active data transfer the 45x family.
    pub fn to_ftp_response(&self, during_transfer: bool) -> String {
        match self {
            BackendError::NotFound(_)
            | BackendError::NotADirectory(_)
            | BackendError::IsADirectory(_) => {
                format!("550 {}.", self)
            }
            BackendError::PermissionDenied(_) => format!("550 {}.", self),
            BackendError::NotEmpty(_) | BackendError::AlreadyExists(_) => {
                format!("553 {}.", self)
            }
            _ if during_transfer => format!("451 {}.", self),
            _ => format!("451 Local error in processing: {}.", self),
        }
    }
}

/// Errors produced by virtual-path resolution.
#[derive(Error, Debug, Clone)]
pub enum VfsError {
    #[error("path escapes the virtual root")]
    EscapesRoot,

    #[error("{0}: no backend mounted")]
    NoBackend(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl VfsError {
    pub fn to_ftp_response(&self) -> String {
        match self {
            VfsError::EscapesRoot => "550 Path escapes the virtual root.".to_string(),
            VfsError::NoBackend(p) => format!("550 {}: no backend mounted.", p),
            VfsError::Backend(e) => e.to_ftp_response(false),
        }
    }
}
