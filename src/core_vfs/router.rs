use std::collections::BTreeSet;
use std::sync::Arc;

use log::{debug, trace};

use crate::core_vfs::backend::Backend;
use crate::core_vfs::entry::{DetailLevel, DirEntry};
use crate::core_vfs::error::VfsError;

/// One binding of a virtual path prefix to a backend instance. A synthetic
/// mount (no backend) keeps an ancestor directory listable.
pub struct Mount {
    pub prefix: String,
    pub backend: Option<Arc<dyn Backend>>,
}

/// Ordered mount table; immutable after the single build pass.
pub struct MountTable {
    // Sorted by descending prefix length so the most specific match wins.
    mounts: Vec<Mount>,
}

/// Resolves `arg` against the working directory `cwd` into an absolute
/// virtual path with all `.`/`..` segments removed. Rejects paths whose
/// normalization escapes the virtual root.
pub fn normalize(cwd: &str, arg: &str) -> Result<String, VfsError> {
    let joined = if arg.starts_with('/') {
        arg.to_string()
    } else if arg.is_empty() {
        cwd.to_string()
    } else {
        format!("{}/{}", cwd.trim_end_matches('/'), arg)
    };

    let mut stack: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if stack.pop().is_none() {
                    return Err(VfsError::EscapesRoot);
                }
            }
            other => stack.push(other),
        }
    }
    if stack.is_empty() {
        Ok("/".to_string())
    } else {
        Ok(format!("/{}", stack.join("/")))
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// True when `path` lies at or under `prefix` on a path-segment boundary.
fn prefix_matches(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    path == prefix || path.starts_with(prefix) && path.as_bytes()[prefix.len()] == b'/'
}

impl MountTable {
    /// Single build pass: normalize prefixes, inject synthetic ancestor
    /// mounts, then sort by descending prefix length once.
    pub fn build(bindings: Vec<(String, Arc<dyn Backend>)>) -> Self {
        let mut mounts: Vec<Mount> = Vec::new();
        let mut seen: BTreeSet<String> = BTreeSet::new();

        for (raw_prefix, backend) in bindings {
            let prefix = normalize_prefix(&raw_prefix);
            seen.insert(prefix.clone());
            mounts.push(Mount {
                prefix,
                backend: Some(backend),
            });
        }

        // Synthetic ancestors keep the tree navigable above each mount.
        let prefixes: Vec<String> = mounts.iter().map(|m| m.prefix.clone()).collect();
        for prefix in prefixes {
            let mut ancestor = prefix.as_str();
            while let Some(pos) = ancestor.rfind('/') {
                ancestor = if pos == 0 { "/" } else { &ancestor[..pos] };
                if seen.insert(ancestor.to_string()) {
                    mounts.push(Mount {
                        prefix: ancestor.to_string(),
                        backend: None,
                    });
                }
                if ancestor == "/" {
                    break;
                }
            }
        }

        mounts.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        debug!(
            "Mount table built: {:?}",
            mounts.iter().map(|m| m.prefix.as_str()).collect::<Vec<_>>()
        );
        MountTable { mounts }
    }

    /// Longest-prefix resolution of a normalized virtual path to a
    /// (backend, backend-relative path) pair. Synthetic mounts never
    /// resolve; only bound backends count.
    pub fn resolve(&self, vpath: &str) -> Result<(Arc<dyn Backend>, String), VfsError> {
        for mount in &self.mounts {
            let backend = match &mount.backend {
                Some(backend) if prefix_matches(&mount.prefix, vpath) => Arc::clone(backend),
                _ => continue,
            };
            let rel = if mount.prefix == "/" {
                vpath.to_string()
            } else {
                let rest = &vpath[mount.prefix.len()..];
                if rest.is_empty() {
                    "/".to_string()
                } else {
                    rest.to_string()
                }
            };
            trace!("resolve {} -> mount {} rel {}", vpath, mount.prefix, rel);
            return Ok((backend, rel));
        }
        Err(VfsError::NoBackend(vpath.to_string()))
    }

    /// Rebuilds a virtual path from a mount prefix and a canonical
    /// backend-relative path.
    fn virtualize(&self, vpath: &str, canonical_rel: &str) -> String {
        for mount in &self.mounts {
            if mount.backend.is_some() && prefix_matches(&mount.prefix, vpath) {
                return if mount.prefix == "/" {
                    canonical_rel.to_string()
                } else if canonical_rel == "/" {
                    mount.prefix.clone()
                } else {
                    format!("{}{}", mount.prefix, canonical_rel)
                };
            }
        }
        vpath.to_string()
    }

    /// True when `vpath` is kept alive purely by mounts nested under it.
    pub fn is_synthetic_dir(&self, vpath: &str) -> bool {
        self.mounts
            .iter()
            .any(|m| m.backend.is_some() && m.prefix != vpath && prefix_matches(vpath, &m.prefix))
    }

    /// Names of the next path segment of every mount nested under `vpath`.
    pub fn synthetic_children(&self, vpath: &str) -> Vec<String> {
        let mut names: BTreeSet<String> = BTreeSet::new();
        for mount in &self.mounts {
            if mount.backend.is_none() || mount.prefix == vpath {
                continue;
            }
            if !prefix_matches(vpath, &mount.prefix) {
                continue;
            }
            let rest = if vpath == "/" {
                &mount.prefix[1..]
            } else {
                &mount.prefix[vpath.len() + 1..]
            };
            if let Some(first) = rest.split('/').next() {
                if !first.is_empty() {
                    names.insert(first.to_string());
                }
            }
        }
        names.into_iter().collect()
    }

    /// Directory check returning the canonical virtual path. Synthetic
    /// directories check out as themselves.
    pub async fn checkdir(&self, vpath: &str) -> Result<String, VfsError> {
        match self.resolve(vpath) {
            Ok((backend, rel)) => match backend.checkdir(&rel).await {
                Ok(canonical) => Ok(self.virtualize(vpath, &canonical)),
                Err(err) if self.is_synthetic_dir(vpath) => {
                    debug!("checkdir {} fell back to synthetic: {}", vpath, err);
                    Ok(vpath.to_string())
                }
                Err(err) => Err(err.into()),
            },
            Err(_) if self.is_synthetic_dir(vpath) => Ok(vpath.to_string()),
            Err(err) => Err(err),
        }
    }

    /// Stat through the bound backend, or a synthesized directory entry.
    pub async fn stat(&self, vpath: &str, level: DetailLevel) -> Result<DirEntry, VfsError> {
        match self.resolve(vpath) {
            Ok((backend, rel)) => match backend.stat(&rel, level).await {
                Ok(entry) => Ok(entry),
                Err(err) if self.is_synthetic_dir(vpath) => {
                    debug!("stat {} fell back to synthetic: {}", vpath, err);
                    Ok(DirEntry::synthetic_dir(basename(vpath)))
                }
                Err(err) => Err(err.into()),
            },
            Err(_) if self.is_synthetic_dir(vpath) => {
                Ok(DirEntry::synthetic_dir(basename(vpath)))
            }
            Err(err) => Err(err),
        }
    }

    /// Directory listing: backend entries merged with synthetic entries
    /// for the next segment of every mount nested under `vpath`.
    pub async fn readdir(
        &self,
        vpath: &str,
        level: DetailLevel,
    ) -> Result<Vec<DirEntry>, VfsError> {
        let synthetic = self.synthetic_children(vpath);
        let mut entries = match self.resolve(vpath) {
            Ok((backend, rel)) => match backend.readdir(&rel, level).await {
                Ok(entries) => entries,
                Err(err) if !synthetic.is_empty() => {
                    debug!("readdir {} has only synthetic entries: {}", vpath, err);
                    Vec::new()
                }
                Err(err) => return Err(err.into()),
            },
            Err(_) if !synthetic.is_empty() => Vec::new(),
            Err(err) => return Err(err),
        };

        for name in synthetic {
            if !entries.iter().any(|e| e.name == name) {
                entries.push(DirEntry::synthetic_dir(&name));
            }
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

fn basename(vpath: &str) -> &str {
    vpath.rsplit('/').next().filter(|s| !s.is_empty()).unwrap_or("/")
}
