use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Result};
use log::info;

use crate::config::{Config, MountConfig};
use crate::core_vfs::backend::Backend;
use crate::core_vfs::localfs::LocalFsBackend;
use crate::core_vfs::router::MountTable;

type BackendFactory = fn(&MountConfig) -> Result<Arc<dyn Backend>>;

/// Static registry of backend constructors, resolved at startup from
/// configuration. Replaces dynamic-library plugin loading.
pub struct BackendRegistry {
    factories: HashMap<&'static str, BackendFactory>,
}

fn localfs_factory(mount: &MountConfig) -> Result<Arc<dyn Backend>> {
    if mount.root.is_empty() {
        bail!("mount {} needs a root directory", mount.prefix);
    }
    Ok(Arc::new(LocalFsBackend::new(&mount.root)))
}

impl BackendRegistry {
    pub fn new() -> Self {
        let mut factories: HashMap<&'static str, BackendFactory> = HashMap::new();
        factories.insert("localfs", localfs_factory);
        BackendRegistry { factories }
    }

    /// Registers an additional backend kind. External backends hook in
    /// here at startup.
    pub fn register(&mut self, kind: &'static str, factory: BackendFactory) {
        self.factories.insert(kind, factory);
    }

    /// Builds the per-session mount table from the configured mount list.
    /// Backends are instantiated fresh per session; the table is immutable
    /// afterward.
    pub fn build_mount_table(&self, config: &Config) -> Result<MountTable> {
        let mut bindings = Vec::new();
        for mount in &config.mounts {
            let factory = match self.factories.get(mount.backend.as_str()) {
                Some(factory) => factory,
                None => bail!("unknown backend kind '{}'", mount.backend),
            };
            let backend = factory(mount)?;
            info!("mounting {} backend at {}", mount.backend, mount.prefix);
            bindings.push((mount.prefix.clone(), backend));
        }
        Ok(MountTable::build(bindings))
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
