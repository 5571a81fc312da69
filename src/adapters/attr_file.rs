//! File-backed attribute host.
//!
//! Implements [`AttributeHost`] for the daemon: the node is a directory
//! under `root` (normally `/run`), each attribute a regular file with the
//! requested mode.  Content is replaced atomically through
//! [`FsAttributeHost::refresh`] so readers never see a partial snapshot.

use std::fs::{self, OpenOptions, Permissions};
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::app::ports::{AttributeHost, AttributeSpec};
use crate::error::HostError;

fn host_err(e: std::io::Error) -> HostError {
    HostError::from(e.kind())
}

pub struct FsAttributeHost {
    root: PathBuf,
}

impl FsAttributeHost {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn node_path(&self, node: &str) -> PathBuf {
        self.root.join(node)
    }

    /// Replace the content of `node/attr` without changing its mode.
    pub fn refresh(&self, node: &str, attr: &str, content: &[u8]) -> Result<(), HostError> {
        let dir = self.node_path(node);
        let target = dir.join(attr);
        let mode = fs::metadata(&target).map_err(host_err)?.permissions().mode();
        let tmp = dir.join(format!(".{attr}.tmp"));

        let written = write_new(&tmp, 0o600, content)
            .and_then(|()| fs::set_permissions(&tmp, Permissions::from_mode(mode)))
            .and_then(|()| fs::rename(&tmp, &target));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(host_err(e));
        }
        Ok(())
    }

    /// Current content of `node/attr`.
    pub fn read(&self, node: &str, attr: &str) -> Result<Vec<u8>, HostError> {
        fs::read(self.node_path(node).join(attr)).map_err(host_err)
    }
}

fn write_new(path: &Path, mode: u32, content: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(path)?;
    file.write_all(content)?;
    file.sync_data()
}

impl AttributeHost for FsAttributeHost {
    fn create_node(&mut self, name: &str) -> Result<(), HostError> {
        let dir = self.node_path(name);
        fs::create_dir(&dir).map_err(host_err)?;
        debug!("attr: created node {}", dir.display());
        Ok(())
    }

    fn create_group(&mut self, node: &str, attrs: &[AttributeSpec]) -> Result<(), HostError> {
        let dir = self.node_path(node);
        for (i, spec) in attrs.iter().enumerate() {
            let path = dir.join(spec.name);
            let created = OpenOptions::new()
                .write(true)
                .create_new(true)
                .mode(spec.mode)
                .open(&path)
                // the open mode is filtered by the umask
                .and_then(|_| fs::set_permissions(&path, Permissions::from_mode(spec.mode)));
            if let Err(e) = created {
                if e.kind() != std::io::ErrorKind::AlreadyExists {
                    let _ = fs::remove_file(&path);
                }
                self.remove_group(node, &attrs[..i]);
                return Err(host_err(e));
            }
        }
        Ok(())
    }

    fn remove_group(&mut self, node: &str, attrs: &[AttributeSpec]) {
        let dir = self.node_path(node);
        for spec in attrs.iter().rev() {
            if let Err(e) = fs::remove_file(dir.join(spec.name)) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("attr: cannot remove {}/{}: {e}", dir.display(), spec.name);
                }
            }
        }
    }

    fn remove_node(&mut self, node: &str) {
        let dir = self.node_path(node);
        if let Err(e) = fs::remove_dir(&dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("attr: cannot remove node {}: {e}", dir.display());
            }
        }
    }
}
