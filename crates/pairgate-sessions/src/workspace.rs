//! Per-identity credential workspaces.
//!
//! Each identity owns one scoped directory (`<root>/session_<number>`)
//! holding the serialized credential material the protocol engine reads and
//! rewrites. The orchestrator owns the directory for the lifetime of a slot
//! and removes it on logout, deletion, or force-repair.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use pairgate_core::Identity;

/// File within the workspace holding the serialized credential blob.
const CREDS_FILE: &str = "creds.json";

/// Handle to one identity's on-disk credential directory.
#[derive(Clone, Debug)]
pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    /// Directory an identity's workspace lives at under `root`.
    #[must_use]
    pub fn path_for(root: &Path, number: &Identity) -> PathBuf {
        root.join(format!("session_{number}"))
    }

    /// Create (or reuse) an empty workspace directory for a fresh pairing.
    pub fn create(root: &Path, number: &Identity) -> io::Result<Self> {
        let dir = Self::path_for(root, number);
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Create the workspace and seed it with a stored credential blob.
    pub fn restore(root: &Path, number: &Identity, creds: &str) -> io::Result<Self> {
        let ws = Self::create(root, number)?;
        fs::write(ws.dir.join(CREDS_FILE), creds)?;
        Ok(ws)
    }

    /// The workspace directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read the serialized credential blob back from disk.
    pub fn read_credentials(&self) -> io::Result<String> {
        fs::read_to_string(self.dir.join(CREDS_FILE))
    }

    /// Delete the workspace directory. Missing directories are fine.
    pub fn remove(&self) -> io::Result<()> {
        remove_dir_if_present(&self.dir)
    }

    /// Delete an identity's workspace without holding a handle to it.
    pub fn remove_at(root: &Path, number: &Identity) -> io::Result<()> {
        remove_dir_if_present(&Self::path_for(root, number))
    }
}

fn remove_dir_if_present(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
