use crate::error::{ChainError, Result};
use crate::utils::sha256_hex;
use log::debug;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Content-addressable artifact store.
pub trait FileStore: Send + Sync {
    /// Write the artifact named by `reference` to `dest`
    fn fetch(&self, reference: &str, dest: &Path) -> Result<()>;
    /// Upload the file at `path`, returning its reference
    fn put(&self, path: &Path) -> Result<String>;
}

/// IPFS store driven through the `ipfs` command-line client
pub struct IpfsStore {
    binary: String,
    api: String,
}

impl IpfsStore {
    pub fn new(binary: impl Into<String>, api: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            api: api.into(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--api").arg(&self.api);
        cmd
    }
}

impl FileStore for IpfsStore {
    fn fetch(&self, reference: &str, dest: &Path) -> Result<()> {
        let file = File::create(dest).map_err(|e| {
            ChainError::FileStore(format!("Failed to create {}: {e}", dest.display()))
        })?;
        let output = self
            .command()
            .arg("cat")
            .arg(reference)
            .stdout(Stdio::from(file))
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| ChainError::FileStore(format!("Failed to run {}: {e}", self.binary)))?;

        if !output.status.success() {
            return Err(ChainError::FileStore(format!(
                "Failed to fetch {reference}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        debug!("Fetched {reference} into {}", dest.display());
        Ok(())
    }

    fn put(&self, path: &Path) -> Result<String> {
        let output = self
            .command()
            .args(["add", "-Q"])
            .arg(path)
            .output()
            .map_err(|e| ChainError::FileStore(format!("Failed to run {}: {e}", self.binary)))?;

        if !output.status.success() {
            return Err(ChainError::FileStore(format!(
                "Failed to upload {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        let cid = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if cid.is_empty() {
            return Err(ChainError::FileStore(format!(
                "No reference returned for {}",
                path.display()
            )));
        }
        Ok(cid)
    }
}

/// Directory-backed store keyed by the SHA-256 of each file's contents.
///
/// Useful for running a node without an IPFS daemon.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn object_path(&self, reference: &str) -> Result<PathBuf> {
        let valid = !reference.is_empty() && reference.chars().all(|c| c.is_ascii_hexdigit());
        if !valid {
            return Err(ChainError::FileStore(format!(
                "Invalid reference {reference:?}"
            )));
        }
        Ok(self.root.join(reference))
    }
}

impl FileStore for LocalStore {
    fn fetch(&self, reference: &str, dest: &Path) -> Result<()> {
        let source = self.object_path(reference)?;
        fs::copy(&source, dest).map_err(|e| {
            ChainError::FileStore(format!("Failed to fetch {reference}: {e}"))
        })?;
        Ok(())
    }

    fn put(&self, path: &Path) -> Result<String> {
        let contents = fs::read(path).map_err(|e| {
            ChainError::FileStore(format!("Failed to read {}: {e}", path.display()))
        })?;
        let reference = sha256_hex(&contents);
        fs::write(self.root.join(&reference), &contents)?;
        Ok(reference)
    }
}
