//! File-based SessionStore implementation

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, error, info};

use learnportal_core::{Error, Result, SessionStore};

/// Session store persisted as a JSON object on disk
///
/// The whole record is held in memory and written back after each mutation.
/// A missing file is an empty session.
#[derive(Debug)]
pub struct FileSessionStore {
    /// Path to the session file
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileSessionStore {
    /// Open (or start) a session file
    ///
    /// # Errors
    /// - `Error::Config` if the home directory can't be resolved for a `~` path
    /// - `Error::Io` if the file exists but can't be read
    /// - `Error::SessionStore` if the file isn't a JSON object of strings
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = expand_home(path.into())?;

        let entries = if path.exists() {
            Self::read_file(&path)?
        } else {
            debug!("Session file {:?} does not exist yet, starting empty", path);
            BTreeMap::new()
        };

        info!("Opened FileSessionStore at {:?}", path);

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(path: &Path) -> Result<BTreeMap<String, String>> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            error!("Failed to read session file: {}", e);
            Error::Io(e)
        })?;

        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&contents).map_err(|e| {
            error!("Failed to parse session file: {}", e);
            Error::SessionStore(format!("Invalid session file: {}", e))
        })
    }

    fn write_file(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(entries)?;
        write_private(&self.path, contents.as_bytes()).map_err(|e| {
            error!("Failed to write session file: {}", e);
            Error::Io(e)
        })?;

        debug!(keys = entries.len(), "Wrote session file");
        Ok(())
    }

    fn mutate(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        apply(&mut entries);
        self.write_file(&entries)
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.mutate(|entries| {
            entries.remove(key);
        })
    }

    fn clear(&self) -> Result<()> {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();

        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Removed session file {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

/// Write `contents`, readable by the owner only on unix (the file holds the
/// bearer token).
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    // `mode` only applies on creation; tighten files left by older versions
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents)?;
    file.sync_all()
}

fn expand_home(path: PathBuf) -> Result<PathBuf> {
    if !path.starts_with("~") {
        return Ok(path);
    }

    let home = dirs::home_dir()
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;
    Ok(home.join(path.strip_prefix("~").unwrap_or(&path)))
}
