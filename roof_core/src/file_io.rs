//! # File I/O
//!
//! Property store persistence:
//! - **Atomic saves**: write to .tmp, sync, rename over the target
//! - **File locking**: one writer per store on shared drives
//! - **Version validation**: refuse stores written by a newer schema
//!
//! ## File Format
//!
//! Stores are saved as `.roof` files containing JSON. Lock files sit next to
//! them with a `.roof.lock` extension and record who holds the lock.
//!
//! ## Example
//!
//! ```rust,no_run
//! use roof_core::file_io::{save_store, load_store, FileLock};
//! use roof_core::store::PropertyStore;
//! use std::path::Path;
//!
//! let store = PropertyStore::new();
//! let path = Path::new("properties.roof");
//!
//! // Lock is released when dropped
//! let lock = FileLock::acquire(path, "estimator@company.com").unwrap();
//! save_store(&store, path).unwrap();
//! drop(lock);
//!
//! let reloaded = load_store(path).unwrap();
//! assert!(reloaded.is_empty());
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::{RoofError, RoofResult};
use crate::store::{PropertyStore, SCHEMA_VERSION};

/// Extension for property store files
pub const STORE_EXTENSION: &str = "roof";

/// Locks older than this are taken over regardless of owner
const STALE_LOCK_HOURS: i64 = 24;

/// Contents of a `.roof.lock` file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Email or username of the holder
    pub user_id: String,
    pub machine: String,
    pub pid: u32,
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    /// Lock info for the current process
    pub fn new(user_id: impl Into<String>) -> Self {
        LockInfo {
            user_id: user_id.into(),
            machine: hostname().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }

    /// A lock is stale when it is older than a day, or when it was taken on
    /// this machine by a process that no longer exists.
    fn is_stale(&self) -> bool {
        if (Utc::now() - self.locked_at).num_hours() > STALE_LOCK_HOURS {
            return true;
        }
        hostname().is_some_and(|ours| ours == self.machine) && !process_alive(self.pid)
    }

    fn holder(&self) -> String {
        format!("{} ({})", self.user_id, self.machine)
    }
}

fn hostname() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("COMPUTERNAME").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOSTNAME").ok().or_else(|| std::env::var("HOST").ok())
    }
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{}", pid)).exists()
}

#[cfg(windows)]
fn process_alive(pid: u32) -> bool {
    use std::process::Command;
    Command::new("tasklist")
        .args(["/FI", &format!("PID eq {}", pid), "/NH"])
        .output()
        .map(|out| String::from_utf8_lossy(&out.stdout).contains(&pid.to_string()))
        .unwrap_or(true)
}

#[cfg(not(any(unix, windows)))]
fn process_alive(_pid: u32) -> bool {
    true
}

/// Exclusive lock on a store file, released on drop.
///
/// Holds an OS-level lock (fs2) on the `.lock` file and writes [`LockInfo`]
/// into it so other users can see who is editing.
pub struct FileLock {
    store_path: PathBuf,
    lock_path: PathBuf,
    /// Keeps the OS lock alive
    _handle: File,
    pub info: LockInfo,
}

impl FileLock {
    /// Acquire an exclusive lock on a store file.
    ///
    /// # Errors
    ///
    /// * `RoofError::FileLocked` - another live process holds the lock
    /// * `RoofError::FileError` - the lock file could not be written
    ///
    /// ```rust,no_run
    /// use roof_core::file_io::FileLock;
    /// use std::path::Path;
    ///
    /// let lock = FileLock::acquire(Path::new("properties.roof"), "user@email.com")?;
    /// drop(lock);
    /// # Ok::<(), roof_core::errors::RoofError>(())
    /// ```
    pub fn acquire(path: &Path, user_id: impl Into<String>) -> RoofResult<Self> {
        let lock_path = lock_path_for(path);

        if let Some(existing) = read_lock_info(&lock_path) {
            if !existing.is_stale() {
                return Err(RoofError::file_locked(
                    path.display().to_string(),
                    existing.holder(),
                    existing.locked_at.to_rfc3339(),
                ));
            }
            warn!("taking over stale lock on {} held by {}", path.display(), existing.holder());
        }

        // Existing contents stay untouched until the OS lock is ours
        let mut handle = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| io_error("create lock", &lock_path, e))?;

        handle
            .try_lock_exclusive()
            .map_err(|_| RoofError::file_locked(path.display().to_string(), "another process", "unknown"))?;

        let info = LockInfo::new(user_id);
        let json = serde_json::to_string_pretty(&info)?;
        handle
            .set_len(0)
            .and_then(|_| handle.seek(SeekFrom::Start(0)))
            .and_then(|_| handle.write_all(json.as_bytes()))
            .and_then(|_| handle.sync_all())
            .map_err(|e| io_error("write lock", &lock_path, e))?;

        Ok(FileLock {
            store_path: path.to_path_buf(),
            lock_path,
            _handle: handle,
            info,
        })
    }

    /// Who holds the lock on `path`, if anyone (stale locks are ignored)
    pub fn check(path: &Path) -> Option<LockInfo> {
        read_lock_info(&lock_path_for(path)).filter(|info| !info.is_stale())
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

/// `properties.roof` -> `properties.roof.lock`
fn lock_path_for(store_path: &Path) -> PathBuf {
    let extension = match store_path.extension() {
        Some(ext) => format!("{}.lock", ext.to_string_lossy()),
        None => "lock".to_string(),
    };
    store_path.with_extension(extension)
}

/// Unreadable or malformed lock files count as no lock
fn read_lock_info(lock_path: &Path) -> Option<LockInfo> {
    let contents = fs::read_to_string(lock_path).ok()?;
    serde_json::from_str(&contents).ok()
}

fn io_error(operation: &str, path: &Path, e: std::io::Error) -> RoofError {
    RoofError::file_error(operation, path.display().to_string(), e.to_string())
}

/// Write bytes to `path` through a synced temporary file and a rename, so an
/// interrupted save never leaves a truncated file behind.
fn write_atomic(path: &Path, bytes: &[u8]) -> RoofResult<()> {
    let tmp_path = path.with_extension(format!("{}.tmp", STORE_EXTENSION));

    let mut tmp = File::create(&tmp_path).map_err(|e| io_error("create temp file", &tmp_path, e))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.sync_all())
        .map_err(|e| io_error("write temp file", &tmp_path, e))?;
    drop(tmp);

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        io_error("rename to final", path, e)
    })
}

/// Save a store atomically.
///
/// ```rust,no_run
/// use roof_core::file_io::save_store;
/// use roof_core::store::PropertyStore;
/// use std::path::Path;
///
/// save_store(&PropertyStore::new(), Path::new("properties.roof"))?;
/// # Ok::<(), roof_core::errors::RoofError>(())
/// ```
pub fn save_store(store: &PropertyStore, path: &Path) -> RoofResult<()> {
    let json = serde_json::to_string_pretty(store)?;
    write_atomic(path, json.as_bytes())?;
    info!("saved {} properties to {}", store.len(), path.display());
    Ok(())
}

/// Load a store from disk.
///
/// # Errors
///
/// * `RoofError::FileError` - the file cannot be read
/// * `RoofError::SerializationError` - invalid JSON
/// * `RoofError::VersionMismatch` - written by an incompatible schema
pub fn load_store(path: &Path) -> RoofResult<PropertyStore> {
    let contents = fs::read_to_string(path).map_err(|e| io_error("read", path, e))?;

    let store: PropertyStore = serde_json::from_str(&contents).map_err(|e| RoofError::SerializationError {
        reason: format!("Invalid JSON in {}: {}", path.display(), e),
    })?;
    validate_version(&store.meta.version)?;

    info!("loaded {} properties from {}", store.len(), path.display());
    Ok(store)
}

/// Load a store and report whether someone else is editing it.
///
/// A `Some(LockInfo)` means the caller should treat the store as read-only.
pub fn load_store_with_lock_check(path: &Path) -> RoofResult<(PropertyStore, Option<LockInfo>)> {
    let store = load_store(path)?;
    Ok((store, FileLock::check(path)))
}

/// Major must match; under 0.x a newer minor is also refused.
fn validate_version(file_version: &str) -> RoofResult<()> {
    let mismatch = || RoofError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };
    let parse = |v: &str| -> Option<(u32, u32)> {
        let mut parts = v.split('.').map(|p| p.parse::<u32>());
        let major = parts.next()?.ok()?;
        let minor = parts.next().unwrap_or(Ok(0)).ok()?;
        Some((major, minor))
    };

    let (file_major, file_minor) = parse(file_version).ok_or_else(mismatch)?;
    let (major, minor) = parse(SCHEMA_VERSION).ok_or_else(mismatch)?;

    if file_major != major || (major == 0 && file_minor > minor) {
        return Err(mismatch());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Polygon};
    use crate::store::{PropertyRecord, PropertyRepository};
    use std::env::temp_dir;

    fn temp_store_path(name: &str) -> PathBuf {
        temp_dir().join(format!("roofiq_test_{}.roof", name))
    }

    #[test]
    fn test_lock_path_generation() {
        assert_eq!(
            lock_path_for(Path::new("/data/properties.roof")),
            Path::new("/data/properties.roof.lock")
        );
        assert_eq!(lock_path_for(Path::new("/data/properties")), Path::new("/data/properties.lock"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = temp_store_path("roundtrip");

        let mut store = PropertyStore::new();
        let mut record = PropertyRecord::new("100 Congress Ave", Point::new(-97.7431, 30.2672));
        record.polygon = Some(Polygon::new(vec![
            Point::new(-97.74310, 30.26720),
            Point::new(-97.74291, 30.26720),
            Point::new(-97.74291, 30.26736),
        ]));
        record.remeasure().unwrap();
        let id = store.create(record).unwrap();
        save_store(&store, &path).unwrap();

        let loaded = load_store(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get(&id).unwrap().address, "100 Congress Ave");
        assert!(loaded.get(&id).unwrap().measurement.is_some());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_atomic_save_leaves_no_tmp_file() {
        let path = temp_store_path("atomic");
        save_store(&PropertyStore::new(), &path).unwrap();

        assert!(!path.with_extension("roof.tmp").exists());
        assert!(path.exists());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_invalid_json() {
        let path = temp_store_path("garbage");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(load_store(&path), Err(RoofError::SerializationError { .. })));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_newer_schema_rejected() {
        let path = temp_store_path("newer");
        let mut store = PropertyStore::new();
        store.meta.version = "0.9.0".to_string();
        save_store(&store, &path).unwrap();

        assert!(matches!(load_store(&path), Err(RoofError::VersionMismatch { .. })));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_file_lock_acquire_and_release() {
        let path = temp_store_path("lock_test");
        File::create(&path).unwrap();

        let lock = FileLock::acquire(&path, "test@example.com").unwrap();
        assert_eq!(lock.info.user_id, "test@example.com");
        assert_eq!(lock.store_path(), path.as_path());

        let lock_path = lock_path_for(&path);
        assert!(lock_path.exists());

        drop(lock);
        assert!(!lock_path.exists());

        let _ = fs::remove_file(&path);
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_takeover_keeps_holder_info() {
        let path = temp_store_path("failed_takeover");
        File::create(&path).unwrap();
        let held = FileLock::acquire(&path, "holder@example.com").unwrap();

        // the live holder's metadata looks stale, but its OS lock is still held
        let lock_path = lock_path_for(&path);
        let mut aged = held.info.clone();
        aged.locked_at = Utc::now() - chrono::Duration::hours(STALE_LOCK_HOURS + 1);
        fs::write(&lock_path, serde_json::to_string(&aged).unwrap()).unwrap();

        let second = FileLock::acquire(&path, "intruder@example.com");
        assert!(matches!(second, Err(RoofError::FileLocked { .. })));

        let on_disk = read_lock_info(&lock_path).unwrap();
        assert_eq!(on_disk.user_id, "holder@example.com");

        drop(held);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_stale_lock_by_age() {
        let mut info = LockInfo::new("someone@example.com");
        assert!(info.pid > 0);
        info.locked_at = Utc::now() - chrono::Duration::hours(STALE_LOCK_HOURS + 1);
        assert!(info.is_stale());
    }

    #[test]
    fn test_version_validation() {
        assert!(validate_version(SCHEMA_VERSION).is_ok());
        assert!(validate_version("0.1.5").is_ok());
        assert!(validate_version("0.0.3").is_ok());
        assert!(validate_version("1.0.0").is_err());
        assert!(validate_version("0.2.0").is_err());
        assert!(validate_version("banana").is_err());
    }

    #[test]
    fn test_load_with_lock_check() {
        let path = temp_store_path("lock_check");
        save_store(&PropertyStore::new(), &path).unwrap();

        let (loaded, lock_info) = load_store_with_lock_check(&path).unwrap();
        assert!(loaded.is_empty());
        assert!(lock_info.is_none());

        let _ = fs::remove_file(&path);
    }
}
