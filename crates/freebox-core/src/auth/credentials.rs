use std::fmt;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info, warn};

use super::AuthError;

/// The long-lived app token issued when the app was paired.
#[derive(Clone, PartialEq, Eq)]
pub struct AppToken(String);

impl AppToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AppToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AppToken(***)")
    }
}

/// Write-once file holding the app token, plus an in-memory copy of the last
/// value read or written so callers don't hit the disk on every session renewal.
pub struct CredentialStore {
    path: PathBuf,
    cached: Mutex<Option<AppToken>>,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the credential file is present
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the app token from disk, verbatim.
    ///
    /// A blank file is left over from an interrupted save: it is deleted and
    /// reported as missing so the next start pairs again.
    pub fn load(&self) -> Result<AppToken, AuthError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(AuthError::CredentialNotFound(self.path.clone()));
            }
            Err(e) => return Err(AuthError::io(&self.path, e)),
        };

        if contents.trim().is_empty() {
            warn!(path = %self.path.display(), "App token file is blank, discarding it");
            self.remove()?;
            return Err(AuthError::CredentialNotFound(self.path.clone()));
        }

        let token = AppToken::new(contents);
        debug!(path = %self.path.display(), "Loaded app token");
        self.set_cached(token.clone());
        Ok(token)
    }

    /// Persist the app token with owner-only permissions.
    ///
    /// An existing file is never overwritten; the cache is updated either way.
    pub fn save(&self, token: &AppToken) -> Result<(), AuthError> {
        if token.as_str().trim().is_empty() {
            return Err(AuthError::EmptyToken);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| AuthError::io(&self.path, e))?;
        }

        match Self::open_new(&self.path) {
            Ok(mut file) => {
                let written = file
                    .write_all(token.as_str().as_bytes())
                    .and_then(|_| file.sync_all());
                drop(file);
                self.discard_on_error(written)?;
                info!(path = %self.path.display(), "Stored app token");
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(path = %self.path.display(), "App token file already exists, keeping it");
            }
            Err(e) => return Err(AuthError::io(&self.path, e)),
        }

        self.set_cached(token.clone());
        Ok(())
    }

    /// Delete the stored app token so the next start pairs again.
    pub fn remove(&self) -> Result<(), AuthError> {
        self.clear_cached();
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::io(&self.path, e)),
        }
    }

    /// Last app token read or written by this store, if any.
    pub fn cached(&self) -> Option<AppToken> {
        self.cached.lock().ok().and_then(|c| c.clone())
    }

    /// Remove a half-written token file so it is never read back as a secret.
    fn discard_on_error(&self, written: std::io::Result<()>) -> Result<(), AuthError> {
        written.map_err(|e| {
            if let Err(cleanup) = std::fs::remove_file(&self.path) {
                warn!(path = %self.path.display(), error = %cleanup, "Failed to remove partial app token file");
            }
            AuthError::io(&self.path, e)
        })
    }

    fn set_cached(&self, token: AppToken) {
        if let Ok(mut cached) = self.cached.lock() {
            *cached = Some(token);
        }
    }

    fn clear_cached(&self) {
        if let Ok(mut cached) = self.cached.lock() {
            *cached = None;
        }
    }

    #[cfg(unix)]
    fn open_new(path: &Path) -> std::io::Result<std::fs::File> {
        use std::os::unix::fs::OpenOptionsExt;
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(path)
    }

    #[cfg(not(unix))]
    fn open_new(path: &Path) -> std::io::Result<std::fs::File> {
        OpenOptions::new().write(true).create_new(true).open(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> CredentialStore {
        CredentialStore::new(dir.path().join("freebox_token"))
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(!store.exists());
        assert!(matches!(store.load(), Err(AuthError::CredentialNotFound(_))));
        assert!(store.cached().is_none());
    }

    #[test]
    fn test_save_blank_token_does_no_io() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let err = store.save(&AppToken::new("")).unwrap_err();
        assert!(matches!(err, AuthError::EmptyToken));
        assert_eq!(err.to_string(), "token should not be blank");
        assert!(!store.exists());
        assert!(store.cached().is_none());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&AppToken::new("IOI")).unwrap();
        assert!(store.exists());
        assert_eq!(store.cached(), Some(AppToken::new("IOI")));

        let fresh = store_in(&dir);
        assert_eq!(fresh.load().unwrap().as_str(), "IOI");
        assert_eq!(fresh.cached(), Some(AppToken::new("IOI")));
    }

    #[test]
    fn test_save_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&AppToken::new("first")).unwrap();
        store.save(&AppToken::new("second")).unwrap();

        let on_disk = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(on_disk, "first");
        // The cache still follows the latest save
        assert_eq!(store.cached(), Some(AppToken::new("second")));
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&AppToken::new("IOI")).unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_blank_file_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "").unwrap();

        assert!(matches!(store.load(), Err(AuthError::CredentialNotFound(_))));
        assert!(!store.exists());
        assert!(store.cached().is_none());

        // The slot is free again
        store.save(&AppToken::new("IOI")).unwrap();
        assert_eq!(store_in(&dir).load().unwrap().as_str(), "IOI");
    }

    #[test]
    fn test_failed_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        // What a write interrupted halfway leaves on disk
        std::fs::write(store.path(), "IO").unwrap();

        let failed = Err(std::io::Error::new(ErrorKind::Other, "no space left on device"));
        let err = store.discard_on_error(failed).unwrap_err();
        assert!(matches!(err, AuthError::CredentialIo { .. }));
        assert!(!store.exists());
        assert!(matches!(store.load(), Err(AuthError::CredentialNotFound(_))));
    }

    #[test]
    fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&AppToken::new("IOI")).unwrap();
        store.remove().unwrap();
        assert!(!store.exists());
        assert!(store.cached().is_none());
        // Removing twice is fine
        store.remove().unwrap();
    }

    #[test]
    fn test_debug_redacts_token() {
        assert_eq!(format!("{:?}", AppToken::new("secret")), "AppToken(***)");
    }
}
