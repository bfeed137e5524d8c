//! # tinyhub-adapter-storage-file
//!
//! Persists the window mask as a single native-endian `u32` in a file.
//!
//! Writes go to a sibling temporary file which is then renamed over the
//! target, so a crash mid-write never leaves a half-written mask behind.
//! A missing file means "never saved" and loads as `None`.
//!
//! ## Dependency rule
//! Same as other adapters: depends on `tinyhub-app` and `tinyhub-domain`.

mod error;

pub use error::FileStoreError;

use std::future::Future;
use std::path::{Path, PathBuf};

use tinyhub_app::ports::WindowStateStore;
use tinyhub_domain::error::TinyHubError;
use tinyhub_domain::mask::WindowMask;

const MASK_BYTES: usize = std::mem::size_of::<u32>();

/// [`WindowStateStore`] backed by one small file.
#[derive(Debug, Clone)]
pub struct FileWindowStore {
    path: PathBuf,
}

impl FileWindowStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> FileStoreError {
        FileStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    async fn read(&self) -> Result<Option<WindowMask>, FileStoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.io_error(err)),
        };
        let raw: [u8; MASK_BYTES] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| FileStoreError::Truncated {
                    path: self.path.clone(),
                    expected: MASK_BYTES,
                    actual: bytes.len(),
                })?;
        Ok(Some(WindowMask::from_raw(u32::from_ne_bytes(raw))))
    }

    async fn write(&self, mask: WindowMask) -> Result<(), FileStoreError> {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, mask.as_raw().to_ne_bytes())
            .await
            .map_err(|err| self.io_error(err))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|err| self.io_error(err))?;
        tracing::debug!(path = %self.path.display(), windows = %mask, "window state written");
        Ok(())
    }
}

impl WindowStateStore for FileWindowStore {
    fn load(&self) -> impl Future<Output = Result<Option<WindowMask>, TinyHubError>> + Send {
        async move { self.read().await.map_err(TinyHubError::from) }
    }

    fn save(&self, mask: WindowMask) -> impl Future<Output = Result<(), TinyHubError>> + Send {
        async move { self.write(mask).await.map_err(TinyHubError::from) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("tinyhub-window-state-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn should_load_none_when_file_missing() {
        let store = FileWindowStore::new(temp_path());
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_roundtrip_mask() {
        let path = temp_path();
        let store = FileWindowStore::new(&path);
        store.save(WindowMask::from_raw(0b10110)).await.unwrap();
        assert_eq!(
            store.load().await.unwrap(),
            Some(WindowMask::from_raw(0b10110))
        );
        assert_eq!(std::fs::read(&path).unwrap().len(), MASK_BYTES);
        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn should_overwrite_previous_value() {
        let path = temp_path();
        let store = FileWindowStore::new(&path);
        store.save(WindowMask::from_raw(0b11111)).await.unwrap();
        store.save(WindowMask::EMPTY).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(WindowMask::EMPTY));
        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn should_reject_truncated_file() {
        let path = temp_path();
        std::fs::write(&path, [0x1f_u8, 0x00]).unwrap();
        let store = FileWindowStore::new(&path);
        let err = store.read().await.unwrap_err();
        assert!(matches!(
            err,
            FileStoreError::Truncated {
                expected: 4,
                actual: 2,
                ..
            }
        ));
        std::fs::remove_file(path).unwrap();
    }
}
