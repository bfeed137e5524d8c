//! Window state store port — persistence of the window mask across restarts.

use std::future::Future;

use tinyhub_domain::error::TinyHubError;
use tinyhub_domain::mask::WindowMask;

/// Durable storage for a single [`WindowMask`] value.
pub trait WindowStateStore {
    /// Load the last saved mask.
    ///
    /// `Ok(None)` means nothing was ever saved, which is a normal first-run
    /// outcome and not an error.
    fn load(&self) -> impl Future<Output = Result<Option<WindowMask>, TinyHubError>> + Send;

    /// Replace the saved mask atomically.
    fn save(&self, mask: WindowMask) -> impl Future<Output = Result<(), TinyHubError>> + Send;
}
