//! State aggregator — sole owner of the window and light masks.

use tinyhub_domain::error::TinyHubError;
use tinyhub_domain::mask::{Bit, LightMask, WindowMask};

use crate::ports::WindowStateStore;

/// Aggregate household state derived from device events.
///
/// Both masks start empty (all windows open, all lights off). Only the
/// window mask survives a restart, through [`persist`](Self::persist) and
/// [`restore`](Self::restore).
#[derive(Debug, Default)]
pub struct StateAggregator {
    windows: WindowMask,
    lights: LightMask,
}

impl StateAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the contact state of one window.
    ///
    /// Returns `(previous, current)` so the caller can detect the edge
    /// without a second read.
    pub fn set_window(&mut self, bit: Bit, closed: bool) -> (WindowMask, WindowMask) {
        let previous = self.windows;
        self.windows = if closed {
            previous.with(bit)
        } else {
            previous.without(bit)
        };
        (previous, self.windows)
    }

    /// Current window mask.
    #[must_use]
    pub fn windows(&self) -> WindowMask {
        self.windows
    }

    pub fn set_light(&mut self, bit: Bit, on: bool) {
        self.lights = if on {
            self.lights.with(bit)
        } else {
            self.lights.without(bit)
        };
    }

    #[must_use]
    pub fn is_light_on(&self, bit: Bit) -> bool {
        self.lights.contains(bit)
    }

    /// Save the window mask.
    ///
    /// # Errors
    ///
    /// Propagates the store's error.
    pub async fn persist<S: WindowStateStore>(&self, store: &S) -> Result<(), TinyHubError> {
        store.save(self.windows).await?;
        tracing::info!(windows = %self.windows, "window state saved");
        Ok(())
    }

    /// Reload the window mask saved by a previous run.
    ///
    /// Returns the restored mask and whether a saved value was found. A
    /// missing or unreadable value leaves every window open.
    pub async fn restore<S: WindowStateStore>(&mut self, store: &S) -> (WindowMask, bool) {
        let (mask, found) = match store.load().await {
            Ok(Some(mask)) => (mask, true),
            Ok(None) => {
                tracing::info!("no saved window state, assuming all windows open");
                (WindowMask::EMPTY, false)
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not load window state, assuming all windows open");
                (WindowMask::EMPTY, false)
            }
        };
        self.windows = mask;
        tracing::info!(windows = %mask, found, "window state restored");
        (mask, found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::sync::Mutex;

    fn bit(index: u8) -> Bit {
        Bit::new(index).unwrap()
    }

    #[derive(Default)]
    struct InMemoryStore {
        saved: Mutex<Option<WindowMask>>,
        fail: bool,
    }

    impl WindowStateStore for InMemoryStore {
        fn load(&self) -> impl Future<Output = Result<Option<WindowMask>, TinyHubError>> + Send {
            let result = if self.fail {
                Err(TinyHubError::Storage("disk on fire".into()))
            } else {
                Ok(*self.saved.lock().unwrap())
            };
            async { result }
        }

        fn save(&self, mask: WindowMask) -> impl Future<Output = Result<(), TinyHubError>> + Send {
            *self.saved.lock().unwrap() = Some(mask);
            async { Ok(()) }
        }
    }

    #[test]
    fn should_return_previous_and_current_masks() {
        let mut state = StateAggregator::new();
        assert_eq!(
            state.set_window(bit(1), true),
            (WindowMask::EMPTY, WindowMask::from_raw(0b10))
        );
        assert_eq!(
            state.set_window(bit(1), true),
            (WindowMask::from_raw(0b10), WindowMask::from_raw(0b10))
        );
        assert_eq!(
            state.set_window(bit(1), false),
            (WindowMask::from_raw(0b10), WindowMask::EMPTY)
        );
    }

    #[test]
    fn should_track_lights_independently_from_windows() {
        let mut state = StateAggregator::new();
        state.set_light(bit(0), true);
        assert!(state.is_light_on(bit(0)));
        assert!(!state.is_light_on(bit(1)));
        assert_eq!(state.windows(), WindowMask::EMPTY);
        state.set_light(bit(0), false);
        assert!(!state.is_light_on(bit(0)));
    }

    #[tokio::test]
    async fn should_roundtrip_window_mask_through_store() {
        let store = InMemoryStore::default();
        let mut state = StateAggregator::new();
        state.set_window(bit(0), true);
        state.set_window(bit(3), true);
        state.persist(&store).await.unwrap();

        let mut restored = StateAggregator::new();
        let (mask, found) = restored.restore(&store).await;
        assert!(found);
        assert_eq!(mask.as_raw(), 0b1001);
        assert_eq!(restored.windows(), mask);
    }

    #[tokio::test]
    async fn should_default_to_all_open_when_nothing_saved() {
        let mut state = StateAggregator::new();
        state.set_window(bit(2), true);
        let (mask, found) = state.restore(&InMemoryStore::default()).await;
        assert!(!found);
        assert_eq!(mask, WindowMask::EMPTY);
        assert_eq!(state.windows(), WindowMask::EMPTY);
    }

    #[tokio::test]
    async fn should_default_to_all_open_when_store_fails() {
        let store = InMemoryStore {
            fail: true,
            ..InMemoryStore::default()
        };
        let mut state = StateAggregator::new();
        let (mask, found) = state.restore(&store).await;
        assert!(!found);
        assert_eq!(mask, WindowMask::EMPTY);
    }

    #[tokio::test]
    async fn should_restore_all_open_value() {
        let store = InMemoryStore::default();
        StateAggregator::new().persist(&store).await.unwrap();
        let (mask, found) = StateAggregator::new().restore(&store).await;
        assert!(found);
        assert_eq!(mask, WindowMask::EMPTY);
    }
}
