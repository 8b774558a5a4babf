//! Session: the command surface a presentation layer drives.
//!
//! A [`Session`] owns the [`Store`] hosting the [`CounterEngine`], arms the
//! onboarding timer at start, forwards viewport notifications and tears
//! everything down on [`Session::shutdown`].

use crate::config::CounterConfig;
use crate::environment::CounterEnvironment;
use crate::reducer::{CounterEngine, VIEWPORT_OBSERVER};
use crate::types::{CounterAction, EngineState, MarkerId, SoundTrigger, Viewport};
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tally_runtime::{Store, StoreError, Transition};
use tokio::sync::watch;

/// Store specialised to the marker counter
pub type CounterStore = Store<EngineState, CounterAction, CounterEnvironment, CounterEngine>;

/// Handle to a running counter
///
/// Cheap to clone; all clones drive the same engine.
#[derive(Clone)]
pub struct Session {
    store: CounterStore,
}

impl Session {
    /// Create the engine and start the session
    ///
    /// Publishes the initial state and arms the onboarding timer.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] only if the store refuses the start command.
    pub async fn start(config: &CounterConfig, env: CounterEnvironment) -> Result<Self, StoreError> {
        let store = Store::new(
            EngineState::new(config.initial_viewport),
            CounterEngine::new(config),
            env,
        );
        let session = Self { store };

        tracing::info!(
            width = config.initial_viewport.width,
            height = config.initial_viewport.height,
            "Starting counter session"
        );
        session.store.send(CounterAction::SessionStarted).await?;
        Ok(session)
    }

    /// Underlying store
    #[must_use]
    pub const fn store(&self) -> &CounterStore {
        &self.store
    }

    async fn apply(&self, action: CounterAction) -> Result<Arc<EngineState>, StoreError> {
        self.store.dispatch(action).await.map(|transition| transition.after)
    }

    /// Add a marker
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn increment(&self) -> Result<Arc<EngineState>, StoreError> {
        self.apply(CounterAction::Increment).await
    }

    /// Remove the most recently added marker
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn decrement(&self) -> Result<Arc<EngineState>, StoreError> {
        self.apply(CounterAction::Decrement).await
    }

    /// Remove every marker
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn reset(&self) -> Result<Arc<EngineState>, StoreError> {
        self.apply(CounterAction::Reset).await
    }

    /// Remove a specific marker (a click on it)
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn remove_marker(&self, id: MarkerId) -> Result<Arc<EngineState>, StoreError> {
        self.apply(CounterAction::RemoveMarker { id }).await
    }

    /// Hide the onboarding message
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn dismiss_message(&self) -> Result<Arc<EngineState>, StoreError> {
        self.apply(CounterAction::DismissMessage).await
    }

    /// Report a new drawing-area size
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn viewport_changed(
        &self,
        width: f64,
        height: f64,
    ) -> Result<Arc<EngineState>, StoreError> {
        self.apply(CounterAction::ViewportChanged { width, height }).await
    }

    /// Clear the sound trigger
    ///
    /// Returns [`SoundTrigger::Fire`] at most once per removal burst; the
    /// sound itself is played through the environment's sound player.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn consume_sound_trigger(&self) -> Result<SoundTrigger, StoreError> {
        let Transition { before, after, .. } =
            self.store.dispatch(CounterAction::ConsumeSoundTrigger).await?;
        Ok(SoundTrigger::between(&before, &after))
    }

    /// Latest published snapshot
    pub async fn current_state(&self) -> Arc<EngineState> {
        self.store.snapshot().await
    }

    /// Receiver notified with every new snapshot
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<EngineState>> {
        self.store.subscribe_state()
    }

    /// Forward viewport resize notifications until the stream ends
    ///
    /// Calling this again replaces the previous observer.
    pub fn observe_viewport<St>(&self, viewports: St)
    where
        St: Stream<Item = Viewport> + Send + 'static,
    {
        self.store.subscribe(
            VIEWPORT_OBSERVER,
            viewports.map(|viewport| CounterAction::ViewportChanged {
                width: viewport.width,
                height: viewport.height,
            }),
        );
    }

    /// Stop observing viewport changes
    ///
    /// Returns `false` if no observer was running.
    pub fn stop_observing_viewport(&self) -> bool {
        self.store.cancel(&VIEWPORT_OBSERVER)
    }

    /// Cancel timers and observers, then stop accepting commands
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if effects are still running
    /// when the configured shutdown timeout elapses.
    pub async fn shutdown(&self) -> Result<(), StoreError> {
        tracing::info!("Shutting down counter session");
        self.store.shutdown(self.store.default_shutdown_timeout()).await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}
