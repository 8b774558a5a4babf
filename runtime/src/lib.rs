//! # Tally Runtime
//!
//! Runtime implementation for tally reducers.
//!
//! This crate provides the Store runtime that coordinates reducer execution
//! and effect handling.
//!
//! ## Core Components
//!
//! - **Store**: Single writer for the state. Commands are applied one at a
//!   time under a write lock and every command publishes a new immutable
//!   snapshot.
//! - **Effect Executor**: Executes effect descriptions and feeds actions back to the reducer
//! - **Cancellable registry**: Timers and subscriptions that can be aborted
//!   by id, and are all aborted on shutdown
//!
//! ## Example
//!
//! ```ignore
//! use tally_runtime::Store;
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//!
//! // Send a command
//! store.send(Action::DoSomething).await?;
//!
//! // Read an immutable snapshot
//! let snapshot = store.snapshot().await;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tally_core::{
    effect::{Effect, EffectId},
    reducer::Reducer,
};
use tokio::sync::{RwLock, watch};
use tokio::task::AbortHandle;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    ///
    /// Commands themselves never fail; these only describe the runtime's
    /// lifecycle.
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        ///
        /// Some effects were still running when the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for effects tracked by an [`EffectHandle`](crate::EffectHandle)
        #[error("Timeout waiting for effects")]
        Timeout,
    }
}

pub use error::StoreError;

/// Configuration for Store instances
///
/// # Example
///
/// ```ignore
/// let config = StoreConfig::default()
///     .with_broadcast_capacity(64)
///     .with_shutdown_timeout(Duration::from_secs(2));
///
/// let store = Store::with_config(state, reducer, env, config);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Number of fed-back actions buffered for slow observers
    pub broadcast_capacity: usize,
    /// Default timeout for graceful shutdown
    pub default_shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Create a new configuration with custom values
    #[must_use]
    pub const fn new(broadcast_capacity: usize, default_shutdown_timeout: Duration) -> Self {
        Self {
            broadcast_capacity,
            default_shutdown_timeout,
        }
    }

    /// Set the action broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.default_shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 16,
            default_shutdown_timeout: Duration::from_secs(5),
        }
    }
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`] to allow waiting for the effects started by
/// one command. Actions fed back by those effects are tracked by their own
/// handles.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(Action::Start).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    /// Create a handle and the tracking context the executor uses
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            counter,
            notifier: tx,
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (tx, rx) = watch::channel(());
        let _ = tx.send(());

        Self {
            effects: Arc::new(AtomicUsize::new(0)),
            completion: rx,
        }
    }

    /// Number of effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all effects to complete
    ///
    /// Cancelled effects count as complete once their task is dropped.
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                // Every tracker is gone, so nothing can still be running
                break;
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires before all
    /// effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.pending())
            .finish_non_exhaustive()
    }
}

/// Internal: Effect tracking context passed through effect execution
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: watch::Sender<()>,
}

impl EffectTracking {
    /// Increment the effect counter (effect started)
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement the effect counter (effect completed)
    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Counter reached zero, notify waiters
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: RAII guard that decrements effect counter on drop
///
/// Runs on completion, on panic and on abort alike.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl AtomicCounterGuard {
    fn acquire(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Result of applying one command
///
/// Both snapshots are captured under the same write lock, so `before` is
/// exactly the state the command was applied to.
#[derive(Debug)]
pub struct Transition<S> {
    /// State the command was applied to
    pub before: Arc<S>,
    /// State produced by the command
    pub after: Arc<S>,
    /// Handle for the effects the command started
    pub handle: EffectHandle,
}

/// Internal: live cancellable tasks keyed by [`EffectId`]
///
/// Each registration carries a generation so a finishing task never removes
/// the task that replaced it.
#[derive(Default)]
struct CancellableRegistry {
    next_generation: AtomicU64,
    tasks: Mutex<HashMap<EffectId, (u64, AbortHandle)>>,
}

impl CancellableRegistry {
    fn lock(&self) -> MutexGuard<'_, HashMap<EffectId, (u64, AbortHandle)>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn `task` under `id`, aborting any task already registered there
    fn spawn<F>(self: &Arc<Self>, id: EffectId, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let registry = Arc::clone(self);
        let key = id.clone();

        // Hold the lock across spawn so the task cannot release before it is registered
        let mut tasks = self.lock();
        let handle = tokio::spawn(async move {
            task.await;
            registry.release(&key, generation);
        });

        if let Some((_, previous)) = tasks.insert(id, (generation, handle.abort_handle())) {
            previous.abort();
            metrics::counter!("store.effects.replaced").increment(1);
            tracing::debug!("Replaced running cancellable effect");
        }
    }

    fn release(&self, id: &EffectId, generation: u64) {
        let mut tasks = self.lock();
        if tasks.get(id).is_some_and(|(current, _)| *current == generation) {
            tasks.remove(id);
        }
    }

    fn cancel(&self, id: &EffectId) -> bool {
        let Some((_, handle)) = self.lock().remove(id) else {
            return false;
        };
        handle.abort();
        true
    }

    fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self.lock().drain().collect();
        for (_, (_, handle)) in &drained {
            handle.abort();
        }
        drained.len()
    }

    fn contains(&self, id: &EffectId) -> bool {
        self.lock().contains_key(id)
    }
}

/// Label used for per-effect-type metrics
const fn effect_kind<A>(effect: &Effect<A>) -> &'static str {
    match effect {
        Effect::None => "none",
        Effect::Parallel(_) => "parallel",
        Effect::Sequential(_) => "sequential",
        Effect::Delay { .. } => "delay",
        Effect::Future(_) => "future",
        Effect::Cancellable { .. } => "cancellable",
        Effect::Cancel(_) => "cancel",
    }
}

/// Store runtime for coordinating reducer execution and effect handling.
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, CancellableRegistry, DecrementGuard,
        Duration, Effect, EffectHandle, EffectId, EffectTracking, Ordering, Reducer, RwLock,
        StoreConfig, StoreError, Transition, effect_kind,
    };
    use futures::{Stream, StreamExt, future::BoxFuture};
    use tokio::sync::{broadcast, watch};

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (an `Arc` snapshot behind `RwLock`, replaced copy-on-write)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop)
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<Arc<S>>>,
        snapshots: Arc<watch::Sender<Arc<S>>>,
        reducer: R,
        environment: E,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        cancellables: Arc<CancellableRegistry>,
        default_shutdown_timeout: Duration,
        /// Actions produced by effects (timers, futures, subscriptions)
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
        A: Clone + Send + 'static,
        S: Clone + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// Uses [`StoreConfig::default()`].
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Create a new Store with custom configuration
        #[must_use]
        pub fn with_config(
            initial_state: S,
            reducer: R,
            environment: E,
            config: StoreConfig,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));
            let initial = Arc::new(initial_state);
            let (snapshots, _) = watch::channel(Arc::clone(&initial));

            Self {
                state: Arc::new(RwLock::new(initial)),
                snapshots: Arc::new(snapshots),
                reducer,
                environment,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                cancellables: Arc::new(CancellableRegistry::default()),
                default_shutdown_timeout: config.default_shutdown_timeout,
                action_broadcast,
            }
        }

        /// Whether shutdown has been initiated
        #[must_use]
        pub fn is_shutting_down(&self) -> bool {
            self.shutdown.load(Ordering::Acquire)
        }

        /// Shutdown timeout taken from the store's configuration
        #[must_use]
        pub const fn default_shutdown_timeout(&self) -> Duration {
            self.default_shutdown_timeout
        }

        /// Initiate graceful shutdown of the store
        ///
        /// This method:
        /// 1. Sets the shutdown flag (rejecting new actions)
        /// 2. Aborts every cancellable effect and subscription
        /// 3. Waits for the remaining effects to complete (with timeout)
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            self.shutdown.store(true, Ordering::Release);

            let cancelled = self.cancellables.cancel_all();
            if cancelled > 0 {
                tracing::debug!(cancelled, "Aborted cancellable effects");
                metrics::counter!("store.effects.cancelled")
                    .increment(u64::try_from(cancelled).unwrap_or(u64::MAX));
            }

            let start = tokio::time::Instant::now();
            let poll_interval = Duration::from_millis(10);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    metrics::counter!("store.shutdown.completed").increment(1);
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(
                        pending_effects = pending,
                        "Shutdown timeout: {} effects still running", pending
                    );
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tracing::trace!(pending_effects = pending, "Waiting for effects to complete");
                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Send an action to the store
        ///
        /// 1. Acquires write lock on state
        /// 2. Calls reducer with (state, action, environment)
        /// 3. Publishes the new snapshot
        /// 4. Starts the returned effects
        ///
        /// Concurrent `send()` calls serialize at the reducer: each command
        /// is fully applied before the next one sees the state.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            self.dispatch(action).await.map(|transition| transition.handle)
        }

        /// Send an action and return the snapshots on both sides of it
        ///
        /// Lets callers react to the state delta of exactly this command,
        /// even when other tasks are sending concurrently.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        pub async fn dispatch(&self, action: A) -> Result<Transition<S>, StoreError> {
            if self.is_shutting_down() {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            tracing::debug!("Processing action");
            metrics::counter!("store.commands.total").increment(1);

            let (handle, tracking) = EffectHandle::new();

            let (before, after, effects) = {
                let mut current = self.state.write().await;
                tracing::trace!("Acquired write lock on state");

                let span = tracing::debug_span!("reducer_execution");
                let _enter = span.enter();

                let before = Arc::clone(&current);
                let start = std::time::Instant::now();
                // `before` and published snapshots keep their copy; the reducer works on a fresh one
                let effects =
                    self.reducer
                        .reduce(Arc::make_mut(&mut *current), action, &self.environment);
                metrics::histogram!("store.reducer.duration_seconds")
                    .record(start.elapsed().as_secs_f64());

                let after = Arc::clone(&current);
                self.snapshots.send_replace(Arc::clone(&after));

                tracing::trace!("Reducer completed, returned {} effects", effects.len());
                (before, after, effects)
            };

            for effect in effects {
                self.execute_effect_internal(effect, tracking.clone());
            }

            Ok(Transition {
                before,
                after,
                handle,
            })
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let tally = store.state(|s| s.tally).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&state)
        }

        /// Current immutable snapshot
        ///
        /// Later commands never mutate the returned value.
        pub async fn snapshot(&self) -> Arc<S> {
            Arc::clone(&*self.state.read().await)
        }

        /// Subscribe to snapshots, pushed after every command
        ///
        /// A slow reader only ever sees the latest snapshot, which is what a
        /// render loop wants.
        #[must_use]
        pub fn subscribe_state(&self) -> watch::Receiver<Arc<S>> {
            self.snapshots.subscribe()
        }

        /// Subscribe to all actions produced by effects
        ///
        /// Only actions fed back by effects are broadcast, not the commands
        /// sent through [`Store::send`].
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Forward every item of `actions` to the store until the stream ends
        ///
        /// The forwarding task is registered under `id`, so it can be stopped
        /// with [`Store::cancel`] and is aborted on shutdown.
        pub fn subscribe<St>(&self, id: EffectId, actions: St)
        where
            St: Stream<Item = A> + Send + 'static,
        {
            if self.is_shutting_down() {
                tracing::debug!(subscription = %id, "Ignoring subscription during shutdown");
                return;
            }

            tracing::debug!(subscription = %id, "Starting subscription");
            let pending_guard = AtomicCounterGuard::acquire(&self.pending_effects);
            let store = self.clone();

            self.cancellables.spawn(id, async move {
                let _pending_guard = pending_guard;
                let mut actions = Box::pin(actions);

                while let Some(action) = actions.next().await {
                    if store.send(action).await.is_err() {
                        break;
                    }
                }
                tracing::trace!("Subscription stream ended");
            });
        }

        /// Abort the cancellable effect or subscription registered under `id`
        ///
        /// Returns `false` if nothing was running under that id.
        pub fn cancel(&self, id: &EffectId) -> bool {
            let cancelled = self.cancellables.cancel(id);
            if cancelled {
                tracing::debug!(effect_id = %id, "Cancelled effect");
                metrics::counter!("store.effects.cancelled").increment(1);
            }
            cancelled
        }

        /// Whether a cancellable effect or subscription is running under `id`
        #[must_use]
        pub fn is_scheduled(&self, id: &EffectId) -> bool {
            self.cancellables.contains(id)
        }

        /// Execute an effect with tracking
        ///
        /// `None`, `Parallel`, `Cancel` and `Cancellable` are handled in
        /// place; everything else runs in its own task.
        #[allow(clippy::needless_pass_by_value)] // tracking is cloned per spawned task
        fn execute_effect_internal(&self, effect: Effect<A>, tracking: EffectTracking) {
            metrics::counter!("store.effects.executed", "type" => effect_kind(&effect))
                .increment(1);

            match effect {
                Effect::None => {
                    tracing::trace!("Executing Effect::None (no-op)");
                },
                Effect::Parallel(effects) => {
                    tracing::trace!("Executing Effect::Parallel with {} effects", effects.len());
                    for effect in effects {
                        self.execute_effect_internal(effect, tracking.clone());
                    }
                },
                Effect::Cancel(id) => {
                    self.cancel(&id);
                },
                Effect::Cancellable { id, effect } => {
                    self.spawn_cancellable(id, *effect, Some(tracking));
                },
                effect @ (Effect::Future(_) | Effect::Delay { .. } | Effect::Sequential(_)) => {
                    tracking.increment();
                    let pending_guard = AtomicCounterGuard::acquire(&self.pending_effects);
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guard = DecrementGuard(tracking);
                        let _pending_guard = pending_guard;
                        store.run_effect(effect).await;
                    });
                },
            }
        }

        /// Spawn `effect` as an abortable task registered under `id`
        fn spawn_cancellable(&self, id: EffectId, effect: Effect<A>, tracking: Option<EffectTracking>) {
            if self.is_shutting_down() {
                tracing::debug!(effect_id = %id, "Skipping cancellable effect during shutdown");
                return;
            }

            tracing::trace!(effect_id = %id, "Scheduling cancellable effect");
            let guard = tracking.map(|tracking| {
                tracking.increment();
                DecrementGuard(tracking)
            });
            let pending_guard = AtomicCounterGuard::acquire(&self.pending_effects);
            let store = self.clone();

            self.cancellables.spawn(id, async move {
                let _guard = guard;
                let _pending_guard = pending_guard;
                store.run_effect(effect).await;
            });
        }

        /// Run an effect to completion inside the current task
        ///
        /// Aborting the task therefore aborts the whole effect tree, which is
        /// what makes [`Effect::Cancellable`] work for delays and sequences.
        fn run_effect(&self, effect: Effect<A>) -> BoxFuture<'_, ()> {
            Box::pin(async move {
                match effect {
                    Effect::None => {},
                    Effect::Future(fut) => {
                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action, sending to store");
                            self.feed_back(action).await;
                        } else {
                            tracing::trace!("Effect::Future completed with no action");
                        }
                    },
                    Effect::Delay { duration, action } => {
                        tracing::trace!("Executing Effect::Delay (duration: {:?})", duration);
                        tokio::time::sleep(duration).await;
                        tracing::trace!("Effect::Delay completed, sending action");
                        self.feed_back(*action).await;
                    },
                    Effect::Parallel(effects) => {
                        futures::future::join_all(
                            effects.into_iter().map(|effect| self.run_effect(effect)),
                        )
                        .await;
                    },
                    Effect::Sequential(effects) => {
                        let effect_count = effects.len();
                        for (idx, effect) in effects.into_iter().enumerate() {
                            tracing::trace!(
                                "Executing sequential effect {} of {}",
                                idx + 1,
                                effect_count
                            );
                            self.run_effect(effect).await;
                        }
                    },
                    Effect::Cancellable { id, effect } => {
                        self.spawn_cancellable(id, *effect, None);
                    },
                    Effect::Cancel(id) => {
                        self.cancel(&id);
                    },
                }
            })
        }

        /// Broadcast an effect-produced action and send it back to the reducer
        async fn feed_back(&self, action: A) {
            let _ = self.action_broadcast.send(action.clone());

            if let Err(error) = self.send(action).await {
                tracing::debug!(%error, "Dropped action produced by effect");
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                snapshots: Arc::clone(&self.snapshots),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                cancellables: Arc::clone(&self.cancellables),
                default_shutdown_timeout: self.default_shutdown_timeout,
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }
}

// Re-export for convenience
pub use store::Store;

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can unwrap
mod tests {
    use super::*;
    use tally_core::{SmallVec, smallvec};

    #[derive(Debug, Clone, Default)]
    struct TestState {
        value: i32,
    }

    #[derive(Debug, Clone)]
    enum TestAction {
        Increment,
        Decrement,
        NoOp,
        ProduceEffect,
        ProduceDelayedAction,
        ProduceParallelEffects,
        ProduceSequentialEffects,
        ScheduleTimer,
        CancelTimer,
    }

    const TIMER: EffectId = EffectId::new("timer");

    #[derive(Debug, Clone)]
    struct TestEnv;

    #[derive(Debug, Clone)]
    struct TestReducer;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = TestEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                TestAction::Increment => {
                    state.value += 1;
                    smallvec![Effect::None]
                },
                TestAction::Decrement => {
                    state.value -= 1;
                    smallvec![Effect::None]
                },
                TestAction::NoOp => smallvec![Effect::None],
                TestAction::ProduceEffect => {
                    smallvec![Effect::Future(Box::pin(async { Some(TestAction::Increment) }))]
                },
                TestAction::ProduceDelayedAction => smallvec![Effect::Delay {
                    duration: Duration::from_millis(10),
                    action: Box::new(TestAction::Increment),
                }],
                TestAction::ProduceParallelEffects => smallvec![Effect::Parallel(vec![
                    Effect::Future(Box::pin(async { Some(TestAction::Increment) })),
                    Effect::Future(Box::pin(async { Some(TestAction::Increment) })),
                    Effect::Future(Box::pin(async { Some(TestAction::Increment) })),
                ])],
                TestAction::ProduceSequentialEffects => smallvec![Effect::Sequential(vec![
                    Effect::Future(Box::pin(async { Some(TestAction::Increment) })),
                    Effect::Future(Box::pin(async { Some(TestAction::Increment) })),
                    Effect::Future(Box::pin(async { Some(TestAction::Decrement) })),
                ])],
                TestAction::ScheduleTimer => smallvec![
                    Effect::Delay {
                        duration: Duration::from_secs(5),
                        action: Box::new(TestAction::Increment),
                    }
                    .cancellable(TIMER)
                ],
                TestAction::CancelTimer => smallvec![Effect::Cancel(TIMER)],
            }
        }
    }

    fn test_store() -> Store<TestState, TestAction, TestEnv, TestReducer> {
        Store::new(TestState::default(), TestReducer, TestEnv)
    }

    #[tokio::test]
    async fn test_store_creation() {
        let store = test_store();

        let value = store.state(|s| s.value).await;
        assert_eq!(value, 0);
    }

    #[tokio::test]
    async fn test_multiple_actions() {
        let store = test_store();

        let _ = store.send(TestAction::Increment).await;
        let _ = store.send(TestAction::Increment).await;
        let _ = store.send(TestAction::Decrement).await;

        let value = store.state(|s| s.value).await;
        assert_eq!(value, 1);
    }

    #[tokio::test]
    async fn test_effect_none() {
        let store = test_store();

        let _ = store.send(TestAction::NoOp).await;
        let value = store.state(|s| s.value).await;
        assert_eq!(value, 0);
    }

    #[tokio::test]
    async fn test_effect_future() {
        let store = test_store();

        let mut handle = store.send(TestAction::ProduceEffect).await.unwrap();
        handle.wait().await;

        let value = store.state(|s| s.value).await;
        assert_eq!(value, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_effect_delay() {
        let store = test_store();

        let _ = store.send(TestAction::ProduceDelayedAction).await;

        // Value should still be 0 immediately
        let value = store.state(|s| s.value).await;
        assert_eq!(value, 0);

        tokio::time::sleep(Duration::from_millis(50)).await;

        let value = store.state(|s| s.value).await;
        assert_eq!(value, 1);
    }

    #[tokio::test]
    async fn test_effect_parallel() {
        let store = test_store();

        let mut handle = store.send(TestAction::ProduceParallelEffects).await.unwrap();
        handle.wait().await;

        let value = store.state(|s| s.value).await;
        assert_eq!(value, 3);
    }

    #[tokio::test]
    async fn test_effect_sequential() {
        let store = test_store();

        let mut handle = store.send(TestAction::ProduceSequentialEffects).await.unwrap();
        handle.wait().await;

        let value = store.state(|s| s.value).await;
        assert_eq!(value, 1);
    }

    #[tokio::test]
    async fn test_dispatch_returns_both_snapshots() {
        let store = test_store();
        let _ = store.send(TestAction::Increment).await;

        let transition = store.dispatch(TestAction::Increment).await.unwrap();

        assert_eq!(transition.before.value, 1);
        assert_eq!(transition.after.value, 2);
    }

    #[tokio::test]
    async fn test_snapshot_is_not_mutated_by_later_commands() {
        let store = test_store();
        let _ = store.send(TestAction::Increment).await;

        let snapshot = store.snapshot().await;
        let _ = store.send(TestAction::Increment).await;
        let _ = store.send(TestAction::Increment).await;

        assert_eq!(snapshot.value, 1);
        assert_eq!(store.snapshot().await.value, 3);
    }

    #[tokio::test]
    async fn test_subscribe_state_sees_latest_snapshot() {
        let store = test_store();
        let mut rx = store.subscribe_state();
        assert_eq!(rx.borrow_and_update().value, 0);

        let _ = store.send(TestAction::Increment).await;

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().value, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellable_timer_fires() {
        let store = test_store();

        let _ = store.send(TestAction::ScheduleTimer).await;
        assert!(store.is_scheduled(&TIMER));

        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(store.state(|s| s.value).await, 1);
        assert!(!store.is_scheduled(&TIMER));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_effect_stops_timer() {
        let store = test_store();

        let mut handle = store.send(TestAction::ScheduleTimer).await.unwrap();
        let _ = store.send(TestAction::CancelTimer).await;
        handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(store.state(|s| s.value).await, 0);
        assert!(!store.is_scheduled(&TIMER));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rescheduling_replaces_timer() {
        let store = test_store();

        let _ = store.send(TestAction::ScheduleTimer).await;
        tokio::time::sleep(Duration::from_secs(3)).await;
        let _ = store.send(TestAction::ScheduleTimer).await;

        // The first timer would have fired at t=5
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(store.state(|s| s.value).await, 0);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_timers_and_rejects_actions() {
        let store = test_store();
        let _ = store.send(TestAction::ScheduleTimer).await;

        store.shutdown(Duration::from_secs(1)).await.unwrap();

        assert!(!store.is_scheduled(&TIMER));
        assert!(matches!(
            store.send(TestAction::Increment).await,
            Err(StoreError::ShutdownInProgress)
        ));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(store.state(|s| s.value).await, 0);
    }

    #[tokio::test]
    async fn test_subscribe_forwards_stream_items() {
        let store = test_store();
        let mut rx = store.subscribe_state();

        store.subscribe(
            EffectId::new("feed"),
            futures::stream::iter(vec![TestAction::Increment, TestAction::Increment]),
        );

        while rx.borrow_and_update().value < 2 {
            rx.changed().await.unwrap();
        }
        assert_eq!(store.state(|s| s.value).await, 2);
    }

    #[tokio::test]
    async fn test_subscribe_actions_sees_fed_back_actions() {
        let store = test_store();
        let mut rx = store.subscribe_actions();

        let _ = store.send(TestAction::ProduceEffect).await;

        let action = rx.recv().await.unwrap();
        assert!(matches!(action, TestAction::Increment));
    }

    #[tokio::test]
    async fn test_completed_handle() {
        let mut handle = EffectHandle::completed();
        assert_eq!(handle.pending(), 0);
        handle.wait_with_timeout(Duration::from_millis(10)).await.unwrap();
    }
}
