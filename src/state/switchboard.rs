//! The switchboard: the committed, read-shared dispatch state.
//!
//! Holds the live command table and event-listener table behind a single
//! swappable snapshot. The loader computes a fully validated replacement and
//! commits it in one swap, so a dispatch that began mid-transaction sees the
//! pre- or post-transaction state, never a partially mutated one.
//!
//! The switchboard also owns the event bus and the error-recovery wrapper,
//! since both need nothing beyond the committed listener table.

use super::table::{Check, CommandTable};
use crate::context::{Context, Globals};
use crate::error::{HandlerError, ModuleId};
use crate::events::{EventArgs, EventName, EventOutcome, EventVerdict};
use crate::module::{ArgValue, CommandHandler, EventListener, GuardHook, Hooks, LifecycleHook};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Event-listener blocks for every loaded module, in module-load order.
pub type EventTable = im::Vector<ModuleListeners>;

/// One module's event listeners, ordered per event by declaration.
#[derive(Clone)]
pub struct ModuleListeners {
    /// The owning module.
    pub module: ModuleId,
    /// Listener lists keyed by event.
    pub listeners: im::HashMap<EventName, im::Vector<Arc<dyn EventListener>>>,
}

impl std::fmt::Debug for ModuleListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: Vec<(&EventName, usize)> = self
            .listeners
            .iter()
            .map(|(event, list)| (event, list.len()))
            .collect();
        f.debug_struct("ModuleListeners")
            .field("module", &self.module)
            .field("listeners", &counts)
            .finish()
    }
}

impl ModuleListeners {
    /// An empty block for `module`.
    pub fn new(module: impl Into<ModuleId>) -> Self {
        Self {
            module: module.into(),
            listeners: im::HashMap::new(),
        }
    }

    /// Append a listener for `event`, preserving declaration order.
    pub fn push(&mut self, event: EventName, listener: Arc<dyn EventListener>) {
        let mut list = self.listeners.get(&event).cloned().unwrap_or_default();
        list.push_back(listener);
        self.listeners.insert(event, list);
    }

    /// Whether this block holds no listeners at all.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

/// The committed dispatch state.
#[derive(Clone, Default)]
pub struct Committed {
    /// The live command table.
    pub table: CommandTable,
    /// The live event-listener table.
    pub listeners: EventTable,
}

/// Central shared state: committed snapshot, event bus, error recovery.
pub struct Switchboard {
    committed: RwLock<Arc<Committed>>,
}

impl Default for Switchboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Switchboard {
    /// An empty switchboard.
    pub fn new() -> Self {
        Self {
            committed: RwLock::new(Arc::new(Committed::default())),
        }
    }

    /// The current committed snapshot.
    pub async fn snapshot(&self) -> Arc<Committed> {
        self.committed.read().await.clone()
    }

    /// Swap in a new committed state. Loader-only.
    pub(crate) async fn commit(&self, next: Committed) {
        *self.committed.write().await = Arc::new(next);
    }

    /// Fire a global event.
    ///
    /// Listeners run in module-load order, then declaration order; the first
    /// verdict returned short-circuits the rest. A listener failure on a
    /// non-`error` event fires the `error` event with a diagnostic and halts
    /// processing; failures of `error` listeners are skipped so error
    /// handling never recurses into itself.
    pub async fn call_event(&self, event: &EventName, args: &mut EventArgs<'_>) -> EventOutcome {
        let snapshot = self.snapshot().await;
        for block in snapshot.listeners.iter() {
            let Some(list) = block.listeners.get(event) else {
                continue;
            };
            for listener in list.iter() {
                match listener.on_event(args).await {
                    Ok(Some(verdict)) => return Some(verdict),
                    Ok(None) => {}
                    Err(error) => {
                        if *event == EventName::Error {
                            continue;
                        }
                        warn!(
                            event = %event,
                            module = %block.module,
                            error = %error,
                            "event listener failed"
                        );
                        let diagnostic = HandlerError::Listener {
                            event: event.as_str().to_string(),
                            message: error.to_string(),
                        };
                        self.fire_error(&diagnostic, args.context()).await;
                        return Some(EventVerdict::Halt);
                    }
                }
            }
        }
        None
    }

    /// Fire the `error` event directly. Listener failures are swallowed.
    async fn fire_error(&self, error: &HandlerError, ctx: Option<&Context>) {
        let snapshot = self.snapshot().await;
        for block in snapshot.listeners.iter() {
            let Some(list) = block.listeners.get(&EventName::Error) else {
                continue;
            };
            for listener in list.iter() {
                let mut args = EventArgs::Error { error, ctx };
                match listener.on_event(&mut args).await {
                    Ok(Some(_)) => return,
                    Ok(None) => {}
                    Err(inner) => {
                        warn!(module = %block.module, error = %inner, "error listener failed");
                    }
                }
            }
        }
    }

    /// Route a handler failure through the recovery chain.
    ///
    /// The owner's local `on_error` hook runs first when present: returning
    /// `Ok(true)` marks the error handled and suppresses the global event,
    /// `Ok(false)` escalates the original error, and a hook failure
    /// escalates the hook's own error instead.
    pub async fn absorb_failure(
        &self,
        hooks: Option<&Hooks>,
        error: HandlerError,
        ctx: Option<&Context>,
    ) {
        debug!(error = %error, "handler failed");
        if let Some(hook) = hooks.and_then(|h| h.on_error.as_ref()) {
            match hook.on_error(&error, ctx).await {
                Ok(true) => return,
                Ok(false) => {}
                Err(hook_error) => {
                    self.fire_error(&hook_error, ctx).await;
                    return;
                }
            }
        }
        self.fire_error(&error, ctx).await;
    }

    /// Invoke a command handler inside the recovery wrapper.
    ///
    /// Returns whether execution completed normally; callers must stop
    /// further per-command side effects on `false`.
    pub async fn try_invoke(
        &self,
        hooks: &Hooks,
        handler: &Arc<dyn CommandHandler>,
        ctx: &mut Context,
        args: Vec<ArgValue>,
    ) -> bool {
        match handler.invoke(ctx, args).await {
            Ok(()) => true,
            Err(error) => {
                self.absorb_failure(Some(hooks), error, Some(&*ctx)).await;
                false
            }
        }
    }

    /// Run a subtree check inside the recovery wrapper.
    ///
    /// A failed check and a check that returned `false` both abort descent.
    pub async fn try_check(&self, check: &Check, ctx: &mut Context) -> bool {
        match check.handler.check(ctx).await {
            Ok(passed) => passed,
            Err(error) => {
                self.absorb_failure(Some(check.hooks.as_ref()), error, Some(&*ctx))
                    .await;
                false
            }
        }
    }

    /// Run a local guard hook inside the recovery wrapper.
    ///
    /// A failed guard yields `Halt` so the dispatch stops exactly as it
    /// would for an explicit veto.
    pub async fn try_guard(
        &self,
        hooks: &Hooks,
        hook: &Arc<dyn GuardHook>,
        ctx: &mut Context,
    ) -> EventOutcome {
        match hook.guard(ctx).await {
            Ok(outcome) => outcome,
            Err(error) => {
                self.absorb_failure(Some(hooks), error, Some(&*ctx)).await;
                Some(EventVerdict::Halt)
            }
        }
    }

    /// Run a lifecycle hook or interval job inside the recovery wrapper.
    pub async fn try_lifecycle(
        &self,
        hooks: &Hooks,
        hook: &Arc<dyn LifecycleHook>,
        globals: &Globals,
    ) -> bool {
        match hook.run(globals).await {
            Ok(()) => true,
            Err(error) => {
                self.absorb_failure(Some(hooks), error, None).await;
                false
            }
        }
    }
}
