//! The module loader: load, unload, and reload as serialized transactions
//! against the committed command table and module registry.
//!
//! Every public operation takes the single transaction lock for its whole
//! batch, so two module transactions never interleave. Dispatch reads are
//! not locked at all: the loader computes a fully validated replacement
//! state and commits it with one snapshot swap.

pub mod intervals;

use crate::context::Globals;
use crate::error::{LoadError, ModuleId};
use crate::events::{EventArgs, EventName};
use crate::module::ModuleResolver;
use crate::state::{
    Committed, EventTable, ModuleListeners, ModuleRecord, StagedModule, Switchboard,
    remove_contribution, stage_module,
};
use intervals::JobHandle;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// A combined unload/reload/load request.
///
/// Removals run first (freeing names before any rename collision), then
/// reloads, then additions; errors from all three phases are aggregated.
#[derive(Default)]
pub struct ReloadPlan {
    /// Module ids to load.
    pub add: Vec<ModuleId>,
    /// Module ids to unload.
    pub remove: Vec<ModuleId>,
    /// Module ids to reload.
    pub reload: Vec<ModuleId>,
}

#[derive(Default)]
struct LoaderState {
    registry: HashMap<ModuleId, ModuleRecord>,
    jobs: HashMap<ModuleId, Vec<JobHandle>>,
}

/// The module loader.
pub struct ModuleLoader {
    switchboard: Arc<Switchboard>,
    resolver: Arc<dyn ModuleResolver>,
    txn: Mutex<LoaderState>,
}

impl ModuleLoader {
    /// Build a loader around a resolver, with an empty committed state.
    pub fn new(resolver: Arc<dyn ModuleResolver>) -> Self {
        Self {
            switchboard: Arc::new(Switchboard::new()),
            resolver,
            txn: Mutex::new(LoaderState::default()),
        }
    }

    /// The committed dispatch state this loader writes to.
    pub fn switchboard(&self) -> &Arc<Switchboard> {
        &self.switchboard
    }

    /// Ids of currently loaded modules, sorted.
    pub async fn loaded(&self) -> Vec<ModuleId> {
        let state = self.txn.lock().await;
        let mut ids: Vec<ModuleId> = state.registry.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Whether a module id is currently loaded.
    pub async fn is_loaded(&self, id: &str) -> bool {
        self.txn.lock().await.registry.contains_key(id)
    }

    /// Load modules. A failing id is recorded and skipped; the rest of the
    /// batch proceeds.
    pub async fn load<I, S>(&self, globals: &Arc<Globals>, ids: I) -> Vec<LoadError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = self.txn.lock().await;
        let mut errors = Vec::new();
        for id in ids {
            if let Err(error) = self.load_one(&mut state, globals, id.as_ref()).await {
                errors.push(error);
            }
        }
        errors
    }

    /// Unload modules. Unloading an id that was never loaded is an error
    /// for that id only.
    pub async fn unload<I, S>(&self, globals: &Arc<Globals>, ids: I) -> Vec<LoadError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = self.txn.lock().await;
        let mut errors = Vec::new();
        for id in ids {
            if let Err(error) = self.unload_one(&mut state, globals, id.as_ref()).await {
                errors.push(error);
            }
        }
        errors
    }

    /// Reload modules: stage the new version, then retire the old one under
    /// the same id, with a single commit so readers never observe the module
    /// missing. Reloading an id that was never loaded behaves as a load.
    pub async fn reload<I, S>(&self, globals: &Arc<Globals>, ids: I) -> Vec<LoadError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = self.txn.lock().await;
        let mut errors = Vec::new();
        for id in ids {
            if let Err(error) = self.reload_one(&mut state, globals, id.as_ref()).await {
                errors.push(error);
            }
        }
        errors
    }

    /// Apply a combined plan under one transaction lock.
    pub async fn handle_reload(&self, globals: &Arc<Globals>, plan: ReloadPlan) -> Vec<LoadError> {
        let mut state = self.txn.lock().await;
        let mut errors = Vec::new();
        for id in &plan.remove {
            if let Err(error) = self.unload_one(&mut state, globals, id).await {
                errors.push(error);
            }
        }
        for id in &plan.reload {
            if let Err(error) = self.reload_one(&mut state, globals, id).await {
                errors.push(error);
            }
        }
        for id in &plan.add {
            if let Err(error) = self.load_one(&mut state, globals, id).await {
                errors.push(error);
            }
        }
        errors
    }

    async fn load_one(
        &self,
        state: &mut LoaderState,
        globals: &Arc<Globals>,
        id: &str,
    ) -> Result<(), LoadError> {
        if state.registry.contains_key(id) {
            return Err(LoadError::AlreadyLoaded(id.to_string()));
        }
        let spec = self.resolver.resolve(id).await?;
        let snapshot = self.switchboard.snapshot().await;
        let StagedModule {
            table,
            record,
            listeners,
        } = stage_module(&snapshot.table, id, &spec, None)?;

        self.run_load_hooks(globals, &record).await;

        let mut event_table = snapshot.listeners.clone();
        if !listeners.is_empty() {
            event_table.push_back(listeners);
        }
        self.switchboard
            .commit(Committed {
                table,
                listeners: event_table,
            })
            .await;

        let handles = intervals::schedule_module(
            &self.switchboard,
            globals,
            id,
            &record.intervals,
            HashMap::new(),
        );
        state.jobs.insert(id.to_string(), handles);
        state.registry.insert(id.to_string(), record);
        info!(module = %id, "module loaded");
        Ok(())
    }

    async fn unload_one(
        &self,
        state: &mut LoaderState,
        globals: &Arc<Globals>,
        id: &str,
    ) -> Result<(), LoadError> {
        let Some(record) = state.registry.remove(id) else {
            return Err(LoadError::NotLoaded(id.to_string()));
        };

        self.run_unload_hooks(globals, &record).await;

        let snapshot = self.switchboard.snapshot().await;
        let table = remove_contribution(&snapshot.table, &record);
        let listeners: EventTable = snapshot
            .listeners
            .iter()
            .filter(|block| block.module != id)
            .cloned()
            .collect();
        self.switchboard.commit(Committed { table, listeners }).await;

        if let Some(handles) = state.jobs.remove(id) {
            for handle in handles {
                handle.stop();
            }
        }
        info!(module = %id, "module unloaded");
        Ok(())
    }

    async fn reload_one(
        &self,
        state: &mut LoaderState,
        globals: &Arc<Globals>,
        id: &str,
    ) -> Result<(), LoadError> {
        let prior = state.registry.get(id).cloned();
        let spec = self.resolver.resolve(id).await?;
        let snapshot = self.switchboard.snapshot().await;
        let StagedModule {
            table,
            record,
            listeners,
        } = stage_module(&snapshot.table, id, &spec, prior.as_ref())?;

        // New version's hooks first, then the retiring version's.
        self.run_load_hooks(globals, &record).await;
        if let Some(old) = &prior {
            self.run_unload_hooks(globals, old).await;
        }

        let event_table = replace_listener_block(&snapshot.listeners, id, listeners);
        self.switchboard
            .commit(Committed {
                table,
                listeners: event_table,
            })
            .await;

        let prior_handles: HashMap<String, JobHandle> = state
            .jobs
            .remove(id)
            .map(|handles| {
                handles
                    .into_iter()
                    .map(|handle| (handle.key().to_string(), handle))
                    .collect()
            })
            .unwrap_or_default();
        let handles = intervals::schedule_module(
            &self.switchboard,
            globals,
            id,
            &record.intervals,
            prior_handles,
        );
        state.jobs.insert(id.to_string(), handles);
        state.registry.insert(id.to_string(), record);
        info!(module = %id, reloaded = prior.is_some(), "module reloaded");
        Ok(())
    }

    async fn run_load_hooks(&self, globals: &Arc<Globals>, record: &ModuleRecord) {
        for group in &record.groups {
            if let Some(hook) = group.hooks.on_load.clone() {
                self.switchboard
                    .try_lifecycle(&group.hooks, &hook, globals)
                    .await;
            }
        }
        self.switchboard
            .call_event(&EventName::OnLoad, &mut EventArgs::Lifecycle(globals))
            .await;
    }

    async fn run_unload_hooks(&self, globals: &Arc<Globals>, record: &ModuleRecord) {
        for group in &record.groups {
            if let Some(hook) = group.hooks.on_unload.clone() {
                self.switchboard
                    .try_lifecycle(&group.hooks, &hook, globals)
                    .await;
            }
        }
        self.switchboard
            .call_event(&EventName::OnUnload, &mut EventArgs::Lifecycle(globals))
            .await;
    }
}

/// Replace a module's listener block in place, preserving module-load order
/// for unchanged modules; an empty replacement removes the block.
fn replace_listener_block(
    table: &EventTable,
    id: &str,
    replacement: ModuleListeners,
) -> EventTable {
    let mut replaced = false;
    let mut out: EventTable = table
        .iter()
        .filter_map(|block| {
            if block.module == id {
                if replacement.is_empty() {
                    None
                } else {
                    replaced = true;
                    Some(replacement.clone())
                }
            } else {
                Some(block.clone())
            }
        })
        .collect();
    if !replaced && !replacement.is_empty() {
        out.push_back(replacement);
    }
    out
}
