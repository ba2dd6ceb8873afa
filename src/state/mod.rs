//! Shared dispatch state: the command table, the per-module registry that
//! can undo a module's contribution, the transactional staging algorithm,
//! and the switchboard holding the committed snapshot.

mod registry;
mod stage;
mod switchboard;
mod table;

pub use registry::{
    GroupRuntime, IntervalRuntime, ModuleRecord, NestedContribution, remove_contribution,
};
pub use stage::{StagedModule, stage_module};
pub use switchboard::{Committed, EventTable, ModuleListeners, Switchboard};
pub use table::{Check, CommandTable, Fallback, Leaf, SubTree, TableEntry};
