//! Per-module registry records: the undo log that reverses exactly one
//! module's contribution to the shared command table.

use super::table::{CommandTable, TableEntry};
use crate::error::ModuleId;
use crate::module::{Hooks, IntervalSpec};
use std::sync::Arc;

/// One owning group of a loaded module, kept for lifecycle-hook dispatch.
#[derive(Debug, Clone)]
pub struct GroupRuntime {
    /// Group name, for diagnostics.
    pub name: String,
    /// The group's hooks.
    pub hooks: Arc<Hooks>,
}

/// An interval job together with its owning group's hooks (for routing
/// job failures through the local error hook).
#[derive(Debug, Clone)]
pub struct IntervalRuntime {
    /// The declared job.
    pub spec: IntervalSpec,
    /// The owning group's hooks.
    pub hooks: Arc<Hooks>,
}

/// What one module added under one nested prefix path.
#[derive(Debug, Clone, Default)]
pub struct NestedContribution {
    /// The normalized prefix path.
    pub path: Vec<String>,
    /// Child command names added at the final node.
    pub names: Vec<String>,
    /// Whether this module supplied the node's default command.
    pub default_cmd: bool,
    /// Whether this module supplied the node's not-found handler.
    pub not_found: bool,
    /// Check names this module attached at the node.
    pub checks: Vec<String>,
}

/// The registry entry for one loaded module: everything needed to reverse
/// its effect without touching other modules' contributions.
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    /// The module id.
    pub id: ModuleId,
    /// Owning groups, for lifecycle-hook dispatch on unload.
    pub groups: Vec<GroupRuntime>,
    /// Top-level command names (including aliases) the module added.
    pub top_level: Vec<String>,
    /// Nested contributions, one per group-with-parent.
    pub nested: Vec<NestedContribution>,
    /// Interval jobs to schedule for this module.
    pub intervals: Vec<IntervalRuntime>,
}

/// Produce a table equal to `table` minus exactly this module's additions.
///
/// Subtree nodes that end up carrying nothing (no children, no fallback
/// handlers, no checks) are pruned from their parent, cascading upward, so
/// unloading the last contributor to a prefix removes the prefix itself.
pub fn remove_contribution(table: &CommandTable, record: &ModuleRecord) -> CommandTable {
    let mut table = table.clone();
    for name in &record.top_level {
        table.remove(name);
    }
    for contribution in &record.nested {
        table = remove_nested(&table, &contribution.path, contribution);
    }
    table
}

fn remove_nested(
    table: &CommandTable,
    path: &[String],
    contribution: &NestedContribution,
) -> CommandTable {
    let Some(segment) = path.first() else {
        return table.clone();
    };
    let Some(TableEntry::Tree(node)) = table.get(segment) else {
        return table.clone();
    };
    let mut node = node.clone();

    if path.len() == 1 {
        for name in &contribution.names {
            node.children.remove(name);
        }
        if contribution.default_cmd {
            node.default_cmd = None;
        }
        if contribution.not_found {
            node.not_found = None;
        }
        if !contribution.checks.is_empty() {
            node.checks = node
                .checks
                .iter()
                .filter(|check| !contribution.checks.contains(&check.name))
                .cloned()
                .collect();
        }
    } else {
        node.children = remove_nested(&node.children, &path[1..], contribution);
    }

    let mut out = table.clone();
    if node.is_empty() {
        out.remove(segment);
    } else {
        out.insert(segment.clone(), TableEntry::Tree(node));
    }
    out
}
