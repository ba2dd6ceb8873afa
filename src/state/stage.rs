//! Transactional staging: merge one module's declared contribution into a
//! copy of the live command table.
//!
//! Staging never mutates the live table. It builds a new persistent value
//! and either returns it whole (with the registry record that can undo it)
//! or fails, leaving nothing to roll back.

use super::registry::{GroupRuntime, IntervalRuntime, ModuleRecord, NestedContribution};
use super::switchboard::ModuleListeners;
use super::table::{Check, CommandTable, Fallback, Leaf, SubTree, TableEntry};
use crate::error::LoadError;
use crate::loader::intervals::Schedule;
use crate::module::{GroupSpec, Hooks, ModuleSpec};
use std::collections::HashSet;
use std::sync::Arc;

/// The outcome of staging one module: the would-be table, the undo record,
/// and the module's event-listener block.
#[derive(Debug)]
pub struct StagedModule {
    /// The live table plus this module's contribution.
    pub table: CommandTable,
    /// The registry record reversing that contribution.
    pub record: ModuleRecord,
    /// The module's global event listeners, in declaration order.
    pub listeners: ModuleListeners,
}

/// Stage `spec` as module `id` against the live table.
///
/// When reloading, `prior` is the module's current registry record; its
/// contribution is removed first so staging is idempotent per id.
pub fn stage_module(
    live: &CommandTable,
    id: &str,
    spec: &ModuleSpec,
    prior: Option<&ModuleRecord>,
) -> Result<StagedModule, LoadError> {
    let mut table = match prior {
        Some(record) => super::registry::remove_contribution(live, record),
        None => live.clone(),
    };

    let mut record = ModuleRecord {
        id: id.to_string(),
        groups: Vec::new(),
        top_level: Vec::new(),
        nested: Vec::new(),
        intervals: Vec::new(),
    };
    let mut listeners = ModuleListeners::new(id);
    let mut job_keys: HashSet<String> = HashSet::new();

    for group in &spec.groups {
        let hooks = Arc::new(group.hooks.clone());
        record.groups.push(GroupRuntime {
            name: group.name.clone(),
            hooks: hooks.clone(),
        });

        match &group.parent {
            None => {
                if group.hooks.has_subtree_hooks() || !group.checks.is_empty() {
                    return Err(LoadError::ParentRequired {
                        group: group.name.clone(),
                        module: id.to_string(),
                    });
                }
                stage_top_level(&mut table, id, group, &hooks, &mut record)?;
            }
            Some(raw_path) => {
                let path = normalize_path(raw_path, group, id)?;
                let mut contribution = NestedContribution {
                    path: path.clone(),
                    ..NestedContribution::default()
                };
                table = insert_nested(&table, &path, &path, group, &hooks, id, &mut contribution)?;
                record.nested.push(contribution);
            }
        }

        for event in &group.events {
            listeners.push(event.event.clone(), event.listener.clone());
        }

        for job in &group.intervals {
            if !job_keys.insert(job.key.clone()) {
                return Err(LoadError::DuplicateInterval {
                    key: job.key.clone(),
                    module: id.to_string(),
                });
            }
            let valid = match &job.schedule {
                Schedule::Every(period) => !period.is_zero(),
                Schedule::Daily(times) => !times.is_empty(),
            };
            if !valid {
                return Err(LoadError::InvalidSchedule {
                    key: job.key.clone(),
                    module: id.to_string(),
                });
            }
            record.intervals.push(IntervalRuntime {
                spec: job.clone(),
                hooks: hooks.clone(),
            });
        }
    }

    Ok(StagedModule {
        table,
        record,
        listeners,
    })
}

fn stage_top_level(
    table: &mut CommandTable,
    id: &str,
    group: &GroupSpec,
    hooks: &Arc<Hooks>,
    record: &mut ModuleRecord,
) -> Result<(), LoadError> {
    for command in &group.commands {
        let spec = Arc::new(command.clone());
        for raw in std::iter::once(&command.name).chain(command.aliases.iter()) {
            let name = normalize_name(raw, id)?;
            if table.contains_key(&name) {
                return Err(LoadError::DuplicateCommand {
                    name,
                    module: id.to_string(),
                });
            }
            table.insert(
                name.clone(),
                TableEntry::Leaf(Leaf {
                    module: id.to_string(),
                    hooks: hooks.clone(),
                    spec: spec.clone(),
                }),
            );
            record.top_level.push(name);
        }
    }
    Ok(())
}

fn insert_nested(
    table: &CommandTable,
    path: &[String],
    full_path: &[String],
    group: &GroupSpec,
    hooks: &Arc<Hooks>,
    id: &str,
    contribution: &mut NestedContribution,
) -> Result<CommandTable, LoadError> {
    let segment = &path[0];
    let mut node = match table.get(segment) {
        None => SubTree::default(),
        Some(TableEntry::Tree(node)) => node.clone(),
        Some(TableEntry::Leaf(_)) => {
            return Err(LoadError::LeafConflict {
                segment: segment.clone(),
                module: id.to_string(),
            });
        }
    };

    if path.len() > 1 {
        node.children = insert_nested(
            &node.children,
            &path[1..],
            full_path,
            group,
            hooks,
            id,
            contribution,
        )?;
    } else {
        attach_group(&mut node, full_path, group, hooks, id, contribution)?;
    }

    let mut out = table.clone();
    out.insert(segment.clone(), TableEntry::Tree(node));
    Ok(out)
}

fn attach_group(
    node: &mut SubTree,
    full_path: &[String],
    group: &GroupSpec,
    hooks: &Arc<Hooks>,
    id: &str,
    contribution: &mut NestedContribution,
) -> Result<(), LoadError> {
    for command in &group.commands {
        let spec = Arc::new(command.clone());
        for raw in std::iter::once(&command.name).chain(command.aliases.iter()) {
            let name = normalize_name(raw, id)?;
            if node.children.contains_key(&name) {
                return Err(LoadError::DuplicateCommand {
                    name,
                    module: id.to_string(),
                });
            }
            node.children.insert(
                name.clone(),
                TableEntry::Leaf(Leaf {
                    module: id.to_string(),
                    hooks: hooks.clone(),
                    spec: spec.clone(),
                }),
            );
            contribution.names.push(name);
        }
    }

    if let Some(handler) = &group.hooks.on_default_command {
        if node.default_cmd.is_some() {
            return Err(LoadError::DefaultCommandExists {
                path: full_path.join(" "),
                module: id.to_string(),
            });
        }
        node.default_cmd = Some(Fallback {
            module: id.to_string(),
            hooks: hooks.clone(),
            handler: handler.clone(),
        });
        contribution.default_cmd = true;
    }

    if let Some(handler) = &group.hooks.on_command_not_found {
        if node.not_found.is_some() {
            return Err(LoadError::NotFoundExists {
                path: full_path.join(" "),
                module: id.to_string(),
            });
        }
        node.not_found = Some(Fallback {
            module: id.to_string(),
            hooks: hooks.clone(),
            handler: handler.clone(),
        });
        contribution.not_found = true;
    }

    for check in &group.checks {
        if node.checks.iter().any(|existing| existing.name == check.name) {
            return Err(LoadError::DuplicateCheck {
                name: check.name.clone(),
                path: full_path.join(" "),
                module: id.to_string(),
            });
        }
        node.checks.push_back(Check {
            name: check.name.clone(),
            module: id.to_string(),
            hooks: hooks.clone(),
            handler: check.handler.clone(),
        });
        contribution.checks.push(check.name.clone());
    }

    Ok(())
}

/// Case-fold and validate a command name or alias.
fn normalize_name(raw: &str, id: &str) -> Result<String, LoadError> {
    let name = raw.trim().to_lowercase();
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(LoadError::InvalidCommandName {
            name: raw.to_string(),
            module: id.to_string(),
        });
    }
    Ok(name)
}

/// Case-fold and validate a parent-prefix path.
fn normalize_path(raw: &[String], group: &GroupSpec, id: &str) -> Result<Vec<String>, LoadError> {
    if raw.is_empty() {
        return Err(LoadError::InvalidParentSegment {
            segment: String::new(),
            group: group.name.clone(),
            module: id.to_string(),
        });
    }
    raw.iter()
        .map(|segment| {
            let trimmed = segment.trim().to_lowercase();
            if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
                return Err(LoadError::InvalidParentSegment {
                    segment: segment.clone(),
                    group: group.name.clone(),
                    module: id.to_string(),
                });
            }
            Ok(trimmed)
        })
        .collect()
}
