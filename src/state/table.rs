//! The command table: a persistent map from command name to entry.
//!
//! Entries are cheap to clone (structural sharing), so staging a module
//! builds a whole new table value while the live one stays untouched until
//! commit. Handler equality is identity equality: two entries are equal when
//! they reference the same handler instances, which is exactly what
//! "removing a module restores the prior table" needs.

use crate::error::ModuleId;
use crate::module::{CheckHandler, CommandHandler, CommandSpec, Hooks};
use std::sync::Arc;

/// One level of the command tree, keyed by lowercase command name.
pub type CommandTable = im::HashMap<String, TableEntry>;

/// A command-table entry: terminal command or nested subtree.
#[derive(Clone)]
pub enum TableEntry {
    /// A directly invocable command.
    Leaf(Leaf),
    /// An intermediate node reached via a parent-prefix token.
    Tree(SubTree),
}

/// A terminal, invocable command.
#[derive(Clone)]
pub struct Leaf {
    /// The module that contributed this command.
    pub module: ModuleId,
    /// The owning group's hooks (local onCommand/onExecute/onError).
    pub hooks: Arc<Hooks>,
    /// The declared command (parameters, required count, handler).
    pub spec: Arc<CommandSpec>,
}

/// A default-command or not-found handler attached to a subtree node.
///
/// Invoked without argument validation, but inside the error-recovery
/// wrapper like any other handler.
#[derive(Clone)]
pub struct Fallback {
    /// The module that supplied this handler.
    pub module: ModuleId,
    /// The owning group's hooks.
    pub hooks: Arc<Hooks>,
    /// The handler body.
    pub handler: Arc<dyn CommandHandler>,
}

/// A named guard attached to a subtree node.
#[derive(Clone)]
pub struct Check {
    /// Check name, unique per node.
    pub name: String,
    /// The module that supplied this check.
    pub module: ModuleId,
    /// The owning group's hooks.
    pub hooks: Arc<Hooks>,
    /// The guard body.
    pub handler: Arc<dyn CheckHandler>,
}

/// An intermediate command-tree node.
///
/// Checks run in declaration order before any descent; invoking any
/// descendant requires every check along the path to pass, outer to inner.
#[derive(Clone, Default)]
pub struct SubTree {
    /// Nested commands and further subtrees.
    pub children: CommandTable,
    /// Invoked when no further token follows this node's prefix.
    pub default_cmd: Option<Fallback>,
    /// Invoked when the next token matches no child.
    pub not_found: Option<Fallback>,
    /// Guards, in declaration order.
    pub checks: im::Vector<Check>,
}

impl SubTree {
    /// Whether this node carries nothing and can be pruned from its parent.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
            && self.default_cmd.is_none()
            && self.not_found.is_none()
            && self.checks.is_empty()
    }
}

impl PartialEq for Leaf {
    fn eq(&self, other: &Self) -> bool {
        self.module == other.module && Arc::ptr_eq(&self.spec, &other.spec)
    }
}

impl PartialEq for Fallback {
    fn eq(&self, other: &Self) -> bool {
        self.module == other.module && Arc::ptr_eq(&self.handler, &other.handler)
    }
}

impl PartialEq for Check {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.module == other.module
            && Arc::ptr_eq(&self.handler, &other.handler)
    }
}

impl PartialEq for SubTree {
    fn eq(&self, other: &Self) -> bool {
        self.children == other.children
            && self.default_cmd == other.default_cmd
            && self.not_found == other.not_found
            && self.checks == other.checks
    }
}

impl PartialEq for TableEntry {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Leaf(a), Self::Leaf(b)) => a == b,
            (Self::Tree(a), Self::Tree(b)) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Debug for Leaf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Leaf")
            .field("module", &self.module)
            .field("command", &self.spec.name)
            .finish()
    }
}

impl std::fmt::Debug for Fallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fallback").field("module", &self.module).finish()
    }
}

impl std::fmt::Debug for Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Check")
            .field("name", &self.name)
            .field("module", &self.module)
            .finish()
    }
}

impl std::fmt::Debug for SubTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubTree")
            .field("children", &self.children)
            .field("default_cmd", &self.default_cmd)
            .field("not_found", &self.not_found)
            .field("checks", &self.checks)
            .finish()
    }
}

impl std::fmt::Debug for TableEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Leaf(leaf) => leaf.fmt(f),
            Self::Tree(tree) => tree.fmt(f),
        }
    }
}
