//! Module introspection surface.
//!
//! A module is a unit of hot-reloadable code contributing commands, checks,
//! event listeners, and interval jobs. Instead of any reflection mechanism,
//! a module describes itself as plain declarative data: a [`ModuleSpec`]
//! built once per load by a [`ModuleResolver`]. Every handler in the spec is
//! a trait object pre-bound to its owning state (typically an `Arc` the
//! handler struct holds), so reloading a module constructs a fresh instance
//! graph without touching other loaded modules.

use crate::context::{Context, Globals};
use crate::error::{HandlerError, HandlerResult, LoadError, TransformError};
use crate::events::{EventArgs, EventName, EventOutcome};
use crate::loader::intervals::Schedule;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use stray_parse::Tokenizer;

// ============================================================================
// Handler traits
// ============================================================================

/// A typed command argument produced by validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// A string argument.
    Str(String),
    /// A base-10 integer argument.
    Int(i64),
    /// A boolean argument.
    Bool(bool),
}

impl ArgValue {
    /// The string value, if this is a string argument.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The integer value, if this is an integer argument.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// The boolean value, if this is a boolean argument.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl std::fmt::Display for ArgValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Trait implemented by all command handlers.
///
/// `args` holds the validated, typed argument list. Default-command and
/// not-found handlers are invoked with an empty list.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Run the command body.
    async fn invoke(&self, ctx: &mut Context, args: Vec<ArgValue>) -> HandlerResult;
}

/// A guard attached to a subtree node, run before descending further.
#[async_trait]
pub trait CheckHandler: Send + Sync {
    /// Return `false` to abort the dispatch (not an error).
    async fn check(&self, ctx: &mut Context) -> Result<bool, HandlerError>;
}

/// A local `onCommand`/`onExecute` hook on a command's owning group.
#[async_trait]
pub trait GuardHook: Send + Sync {
    /// Inspect the pending invocation; the verdict follows the event
    /// contract (halt, rewrite the working content, or pass through).
    async fn guard(&self, ctx: &mut Context) -> Result<EventOutcome, HandlerError>;
}

/// A global event listener.
#[async_trait]
pub trait EventListener: Send + Sync {
    /// Handle one event firing. Return `Ok(None)` to let iteration continue.
    async fn on_event(&self, args: &mut EventArgs<'_>) -> Result<EventOutcome, HandlerError>;
}

/// An `onLoad`/`onUnload` lifecycle hook or an interval job body.
#[async_trait]
pub trait LifecycleHook: Send + Sync {
    /// Run the hook.
    async fn run(&self, globals: &Globals) -> HandlerResult;
}

/// A local error hook on an owning group.
#[async_trait]
pub trait ErrorHook: Send + Sync {
    /// Handle a failure from this group's code. Return `Ok(true)` to mark
    /// the error handled (suppressing the global `error` event), `Ok(false)`
    /// to escalate it.
    async fn on_error(&self, error: &HandlerError, ctx: Option<&Context>)
    -> Result<bool, HandlerError>;
}

/// Converts tokens from the argument stream into one typed value.
#[async_trait]
pub trait Transformer: Send + Sync {
    /// Consume zero or more tokens and produce a value.
    async fn transform(
        &self,
        ctx: &mut Context,
        args: &mut Tokenizer,
    ) -> Result<ArgValue, TransformError>;
}

// ============================================================================
// Declarative module data
// ============================================================================

/// The primitive type tag of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// A string parameter (standard string transformer).
    Str,
    /// An integer parameter (standard number transformer).
    Int,
    /// A boolean parameter (standard boolean transformer).
    Bool,
    /// A parameter that only a custom transformer can produce.
    Custom,
}

/// One declared parameter: a type tag plus an optional transformer override.
#[derive(Clone)]
pub struct ParamSpec {
    /// The declared primitive type.
    pub ty: ParamType,
    /// Custom transformer, overriding the standard one for `ty`.
    pub transformer: Option<Arc<dyn Transformer>>,
}

/// A declared command: primary name, aliases, parameter shape, handler.
#[derive(Clone)]
pub struct CommandSpec {
    /// Primary command name.
    pub name: String,
    /// Alternative names resolving to the same handler.
    pub aliases: Vec<String>,
    /// Declared parameters, in order.
    pub params: Vec<ParamSpec>,
    /// Explicit required-argument count; defaults to all declared params.
    pub required: Option<usize>,
    /// The command body.
    pub handler: Arc<dyn CommandHandler>,
}

impl CommandSpec {
    /// A command with the given primary name and handler.
    pub fn new(name: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            params: Vec::new(),
            required: None,
            handler,
        }
    }

    /// Add an alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Add a parameter using the standard transformer for its type.
    pub fn param(mut self, ty: ParamType) -> Self {
        self.params.push(ParamSpec {
            ty,
            transformer: None,
        });
        self
    }

    /// Add a parameter with a custom transformer.
    pub fn param_with(mut self, ty: ParamType, transformer: Arc<dyn Transformer>) -> Self {
        self.params.push(ParamSpec {
            ty,
            transformer: Some(transformer),
        });
        self
    }

    /// Override the required-argument count (for trailing optional params).
    pub fn required(mut self, count: usize) -> Self {
        self.required = Some(count);
        self
    }

    /// The number of arguments that must be collected for this command.
    pub fn required_count(&self) -> usize {
        self.required.unwrap_or(self.params.len())
    }
}

/// A named check declared by a group.
#[derive(Clone)]
pub struct CheckSpec {
    /// The check name (unique per subtree node).
    pub name: String,
    /// The guard body.
    pub handler: Arc<dyn CheckHandler>,
}

/// A global event listener declared by a group.
#[derive(Clone)]
pub struct EventSpec {
    /// The event to listen for.
    pub event: EventName,
    /// The listener body.
    pub listener: Arc<dyn EventListener>,
}

/// An interval job declared by a group.
#[derive(Clone)]
pub struct IntervalSpec {
    /// Job key, unique within the module; reloads match jobs by key to
    /// preserve timer continuity.
    pub key: String,
    /// When the job fires.
    pub schedule: Schedule,
    /// The job body.
    pub job: Arc<dyn LifecycleHook>,
}

/// Optional per-group hooks.
#[derive(Clone, Default)]
pub struct Hooks {
    /// Runs after the group's module is staged during load/reload.
    pub on_load: Option<Arc<dyn LifecycleHook>>,
    /// Runs before the group's module is removed during unload/reload.
    pub on_unload: Option<Arc<dyn LifecycleHook>>,
    /// Local error handler for failures in this group's code.
    pub on_error: Option<Arc<dyn ErrorHook>>,
    /// Local guard run after the global `onCommand` event.
    pub on_command: Option<Arc<dyn GuardHook>>,
    /// Local guard run after the global `onExecute` event.
    pub on_execute: Option<Arc<dyn GuardHook>>,
    /// Invoked when the group's parent prefix is reached with no further
    /// token. Requires a parent prefix.
    pub on_default_command: Option<Arc<dyn CommandHandler>>,
    /// Invoked when the next token under the group's parent prefix matches
    /// no child. Requires a parent prefix.
    pub on_command_not_found: Option<Arc<dyn CommandHandler>>,
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("on_load", &self.on_load.is_some())
            .field("on_unload", &self.on_unload.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_command", &self.on_command.is_some())
            .field("on_execute", &self.on_execute.is_some())
            .field("on_default_command", &self.on_default_command.is_some())
            .field("on_command_not_found", &self.on_command_not_found.is_some())
            .finish()
    }
}

impl std::fmt::Debug for IntervalSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntervalSpec")
            .field("key", &self.key)
            .field("schedule", &self.schedule)
            .finish()
    }
}

impl Hooks {
    /// Whether any subtree-only hook is present.
    pub(crate) fn has_subtree_hooks(&self) -> bool {
        self.on_default_command.is_some() || self.on_command_not_found.is_some()
    }
}

/// One owning unit within a module: an optional parent prefix plus the
/// commands, checks, listeners, jobs, and hooks bound to one instance.
#[derive(Clone)]
pub struct GroupSpec {
    /// Group name, used in diagnostics.
    pub name: String,
    /// Parent-prefix path; commands nest under these segments.
    pub parent: Option<Vec<String>>,
    /// Declared commands.
    pub commands: Vec<CommandSpec>,
    /// Declared checks (attached to the parent-prefix node).
    pub checks: Vec<CheckSpec>,
    /// Declared global event listeners.
    pub events: Vec<EventSpec>,
    /// Declared interval jobs.
    pub intervals: Vec<IntervalSpec>,
    /// Optional hooks.
    pub hooks: Hooks,
}

impl GroupSpec {
    /// An empty group with the given diagnostic name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            commands: Vec::new(),
            checks: Vec::new(),
            events: Vec::new(),
            intervals: Vec::new(),
            hooks: Hooks::default(),
        }
    }

    /// Nest this group's commands under a parent-prefix path.
    pub fn parent<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parent = Some(path.into_iter().map(Into::into).collect());
        self
    }

    /// Add a command.
    pub fn command(mut self, command: CommandSpec) -> Self {
        self.commands.push(command);
        self
    }

    /// Add a named check.
    pub fn check(mut self, name: impl Into<String>, handler: Arc<dyn CheckHandler>) -> Self {
        self.checks.push(CheckSpec {
            name: name.into(),
            handler,
        });
        self
    }

    /// Add a global event listener.
    pub fn listen(mut self, event: EventName, listener: Arc<dyn EventListener>) -> Self {
        self.events.push(EventSpec { event, listener });
        self
    }

    /// Add an interval job.
    pub fn interval(
        mut self,
        key: impl Into<String>,
        schedule: Schedule,
        job: Arc<dyn LifecycleHook>,
    ) -> Self {
        self.intervals.push(IntervalSpec {
            key: key.into(),
            schedule,
            job,
        });
        self
    }

    /// Set the `onLoad` hook.
    pub fn on_load(mut self, hook: Arc<dyn LifecycleHook>) -> Self {
        self.hooks.on_load = Some(hook);
        self
    }

    /// Set the `onUnload` hook.
    pub fn on_unload(mut self, hook: Arc<dyn LifecycleHook>) -> Self {
        self.hooks.on_unload = Some(hook);
        self
    }

    /// Set the local error hook.
    pub fn on_error(mut self, hook: Arc<dyn ErrorHook>) -> Self {
        self.hooks.on_error = Some(hook);
        self
    }

    /// Set the local `onCommand` guard.
    pub fn on_command(mut self, hook: Arc<dyn GuardHook>) -> Self {
        self.hooks.on_command = Some(hook);
        self
    }

    /// Set the local `onExecute` guard.
    pub fn on_execute(mut self, hook: Arc<dyn GuardHook>) -> Self {
        self.hooks.on_execute = Some(hook);
        self
    }

    /// Set the default-command handler for the group's parent node.
    pub fn on_default_command(mut self, handler: Arc<dyn CommandHandler>) -> Self {
        self.hooks.on_default_command = Some(handler);
        self
    }

    /// Set the not-found handler for the group's parent node.
    pub fn on_command_not_found(mut self, handler: Arc<dyn CommandHandler>) -> Self {
        self.hooks.on_command_not_found = Some(handler);
        self
    }
}

/// Everything one module declares, produced fresh for each load.
#[derive(Clone, Default)]
pub struct ModuleSpec {
    /// The module's owning groups.
    pub groups: Vec<GroupSpec>,
}

impl ModuleSpec {
    /// An empty module spec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group.
    pub fn group(mut self, group: GroupSpec) -> Self {
        self.groups.push(group);
        self
    }
}

// ============================================================================
// Module resolution
// ============================================================================

/// Resolves a module id to a freshly constructed [`ModuleSpec`].
///
/// Each call must build a new instance graph: a reload replaces the module's
/// instances without touching other loaded modules. Comparing modules across
/// reloads is done by id, never by instance identity.
#[async_trait]
pub trait ModuleResolver: Send + Sync {
    /// Construct the module's spec.
    async fn resolve(&self, id: &str) -> Result<ModuleSpec, LoadError>;
}

/// A factory producing a module's spec.
pub type ModuleFactory = dyn Fn() -> ModuleSpec + Send + Sync;

/// A resolver over a fixed id → factory map, for bots whose module set is
/// known at startup (and for tests).
#[derive(Default)]
pub struct StaticResolver {
    factories: HashMap<String, Arc<ModuleFactory>>,
}

impl StaticResolver {
    /// An empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module factory under an id.
    pub fn register<F>(mut self, id: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> ModuleSpec + Send + Sync + 'static,
    {
        self.factories.insert(id.into(), Arc::new(factory));
        self
    }
}

#[async_trait]
impl ModuleResolver for StaticResolver {
    async fn resolve(&self, id: &str) -> Result<ModuleSpec, LoadError> {
        match self.factories.get(id) {
            Some(factory) => Ok(factory()),
            None => Err(LoadError::UnknownModule(id.to_string())),
        }
    }
}
