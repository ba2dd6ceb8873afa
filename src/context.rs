//! Per-message context and the shared globals handed to module code.

use crate::error::{HandlerError, HandlerResult};
use crate::loader::ModuleLoader;
use crate::module::ModuleResolver;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Shared handles available to every piece of module code.
///
/// Lifecycle hooks and interval jobs receive `&Globals` directly; command
/// handlers reach it through [`Context::globals`]. Modules use the loader
/// handle to schedule load/unload/reload of themselves or other modules.
pub struct Globals {
    /// The module loader owning the command table and registry.
    pub loader: ModuleLoader,
}

impl Globals {
    /// Build the shared globals around a module resolver.
    pub fn new(resolver: Arc<dyn ModuleResolver>) -> Self {
        Self {
            loader: ModuleLoader::new(resolver),
        }
    }
}

/// Context handed to each command invocation and message-pipeline hook.
///
/// The working text fields are mutated as the dispatch pipeline advances:
/// `msg` holds the message with the prefix stripped, `content` the unconsumed
/// argument text once a command is resolved. Event listeners and local hooks
/// may rewrite either through the verdict contract.
pub struct Context {
    /// Working message text (trimmed; prefix stripped once matched).
    pub msg: String,
    /// Unconsumed argument text at command-resolution time.
    pub content: String,
    /// The prefix that matched this message.
    pub current_prefix: String,
    /// Parent-prefix chain walked to reach the resolved command.
    pub parent: Vec<String>,
    /// The resolved command name (empty for default-command invocations).
    pub command_name: String,
    /// Shared framework handles.
    pub globals: Arc<Globals>,
    reply_tx: Option<mpsc::Sender<String>>,
}

impl Context {
    /// Build a fresh context for one incoming message.
    pub fn new(globals: Arc<Globals>, reply_tx: Option<mpsc::Sender<String>>) -> Self {
        Self {
            msg: String::new(),
            content: String::new(),
            current_prefix: String::new(),
            parent: Vec::new(),
            command_name: String::new(),
            globals,
            reply_tx,
        }
    }

    /// Send a reply line to whatever transport produced this message.
    ///
    /// A context without a reply channel accepts and drops the line.
    pub async fn reply(&self, line: impl Into<String>) -> HandlerResult {
        match &self.reply_tx {
            Some(tx) => tx.send(line.into()).await.map_err(HandlerError::from),
            None => Ok(()),
        }
    }

    /// The full command path (parent chain plus the resolved name).
    pub fn command_path(&self) -> String {
        let mut path = self.parent.join(" ");
        if !self.command_name.is_empty() {
            if !path.is_empty() {
                path.push(' ');
            }
            path.push_str(&self.command_name);
        }
        path
    }
}
