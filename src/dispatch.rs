//! Command resolution and dispatch.
//!
//! [`CommandProcessor::process_line`] drives one message through the
//! pipeline: `onMessage` event → prefix match → `preCheck` event →
//! tokenize → table lookup → subtree descent (checks, default/not-found
//! handlers) → `onCommand` (global, then local) → argument validation →
//! `onExecute` (global, then local) → handler invocation. Misses at any
//! stage before resolution abort silently: a non-command message is not an
//! error.

use crate::context::{Context, Globals};
use crate::error::LoadError;
use crate::events::{EventArgs, EventName, EventVerdict};
use crate::loader::{ModuleLoader, ReloadPlan};
use crate::module::ModuleResolver;
use crate::state::{Fallback, Leaf, Switchboard, TableEntry};
use crate::validate::validate_args;
use regex::Regex;
use std::sync::Arc;
use stray_parse::Tokenizer;
use tokio::sync::mpsc;
use tracing::trace;

/// A command prefix: a literal string or an anchored pattern.
#[derive(Debug, Clone)]
pub enum Prefix {
    /// Matches when the message starts with this exact string.
    Literal(String),
    /// Matches when the pattern matches at the start of the message.
    Pattern(Regex),
}

impl Prefix {
    /// A literal prefix.
    pub fn literal(prefix: impl Into<String>) -> Self {
        Self::Literal(prefix.into())
    }

    /// A pattern prefix. The pattern is only considered when it matches at
    /// position zero.
    pub fn pattern(pattern: Regex) -> Self {
        Self::Pattern(pattern)
    }

    /// The matched prefix text, if this prefix matches `text`.
    fn matched<'a>(&self, text: &'a str) -> Option<&'a str> {
        match self {
            Self::Literal(prefix) => text.starts_with(prefix).then(|| &text[..prefix.len()]),
            Self::Pattern(pattern) => pattern
                .find(text)
                .filter(|m| m.start() == 0)
                .map(|m| m.as_str()),
        }
    }
}

/// Try each prefix in order; first match wins.
fn match_prefix<'a>(prefixes: &[Prefix], text: &'a str) -> Option<&'a str> {
    prefixes.iter().find_map(|prefix| prefix.matched(text))
}

/// The dispatcher: owns the shared globals and resolves incoming lines
/// against the committed command table.
pub struct CommandProcessor {
    globals: Arc<Globals>,
}

impl CommandProcessor {
    /// Build a processor (and its module loader) around a resolver.
    pub fn new(resolver: Arc<dyn ModuleResolver>) -> Self {
        Self {
            globals: Arc::new(Globals::new(resolver)),
        }
    }

    /// The shared globals handed to module code.
    pub fn globals(&self) -> &Arc<Globals> {
        &self.globals
    }

    /// The module loader.
    pub fn loader(&self) -> &ModuleLoader {
        &self.globals.loader
    }

    fn switchboard(&self) -> &Arc<Switchboard> {
        self.globals.loader.switchboard()
    }

    /// Load modules by id. Returns per-module errors (empty on success).
    pub async fn load_modules<I, S>(&self, ids: I) -> Vec<LoadError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.globals.loader.load(&self.globals, ids).await
    }

    /// Unload modules by id.
    pub async fn unload_modules<I, S>(&self, ids: I) -> Vec<LoadError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.globals.loader.unload(&self.globals, ids).await
    }

    /// Reload modules by id.
    pub async fn reload_modules<I, S>(&self, ids: I) -> Vec<LoadError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.globals.loader.reload(&self.globals, ids).await
    }

    /// Apply a combined unload/reload/load plan.
    pub async fn handle_reload(&self, plan: ReloadPlan) -> Vec<LoadError> {
        self.globals.loader.handle_reload(&self.globals, plan).await
    }

    /// Process one incoming line.
    ///
    /// Replies produced by handlers go to `reply`, when provided.
    pub async fn process_line(
        &self,
        prefixes: &[Prefix],
        line: &str,
        reply: Option<mpsc::Sender<String>>,
    ) {
        let mut working = line.trim().to_string();
        let mut ctx = Context::new(self.globals.clone(), reply);
        ctx.msg = working.clone();

        // onMessage: may halt, rewrite the text, or mutate ctx.msg in place.
        match self.fire_ctx_event(&EventName::OnMessage, &mut ctx).await {
            Some(EventVerdict::Halt) => return,
            Some(EventVerdict::Rewrite(text)) => working = text,
            Some(EventVerdict::Accept) => {}
            None => working = ctx.msg.clone(),
        }

        // Prefix match; a miss is an ordinary non-command message.
        let Some(matched) = match_prefix(prefixes, &working) else {
            return;
        };
        ctx.current_prefix = matched.to_string();
        ctx.msg = working[matched.len()..].to_string();
        working = ctx.msg.clone();

        // preCheck, same contract as onMessage.
        match self.fire_ctx_event(&EventName::PreCheck, &mut ctx).await {
            Some(EventVerdict::Halt) => return,
            Some(EventVerdict::Rewrite(text)) => working = text,
            Some(EventVerdict::Accept) => {}
            None => working = ctx.msg.clone(),
        }

        // Command words are tokenized without quote handling.
        let mut tokens = Tokenizer::new(&working);
        let Ok(first) = tokens.next_token(false) else {
            return;
        };
        let key = first.to_lowercase();

        let snapshot = self.switchboard().snapshot().await;
        let Some(entry) = snapshot.table.get(&key) else {
            trace!(command = %key, "unknown command");
            return;
        };

        // Walk the tree: run each subtree's checks, then descend on the
        // next token, falling back to default/not-found handlers.
        let mut entry = entry.clone();
        let mut name = key;
        let mut parent: Vec<String> = Vec::new();
        let leaf: Leaf = loop {
            match entry {
                TableEntry::Leaf(leaf) => break leaf,
                TableEntry::Tree(node) => {
                    for check in node.checks.iter() {
                        if !self.switchboard().try_check(check, &mut ctx).await {
                            return;
                        }
                    }
                    parent.push(name.clone());

                    let Ok(next) = tokens.next_token(false) else {
                        // Out of tokens: the node's default command, if any.
                        if let Some(fallback) = &node.default_cmd {
                            ctx.parent = parent;
                            ctx.command_name = String::new();
                            ctx.content = tokens.take_rest();
                            self.invoke_fallback(fallback, &mut ctx).await;
                        }
                        return;
                    };
                    let next = next.to_lowercase();

                    match node.children.get(&next) {
                        Some(child) => {
                            entry = child.clone();
                            name = next;
                        }
                        None => {
                            if let Some(fallback) = &node.not_found {
                                ctx.parent = parent;
                                ctx.command_name = next;
                                ctx.content = tokens.take_rest();
                                self.invoke_fallback(fallback, &mut ctx).await;
                            }
                            return;
                        }
                    }
                }
            }
        };

        ctx.parent = parent;
        ctx.command_name = name;
        ctx.content = tokens.take_rest();

        // onCommand: global event, then the owner's local hook. The local
        // hook runs last so its rewrite takes precedence.
        match self.fire_ctx_event(&EventName::OnCommand, &mut ctx).await {
            Some(EventVerdict::Halt) => return,
            Some(EventVerdict::Rewrite(text)) => ctx.content = text,
            _ => {}
        }
        if let Some(hook) = leaf.hooks.on_command.clone() {
            match self.switchboard().try_guard(&leaf.hooks, &hook, &mut ctx).await {
                Some(EventVerdict::Halt) => return,
                Some(EventVerdict::Rewrite(text)) => ctx.content = text,
                _ => {}
            }
        }

        // Argument validation over the (possibly rewritten) content.
        let content = ctx.content.clone();
        let mut args = Tokenizer::new(&content);
        let args = match validate_args(&mut ctx, &mut args, &leaf.spec).await {
            Ok(Some(args)) => args,
            Ok(None) => return,
            Err(error) => {
                self.switchboard()
                    .absorb_failure(Some(leaf.hooks.as_ref()), error.into(), Some(&ctx))
                    .await;
                return;
            }
        };

        // onExecute: global event, then the owner's local hook.
        match self.fire_ctx_event(&EventName::OnExecute, &mut ctx).await {
            Some(EventVerdict::Halt) => return,
            Some(EventVerdict::Rewrite(text)) => ctx.content = text,
            _ => {}
        }
        if let Some(hook) = leaf.hooks.on_execute.clone() {
            match self.switchboard().try_guard(&leaf.hooks, &hook, &mut ctx).await {
                Some(EventVerdict::Halt) => return,
                Some(EventVerdict::Rewrite(text)) => ctx.content = text,
                _ => {}
            }
        }

        self.switchboard()
            .try_invoke(&leaf.hooks, &leaf.spec.handler, &mut ctx, args)
            .await;
    }

    async fn fire_ctx_event(&self, event: &EventName, ctx: &mut Context) -> Option<EventVerdict> {
        let mut args = EventArgs::Ctx(ctx);
        self.switchboard().call_event(event, &mut args).await
    }

    async fn invoke_fallback(&self, fallback: &Fallback, ctx: &mut Context) {
        self.switchboard()
            .try_invoke(&fallback.hooks, &fallback.handler, ctx, Vec::new())
            .await;
    }
}
