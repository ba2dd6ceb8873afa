//! Integration test common infrastructure.
//!
//! Provides reusable probe handlers, listeners, and hooks with observable
//! side effects, plus a dispatch helper that captures replies.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use straybot::context::Context;
use straybot::dispatch::{CommandProcessor, Prefix};
use straybot::error::{HandlerError, HandlerResult};
use straybot::events::{EventArgs, EventOutcome};
use straybot::module::{
    ArgValue, CheckHandler, CommandHandler, ErrorHook, EventListener, GuardHook, LifecycleHook,
};
use tokio::sync::mpsc;

/// Dispatch one line and return every reply the handlers produced.
pub async fn dispatch(
    processor: &CommandProcessor,
    prefixes: &[Prefix],
    line: &str,
) -> Vec<String> {
    let (tx, mut rx) = mpsc::channel(64);
    processor.process_line(prefixes, line, Some(tx)).await;
    let mut replies = Vec::new();
    while let Ok(reply) = rx.try_recv() {
        replies.push(reply);
    }
    replies
}

/// An invocation counter shared between a test and its handlers.
#[derive(Default)]
pub struct Probe {
    hits: AtomicUsize,
}

impl Probe {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn hit(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// A command that counts invocations and records its arguments.
pub struct CountingCommand {
    pub probe: Arc<Probe>,
    pub reply: Option<String>,
    pub seen_args: Arc<Mutex<Vec<ArgValue>>>,
}

impl CountingCommand {
    pub fn new(probe: &Arc<Probe>) -> Arc<Self> {
        Arc::new(Self {
            probe: probe.clone(),
            reply: None,
            seen_args: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn replying(probe: &Arc<Probe>, reply: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            probe: probe.clone(),
            reply: Some(reply.into()),
            seen_args: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn last_args(&self) -> Vec<ArgValue> {
        self.seen_args.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandHandler for CountingCommand {
    async fn invoke(&self, ctx: &mut Context, args: Vec<ArgValue>) -> HandlerResult {
        self.probe.hit();
        *self.seen_args.lock().unwrap() = args;
        if let Some(reply) = &self.reply {
            ctx.reply(reply.clone()).await?;
        }
        Ok(())
    }
}

/// A command that always fails with the given message.
pub struct FailingCommand {
    pub message: String,
}

impl FailingCommand {
    pub fn new(message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            message: message.into(),
        })
    }
}

#[async_trait]
impl CommandHandler for FailingCommand {
    async fn invoke(&self, _ctx: &mut Context, _args: Vec<ArgValue>) -> HandlerResult {
        Err(HandlerError::failed(self.message.clone()))
    }
}

/// A check gated by a shared flag.
pub struct GateCheck {
    pub open: Arc<AtomicBool>,
    pub probe: Arc<Probe>,
}

impl GateCheck {
    pub fn new(open: &Arc<AtomicBool>, probe: &Arc<Probe>) -> Arc<Self> {
        Arc::new(Self {
            open: open.clone(),
            probe: probe.clone(),
        })
    }
}

#[async_trait]
impl CheckHandler for GateCheck {
    async fn check(&self, _ctx: &mut Context) -> Result<bool, HandlerError> {
        self.probe.hit();
        Ok(self.open.load(Ordering::SeqCst))
    }
}

/// A listener returning a fixed outcome for every event it receives.
pub struct FixedListener {
    pub outcome: EventOutcome,
    pub probe: Arc<Probe>,
}

impl FixedListener {
    pub fn new(outcome: EventOutcome, probe: &Arc<Probe>) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            probe: probe.clone(),
        })
    }
}

#[async_trait]
impl EventListener for FixedListener {
    async fn on_event(&self, _args: &mut EventArgs<'_>) -> Result<EventOutcome, HandlerError> {
        self.probe.hit();
        Ok(self.outcome.clone())
    }
}

/// A local guard hook returning a fixed outcome.
pub struct FixedGuard {
    pub outcome: EventOutcome,
    pub probe: Arc<Probe>,
}

impl FixedGuard {
    pub fn new(outcome: EventOutcome, probe: &Arc<Probe>) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            probe: probe.clone(),
        })
    }
}

#[async_trait]
impl GuardHook for FixedGuard {
    async fn guard(&self, _ctx: &mut Context) -> Result<EventOutcome, HandlerError> {
        self.probe.hit();
        Ok(self.outcome.clone())
    }
}

/// A lifecycle hook appending a label to a shared journal.
pub struct JournalHook {
    pub label: String,
    pub journal: Arc<Mutex<Vec<String>>>,
}

impl JournalHook {
    pub fn new(label: impl Into<String>, journal: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            journal: journal.clone(),
        })
    }
}

#[async_trait]
impl LifecycleHook for JournalHook {
    async fn run(&self, _globals: &straybot::context::Globals) -> HandlerResult {
        self.journal.lock().unwrap().push(self.label.clone());
        Ok(())
    }
}

/// An error listener capturing stringified errors.
pub struct ErrorCapture {
    pub seen: Arc<Mutex<Vec<String>>>,
}

impl ErrorCapture {
    pub fn new(seen: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self { seen: seen.clone() })
    }
}

#[async_trait]
impl EventListener for ErrorCapture {
    async fn on_event(&self, args: &mut EventArgs<'_>) -> Result<EventOutcome, HandlerError> {
        if let EventArgs::Error { error, .. } = args {
            self.seen.lock().unwrap().push(error.to_string());
        }
        Ok(None)
    }
}

/// A local error hook that reports the error handled or not.
pub struct LocalErrorHook {
    pub handled: bool,
    pub probe: Arc<Probe>,
}

impl LocalErrorHook {
    pub fn new(handled: bool, probe: &Arc<Probe>) -> Arc<Self> {
        Arc::new(Self {
            handled,
            probe: probe.clone(),
        })
    }
}

#[async_trait]
impl ErrorHook for LocalErrorHook {
    async fn on_error(
        &self,
        _error: &HandlerError,
        _ctx: Option<&Context>,
    ) -> Result<bool, HandlerError> {
        self.probe.hit();
        Ok(self.handled)
    }
}

/// No prefix at all: every line is a command line.
pub fn bare() -> Vec<Prefix> {
    vec![Prefix::literal("")]
}

/// The conventional `!` prefix.
pub fn bang() -> Vec<Prefix> {
    vec![Prefix::literal("!")]
}
