//! Event names and the values that flow through the event bus.
//!
//! Events fire in two flavors: global listeners registered by any loaded
//! module (iterated in module-load order), and local per-group hooks on the
//! command's owning group. Both share the verdict contract below.

use crate::context::{Context, Globals};
use crate::error::HandlerError;

/// A named hook point.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventName {
    /// Fired for every incoming line, before prefix matching.
    OnMessage,
    /// Fired after the prefix is stripped, before tokenization.
    PreCheck,
    /// Fired once a leaf command is resolved, before validation.
    OnCommand,
    /// Fired after validation, immediately before the handler body.
    OnExecute,
    /// Fired when a module finishes staging during load/reload.
    OnLoad,
    /// Fired when a module is about to be removed during unload/reload.
    OnUnload,
    /// Fired when a handler, hook, or listener fails.
    Error,
    /// A module-defined event name.
    Custom(String),
}

impl EventName {
    /// The event name as a string (for diagnostics and logging).
    pub fn as_str(&self) -> &str {
        match self {
            Self::OnMessage => "onMessage",
            Self::PreCheck => "preCheck",
            Self::OnCommand => "onCommand",
            Self::OnExecute => "onExecute",
            Self::OnLoad => "onLoad",
            Self::OnUnload => "onUnload",
            Self::Error => "error",
            Self::Custom(name) => name,
        }
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A listener's or guard hook's response.
///
/// `None` from a listener means "no opinion" and iteration continues; the
/// first `Some` verdict short-circuits the remaining listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventVerdict {
    /// Explicitly allow processing to continue unchanged.
    Accept,
    /// Abort processing of this message.
    Halt,
    /// Replace the working text and continue.
    Rewrite(String),
}

/// Aggregate outcome of firing an event: the first verdict returned, if any.
pub type EventOutcome = Option<EventVerdict>;

/// The payload handed to event listeners.
///
/// Listeners match on the variant they care about and return `Ok(None)`
/// for payloads they do not handle.
pub enum EventArgs<'a> {
    /// Message-pipeline events carry the mutable per-message context.
    Ctx(&'a mut Context),
    /// Lifecycle events (`onLoad`/`onUnload` and custom loader-side events)
    /// carry the shared globals.
    Lifecycle(&'a Globals),
    /// The `error` event carries the failure and, when one exists, the
    /// context of the message being processed.
    Error {
        /// The failure being reported.
        error: &'a HandlerError,
        /// The message context, if the failure happened inside a dispatch.
        ctx: Option<&'a Context>,
    },
}

impl<'a> EventArgs<'a> {
    /// The context associated with this payload, if any.
    pub fn context(&self) -> Option<&Context> {
        match self {
            Self::Ctx(ctx) => Some(ctx),
            Self::Error { ctx, .. } => *ctx,
            Self::Lifecycle(_) => None,
        }
    }
}
