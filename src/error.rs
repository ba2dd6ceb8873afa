//! Unified error handling for straybot.
//!
//! Error families are split by where they surface: [`TransformError`] inside
//! a single argument transformer, [`CommandError`] from argument validation,
//! [`HandlerError`] from running user code, and [`LoadError`] from module
//! staging and loader operations.

use stray_parse::{TokenError, ValueError};
use thiserror::Error;
use tokio::sync::mpsc;

/// A module identifier (typically the module's file path or registered name).
pub type ModuleId = String;

// ============================================================================
// Argument transformation and validation
// ============================================================================

/// Errors produced by a single argument transformer.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The token stream is exhausted. Stops collection; only an error if the
    /// required count has not been met.
    #[error(transparent)]
    EndOfArgs(#[from] TokenError),

    /// The token could not be converted to the requested value.
    #[error(transparent)]
    Value(#[from] ValueError),

    /// A custom transformer failed.
    #[error("{0}")]
    Other(String),
}

/// Errors produced by argument validation for one command invocation.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A transformer rejected its input. `arg` is the zero-based index of
    /// the offending parameter.
    #[error("invalid argument {arg}: {source}")]
    Parse {
        /// Zero-based parameter index.
        arg: usize,
        /// The underlying transformer failure.
        source: TransformError,
    },

    /// Fewer arguments were collected than the command requires.
    #[error("invalid number of arguments: expected {required}, received {received}")]
    InvalidArgCount {
        /// How many arguments were collected.
        received: usize,
        /// How many the command requires.
        required: usize,
    },
}

// ============================================================================
// Handler errors (user code)
// ============================================================================

/// Errors that can occur while running a command, hook, listener, or
/// interval job.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Argument validation failed for this invocation.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The handler reported a failure of its own.
    #[error("{0}")]
    Failed(String),

    /// The reply channel for this context is closed.
    #[error("send error: {0}")]
    Send(#[from] mpsc::error::SendError<String>),

    /// Diagnostic wrapper for an event listener that failed while an event
    /// was being dispatched.
    #[error("listener for event '{event}' failed: {message}")]
    Listener {
        /// The event being dispatched.
        event: String,
        /// The listener's own error, stringified.
        message: String,
    },
}

impl HandlerError {
    /// Convenience constructor for module code reporting its own failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Result type for command handlers and hooks.
pub type HandlerResult = Result<(), HandlerError>;

// ============================================================================
// Module staging and loader errors
// ============================================================================

/// Errors surfaced per module by loader operations.
///
/// Authoring errors reject the whole staged module: the live command table
/// is never left partially updated.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Load of an id that is already loaded.
    #[error("module '{0}' has already been loaded")]
    AlreadyLoaded(ModuleId),

    /// Unload of an id that was never loaded.
    #[error("module '{0}' has not been loaded")]
    NotLoaded(ModuleId),

    /// The resolver does not know this id.
    #[error("module '{0}' not found")]
    UnknownModule(ModuleId),

    /// The resolver failed to construct the module.
    #[error("module '{id}' failed to resolve: {message}")]
    Resolve {
        /// The module id.
        id: ModuleId,
        /// The resolver's error, stringified.
        message: String,
    },

    /// A command name or alias collides at its table level.
    #[error("command '{name}' already exists (module '{module}')")]
    DuplicateCommand {
        /// The colliding name.
        name: String,
        /// The module being staged.
        module: ModuleId,
    },

    /// A command name is empty or contains whitespace.
    #[error("invalid command name '{name}' (module '{module}')")]
    InvalidCommandName {
        /// The offending name.
        name: String,
        /// The module being staged.
        module: ModuleId,
    },

    /// A parent-prefix segment is empty or contains whitespace.
    #[error("invalid parent segment '{segment}' in group '{group}' (module '{module}')")]
    InvalidParentSegment {
        /// The offending segment.
        segment: String,
        /// The declaring group.
        group: String,
        /// The module being staged.
        module: ModuleId,
    },

    /// A parent-prefix segment is already registered as a leaf command.
    #[error("prefix segment '{segment}' is already a command (module '{module}')")]
    LeafConflict {
        /// The conflicting segment.
        segment: String,
        /// The module being staged.
        module: ModuleId,
    },

    /// The subtree at this path already has a default command.
    #[error("default command already exists under '{path}' (module '{module}')")]
    DefaultCommandExists {
        /// The joined prefix path.
        path: String,
        /// The module being staged.
        module: ModuleId,
    },

    /// The subtree at this path already has a not-found handler.
    #[error("not-found handler already exists under '{path}' (module '{module}')")]
    NotFoundExists {
        /// The joined prefix path.
        path: String,
        /// The module being staged.
        module: ModuleId,
    },

    /// A check with this name is already attached at this path.
    #[error("check '{name}' already exists under '{path}' (module '{module}')")]
    DuplicateCheck {
        /// The colliding check name.
        name: String,
        /// The joined prefix path.
        path: String,
        /// The module being staged.
        module: ModuleId,
    },

    /// A group declares checks or fallback handlers but no parent prefix.
    #[error("group '{group}' declares subtree hooks but no parent prefix (module '{module}')")]
    ParentRequired {
        /// The declaring group.
        group: String,
        /// The module being staged.
        module: ModuleId,
    },

    /// Two interval jobs in the same module share a key.
    #[error("interval job '{key}' declared twice (module '{module}')")]
    DuplicateInterval {
        /// The colliding job key.
        key: String,
        /// The module being staged.
        module: ModuleId,
    },

    /// An interval schedule is structurally invalid (zero period, no times).
    #[error("interval job '{key}' has an invalid schedule (module '{module}')")]
    InvalidSchedule {
        /// The offending job key.
        key: String,
        /// The module being staged.
        module: ModuleId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_count_message_carries_counts() {
        let err = CommandError::InvalidArgCount {
            received: 1,
            required: 2,
        };
        assert_eq!(
            err.to_string(),
            "invalid number of arguments: expected 2, received 1"
        );
    }

    #[test]
    fn test_parse_error_carries_index() {
        let err = CommandError::Parse {
            arg: 3,
            source: TransformError::Value(ValueError::InvalidNumber("abc".into())),
        };
        assert!(err.to_string().starts_with("invalid argument 3:"));
    }

    #[test]
    fn test_load_error_display() {
        let err = LoadError::DuplicateCommand {
            name: "ping".into(),
            module: "general".into(),
        };
        assert_eq!(
            err.to_string(),
            "command 'ping' already exists (module 'general')"
        );
    }
}
