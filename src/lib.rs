//! # straybot
//!
//! A hot-reloadable command dispatch framework for text bots.
//!
//! Modules declare commands (optionally nested under parent prefixes),
//! guard checks, global event listeners, and interval jobs as plain data
//! ([`module::ModuleSpec`]). The loader merges each module's contribution
//! into one shared command table transactionally: loading, unloading, and
//! reloading are serialized, atomic per module, and exactly reversible.
//! The dispatcher resolves incoming lines through prefix match →
//! tokenization → tree descent → argument validation → handler invocation,
//! with a local-then-global error-recovery chain around every handler.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use straybot::dispatch::{CommandProcessor, Prefix};
//! use straybot::module::{CommandSpec, GroupSpec, ModuleSpec, StaticResolver};
//! # use straybot::context::Context;
//! # use straybot::error::HandlerResult;
//! # use straybot::module::{ArgValue, CommandHandler};
//! # struct Ping;
//! # #[async_trait::async_trait]
//! # impl CommandHandler for Ping {
//! #     async fn invoke(&self, ctx: &mut Context, _args: Vec<ArgValue>) -> HandlerResult {
//! #         ctx.reply("pong").await
//! #     }
//! # }
//!
//! # #[tokio::main] async fn main() {
//! let resolver = StaticResolver::new().register("greeter", || {
//!     ModuleSpec::new().group(
//!         GroupSpec::new("greeter").command(CommandSpec::new("ping", Arc::new(Ping))),
//!     )
//! });
//!
//! let processor = CommandProcessor::new(Arc::new(resolver));
//! processor.load_modules(["greeter"]).await;
//! processor
//!     .process_line(&[Prefix::literal("!")], "!ping", None)
//!     .await;
//! # }
//! ```

pub mod config;
pub mod context;
pub mod demo;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod loader;
pub mod module;
pub mod state;
pub mod validate;

pub use context::{Context, Globals};
pub use dispatch::{CommandProcessor, Prefix};
pub use error::{CommandError, HandlerError, HandlerResult, LoadError, ModuleId, TransformError};
pub use events::{EventName, EventVerdict};
pub use loader::{ModuleLoader, ReloadPlan, intervals::Schedule};
pub use module::{
    ArgValue, CommandSpec, GroupSpec, ModuleResolver, ModuleSpec, ParamType, StaticResolver,
};
