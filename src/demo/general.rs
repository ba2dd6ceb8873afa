//! General-purpose demo commands.

use crate::context::Context;
use crate::error::{HandlerError, HandlerResult};
use crate::events::{EventArgs, EventName, EventOutcome};
use crate::module::{
    ArgValue, CommandHandler, CommandSpec, EventListener, GroupSpec, ModuleSpec, ParamType,
};
use crate::validate::{NumberTransformer, StringTransformer};
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use stray_parse::{Bounds, BoundsPolicy};
use tracing::warn;

struct PingCommand;

#[async_trait]
impl CommandHandler for PingCommand {
    async fn invoke(&self, ctx: &mut Context, _args: Vec<ArgValue>) -> HandlerResult {
        ctx.reply("pong").await
    }
}

struct EchoCommand;

#[async_trait]
impl CommandHandler for EchoCommand {
    async fn invoke(&self, ctx: &mut Context, args: Vec<ArgValue>) -> HandlerResult {
        let text = args
            .first()
            .and_then(ArgValue::as_str)
            .unwrap_or_default()
            .to_string();
        if text.is_empty() {
            ctx.reply("echo what?").await
        } else {
            ctx.reply(text).await
        }
    }
}

/// `roll [sides]` - roll a die, defaulting to six sides.
struct RollCommand;

#[async_trait]
impl CommandHandler for RollCommand {
    async fn invoke(&self, ctx: &mut Context, args: Vec<ArgValue>) -> HandlerResult {
        let sides = args.first().and_then(ArgValue::as_int).unwrap_or(6);
        let rolled = rand::thread_rng().gen_range(1..=sides);
        ctx.reply(format!("rolled {rolled} (d{sides})")).await
    }
}

/// Reports dispatch failures back to whoever sent the line.
struct ReportErrors;

#[async_trait]
impl EventListener for ReportErrors {
    async fn on_event(&self, args: &mut EventArgs<'_>) -> Result<EventOutcome, HandlerError> {
        if let EventArgs::Error { error, ctx } = args {
            warn!(error = %error, "command failed");
            if let Some(ctx) = ctx {
                ctx.reply(format!("error: {error}")).await?;
            }
        }
        Ok(None)
    }
}

/// The general demo module.
pub fn module(bounds_policy: BoundsPolicy) -> ModuleSpec {
    let sides = Bounds::new(Some(2), Some(120)).with_policy(bounds_policy);
    ModuleSpec::new().group(
        GroupSpec::new("general")
            .command(CommandSpec::new("ping", Arc::new(PingCommand)))
            .command(
                CommandSpec::new("echo", Arc::new(EchoCommand))
                    .param_with(ParamType::Str, Arc::new(StringTransformer::rest())),
            )
            .command(
                CommandSpec::new("roll", Arc::new(RollCommand))
                    .alias("dice")
                    .param_with(ParamType::Int, Arc::new(NumberTransformer::with_bounds(sides)))
                    .required(0),
            )
            .listen(EventName::Error, Arc::new(ReportErrors)),
    )
}
