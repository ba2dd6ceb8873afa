//! Admin demo module: module management commands under the `admin` prefix,
//! gated by a maintenance-mode check.

use crate::context::Context;
use crate::error::{HandlerError, HandlerResult, LoadError};
use crate::module::{
    ArgValue, CheckHandler, CommandHandler, CommandSpec, GroupSpec, ModuleSpec, ParamType,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// State shared between the maintenance toggle and the admin-subtree check.
struct AdminShared {
    maintenance: AtomicBool,
}

/// `maintenance <on|off>` - toggle maintenance mode.
struct MaintenanceCommand {
    shared: Arc<AdminShared>,
}

#[async_trait]
impl CommandHandler for MaintenanceCommand {
    async fn invoke(&self, ctx: &mut Context, args: Vec<ArgValue>) -> HandlerResult {
        let enabled = args.first().and_then(ArgValue::as_bool).unwrap_or(false);
        self.shared.maintenance.store(enabled, Ordering::SeqCst);
        ctx.reply(if enabled {
            "maintenance mode on; admin commands disabled"
        } else {
            "maintenance mode off"
        })
        .await
    }
}

/// Denies the admin subtree while maintenance mode is on.
struct MaintenanceCheck {
    shared: Arc<AdminShared>,
}

#[async_trait]
impl CheckHandler for MaintenanceCheck {
    async fn check(&self, ctx: &mut Context) -> Result<bool, HandlerError> {
        if self.shared.maintenance.load(Ordering::SeqCst) {
            ctx.reply("admin commands are disabled during maintenance")
                .await?;
            return Ok(false);
        }
        Ok(true)
    }
}

/// Which loader operation a module-management command performs.
#[derive(Clone, Copy)]
enum Op {
    Load,
    Unload,
    Reload,
}

struct ModuleCommand {
    op: Op,
}

#[async_trait]
impl CommandHandler for ModuleCommand {
    async fn invoke(&self, ctx: &mut Context, args: Vec<ArgValue>) -> HandlerResult {
        let id = args
            .first()
            .and_then(ArgValue::as_str)
            .ok_or_else(|| HandlerError::failed("missing module id"))?
            .to_string();

        let globals = ctx.globals.clone();
        let (errors, verb): (Vec<LoadError>, &str) = match self.op {
            Op::Load => (globals.loader.load(&globals, [&id]).await, "loaded"),
            Op::Unload => (globals.loader.unload(&globals, [&id]).await, "unloaded"),
            Op::Reload => (globals.loader.reload(&globals, [&id]).await, "reloaded"),
        };

        if errors.is_empty() {
            ctx.reply(format!("{verb} '{id}'")).await
        } else {
            for error in &errors {
                ctx.reply(format!("{error}")).await?;
            }
            Ok(())
        }
    }
}

struct StatusCommand;

#[async_trait]
impl CommandHandler for StatusCommand {
    async fn invoke(&self, ctx: &mut Context, _args: Vec<ArgValue>) -> HandlerResult {
        let loaded = ctx.globals.loader.loaded().await;
        ctx.reply(format!("loaded modules: {}", loaded.join(", "))).await
    }
}

struct AdminUsage;

#[async_trait]
impl CommandHandler for AdminUsage {
    async fn invoke(&self, ctx: &mut Context, _args: Vec<ArgValue>) -> HandlerResult {
        ctx.reply("admin commands: load <id>, unload <id>, reload <id>, status")
            .await
    }
}

struct AdminUnknown;

#[async_trait]
impl CommandHandler for AdminUnknown {
    async fn invoke(&self, ctx: &mut Context, _args: Vec<ArgValue>) -> HandlerResult {
        ctx.reply(format!("unknown admin command '{}'", ctx.command_name))
            .await
    }
}

/// The admin demo module.
pub fn module() -> ModuleSpec {
    let shared = Arc::new(AdminShared {
        maintenance: AtomicBool::new(false),
    });

    ModuleSpec::new()
        .group(
            GroupSpec::new("maintenance").command(
                CommandSpec::new(
                    "maintenance",
                    Arc::new(MaintenanceCommand {
                        shared: shared.clone(),
                    }),
                )
                .param(ParamType::Bool),
            ),
        )
        .group(
            GroupSpec::new("admin")
                .parent(["admin"])
                .command(
                    CommandSpec::new("load", Arc::new(ModuleCommand { op: Op::Load }))
                        .param(ParamType::Str),
                )
                .command(
                    CommandSpec::new("unload", Arc::new(ModuleCommand { op: Op::Unload }))
                        .param(ParamType::Str),
                )
                .command(
                    CommandSpec::new("reload", Arc::new(ModuleCommand { op: Op::Reload }))
                        .param(ParamType::Str),
                )
                .command(CommandSpec::new("status", Arc::new(StatusCommand)))
                .check("maintenance", Arc::new(MaintenanceCheck { shared }))
                .on_default_command(Arc::new(AdminUsage))
                .on_command_not_found(Arc::new(AdminUnknown)),
        )
}
