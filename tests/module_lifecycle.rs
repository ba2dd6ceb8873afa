//! Loader transactions: load/unload/reload semantics, lifecycle hooks and
//! events, error lists, and exact reversibility of module contributions.

mod common;

use common::*;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use straybot::dispatch::CommandProcessor;
use straybot::error::LoadError;
use straybot::events::{EventName, EventVerdict};
use straybot::loader::ReloadPlan;
use straybot::module::{CommandSpec, GroupSpec, ModuleSpec, StaticResolver};

fn flat(probe: &Arc<Probe>, name: &str) -> impl Fn() -> ModuleSpec + Send + Sync + use<> {
    let probe = probe.clone();
    let name = name.to_string();
    move || {
        ModuleSpec::new().group(
            GroupSpec::new("g").command(CommandSpec::new(name.clone(), CountingCommand::new(&probe))),
        )
    }
}

fn nested(probe: &Arc<Probe>, prefix: &str, name: &str) -> impl Fn() -> ModuleSpec + Send + Sync + use<> {
    let probe = probe.clone();
    let prefix = prefix.to_string();
    let name = name.to_string();
    move || {
        ModuleSpec::new().group(
            GroupSpec::new("g")
                .parent([prefix.clone()])
                .command(CommandSpec::new(name.clone(), CountingCommand::new(&probe))),
        )
    }
}

#[tokio::test]
async fn test_unload_restores_exact_prior_table() {
    let probe = Probe::shared();
    let resolver = StaticResolver::new()
        .register("base", nested(&probe, "admin", "kick"))
        .register("extra", nested(&probe, "admin", "ban"));
    let processor = CommandProcessor::new(Arc::new(resolver));

    assert!(processor.load_modules(["base"]).await.is_empty());
    let before = processor.loader().switchboard().snapshot().await;

    assert!(processor.load_modules(["extra"]).await.is_empty());
    assert!(processor.unload_modules(["extra"]).await.is_empty());

    let after = processor.loader().switchboard().snapshot().await;
    assert_eq!(before.table, after.table);
    assert_eq!(processor.loader().loaded().await, vec!["base"]);
}

#[tokio::test]
async fn test_sibling_contributions_survive_shared_prefix_unload() {
    let a_probe = Probe::shared();
    let b_probe = Probe::shared();
    let default_probe = Probe::shared();

    let a_default = CountingCommand::new(&default_probe);
    let a_leaf = CountingCommand::new(&a_probe);
    let resolver = StaticResolver::new()
        .register("a", move || {
            ModuleSpec::new().group(
                GroupSpec::new("g")
                    .parent(["admin"])
                    .command(CommandSpec::new("kick", a_leaf.clone()))
                    .on_default_command(a_default.clone()),
            )
        })
        .register("b", nested(&b_probe, "admin", "ban"));
    let processor = CommandProcessor::new(Arc::new(resolver));
    processor.load_modules(["a", "b"]).await;

    dispatch(&processor, &bare(), "admin").await;
    assert_eq!(default_probe.count(), 1);

    assert!(processor.unload_modules(["a"]).await.is_empty());

    // B's leaf under the shared prefix is intact and dispatchable.
    dispatch(&processor, &bare(), "admin ban").await;
    assert_eq!(b_probe.count(), 1);

    // A's leaf and its default handler are gone, silently.
    dispatch(&processor, &bare(), "admin kick").await;
    dispatch(&processor, &bare(), "admin").await;
    assert_eq!(a_probe.count(), 0);
    assert_eq!(default_probe.count(), 1);
}

#[tokio::test]
async fn test_duplicate_command_rejects_whole_module() {
    let a_probe = Probe::shared();
    let b_probe = Probe::shared();
    let b_extra = CountingCommand::new(&b_probe);
    let b_dup = CountingCommand::new(&b_probe);
    let resolver = StaticResolver::new()
        .register("a", flat(&a_probe, "ping"))
        .register("b", move || {
            ModuleSpec::new().group(
                GroupSpec::new("g")
                    .command(CommandSpec::new("pong", b_extra.clone()))
                    .command(CommandSpec::new("ping", b_dup.clone())),
            )
        });
    let processor = CommandProcessor::new(Arc::new(resolver));

    assert!(processor.load_modules(["a"]).await.is_empty());
    let before = processor.loader().switchboard().snapshot().await;

    let errors = processor.load_modules(["b"]).await;
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors[0],
        LoadError::DuplicateCommand { ref name, .. } if name == "ping"
    ));

    // Nothing of module b was applied, not even its non-colliding command.
    let after = processor.loader().switchboard().snapshot().await;
    assert_eq!(before.table, after.table);
    assert_eq!(processor.loader().loaded().await, vec!["a"]);

    dispatch(&processor, &bare(), "pong").await;
    assert_eq!(b_probe.count(), 0);
    dispatch(&processor, &bare(), "ping").await;
    assert_eq!(a_probe.count(), 1);
}

#[tokio::test]
async fn test_batch_continues_past_failing_ids() {
    let probe = Probe::shared();
    let resolver = StaticResolver::new()
        .register("a", flat(&probe, "one"))
        .register("b", flat(&probe, "two"));
    let processor = CommandProcessor::new(Arc::new(resolver));

    let errors = processor.load_modules(["a", "a", "missing", "b"]).await;
    assert_eq!(errors.len(), 2);
    assert!(matches!(errors[0], LoadError::AlreadyLoaded(_)));
    assert!(matches!(errors[1], LoadError::UnknownModule(_)));
    assert_eq!(processor.loader().loaded().await, vec!["a", "b"]);

    let errors = processor.unload_modules(["never-loaded"]).await;
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], LoadError::NotLoaded(_)));
}

#[tokio::test]
async fn test_lifecycle_hooks_and_events() {
    let journal = Arc::new(Mutex::new(Vec::new()));
    let version = Arc::new(AtomicUsize::new(0));

    let factory_journal = journal.clone();
    let factory_version = version.clone();
    let watcher_load = Probe::shared();
    let watcher_unload = Probe::shared();
    let on_load_listener = FixedListener::new(None, &watcher_load);
    let on_unload_listener = FixedListener::new(None, &watcher_unload);
    let resolver = StaticResolver::new()
        .register("watcher", move || {
            ModuleSpec::new().group(
                GroupSpec::new("g")
                    .listen(EventName::OnLoad, on_load_listener.clone())
                    .listen(EventName::OnUnload, on_unload_listener.clone()),
            )
        })
        .register("target", move || {
            let v = factory_version.fetch_add(1, Ordering::SeqCst) + 1;
            ModuleSpec::new().group(
                GroupSpec::new("g")
                    .on_load(JournalHook::new(format!("load v{v}"), &factory_journal))
                    .on_unload(JournalHook::new(format!("unload v{v}"), &factory_journal)),
            )
        });
    let processor = CommandProcessor::new(Arc::new(resolver));
    processor.load_modules(["watcher"]).await;

    assert!(processor.load_modules(["target"]).await.is_empty());
    assert_eq!(journal.lock().unwrap().clone(), vec!["load v1"]);
    assert_eq!(watcher_load.count(), 1);

    // Reload runs the new version's load hook, then the old version's
    // unload hook, and fires both global events.
    assert!(processor.reload_modules(["target"]).await.is_empty());
    assert_eq!(
        journal.lock().unwrap().clone(),
        vec!["load v1", "load v2", "unload v1"]
    );
    assert_eq!(watcher_load.count(), 2);
    assert_eq!(watcher_unload.count(), 1);

    assert!(processor.unload_modules(["target"]).await.is_empty());
    assert_eq!(
        journal.lock().unwrap().clone(),
        vec!["load v1", "load v2", "unload v1", "unload v2"]
    );
    assert_eq!(watcher_unload.count(), 2);
}

#[tokio::test]
async fn test_reload_swaps_handler_without_losing_the_slot() {
    let version = Arc::new(AtomicUsize::new(0));
    let factory_version = version.clone();
    let resolver = StaticResolver::new().register("m", move || {
        let v = factory_version.fetch_add(1, Ordering::SeqCst) + 1;
        let probe = Probe::shared();
        ModuleSpec::new().group(
            GroupSpec::new("g").command(CommandSpec::new(
                "version",
                CountingCommand::replying(&probe, format!("v{v}")),
            )),
        )
    });
    let processor = CommandProcessor::new(Arc::new(resolver));

    processor.load_modules(["m"]).await;
    assert_eq!(dispatch(&processor, &bare(), "version").await, vec!["v1"]);

    assert!(processor.reload_modules(["m"]).await.is_empty());
    assert_eq!(dispatch(&processor, &bare(), "version").await, vec!["v2"]);
    assert_eq!(processor.loader().loaded().await, vec!["m"]);
}

#[tokio::test]
async fn test_reload_of_unloaded_module_acts_as_load() {
    let probe = Probe::shared();
    let resolver = StaticResolver::new().register("m", flat(&probe, "ping"));
    let processor = CommandProcessor::new(Arc::new(resolver));

    assert!(processor.reload_modules(["m"]).await.is_empty());
    dispatch(&processor, &bare(), "ping").await;
    assert_eq!(probe.count(), 1);
    assert_eq!(processor.loader().loaded().await, vec!["m"]);
}

#[tokio::test]
async fn test_unload_removes_event_listeners() {
    let probe = Probe::shared();
    let halt_probe = Probe::shared();
    let halt = FixedListener::new(Some(EventVerdict::Halt), &halt_probe);
    let resolver = StaticResolver::new()
        .register("target", flat(&probe, "ping"))
        .register("muzzle", move || {
            ModuleSpec::new()
                .group(GroupSpec::new("g").listen(EventName::OnMessage, halt.clone()))
        });
    let processor = CommandProcessor::new(Arc::new(resolver));
    processor.load_modules(["target", "muzzle"]).await;

    dispatch(&processor, &bare(), "ping").await;
    assert_eq!(probe.count(), 0);

    processor.unload_modules(["muzzle"]).await;
    dispatch(&processor, &bare(), "ping").await;
    assert_eq!(probe.count(), 1);
    assert_eq!(halt_probe.count(), 1);
}

#[tokio::test]
async fn test_handle_reload_composes_all_three_phases() {
    let probe = Probe::shared();
    let resolver = StaticResolver::new()
        .register("old", flat(&probe, "old"))
        .register("keep", flat(&probe, "keep"))
        .register("new", flat(&probe, "new"));
    let processor = CommandProcessor::new(Arc::new(resolver));
    processor.load_modules(["old", "keep"]).await;

    let errors = processor
        .handle_reload(ReloadPlan {
            add: vec!["new".into()],
            remove: vec!["old".into()],
            reload: vec!["keep".into()],
        })
        .await;
    assert!(errors.is_empty());
    assert_eq!(processor.loader().loaded().await, vec!["keep", "new"]);

    // Removals run first, so a plan can free a name for an added module.
    let errors = processor
        .handle_reload(ReloadPlan {
            add: vec!["missing".into()],
            remove: vec!["not-there".into()],
            reload: vec![],
        })
        .await;
    assert_eq!(errors.len(), 2);
}

#[tokio::test]
async fn test_freed_name_is_reusable_after_unload() {
    let a_probe = Probe::shared();
    let b_probe = Probe::shared();
    let resolver = StaticResolver::new()
        .register("a", flat(&a_probe, "ping"))
        .register("b", flat(&b_probe, "ping"));
    let processor = CommandProcessor::new(Arc::new(resolver));

    processor.load_modules(["a"]).await;
    assert_eq!(processor.load_modules(["b"]).await.len(), 1);

    processor.unload_modules(["a"]).await;
    assert!(processor.load_modules(["b"]).await.is_empty());

    dispatch(&processor, &bare(), "ping").await;
    assert_eq!(a_probe.count(), 0);
    assert_eq!(b_probe.count(), 1);
}
