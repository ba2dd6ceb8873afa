//! Interval-job lifecycle under paused tokio time: immediate first fire,
//! steady cadence, reload continuity, and teardown on unload.

mod common;

use common::*;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use straybot::context::Globals;
use straybot::dispatch::CommandProcessor;
use straybot::error::{HandlerError, HandlerResult};
use straybot::events::EventName;
use straybot::loader::intervals::Schedule;
use straybot::module::{GroupSpec, LifecycleHook, ModuleSpec, StaticResolver};
use async_trait::async_trait;

struct TickJob {
    probe: Arc<Probe>,
}

#[async_trait]
impl LifecycleHook for TickJob {
    async fn run(&self, _globals: &Globals) -> HandlerResult {
        self.probe.hit();
        Ok(())
    }
}

struct FailingJob;

#[async_trait]
impl LifecycleHook for FailingJob {
    async fn run(&self, _globals: &Globals) -> HandlerResult {
        Err(HandlerError::failed("tick failed"))
    }
}

fn ticker(probe: &Arc<Probe>, period_ms: &Arc<AtomicU64>) -> impl Fn() -> ModuleSpec + Send + Sync + use<> {
    let probe = probe.clone();
    let period_ms = period_ms.clone();
    move || {
        ModuleSpec::new().group(GroupSpec::new("g").interval(
            "tick",
            Schedule::Every(Duration::from_millis(period_ms.load(Ordering::SeqCst))),
            Arc::new(TickJob {
                probe: probe.clone(),
            }),
        ))
    }
}

async fn settle(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn test_reload_with_unchanged_period_keeps_cadence() {
    let probe = Probe::shared();
    let period = Arc::new(AtomicU64::new(1000));
    let resolver = StaticResolver::new().register("ticker", ticker(&probe, &period));
    let processor = CommandProcessor::new(Arc::new(resolver));

    processor.load_modules(["ticker"]).await;
    settle(5).await; // the fresh job fires once immediately
    assert_eq!(probe.count(), 1);

    settle(1000).await;
    assert_eq!(probe.count(), 2);

    // Reload halfway through the period: no double-fire, no reset.
    settle(500).await;
    assert!(processor.reload_modules(["ticker"]).await.is_empty());
    settle(450).await;
    assert_eq!(probe.count(), 2);

    // The next fire lands exactly one period after the previous one.
    settle(60).await;
    assert_eq!(probe.count(), 3);

    settle(1000).await;
    assert_eq!(probe.count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_unload_stops_job() {
    let probe = Probe::shared();
    let period = Arc::new(AtomicU64::new(1000));
    let resolver = StaticResolver::new().register("ticker", ticker(&probe, &period));
    let processor = CommandProcessor::new(Arc::new(resolver));

    processor.load_modules(["ticker"]).await;
    settle(1005).await;
    assert_eq!(probe.count(), 2);

    assert!(processor.unload_modules(["ticker"]).await.is_empty());
    settle(5000).await;
    assert_eq!(probe.count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_reload_with_changed_period_reschedules_fresh() {
    let probe = Probe::shared();
    let period = Arc::new(AtomicU64::new(1000));
    let resolver = StaticResolver::new().register("ticker", ticker(&probe, &period));
    let processor = CommandProcessor::new(Arc::new(resolver));

    processor.load_modules(["ticker"]).await;
    settle(5).await;
    assert_eq!(probe.count(), 1);

    // Change the period; the job is rescheduled like a fresh load.
    period.store(250, Ordering::SeqCst);
    assert!(processor.reload_modules(["ticker"]).await.is_empty());
    settle(5).await;
    assert_eq!(probe.count(), 2);

    settle(250).await;
    settle(250).await;
    assert_eq!(probe.count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_job_failure_routes_to_error_event_and_keeps_ticking() {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let capture = ErrorCapture::new(&errors);
    let resolver = StaticResolver::new().register("flaky", move || {
        ModuleSpec::new().group(
            GroupSpec::new("g")
                .interval(
                    "tick",
                    Schedule::Every(Duration::from_millis(100)),
                    Arc::new(FailingJob),
                )
                .listen(EventName::Error, capture.clone()),
        )
    });
    let processor = CommandProcessor::new(Arc::new(resolver));

    processor.load_modules(["flaky"]).await;
    settle(5).await;
    settle(100).await;
    settle(100).await;

    let seen = errors.lock().unwrap().clone();
    assert!(seen.len() >= 2, "job failures must keep surfacing: {seen:?}");
    assert!(seen.iter().all(|message| message == "tick failed"));
}
