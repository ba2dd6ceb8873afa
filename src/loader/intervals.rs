//! Interval-job scheduling.
//!
//! Each job runs in its own spawned task, woken either on a fixed period or
//! at wall-clock UTC times of day. A cancellation token tears the task down
//! on unload; a reload with an unchanged key and schedule hands the new task
//! the old last-fired anchor so the cadence continues unbroken.

use crate::context::Globals;
use crate::state::{IntervalRuntime, Switchboard};
use chrono::{DateTime, NaiveTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// When an interval job fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    /// A fixed period between firings.
    Every(Duration),
    /// One or more wall-clock UTC times of day.
    Daily(Vec<NaiveTime>),
}

/// A running interval job.
pub struct JobHandle {
    key: String,
    schedule: Schedule,
    token: CancellationToken,
    last_fired: Arc<Mutex<Instant>>,
}

impl JobHandle {
    /// The job key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The job's schedule.
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Cancel the job's task.
    pub fn stop(&self) {
        self.token.cancel();
    }
}

/// Schedule a module's interval jobs, reusing timer anchors from `prior`
/// handles whose key and schedule are unchanged.
pub(crate) fn schedule_module(
    switchboard: &Arc<Switchboard>,
    globals: &Arc<Globals>,
    module: &str,
    intervals: &[IntervalRuntime],
    mut prior: HashMap<String, JobHandle>,
) -> Vec<JobHandle> {
    let mut handles = Vec::with_capacity(intervals.len());
    for entry in intervals {
        let anchor = prior.remove(&entry.spec.key).and_then(|old| {
            old.stop();
            (old.schedule == entry.spec.schedule).then(|| old.last_fired.clone())
        });
        handles.push(spawn_job(switchboard, globals, module, entry, anchor));
    }
    for old in prior.into_values() {
        old.stop();
    }
    handles
}

fn spawn_job(
    switchboard: &Arc<Switchboard>,
    globals: &Arc<Globals>,
    module: &str,
    entry: &IntervalRuntime,
    anchor: Option<Arc<Mutex<Instant>>>,
) -> JobHandle {
    let token = CancellationToken::new();
    let resumed = anchor.is_some();
    let last_fired = anchor.unwrap_or_else(|| Arc::new(Mutex::new(Instant::now())));

    let task_token = token.clone();
    let switchboard = switchboard.clone();
    let globals = globals.clone();
    let hooks = entry.hooks.clone();
    let job = entry.spec.job.clone();
    let schedule = entry.spec.schedule.clone();
    let anchor = last_fired.clone();
    let module = module.to_string();
    let key = entry.spec.key.clone();

    tokio::spawn(async move {
        // A freshly loaded periodic job fires once immediately, anchoring
        // the cadence; resumed and wall-clock jobs wait for their slot.
        if !resumed && matches!(schedule, Schedule::Every(_)) {
            set_anchor(&anchor, Instant::now());
            debug!(module = %module, job = %key, "interval fired");
            switchboard.try_lifecycle(&hooks, &job, &globals).await;
        }
        loop {
            let wake = match &schedule {
                Schedule::Every(period) => read_anchor(&anchor) + *period,
                Schedule::Daily(times) => Instant::now() + next_daily_delay(times, Utc::now()),
            };
            tokio::select! {
                _ = task_token.cancelled() => break,
                _ = sleep_until(wake) => {
                    set_anchor(&anchor, Instant::now());
                    debug!(module = %module, job = %key, "interval fired");
                    switchboard.try_lifecycle(&hooks, &job, &globals).await;
                }
            }
        }
    });

    JobHandle {
        key: entry.spec.key.clone(),
        schedule: entry.spec.schedule.clone(),
        token,
        last_fired,
    }
}

fn read_anchor(anchor: &Arc<Mutex<Instant>>) -> Instant {
    *anchor.lock().expect("interval anchor lock poisoned")
}

fn set_anchor(anchor: &Arc<Mutex<Instant>>, value: Instant) {
    *anchor.lock().expect("interval anchor lock poisoned") = value;
}

/// Time until the next occurrence of any of the given UTC times of day.
pub fn next_daily_delay(times: &[NaiveTime], now: DateTime<Utc>) -> Duration {
    let mut best: Option<DateTime<Utc>> = None;
    for time in times {
        for days_ahead in 0..2u64 {
            let date = now.date_naive() + chrono::Days::new(days_ahead);
            let candidate = date.and_time(*time).and_utc();
            if candidate > now && best.is_none_or(|b| candidate < b) {
                best = Some(candidate);
            }
        }
    }
    match best {
        Some(when) => (when - now).to_std().unwrap_or_default(),
        // Unreachable with validated schedules (at least one time of day).
        None => Duration::from_secs(86_400),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_next_daily_delay_same_day() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let delay = next_daily_delay(&[at(10, 30, 0)], now);
        assert_eq!(delay, Duration::from_secs(30 * 60));
    }

    #[test]
    fn test_next_daily_delay_rolls_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 23, 0, 0).unwrap();
        let delay = next_daily_delay(&[at(1, 0, 0)], now);
        assert_eq!(delay, Duration::from_secs(2 * 3600));
    }

    #[test]
    fn test_next_daily_delay_picks_soonest_time() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let delay = next_daily_delay(&[at(6, 0, 0), at(12, 0, 30), at(18, 0, 0)], now);
        assert_eq!(delay, Duration::from_secs(30));
    }

    #[test]
    fn test_exact_time_rolls_forward() {
        // A job checked exactly at its slot schedules the next occurrence.
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap();
        let delay = next_daily_delay(&[at(6, 0, 0)], now);
        assert_eq!(delay, Duration::from_secs(24 * 3600));
    }
}
