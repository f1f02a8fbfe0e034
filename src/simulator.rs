//! Simulated transfer for one upload attempt.
//!
//! The state machine is a pure step function over [`UploadRecord`]; timing
//! comes from a [`Scheduler`] and every random draw from a [`RandomSource`],
//! so tests can run a whole attempt without real timers.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{UploadRecord, UploadStatus};
use crate::random::RandomSource;
use crate::share::LinkBuilder;

/// knobs for the fake network. none of these are correctness contracts.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationTuning {
    /// per-step delay is drawn from [min_delay, max_delay)
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// progress increment per step, percentage points in [0, max_increment)
    pub max_increment: f64,
    /// reported speed in MB/s while uploading, [min_speed, max_speed)
    pub min_speed: f64,
    pub max_speed: f64,
    /// chance that an attempt gets aborted
    pub failure_rate: f64,
    /// the abort lands somewhere in [0, failure_window) of simulated time
    pub failure_window: Duration,
}

impl Default for SimulationTuning {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
            max_increment: 15.0,
            min_speed: 1.2,
            max_speed: 4.2,
            failure_rate: 0.05,
            failure_window: Duration::from_millis(1000),
        }
    }
}

pub type SleepFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// what drives time between steps
pub trait Scheduler: Send + Sync {
    fn sleep(&self, delay: Duration) -> SleepFuture;
}

/// real timers
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn sleep(&self, delay: Duration) -> SleepFuture {
        Box::pin(tokio::time::sleep(delay))
    }
}

/// no waiting at all, just yields back to the runtime between steps
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
    fn sleep(&self, _delay: Duration) -> SleepFuture {
        Box::pin(tokio::task::yield_now())
    }
}

/// decided once when an attempt starts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttemptPlan {
    /// simulated time after which the transfer is aborted, if it is doomed
    pub abort_after: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Progress(UploadRecord),
    Completed(UploadRecord),
    Failed(UploadRecord),
}

impl Step {
    pub fn record(&self) -> &UploadRecord {
        match self {
            Self::Progress(r) | Self::Completed(r) | Self::Failed(r) => r,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }
}

#[derive(Clone)]
pub struct Simulator {
    tuning: SimulationTuning,
    random: Arc<dyn RandomSource>,
    links: LinkBuilder,
}

impl Simulator {
    pub fn new(tuning: SimulationTuning, random: Arc<dyn RandomSource>, links: LinkBuilder) -> Self {
        Self {
            tuning,
            random,
            links,
        }
    }

    pub fn tuning(&self) -> &SimulationTuning {
        &self.tuning
    }

    /// enter uploading and roll the dice on whether this attempt will be aborted
    pub fn begin(&self, record: &UploadRecord) -> (UploadRecord, AttemptPlan) {
        let abort_after = if self.random.chance(self.tuning.failure_rate) {
            let window = self.tuning.failure_window.as_secs_f64();
            Some(Duration::from_secs_f64(self.random.range(0.0, window)))
        } else {
            None
        };
        (record.start_attempt(), AttemptPlan { abort_after })
    }

    pub fn next_delay(&self) -> Duration {
        let low = self.tuning.min_delay.as_secs_f64();
        let high = self.tuning.max_delay.as_secs_f64().max(low);
        Duration::from_secs_f64(self.random.range(low, high))
    }

    /// one tick of an uploading record, `elapsed` being the simulated time
    /// since the attempt began. records outside `uploading` are handed back unchanged.
    pub fn step(&self, record: &UploadRecord, elapsed: Duration, plan: &AttemptPlan) -> Step {
        if record.status != UploadStatus::Uploading {
            return Step::Progress(record.clone());
        }

        if plan.abort_after.is_some_and(|at| elapsed >= at) {
            return Step::Failed(record.fail());
        }

        let increment = self.random.range(0.0, self.tuning.max_increment);
        let speed = self.random.range(self.tuning.min_speed, self.tuning.max_speed);
        let next = record.advance(increment, speed);

        if next.progress >= 100.0 {
            Step::Completed(next.complete(self.links.file_link(&next.id)))
        } else {
            Step::Progress(next)
        }
    }
}
