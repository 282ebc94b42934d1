//! Fake generation services for simulation tests.
//!
//! Both fakes timestamp every call against the shared [`SimClock`], which is
//! what the rate-ceiling checks run on.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use qg_core::{Clock, ServiceError, ServiceErrorKind, TextGenerator};

use crate::clock::SimClock;
use crate::fault::{FaultInjector, FaultStats};

/// One scripted response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Answer with this text
    Reply(String),
    /// Fail with a throttling error
    Throttle,
    /// Fail with a non-retryable error
    Fail(String),
}

impl Step {
    pub fn reply(text: impl Into<String>) -> Self {
        Step::Reply(text.into())
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Step::Fail(message.into())
    }
}

/// How a recorded call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Replied,
    Failed(ServiceErrorKind),
}

/// A call that reached a fake service.
#[derive(Debug, Clone)]
pub struct CallRecord {
    /// Simulated time the call arrived
    pub at: Duration,
    pub prompt: String,
    pub outcome: CallOutcome,
}

/// Ordered record of calls.
#[derive(Debug, Default)]
pub struct CallLog {
    calls: Mutex<Vec<CallRecord>>,
}

impl CallLog {
    fn lock(&self) -> MutexGuard<'_, Vec<CallRecord>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, record: CallRecord) {
        self.lock().push(record);
    }

    #[must_use]
    pub fn records(&self) -> Vec<CallRecord> {
        self.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Arrival times of every call.
    #[must_use]
    pub fn timestamps(&self) -> Vec<Duration> {
        self.lock().iter().map(|r| r.at).collect()
    }

    /// Number of calls whose prompt contains `marker`.
    #[must_use]
    pub fn count_matching(&self, marker: &str) -> usize {
        self.lock().iter().filter(|r| r.prompt.contains(marker)).count()
    }

    /// Arrival times of calls that got a reply.
    #[must_use]
    pub fn replied_timestamps(&self) -> Vec<Duration> {
        self.lock()
            .iter()
            .filter(|r| r.outcome == CallOutcome::Replied)
            .map(|r| r.at)
            .collect()
    }

    /// Largest number of calls inside any half-open span `[t, t + window)`.
    #[must_use]
    pub fn max_in_window(&self, window: Duration) -> usize {
        densest_window(&self.timestamps(), window)
    }

    /// Like [`CallLog::max_in_window`], counting replied calls only.
    #[must_use]
    pub fn max_replied_in_window(&self, window: Duration) -> usize {
        densest_window(&self.replied_timestamps(), window)
    }
}

/// Sliding-window maximum over sorted arrival times.
fn densest_window(times: &[Duration], window: Duration) -> usize {
    let mut max = 0;
    let mut start = 0;
    for end in 0..times.len() {
        while times[end] >= times[start] + window {
            start += 1;
        }
        max = max.max(end - start + 1);
    }
    max
}

/// Plays back a script of replies and errors per prompt.
///
/// A prompt uses the script of the first registered marker it contains.
/// Once a script runs dry, or when no marker matches, the service replies
/// with a default text derived from the prompt.
pub struct ScriptedService {
    clock: Arc<SimClock>,
    scripts: Mutex<Vec<(String, VecDeque<Step>)>>,
    latency: Duration,
    log: CallLog,
}

impl ScriptedService {
    pub fn new(clock: Arc<SimClock>) -> Self {
        Self {
            clock,
            scripts: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
            log: CallLog::default(),
        }
    }

    /// Register a script for prompts containing `marker`.
    #[must_use]
    pub fn on(self, marker: impl Into<String>, steps: impl IntoIterator<Item = Step>) -> Self {
        self.lock_scripts()
            .push((marker.into(), steps.into_iter().collect()));
        self
    }

    /// Simulated time each call takes.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }

    /// Shorthand for `log().records()`.
    #[must_use]
    pub fn calls(&self) -> Vec<CallRecord> {
        self.log.records()
    }

    fn lock_scripts(&self) -> MutexGuard<'_, Vec<(String, VecDeque<Step>)>> {
        self.scripts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_step(&self, prompt: &str) -> Step {
        let mut scripts = self.lock_scripts();
        let script = scripts
            .iter_mut()
            .find(|(marker, _)| prompt.contains(marker.as_str()));

        match script.and_then(|(_, steps)| steps.pop_front()) {
            Some(step) => step,
            None => Step::Reply(default_reply(prompt)),
        }
    }
}

fn default_reply(prompt: &str) -> String {
    let first_line = prompt
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("empty prompt");
    format!("Generated test case for: {first_line}")
}

#[async_trait]
impl TextGenerator for ScriptedService {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        let at = self.clock.now();
        let step = self.next_step(prompt);

        if !self.latency.is_zero() {
            self.clock.advance(self.latency);
        }

        let (outcome, result) = match step {
            Step::Reply(text) => (CallOutcome::Replied, Ok(text)),
            Step::Throttle => (
                CallOutcome::Failed(ServiceErrorKind::Throttling),
                Err(ServiceError::throttled("429 Resource has been exhausted")),
            ),
            Step::Fail(message) => (
                CallOutcome::Failed(ServiceErrorKind::Fatal),
                Err(ServiceError::fatal(message)),
            ),
        };

        self.log.push(CallRecord {
            at,
            prompt: prompt.to_string(),
            outcome,
        });
        result
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Throttles or fails at random, per a seeded [`FaultInjector`].
pub struct FaultyService {
    clock: Arc<SimClock>,
    injector: Mutex<FaultInjector>,
    log: CallLog,
}

impl FaultyService {
    pub fn new(clock: Arc<SimClock>, injector: FaultInjector) -> Self {
        Self {
            clock,
            injector: Mutex::new(injector),
            log: CallLog::default(),
        }
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }

    #[must_use]
    pub fn fault_stats(&self) -> FaultStats {
        self.injector
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .stats()
    }
}

#[async_trait]
impl TextGenerator for FaultyService {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        let at = self.clock.now();
        let fault = self
            .injector
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .next_fault();

        let (outcome, result) = match fault {
            None => (CallOutcome::Replied, Ok(default_reply(prompt))),
            Some(ServiceErrorKind::Throttling) => (
                CallOutcome::Failed(ServiceErrorKind::Throttling),
                Err(ServiceError::throttled("simulated quota exhaustion")),
            ),
            Some(ServiceErrorKind::Fatal) => (
                CallOutcome::Failed(ServiceErrorKind::Fatal),
                Err(ServiceError::fatal("simulated service failure")),
            ),
        };

        self.log.push(CallRecord {
            at,
            prompt: prompt.to_string(),
            outcome,
        });
        result
    }

    fn name(&self) -> &str {
        "faulty"
    }
}
