//! Sequential generation pipeline.
//!
//! Runs one request at a time against the generation service, keeping to
//! the configured window quota, pacing successful requests, and backing
//! off geometrically on throttling. The first specification that cannot be
//! generated aborts the run.

use std::time::Duration;

use qg_core::{
    verify_suite, Clock, GenerationResult, ServiceError, TestCaseSpecification, TextGenerator,
};

use crate::limits::{RateLimitConfig, RateLimitState};
use crate::prompt::{tidy_response, PromptBuilder};

/// Case type reported for single-prompt story runs.
const STORY_CASE_TYPE: &str = "Story";

/// What a failed run hands back besides the failure itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// No results at all
    #[default]
    AllOrNothing,
    /// The completed prefix, marked incomplete
    RetainPartial,
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Requests that reached the service, throttled ones included.
    /// Only accepted ones count against the window.
    pub requests_count: u32,
    /// Requests answered with a throttling error
    pub throttled_count: u32,
    /// Full-window waits taken
    pub cooldowns_count: u32,
    /// Clock time from start to finish
    pub elapsed: Duration,
}

/// A complete, ordered suite: one result per specification.
#[derive(Debug, Clone)]
pub struct GeneratedSuite {
    pub results: Vec<GenerationResult>,
    pub stats: RunStats,
}

impl GeneratedSuite {
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn into_results(self) -> Vec<GenerationResult> {
        self.results
    }

    /// Format as a summary string.
    pub fn format_summary(&self) -> String {
        let mut summary = format!(
            "[SUCCESS] Generated {} test cases in {:.2}s\n",
            self.results.len(),
            self.stats.elapsed.as_secs_f64(),
        );
        summary.push_str(&format!("  Requests: {}\n", self.stats.requests_count));
        summary.push_str(&format!("  Throttled: {}\n", self.stats.throttled_count));
        summary.push_str(&format!(
            "  Window cooldowns: {}\n",
            self.stats.cooldowns_count
        ));
        summary
    }
}

/// A run aborted at one specification.
#[derive(Debug, thiserror::Error)]
#[error(
    "Generation failed for specification {index} ({case_type}) after {attempts} attempt(s): {cause}"
)]
pub struct GenerationFailure {
    /// Position of the failing specification in the input
    pub index: usize,
    /// Its case type
    pub case_type: String,
    /// Requests sent for it
    pub attempts: u32,
    #[source]
    pub cause: ServiceError,
    /// Results for specifications before `index`, under
    /// [`FailurePolicy::RetainPartial`] only. Always incomplete.
    pub partial: Option<Vec<GenerationResult>>,
}

impl GenerationFailure {
    /// Whether the run ran out of attempts on throttling rather than
    /// hitting a non-retryable error.
    #[must_use]
    pub fn is_retry_exhaustion(&self) -> bool {
        self.cause.is_throttling()
    }
}

/// Generates one test case per specification, sequentially.
///
/// Window state lives inside each `run`, so a pipeline can be run any
/// number of times and each run starts with a fresh window.
pub struct GenerationPipeline<G, C> {
    service: G,
    clock: C,
    limits: RateLimitConfig,
    policy: FailurePolicy,
    feature: String,
}

impl<G: TextGenerator, C: Clock> GenerationPipeline<G, C> {
    pub fn new(service: G, clock: C, limits: RateLimitConfig) -> Self {
        debug_assert!(limits.validate().is_ok(), "Rate limits must be validated");

        Self {
            service,
            clock,
            limits,
            policy: FailurePolicy::default(),
            feature: "Login".to_string(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Feature name used in prompts (default "Login").
    #[must_use]
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = feature.into();
        self
    }

    pub fn limits(&self) -> &RateLimitConfig {
        &self.limits
    }

    pub fn service(&self) -> &G {
        &self.service
    }

    /// Generate a test case for each specification, in order.
    pub async fn run(
        &self,
        specs: &[TestCaseSpecification],
    ) -> Result<GeneratedSuite, GenerationFailure> {
        let start = self.clock.now();
        let mut state = RateLimitState::new(start);
        let mut stats = RunStats::default();
        let mut results = Vec::with_capacity(specs.len());

        tracing::info!(
            specs_count = specs.len(),
            service = self.service.name(),
            max_requests_per_window = self.limits.max_requests_per_window,
            max_attempts = self.limits.max_retries_per_item,
            "Starting generation run"
        );

        for (index, spec) in specs.iter().enumerate() {
            let prompt = PromptBuilder::build_case_prompt(spec, &self.feature);

            tracing::info!(index, case_type = %spec.case_type, "Generating test case");

            match self.dispatch(&prompt, &mut state, &mut stats).await {
                Ok(text) => {
                    tracing::info!(index, case_type = %spec.case_type, "Test case generated");
                    results.push(GenerationResult::new(index, text));
                    self.pause(self.limits.inter_request_delay()).await;
                }
                Err((attempts, cause)) => {
                    tracing::error!(
                        index,
                        case_type = %spec.case_type,
                        attempts,
                        error = %cause,
                        "Generation failed, aborting run"
                    );
                    return Err(self.failure(index, &spec.case_type, attempts, cause, results));
                }
            }
        }

        stats.elapsed = self.clock.now().saturating_sub(start);
        debug_assert!(
            verify_suite(&results, specs.len()).is_ok(),
            "Generated suite must be complete and ordered"
        );

        tracing::info!(
            results_count = results.len(),
            requests_count = stats.requests_count,
            throttled_count = stats.throttled_count,
            cooldowns_count = stats.cooldowns_count,
            "Generation run complete"
        );

        Ok(GeneratedSuite { results, stats })
    }

    /// Send one free-form prompt under the same limits.
    ///
    /// Failures report index 0 and case type "Story".
    pub async fn run_prompt(&self, prompt: &str) -> Result<String, GenerationFailure> {
        let mut state = RateLimitState::new(self.clock.now());
        let mut stats = RunStats::default();

        tracing::info!(service = self.service.name(), "Generating from single prompt");

        match self.dispatch(prompt, &mut state, &mut stats).await {
            Ok(text) => Ok(text),
            Err((attempts, cause)) => {
                tracing::error!(attempts, error = %cause, "Generation failed");
                Err(self.failure(0, STORY_CASE_TYPE, attempts, cause, Vec::new()))
            }
        }
    }

    /// Send one prompt until it succeeds, fails fatally, or runs out of
    /// attempts. Errors carry the number of requests sent.
    ///
    /// The window gate runs once, before the first attempt. Retries are
    /// paced by backoff alone, and only an accepted request counts
    /// against the window.
    async fn dispatch(
        &self,
        prompt: &str,
        state: &mut RateLimitState,
        stats: &mut RunStats,
    ) -> Result<String, (u32, ServiceError)> {
        let max_attempts = self.limits.max_retries_per_item;
        let mut attempt: u32 = 0;

        if state.window_exhausted(&self.limits) {
            tracing::info!(
                requests_since_reset = state.requests_since_reset,
                wait_secs = self.limits.window_seconds,
                "Request window exhausted, waiting for cooldown"
            );
            self.pause(self.limits.window()).await;
            state.reset(self.clock.now());
            stats.cooldowns_count += 1;
        }

        loop {
            stats.requests_count += 1;

            let cause = match self.service.generate(prompt).await {
                Ok(text) => {
                    let text = tidy_response(&text);
                    if !text.is_empty() {
                        state.record_request();
                        return Ok(text);
                    }
                    ServiceError::fatal("service returned an empty response")
                }
                Err(err) => err,
            };

            let attempts = attempt + 1;
            if !cause.is_throttling() {
                return Err((attempts, cause));
            }

            stats.throttled_count += 1;
            if attempts >= max_attempts {
                return Err((attempts, cause));
            }

            let backoff = self.limits.backoff_delay(attempt);
            tracing::warn!(
                attempt = attempts,
                max_attempts,
                backoff_secs = backoff.as_secs(),
                "Request throttled, backing off"
            );
            self.pause(backoff).await;
            attempt = attempts;
        }
    }

    async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            self.clock.sleep(duration).await;
        }
    }

    fn failure(
        &self,
        index: usize,
        case_type: &str,
        attempts: u32,
        cause: ServiceError,
        completed: Vec<GenerationResult>,
    ) -> GenerationFailure {
        debug_assert!(completed.len() == index, "Completed prefix must end at the failure");

        let partial = match self.policy {
            FailurePolicy::AllOrNothing => None,
            FailurePolicy::RetainPartial => Some(completed),
        };
        GenerationFailure {
            index,
            case_type: case_type.to_string(),
            attempts,
            cause,
            partial,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use qg_core::{LoginCatalogue, ServiceErrorKind, SpecificationSource};
    use qg_sim::{ScriptedService, SimClock, Step};

    fn specs(types: &[&str]) -> Vec<TestCaseSpecification> {
        types
            .iter()
            .map(|t| TestCaseSpecification::new(*t, format!("Check {t}"), "App is up.", "", ""))
            .collect()
    }

    fn fast_limits() -> RateLimitConfig {
        RateLimitConfig {
            max_requests_per_window: 100,
            inter_request_delay_seconds: 0,
            max_retries_per_item: 3,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_run_preserves_order() {
        let clock = Arc::new(SimClock::new());
        let service = ScriptedService::new(clock.clone())
            .on("Check A", [Step::reply("case A")])
            .on("Check B", [Step::reply("case B")])
            .on("Check C", [Step::reply("case C")]);
        let pipeline = GenerationPipeline::new(service, clock.clone(), fast_limits());

        let suite = pipeline.run(&specs(&["A", "B", "C"])).await.unwrap();

        let texts: Vec<&str> = suite.results.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, ["case A", "case B", "case C"]);
        assert_eq!(suite.stats.requests_count, 3);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_empty_input() {
        let clock = Arc::new(SimClock::new());
        let service = ScriptedService::new(clock.clone());
        let pipeline = GenerationPipeline::new(service, clock.clone(), RateLimitConfig::default());

        let suite = pipeline.run(&[]).await.unwrap();
        assert!(suite.is_empty());
        assert!(pipeline.service().calls().is_empty());
    }

    #[tokio::test]
    async fn test_default_limits_pace_and_cool_down() {
        let clock = Arc::new(SimClock::new());
        let service = ScriptedService::new(clock.clone());
        let pipeline = GenerationPipeline::new(service, clock.clone(), RateLimitConfig::default());

        let specs = LoginCatalogue::core().produce();
        let suite = pipeline.run(&specs).await.unwrap();

        assert_eq!(suite.len(), 2);
        // delay after A, window cooldown before B, delay after B
        assert_eq!(
            clock.sleeps(),
            [
                Duration::from_secs(1),
                Duration::from_secs(60),
                Duration::from_secs(1)
            ]
        );
        assert_eq!(suite.stats.cooldowns_count, 1);
        assert_eq!(suite.stats.elapsed, Duration::from_secs(62));

        let times = pipeline.service().log().timestamps();
        assert_eq!(times, [Duration::ZERO, Duration::from_secs(61)]);
    }

    #[tokio::test]
    async fn test_throttled_attempts_do_not_count_against_window() {
        let clock = Arc::new(SimClock::new());
        let service = ScriptedService::new(clock.clone()).on("Check A", [Step::Throttle]);
        let limits = RateLimitConfig {
            max_requests_per_window: 1,
            inter_request_delay_seconds: 0,
            max_retries_per_item: 2,
            ..Default::default()
        };
        let pipeline = GenerationPipeline::new(service, clock.clone(), limits);

        let suite = pipeline.run(&specs(&["A", "B"])).await.unwrap();

        assert_eq!(suite.len(), 2);
        // backoff 1s before the retry, cooldown only after the accepted request
        assert_eq!(
            clock.sleeps(),
            [Duration::from_secs(1), Duration::from_secs(60)]
        );
        assert_eq!(suite.stats.cooldowns_count, 1);
        assert_eq!(suite.stats.requests_count, 3);

        let log = pipeline.service().log();
        assert_eq!(log.timestamps(), [0, 1, 61].map(Duration::from_secs));
        assert_eq!(log.max_replied_in_window(pipeline.limits().window()), 1);
    }

    #[tokio::test]
    async fn test_retry_exhaustion() {
        let clock = Arc::new(SimClock::new());
        let service = ScriptedService::new(clock.clone())
            .on("Check A", [Step::Throttle, Step::Throttle, Step::Throttle, Step::Throttle]);
        let pipeline = GenerationPipeline::new(service, clock.clone(), fast_limits());

        let failure = pipeline.run(&specs(&["A", "B"])).await.unwrap_err();

        assert_eq!(failure.index, 0);
        assert_eq!(failure.case_type, "A");
        assert_eq!(failure.attempts, 3);
        assert!(failure.is_retry_exhaustion());
        assert!(failure.partial.is_none());
        assert_eq!(pipeline.service().calls().len(), 3);
        // No backoff after the last attempt
        assert_eq!(
            clock.sleeps(),
            [Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[tokio::test]
    async fn test_fatal_error_is_not_retried() {
        let clock = Arc::new(SimClock::new());
        let service = ScriptedService::new(clock.clone()).on("Check B", [Step::fail("401 bad key")]);
        let pipeline = GenerationPipeline::new(service, clock.clone(), fast_limits())
            .with_policy(FailurePolicy::RetainPartial);

        let failure = pipeline.run(&specs(&["A", "B", "C"])).await.unwrap_err();

        assert_eq!(failure.index, 1);
        assert_eq!(failure.attempts, 1);
        assert_eq!(failure.cause.kind, ServiceErrorKind::Fatal);
        assert!(!failure.is_retry_exhaustion());

        let partial = failure.partial.unwrap();
        assert_eq!(partial.len(), 1);
        assert_eq!(partial[0].index, 0);
        assert_eq!(pipeline.service().log().count_matching("Check C"), 0);
    }

    #[tokio::test]
    async fn test_empty_response_fails() {
        let clock = Arc::new(SimClock::new());
        let service = ScriptedService::new(clock.clone()).on("Check A", [Step::reply("  \n")]);
        let pipeline = GenerationPipeline::new(service, clock.clone(), fast_limits());

        let failure = pipeline.run(&specs(&["A"])).await.unwrap_err();
        assert_eq!(failure.cause.kind, ServiceErrorKind::Fatal);
        assert_eq!(failure.attempts, 1);
    }

    #[tokio::test]
    async fn test_run_prompt() {
        let clock = Arc::new(SimClock::new());
        let service = ScriptedService::new(clock.clone())
            .on("story", [Step::Throttle, Step::reply("```markdown\n1. Login works\n```")]);
        let pipeline = GenerationPipeline::new(service, clock.clone(), fast_limits());

        let text = pipeline.run_prompt("story prompt").await.unwrap();
        assert_eq!(text, "1. Login works");
        assert_eq!(clock.sleeps(), [Duration::from_secs(1)]);
    }

    #[tokio::test]
    async fn test_run_prompt_failure_reports_story() {
        let clock = Arc::new(SimClock::new());
        let service = ScriptedService::new(clock.clone()).on("story", [Step::fail("500")]);
        let pipeline = GenerationPipeline::new(service, clock.clone(), fast_limits());

        let failure = pipeline.run_prompt("story prompt").await.unwrap_err();
        assert_eq!(failure.index, 0);
        assert_eq!(failure.case_type, "Story");
    }

    #[tokio::test]
    async fn test_feature_reaches_prompt() {
        let clock = Arc::new(SimClock::new());
        let service = ScriptedService::new(clock.clone());
        let pipeline =
            GenerationPipeline::new(service, clock.clone(), fast_limits()).with_feature("Checkout");

        pipeline.run(&specs(&["A"])).await.unwrap();
        assert_eq!(pipeline.service().log().count_matching("**Feature:** Checkout"), 1);
    }

    #[test]
    fn test_format_summary() {
        let suite = GeneratedSuite {
            results: vec![GenerationResult::new(0, "x")],
            stats: RunStats {
                requests_count: 3,
                throttled_count: 2,
                cooldowns_count: 1,
                elapsed: Duration::from_millis(1500),
            },
        };
        let summary = suite.format_summary();
        assert!(summary.starts_with("[SUCCESS] Generated 1 test cases in 1.50s"));
        assert!(summary.contains("Throttled: 2"));
        assert!(summary.contains("Window cooldowns: 1"));
    }

    #[test]
    fn test_failure_display() {
        let failure = GenerationFailure {
            index: 4,
            case_type: "Cross-Browser - Chrome".to_string(),
            attempts: 5,
            cause: ServiceError::throttled("quota"),
            partial: None,
        };
        assert_eq!(
            failure.to_string(),
            "Generation failed for specification 4 (Cross-Browser - Chrome) after 5 attempt(s): throttled: quota"
        );
    }
}
