//! Deterministic fault injection for the generation service.
//!
//! Decides, call by call, whether a fake service should throttle, fail
//! fatally, or answer. Decisions come from a seeded RNG, so the same seed
//! replays the same fault sequence.

use qg_core::ServiceErrorKind;

use crate::random::DeterministicRng;

/// Configuration for fault injection.
#[derive(Debug, Clone)]
pub struct FaultConfig {
    /// Probability a call is throttled (0.0 to 1.0)
    pub throttle_probability: f64,
    /// Probability a call fails with a non-retryable error
    pub fatal_probability: f64,
    /// Whether fault injection is enabled
    pub enabled: bool,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            throttle_probability: 0.2,
            fatal_probability: 0.0,
            enabled: true,
        }
    }
}

impl FaultConfig {
    /// Every call succeeds.
    #[must_use]
    pub fn none() -> Self {
        Self {
            throttle_probability: 0.0,
            fatal_probability: 0.0,
            enabled: false,
        }
    }

    /// Heavy throttling, never fatal.
    #[must_use]
    pub fn throttling_bursts() -> Self {
        Self {
            throttle_probability: 0.5,
            fatal_probability: 0.0,
            enabled: true,
        }
    }

    /// Occasional throttling plus rare fatal errors.
    #[must_use]
    pub fn flaky() -> Self {
        Self {
            throttle_probability: 0.3,
            fatal_probability: 0.05,
            enabled: true,
        }
    }
}

/// Deterministic fault injector.
pub struct FaultInjector {
    rng: DeterministicRng,
    config: FaultConfig,
    throttles_injected_count: u64,
    fatals_injected_count: u64,
}

impl FaultInjector {
    pub fn new(rng: DeterministicRng, config: FaultConfig) -> Self {
        debug_assert!(
            (0.0..=1.0).contains(&config.throttle_probability),
            "Throttle probability must be in [0.0, 1.0]"
        );
        debug_assert!(
            (0.0..=1.0).contains(&config.fatal_probability),
            "Fatal probability must be in [0.0, 1.0]"
        );

        Self {
            rng,
            config,
            throttles_injected_count: 0,
            fatals_injected_count: 0,
        }
    }

    /// Decide the fault (if any) for the next call.
    ///
    /// Fatal errors are drawn first so a non-zero fatal probability is
    /// honoured even under heavy throttling.
    pub fn next_fault(&mut self) -> Option<ServiceErrorKind> {
        if !self.config.enabled {
            return None;
        }

        if self.rng.gen_bool(self.config.fatal_probability) {
            self.fatals_injected_count += 1;
            return Some(ServiceErrorKind::Fatal);
        }

        if self.rng.gen_bool(self.config.throttle_probability) {
            self.throttles_injected_count += 1;
            return Some(ServiceErrorKind::Throttling);
        }

        None
    }

    #[must_use]
    pub fn stats(&self) -> FaultStats {
        FaultStats {
            throttles_count: self.throttles_injected_count,
            fatals_count: self.fatals_injected_count,
        }
    }

    #[must_use]
    pub fn config(&self) -> &FaultConfig {
        &self.config
    }
}

/// Statistics about injected faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultStats {
    pub throttles_count: u64,
    pub fatals_count: u64,
}
