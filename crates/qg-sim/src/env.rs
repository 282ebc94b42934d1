//! Simulation environment: one seed, one clock, services wired to both.

use std::sync::Arc;

use crate::clock::SimClock;
use crate::fault::{FaultConfig, FaultInjector};
use crate::random::DeterministicRng;
use crate::service::{FaultyService, ScriptedService};

/// Complete simulation environment.
///
/// Services built from the same environment share its clock, so call
/// timestamps and pipeline sleeps live on one timeline.
///
/// # Usage
///
/// ```rust
/// use qg_sim::{get_or_generate_seed, FaultConfig, SimEnv};
///
/// let seed = get_or_generate_seed();
/// let mut env = SimEnv::new(seed);
/// let service = env.faulty_service(FaultConfig::throttling_bursts());
/// let clock = env.clock();
/// ```
pub struct SimEnv {
    seed: u64,
    clock: Arc<SimClock>,
    rng: DeterministicRng,
}

impl SimEnv {
    pub fn new(seed: u64) -> Self {
        debug_assert!(seed != 0, "Seed should not be zero");

        Self {
            seed,
            clock: Arc::new(SimClock::new()),
            rng: DeterministicRng::new(seed),
        }
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Shared handle to the simulated clock.
    #[must_use]
    pub fn clock(&self) -> Arc<SimClock> {
        Arc::clone(&self.clock)
    }

    pub fn rng(&mut self) -> &mut DeterministicRng {
        &mut self.rng
    }

    /// A scripted service on this environment's clock.
    #[must_use]
    pub fn scripted_service(&self) -> ScriptedService {
        ScriptedService::new(self.clock())
    }

    /// A fault-injecting service with its own RNG forked from the seed.
    pub fn faulty_service(&mut self, config: FaultConfig) -> FaultyService {
        let injector = FaultInjector::new(self.rng.fork(), config);
        FaultyService::new(self.clock(), injector)
    }

    /// Format seed for failure messages.
    #[must_use]
    pub fn format_seed(&self) -> String {
        format!("QG_SEED={}", self.seed)
    }
}
