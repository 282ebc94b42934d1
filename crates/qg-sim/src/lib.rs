//! # qg-sim
//!
//! Deterministic simulation support for generation pipeline tests.
//!
//! Real pipeline runs spend almost all of their time waiting: window
//! cooldowns of a minute, pacing delays, exponential backoff. This crate
//! replaces both sides of that with reproducible stand-ins:
//!
//! - [`SimClock`]: simulated time. `sleep` advances the clock instantly and
//!   records the requested duration.
//! - [`ScriptedService`]: a fake generation service that plays back a
//!   per-prompt script of replies, throttles and failures.
//! - [`FaultyService`]: a fake service that throttles or fails at random,
//!   driven by a seeded [`FaultInjector`].
//!
//! ## Usage
//!
//! ```rust
//! use qg_sim::{SimEnv, Step};
//!
//! let env = SimEnv::new(12345);
//! let service = env
//!     .scripted_service()
//!     .on("Positive", [Step::Throttle, Step::reply("TC_LOGIN_001 ...")]);
//!
//! // hand `env.clock()` and `service` to the pipeline, then inspect
//! // `service.calls()` and `env.clock().sleeps()`
//! ```
//!
//! ## Reproducibility
//!
//! To reproduce a failing seeded test:
//! ```bash
//! QG_SEED=12345 cargo test
//! ```

pub mod clock;
pub mod env;
pub mod fault;
pub mod random;
pub mod service;

pub use clock::SimClock;
pub use env::SimEnv;
pub use fault::{FaultConfig, FaultInjector, FaultStats};
pub use random::DeterministicRng;
pub use service::{CallLog, CallOutcome, CallRecord, FaultyService, ScriptedService, Step};

/// Get the simulation seed from `QG_SEED` or generate a random one.
///
/// Prints the seed for reproduction.
///
/// # Panics
///
/// Panics if `QG_SEED` is set but is not a valid `u64`.
#[must_use]
pub fn get_or_generate_seed() -> u64 {
    match std::env::var("QG_SEED") {
        Ok(s) => match s.parse::<u64>() {
            Ok(seed) => {
                println!("QG_SEED={} (from environment)", seed);
                seed
            }
            Err(_) => panic!("QG_SEED must be a valid u64, got {:?}", s),
        },
        Err(_) => {
            // Zero is reserved; see DeterministicRng::new
            let seed = rand::random::<u64>().max(1);
            println!("QG_SEED={} (randomly generated)", seed);
            seed
        }
    }
}
