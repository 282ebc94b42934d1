//! # qg-core
//!
//! Core types for generating QA test cases from test-case specifications.
//!
//! A run of the generator moves data through three shapes:
//!
//! ```text
//! ┌────────────────────┐     ┌────────────────┐     ┌──────────────────┐
//! │ TestCaseSpecifi-   │ ──> │ prompt string  │ ──> │ GenerationResult │
//! │ cation (immutable) │     │ (one per item) │     │ {index, text}    │
//! └────────────────────┘     └────────────────┘     └──────────────────┘
//! ```
//!
//! This crate owns the first and last shapes, the sources that produce
//! specifications, and the two capability traits the pipeline is written
//! against:
//!
//! - [`TextGenerator`]: the external generation service. Errors carry a
//!   structured [`ServiceErrorKind`] so retry eligibility is never decided by
//!   matching on message text.
//! - [`Clock`]: every pause the pipeline takes goes through here, so tests can
//!   run on simulated time.

pub mod check;
pub mod clock;
pub mod result;
pub mod service;
pub mod spec;
pub mod story;

pub use check::{check_suite, verify_suite, CheckResult};
pub use clock::Clock;
pub use result::GenerationResult;
pub use service::{ServiceError, ServiceErrorKind, TextGenerator};
pub use spec::{
    FixedSource, LoginCatalogue, SpecError, SpecificationSource, StorySource,
    TestCaseSpecification,
};
pub use story::UserStory;
