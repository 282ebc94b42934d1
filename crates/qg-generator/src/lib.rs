//! # qg-generator
//!
//! Rate-limited generation of QA test cases from test-case specifications.
//!
//! Specifications go through the pipeline one at a time. Each becomes a
//! prompt, the prompt goes to the generation service under a request
//! window quota, and throttled requests are retried with geometric backoff.
//! A suite is written only if every specification produced a test case.
//!
//! # Usage
//!
//! ```bash
//! # Two login specifications, free-tier limits, written to test_cases.md
//! GEMINI_API_KEY=... cargo run -p qg-generator --bin qg-generate -- cases
//!
//! # Specifications derived from a user story document
//! cargo run -p qg-generator --bin qg-generate -- cases --story story.txt --from-story
//!
//! # Whole-story mode: one prompt, one response
//! cargo run -p qg-generator --bin qg-generate -- story --story story.txt
//!
//! # Markdown test plan for a Word user story, no API calls
//! cargo run -p qg-generator --bin qg-generate -- plan --story story.docx
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ Specification│ ──> │ PromptBuilder│ ──> │ window gate   │
//! │ source       │     │              │     │ (cooldown)    │
//! └──────────────┘     └──────────────┘     └───────┬───────┘
//!                                                   │
//!                       throttled, attempts left    ▼
//!                     ┌────────────────────── ┌───────────────┐
//!                     │   backoff base^k      │ TextGenerator │
//!                     └─────────────────────> └───────┬───────┘
//!                                                     │
//!                              ┌──────────────────────┴─────┐
//!                              ▼ all succeeded              ▼ any failed
//!                       ┌─────────────┐             ┌──────────────────┐
//!                       │ write_suite │             │ GenerationFailure│
//!                       └─────────────┘             └──────────────────┘
//! ```

pub mod client;
pub mod clock;
pub mod document;
pub mod error;
pub mod limits;
pub mod logging;
pub mod pipeline;
pub mod prompt;
pub mod report;

pub use client::{ClientError, GeminiClient, GeminiConfig};
pub use clock::SystemClock;
pub use document::{read_document, ReadError};
pub use error::GeneratorError;
pub use limits::{ConfigError, RateLimitConfig, RateLimitState};
pub use logging::{init_logging, LogFormat, LoggingConfig, LoggingError};
pub use pipeline::{FailurePolicy, GeneratedSuite, GenerationFailure, GenerationPipeline, RunStats};
pub use prompt::{tidy_response, PromptBuilder};
pub use report::{
    format_suite, format_test_plan, write_suite, write_test_plan, write_text, WriteError,
};
