//! # Braille Conformance Tests
//!
//! Conformance runner for an externally built Afrikaans/Braille translator.
//! Fixtures are directories holding a manifest plus a plain and an encoded
//! text; every fixture is translated in both directions and the output is
//! compared against the opposite file.
//!
//! ## Architecture
//!
//! - `status`: fixture lifecycle and its transition table
//! - `fixture`: manifest parsing and fixture validation
//! - `discovery`: scanning a fixture root into a fixture set
//! - `execution`: driving the translator with a timeout
//! - `comparison`: output matching and span alignment
//! - `harness`: fixture sets, aggregates and the progress-reporting harness
//! - `reporting`: records, tables and report formats
//! - `config`: command line, fixture layout and launch settings

pub mod comparison;
pub mod config;
pub mod discovery;
pub mod execution;
pub mod fixture;
pub mod harness;
pub mod reporting;
pub mod status;

pub use comparison::{align, Alignment, Span, SpanKind};
pub use config::{Direction, FixtureLayout, ProgramConfig, RenderOptions};
pub use discovery::{Discovery, SkippedFixture};
pub use execution::{
    FailureKind, Invocation, ProcessOutput, ProcessRunner, RunFailure, TestExecutor, TestResult,
    TokioProcessRunner,
};
pub use fixture::{Fixture, Level, Validation, ValidationError};
pub use harness::{ConformanceHarness, FixtureSet, HarnessBuilder, StatusCounts, Summary};
pub use reporting::{FixtureRecord, TestReport};
pub use status::{StateError, Status};

/// Runner errors
#[derive(thiserror::Error, Debug)]
pub enum ConformanceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fixture discovery failed: {0}")]
    Discovery(String),

    #[error("Test execution failed: {0}")]
    Execution(String),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(#[from] indicatif::style::TemplateError),
}
