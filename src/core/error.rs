//! Error types for the backend pipeline.
//!
//! Using thiserror for more idiomatic error handling. Ordinary compilation
//! failures propagate as [`CompileError`] through `CompileResult`. The two
//! fatal harness failures, [`DeterminismViolation`](super::verifier::DeterminismViolation)
//! and [`StackGuardCorruption`](super::stack_guard::StackGuardCorruption),
//! live next to the code that raises them and never travel up a call chain:
//! their check sites terminate the process.

use thiserror::Error;

/// Main error type for module compilation.
#[derive(Error, Debug)]
pub enum CompileError {
    /// A stage asked the compilation context for a binding that was never
    /// made. This is a pipeline programming bug, not an input error.
    #[error("compilation context misuse: {missing} was never bound")]
    ContextMisuse { missing: &'static str },

    #[error("SSA validation failed for {function}: {reason}")]
    SsaValidation { function: String, reason: String },

    #[error("register allocation validation failed for {function}: {reason}")]
    RegAllocValidation { function: String, reason: String },

    #[error("{stage} stage failed for {function}: {reason}")]
    StageFailed {
        stage: &'static str,
        function: String,
        reason: String,
    },

    #[error("module has no function at index {index}")]
    FunctionIndexOutOfRange { index: usize },
}

/// Result type alias for compile operations.
pub type CompileResult<T> = Result<T, CompileError>;
