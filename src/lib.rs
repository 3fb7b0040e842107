//! Smelt - staged native-code backend harness for WebAssembly.
//!
//! Smelt translates the function bodies of a decoded WebAssembly module
//! through a staged intermediate representation down to target machine
//! instructions. This crate is the backend's correctness-and-safety core:
//! the deterministic-compilation verifier that proves the staged pipeline
//! produces bit-identical output across repeated, order-perturbed
//! compilations, the stack guard checker that catches overflow corruption
//! in generated code's runtime stacks, and the diagnostic gating both
//! mechanisms and the stages themselves consult.
//!
//! # Primary Usage
//!
//! ```ignore
//! use bumpalo::Bump;
//! use smelt::core::{options, CompilationContext, DeterminismVerifier};
//! use smelt::pipeline::ModuleCompiler;
//!
//! let arena = Bump::new();
//! let ctx = if options::DETERMINISM_VERIFIER_ENABLED {
//!     CompilationContext::with_verifier(
//!         &arena,
//!         DeterminismVerifier::new(function_names.len(), options::DETERMINISM_VERIFIER_ITERATIONS),
//!     )
//! } else {
//!     CompilationContext::new(&arena)
//! };
//!
//! let compiled = ModuleCompiler::new(&ctx, pipeline, function_names).compile()?;
//! ```
//!
//! # Architecture
//!
//! - [`core`] - Diagnostic gate, compilation context, verifier, stack guard
//! - [`pipeline`] - Staged pipeline contract and module compilation driver
//! - [`wasm`] - Module binary support (LEB128, import section entries)

pub mod core;
pub mod pipeline;
pub mod wasm;

// Re-export common types from organized modules
pub use crate::core::{
    // Compilation scope
    CompilationContext,
    // Errors
    CompileError,
    CompileResult,
    // Determinism verification
    DeterminismVerifier,
    DeterminismViolation,
    // Stack safety
    GuardedStack,
    StackGuardCorruption,
};
pub use crate::pipeline::{CompiledFunction, FunctionPipeline, ModuleCompiler, Stage};
