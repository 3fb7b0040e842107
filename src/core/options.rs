//! Compile-time debug and validation switches for the backend pipeline.
//!
//! Every switch that gates a stage dump, a structural validator, or the
//! determinism verifier lives here instead of being scattered across the
//! stage implementations, so flipping one while debugging is a single-file
//! edit. All of them are `const`, which keeps the gated checks free on the
//! hot compilation paths when they are off.

// ----- Stage dumps -----
// These must stay disabled by default. Enable them only when debugging.

/// Print the SSA produced by the front end for each function.
pub const PRINT_SSA: bool = false;

/// Print the SSA after the optimizer has run.
pub const PRINT_OPTIMIZED_SSA: bool = false;

/// Print the SSA after block layout has fixed the emission order.
pub const PRINT_BLOCK_LAID_OUT_SSA: bool = false;

/// Print the backend IR produced by lowering the laid-out SSA.
pub const PRINT_BACKEND_IR: bool = false;

/// Print the backend IR after register allocation.
pub const PRINT_REGISTER_ALLOCATED: bool = false;

/// Print the finalized machine code summary for each function.
pub const PRINT_FINALIZED_MACHINE_CODE: bool = false;

/// Print the raw machine code bytes of each function as hex.
pub const PRINT_MACHINE_CODE_HEX_PER_FUNCTION: bool = false;

// ----- Structural validators -----
// These must stay enabled by default until extended fuzzing justifies
// turning them off.

/// Run SSA structural validation after the optimizer.
pub const SSA_VALIDATION_ENABLED: bool = true;

/// Run register-allocation structural validation after the allocator.
pub const REG_ALLOC_VALIDATION_ENABLED: bool = true;

// ----- Stack guard check -----

/// Check the guard page adjoining a generated function's stack for
/// overflow corruption.
pub const STACK_GUARD_CHECK_ENABLED: bool = true;

/// Size in bytes of the zeroed guard page placed below a guarded stack.
pub const STACK_GUARD_PAGE_SIZE: usize = 8096;

// ----- Deterministic compilation verifier -----

/// Recompile each module [`DETERMINISM_VERIFIER_ITERATIONS`] times under
/// randomized function ordering and diff every stage snapshot across
/// passes. Disabled by default since the repeated compilation is
/// expensive; when in doubt about a nondeterminism report, enable it.
pub const DETERMINISM_VERIFIER_ENABLED: bool = false;

/// Number of compilation passes the verifier runs per module.
pub const DETERMINISM_VERIFIER_ITERATIONS: usize = 5;

/// True when some switch tags its output by function name, which requires
/// the compilation context to track the function currently being compiled.
pub const NEED_FUNCTION_NAME_IN_CONTEXT: bool = PRINT_SSA
    || PRINT_OPTIMIZED_SSA
    || PRINT_BLOCK_LAID_OUT_SSA
    || PRINT_BACKEND_IR
    || PRINT_REGISTER_ALLOCATED
    || PRINT_FINALIZED_MACHINE_CODE
    || PRINT_MACHINE_CODE_HEX_PER_FUNCTION
    || DETERMINISM_VERIFIER_ENABLED;
