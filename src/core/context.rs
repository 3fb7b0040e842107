//! Arena-based per-module compilation context.
//!
//! One context is created per module compilation and handed by reference
//! through every pipeline stage, then dropped with the compilation. It
//! carries the scoped diagnostic and heuristic state the stages consult:
//! the name of the function currently being compiled (for tagging dumps
//! and verifier snapshots), the high-register-pressure hint read by the
//! register allocator, and the optional determinism verifier attached for
//! this module. Names are interned in the session arena so stages can hold
//! `&str` labels without cloning.
//!
//! Contexts are deliberately independent: nothing here is process-global,
//! so concurrent module compilations in separate contexts cannot observe
//! each other's state. A single context is single-threaded start to finish.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use bumpalo::Bump;

use super::error::{CompileError, CompileResult};
use super::options;
use super::verifier::DeterminismVerifier;

/// Per-module scoped carrier of diagnostic and heuristic state.
pub struct CompilationContext<'arena> {
    /// Arena allocator shared by everything scoped to this compilation.
    arena: &'arena Bump,

    /// String interning for diagnostic labels.
    interned_strings: RefCell<HashMap<String, &'arena str>>,

    /// Name of the function currently being compiled, when tracking is on.
    current_function: Cell<Option<&'arena str>>,

    /// Set once before compilation starts; read by the register allocator.
    high_register_pressure: Cell<bool>,

    /// Determinism verifier for this module, when verification is on.
    verifier: Option<RefCell<DeterminismVerifier>>,
}

impl<'arena> CompilationContext<'arena> {
    /// Create a context with no verifier attached.
    pub fn new(arena: &'arena Bump) -> Self {
        Self {
            arena,
            interned_strings: RefCell::new(HashMap::new()),
            current_function: Cell::new(None),
            high_register_pressure: Cell::new(false),
            verifier: None,
        }
    }

    /// Create a context with a determinism verifier scoped to this module.
    pub fn with_verifier(arena: &'arena Bump, verifier: DeterminismVerifier) -> Self {
        let mut ctx = Self::new(arena);
        ctx.verifier = Some(RefCell::new(verifier));
        ctx
    }

    /// Get access to the arena allocator.
    pub fn arena(&self) -> &'arena Bump {
        self.arena
    }

    /// Intern a string in the arena.
    pub fn intern_str(&self, s: &str) -> &'arena str {
        let mut strings = self.interned_strings.borrow_mut();
        if let Some(&interned) = strings.get(s) {
            return interned;
        }

        let interned = self.arena.alloc_str(s);
        strings.insert(s.to_string(), interned);
        interned
    }

    /// True when some diagnostic consumer needs the current function name.
    ///
    /// Either a compile-time switch demands per-function tagging, or a
    /// verifier was attached to this context at runtime.
    pub fn needs_function_name(&self) -> bool {
        options::NEED_FUNCTION_NAME_IN_CONTEXT || self.verifier.is_some()
    }

    /// Bind the name of the function about to be compiled.
    ///
    /// A documented no-op while [`needs_function_name`](Self::needs_function_name)
    /// is false, so hot paths do not pay for interning that nothing reads.
    pub fn set_current_function(&self, name: &str) {
        if !self.needs_function_name() {
            return;
        }
        self.current_function.set(Some(self.intern_str(name)));
    }

    /// Unbind the current function name, e.g. at the end of a module pass.
    ///
    /// Keeps a stale name from leaking into diagnostics of whatever runs
    /// next on this context.
    pub fn clear_current_function(&self) {
        self.current_function.set(None);
    }

    /// Name of the function currently being compiled.
    ///
    /// Calling this with no name bound is a pipeline programming bug and
    /// fails with [`CompileError::ContextMisuse`].
    pub fn current_function_name(&self) -> CompileResult<&'arena str> {
        self.current_function.get().ok_or(CompileError::ContextMisuse {
            missing: "current function name",
        })
    }

    /// Mark this compilation as running under high register pressure.
    pub fn enable_high_register_pressure(&self) {
        self.high_register_pressure.set(true);
    }

    /// Whether the register allocator should assume high pressure.
    pub fn is_high_register_pressure(&self) -> bool {
        self.high_register_pressure.get()
    }

    /// The verifier attached to this module's compilation, if any.
    pub fn verifier(&self) -> Option<&RefCell<DeterminismVerifier>> {
        self.verifier.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbound_function_name_is_a_misuse() {
        let arena = Bump::new();
        let ctx = CompilationContext::new(&arena);

        let err = ctx.current_function_name().unwrap_err();
        assert!(matches!(err, CompileError::ContextMisuse { .. }));
    }

    #[test]
    fn name_tracking_follows_attached_verifier() {
        let arena = Bump::new();
        let ctx = CompilationContext::with_verifier(&arena, DeterminismVerifier::with_seed(1, 2, 0));
        assert!(ctx.needs_function_name());

        ctx.set_current_function("fib");
        assert_eq!(ctx.current_function_name().unwrap(), "fib");

        ctx.set_current_function("main");
        assert_eq!(ctx.current_function_name().unwrap(), "main");

        ctx.clear_current_function();
        assert!(ctx.current_function_name().is_err());
    }

    #[test]
    fn high_register_pressure_defaults_off() {
        let arena = Bump::new();
        let ctx = CompilationContext::new(&arena);

        assert!(!ctx.is_high_register_pressure());
        ctx.enable_high_register_pressure();
        assert!(ctx.is_high_register_pressure());
    }

    #[test]
    fn interning_deduplicates() {
        let arena = Bump::new();
        let ctx = CompilationContext::new(&arena);

        let a = ctx.intern_str("function[3]");
        let b = ctx.intern_str("function[3]");
        let c = ctx.intern_str("function[4]");
        assert_eq!(a.as_ptr(), b.as_ptr());
        assert_ne!(a.as_ptr(), c.as_ptr());
    }

    #[test]
    fn contexts_do_not_share_state() {
        let arena_a = Bump::new();
        let arena_b = Bump::new();
        let a = CompilationContext::with_verifier(&arena_a, DeterminismVerifier::with_seed(1, 2, 0));
        let b = CompilationContext::with_verifier(&arena_b, DeterminismVerifier::with_seed(1, 2, 0));

        a.set_current_function("left");
        b.set_current_function("right");
        a.enable_high_register_pressure();

        assert_eq!(a.current_function_name().unwrap(), "left");
        assert_eq!(b.current_function_name().unwrap(), "right");
        assert!(!b.is_high_register_pressure());
    }
}
