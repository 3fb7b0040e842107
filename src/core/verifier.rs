//! Deterministic compilation verifier.
//!
//! Compiler nondeterminism rarely shows up in unit tests: builder or
//! allocator state that survives a reset, or output formatted from an
//! unstable iteration order, produces different machine code for the same
//! input only under a different compilation order. The verifier catches
//! this class of bug by recompiling one module several times, feeding the
//! functions to the pipeline in a randomized order on every pass after the
//! first, and diffing each stage's snapshot against the value recorded on
//! an earlier pass. The first pass always runs in natural order so the
//! recorded baseline reflects the compiler's default ordering.
//!
//! One verifier is scoped to one module compilation and is attached to
//! that module's [`CompilationContext`](super::context::CompilationContext).
//! It is not meant to be shared across threads; a host that compiles
//! modules in parallel gives each module its own verifier.

use std::collections::HashMap;
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;

/// Two compilation passes produced different snapshots for the same
/// function and scope. Always fatal at the check site; [`try_record_or_check`]
/// returns it only so embedders and tests can observe the mismatch without
/// terminating the process.
///
/// [`try_record_or_check`]: DeterminismVerifier::try_record_or_check
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("non-deterministic compilation of {function} at scope \"{scope}\"")]
pub struct DeterminismViolation {
    /// Diagnostic name of the offending function.
    pub function: String,
    /// Stage scope label that produced the mismatch.
    pub scope: String,
    /// Snapshot recorded by an earlier pass.
    pub old: String,
    /// Snapshot produced by the current pass.
    pub new: String,
}

/// Cross-pass verifier state for one module compilation.
pub struct DeterminismVerifier {
    iterations: usize,
    initial_pass_done: bool,
    /// Probe order for the current pass. Identity on the baseline pass,
    /// shuffled in place on every later pass. Always a permutation of
    /// `0..function_count`.
    function_order: Vec<usize>,
    rng: StdRng,
    /// Last recorded snapshot per `"<function>: <scope>"` key. The first
    /// occurrence of a key fixes the expected value for all later passes.
    snapshots: HashMap<String, String>,
}

impl DeterminismVerifier {
    /// Create a verifier for a module with `function_count` local
    /// functions, running `iterations` compilation passes in total.
    ///
    /// The shuffle seed is taken from the wall clock: different runs
    /// probing different orders is the point, and a reproduction seed can
    /// be pinned with [`with_seed`](Self::with_seed).
    pub fn new(function_count: usize, iterations: usize) -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self::with_seed(function_count, iterations, seed)
    }

    /// Like [`new`](Self::new) with an explicit shuffle seed, for
    /// reproducing a specific ordering.
    pub fn with_seed(function_count: usize, iterations: usize, seed: u64) -> Self {
        Self {
            iterations,
            initial_pass_done: false,
            function_order: (0..function_count).collect(),
            rng: StdRng::seed_from_u64(seed),
            snapshots: HashMap::new(),
        }
    }

    /// Total number of compilation passes the driver should run.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Number of functions the probe order covers.
    pub fn function_count(&self) -> usize {
        self.function_order.len()
    }

    /// Start the next compilation pass.
    ///
    /// The first call establishes the baseline and keeps the natural
    /// function order; every later call reshuffles the probe order.
    pub fn begin_iteration(&mut self) {
        if !self.initial_pass_done {
            self.initial_pass_done = true;
            return;
        }
        self.function_order.shuffle(&mut self.rng);
    }

    /// Map the driver's loop index to the function index to compile next.
    ///
    /// The driver always iterates `0..function_count` in natural order and
    /// asks the verifier which function that slot means on this pass. The
    /// indirection is what lets the verifier probe order sensitivity
    /// without the driver changing shape.
    pub fn translated_index(&self, index: usize) -> usize {
        self.function_order[index]
    }

    /// Record `value` for `function` at `scope`, or check it against the
    /// value recorded on an earlier pass.
    ///
    /// Repeating an identical value is a no-op, so a stage may snapshot
    /// the same state more than once per pass. A differing value returns
    /// the violation with both snapshots attached.
    pub fn try_record_or_check(
        &mut self,
        function: &str,
        scope: &str,
        value: &str,
    ) -> Result<(), DeterminismViolation> {
        let key = format!("{function}: {scope}");
        match self.snapshots.get(&key) {
            None => {
                self.snapshots.insert(key, value.to_string());
                Ok(())
            }
            Some(old) if old == value => Ok(()),
            Some(old) => Err(DeterminismViolation {
                function: function.to_string(),
                scope: scope.to_string(),
                old: old.clone(),
                new: value.to_string(),
            }),
        }
    }

    /// [`try_record_or_check`](Self::try_record_or_check), but a mismatch
    /// prints the old/new diff and terminates the process.
    ///
    /// A pipeline already shown to be non-deterministic cannot be trusted
    /// to finish the remaining passes, so there is no recovery path here.
    pub fn record_or_check(&mut self, function: &str, scope: &str, value: &str) {
        if let Err(violation) = self.try_record_or_check(function, scope, value) {
            eprintln!("{}", violation.render_report());
            process::exit(1);
        }
    }
}

impl DeterminismViolation {
    /// Full diagnostic with both snapshots, printed before the process
    /// exits on a fatal mismatch.
    pub fn render_report(&self) -> String {
        format!(
            "BUG: non-deterministic compilation of {} at scope \"{}\".\n\
             \n\
             Frequent culprits:\n\
             \t* builder, allocator or compiler state surviving the reset between compilations\n\
             \t* output formatted from a map or set with unstable iteration order\n\
             \n\
             ---------- [old] ----------\n\
             {}\n\
             \n\
             ---------- [new] ----------\n\
             {}\n",
            self.function, self.scope, self.old, self.new,
        )
    }
}
