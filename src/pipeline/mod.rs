//! Staged pipeline contract and module compilation driver.
//!
//! The backend translates each function through a fixed sequence of named
//! stages: front end (bytecode to SSA), SSA optimizer, block layout,
//! backend IR lowering, register allocation, and machine code
//! finalization. The stage transformations themselves live behind the
//! [`FunctionPipeline`] trait; this module owns everything around them —
//! the order the stages run in, the gated dumps, the structural validator
//! hooks, and the determinism verifier checkpoints.
//!
//! [`ModuleCompiler`] drives one module:
//! ```text
//! for each pass {                       // one pass, or verifier iterations
//!     verifier.begin_iteration();
//!     for slot in 0..function_count {
//!         index = verifier.translated_index(slot);
//!         ctx.set_current_function(name[index]);
//!         for stage in stages {
//!             pipeline.run(stage);
//!             checkpoint(stage);        // dump and/or record_or_check
//!         }
//!     }
//! }
//! ```
//!
//! Snapshot strings handed to the verifier must be pure functions of the
//! logical compiler state for one function. Formatting that leaks memory
//! addresses or an unstable container order will fail verification even
//! when the generated code is fine.

use crate::core::context::CompilationContext;
use crate::core::error::{CompileError, CompileResult};
use crate::core::options;
use crate::core::stack_guard::hex_encode;

/// The named stages of the function translation pipeline, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// SSA as produced by the front end.
    Ssa,
    /// SSA after the optimizer.
    OptimizedSsa,
    /// SSA after block layout fixed the emission order.
    BlockLaidOutSsa,
    /// Backend IR lowered from the laid-out SSA.
    BackendIr,
    /// Backend IR after register allocation.
    RegisterAllocated,
    /// Finalized machine code.
    FinalizedMachineCode,
}

impl Stage {
    /// All stages in the order the driver runs them.
    pub const ALL: [Stage; 6] = [
        Stage::Ssa,
        Stage::OptimizedSsa,
        Stage::BlockLaidOutSsa,
        Stage::BackendIr,
        Stage::RegisterAllocated,
        Stage::FinalizedMachineCode,
    ];

    /// Stable scope label keying this stage's verifier snapshots.
    pub fn scope(self) -> &'static str {
        match self {
            Stage::Ssa => "ssa",
            Stage::OptimizedSsa => "optimized-ssa",
            Stage::BlockLaidOutSsa => "block-laid-out-ssa",
            Stage::BackendIr => "backend-ir",
            Stage::RegisterAllocated => "register-allocated",
            Stage::FinalizedMachineCode => "finalized-machine-code",
        }
    }

    /// Whether the diagnostic gate asks for this stage's dump.
    pub fn print_enabled(self) -> bool {
        match self {
            Stage::Ssa => options::PRINT_SSA,
            Stage::OptimizedSsa => options::PRINT_OPTIMIZED_SSA,
            Stage::BlockLaidOutSsa => options::PRINT_BLOCK_LAID_OUT_SSA,
            Stage::BackendIr => options::PRINT_BACKEND_IR,
            Stage::RegisterAllocated => options::PRINT_REGISTER_ALLOCATED,
            Stage::FinalizedMachineCode => options::PRINT_FINALIZED_MACHINE_CODE,
        }
    }
}

/// The staged translation of one function at a time.
///
/// Implementations supply the actual transformation logic; the driver owns
/// diagnostics, validation gating and verification. `build_ssa` selects
/// the function and resets any per-function state, and the later stage
/// methods operate on whatever `build_ssa` selected. Register allocation
/// reads the context's high-register-pressure hint as a pure input.
pub trait FunctionPipeline {
    fn build_ssa(
        &mut self,
        ctx: &CompilationContext<'_>,
        function_index: usize,
    ) -> CompileResult<()>;

    fn optimize_ssa(&mut self, ctx: &CompilationContext<'_>) -> CompileResult<()>;

    fn layout_blocks(&mut self, ctx: &CompilationContext<'_>) -> CompileResult<()>;

    fn lower_to_backend_ir(&mut self, ctx: &CompilationContext<'_>) -> CompileResult<()>;

    fn allocate_registers(&mut self, ctx: &CompilationContext<'_>) -> CompileResult<()>;

    /// Finalize and return the function's machine code bytes.
    fn finalize_machine_code(&mut self, ctx: &CompilationContext<'_>) -> CompileResult<Vec<u8>>;

    /// Deterministic textual snapshot of `stage`'s most recent output for
    /// the current function.
    ///
    /// Only called when a dump switch or an attached verifier needs it, so
    /// implementations may format eagerly without burdening default
    /// builds. The string must depend only on logical compiler state.
    fn snapshot(&self, stage: Stage) -> String;

    /// SSA structural validation, run after the optimizer when
    /// [`options::SSA_VALIDATION_ENABLED`] is set.
    fn validate_ssa(&self, _ctx: &CompilationContext<'_>) -> CompileResult<()> {
        Ok(())
    }

    /// Register-allocation structural validation, run after the allocator
    /// when [`options::REG_ALLOC_VALIDATION_ENABLED`] is set.
    fn validate_register_allocation(&self, _ctx: &CompilationContext<'_>) -> CompileResult<()> {
        Ok(())
    }
}

/// Machine code for one compiled function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFunction {
    /// Diagnostic name the module decoder assigned to this function.
    pub name: String,
    /// Finalized machine code bytes.
    pub code: Vec<u8>,
}

/// Architecture independent driver for one module's compilation.
///
/// Owns the pipeline, borrows the module's [`CompilationContext`], and
/// runs every local function through the stages. With a verifier attached
/// to the context the whole module is compiled once per verifier
/// iteration, probing a different function order each time; without one it
/// is compiled once in natural order. Results always come back in natural
/// index order no matter what order was probed.
pub struct ModuleCompiler<'arena, P: FunctionPipeline> {
    ctx: &'arena CompilationContext<'arena>,
    pipeline: P,
    function_names: Vec<String>,
}

impl<'arena, P: FunctionPipeline> ModuleCompiler<'arena, P> {
    /// Create a driver over the module's local functions.
    ///
    /// `function_names` are the stable per-function diagnostic labels the
    /// module decoder supplies, indexed by local function index.
    pub fn new(
        ctx: &'arena CompilationContext<'arena>,
        pipeline: P,
        function_names: Vec<String>,
    ) -> Self {
        Self {
            ctx,
            pipeline,
            function_names,
        }
    }

    /// Compile every function in the module.
    ///
    /// A fatal determinism mismatch does not return: the verifier prints
    /// the snapshot diff and terminates the process.
    pub fn compile(&mut self) -> CompileResult<Vec<CompiledFunction>> {
        let passes = match self.ctx.verifier() {
            Some(verifier) => verifier.borrow().iterations(),
            None => 1,
        };

        let mut compiled = Vec::new();
        for pass in 0..passes {
            if let Some(verifier) = self.ctx.verifier() {
                verifier.borrow_mut().begin_iteration();
            }
            log::debug!(
                "module pass {}/{} ({} functions)",
                pass + 1,
                passes,
                self.function_names.len()
            );
            compiled = self.run_pass()?;
        }
        Ok(compiled)
    }

    /// One full pass over the module, honoring the verifier's probe order.
    fn run_pass(&mut self) -> CompileResult<Vec<CompiledFunction>> {
        let count = self.function_names.len();
        let mut results: Vec<(usize, CompiledFunction)> = Vec::with_capacity(count);

        for slot in 0..count {
            let index = match self.ctx.verifier() {
                Some(verifier) => verifier.borrow().translated_index(slot),
                None => slot,
            };
            let code = self.compile_function(index)?;
            results.push((
                index,
                CompiledFunction {
                    name: self.function_names[index].clone(),
                    code,
                },
            ));
        }
        self.ctx.clear_current_function();

        results.sort_by_key(|(index, _)| *index);
        Ok(results.into_iter().map(|(_, function)| function).collect())
    }

    fn compile_function(&mut self, index: usize) -> CompileResult<Vec<u8>> {
        let name = self
            .function_names
            .get(index)
            .ok_or(CompileError::FunctionIndexOutOfRange { index })?
            .clone();
        self.ctx.set_current_function(&name);
        log::trace!("compiling {name}");

        self.pipeline.build_ssa(self.ctx, index)?;
        self.checkpoint(Stage::Ssa)?;

        self.pipeline.optimize_ssa(self.ctx)?;
        self.checkpoint(Stage::OptimizedSsa)?;
        if options::SSA_VALIDATION_ENABLED {
            self.pipeline.validate_ssa(self.ctx)?;
        }

        self.pipeline.layout_blocks(self.ctx)?;
        self.checkpoint(Stage::BlockLaidOutSsa)?;

        self.pipeline.lower_to_backend_ir(self.ctx)?;
        self.checkpoint(Stage::BackendIr)?;

        self.pipeline.allocate_registers(self.ctx)?;
        self.checkpoint(Stage::RegisterAllocated)?;
        if options::REG_ALLOC_VALIDATION_ENABLED {
            self.pipeline.validate_register_allocation(self.ctx)?;
        }

        let code = self.pipeline.finalize_machine_code(self.ctx)?;
        self.checkpoint(Stage::FinalizedMachineCode)?;
        if options::PRINT_MACHINE_CODE_HEX_PER_FUNCTION {
            println!("[[[machine code for {name}]]]\n{}", hex_encode(&code));
        }
        Ok(code)
    }

    /// Stage checkpoint: dump when the gate asks for it, and feed the
    /// snapshot to the verifier when one is attached.
    fn checkpoint(&mut self, stage: Stage) -> CompileResult<()> {
        let verifying = self.ctx.verifier().is_some();
        if !stage.print_enabled() && !verifying {
            return Ok(());
        }

        let snapshot = self.pipeline.snapshot(stage);
        let function = self.ctx.current_function_name()?;
        if stage.print_enabled() {
            println!("[[[{} for {}]]]\n{}", stage.scope(), function, snapshot);
        }
        if let Some(verifier) = self.ctx.verifier() {
            verifier
                .borrow_mut()
                .record_or_check(function, stage.scope(), &snapshot);
        }
        Ok(())
    }
}
