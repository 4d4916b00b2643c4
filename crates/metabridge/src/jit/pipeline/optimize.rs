//! Backend-agnostic optimization passes on JIT IR
//!
//! Each pass implements the `OptPass` trait and transforms a `JitFunction` in place.

use rustc_hash::{FxHashMap, FxHashSet};
use crate::jit::handle::MetadataHandle;
use crate::jit::ir::instr::{JitFunction, JitInstr, JitTerminator, Reg};

/// An optimization pass on JIT IR
pub trait OptPass: Send + Sync {
    /// Name of this pass (for diagnostics)
    fn name(&self) -> &str;
    /// Run the pass, mutating the function in place
    fn run(&self, func: &mut JitFunction<'_>);
}

/// Optimizer that runs a sequence of passes
pub struct JitOptimizer {
    passes: Vec<Box<dyn OptPass>>,
}

impl JitOptimizer {
    /// Create an optimizer with the default pass pipeline
    pub fn new() -> Self {
        JitOptimizer {
            passes: vec![
                Box::new(KlassConstantDedup),
                Box::new(CopyPropagation),
                Box::new(KlassCheckFolding),
                Box::new(CopyPropagation),
                Box::new(DeadCodeElimination),
            ],
        }
    }

    /// Create an empty optimizer (no passes)
    pub fn empty() -> Self {
        JitOptimizer { passes: vec![] }
    }

    /// Add a pass to the pipeline
    pub fn add_pass(&mut self, pass: Box<dyn OptPass>) {
        self.passes.push(pass);
    }

    /// Names of the passes, in run order
    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Run all passes in order
    pub fn optimize(&self, func: &mut JitFunction<'_>) {
        for pass in &self.passes {
            let before = func.instr_count();
            pass.run(func);
            tracing::trace!(
                pass = pass.name(),
                before,
                after = func.instr_count(),
                "optimization pass finished"
            );
        }
    }
}

impl Default for JitOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

// ===== Pass 1: Klass Constant Deduplication =====

/// Merges repeated klass constants within a block.
///
/// Two `ConstKlass` instructions whose handles are equal name the same class,
/// so the second becomes a `Move` from the first. Handles that merely share a
/// name are left alone.
pub struct KlassConstantDedup;

impl OptPass for KlassConstantDedup {
    fn name(&self) -> &str { "klass-constant-dedup" }

    fn run(&self, func: &mut JitFunction<'_>) {
        for block in &mut func.blocks {
            let mut first_def: FxHashMap<MetadataHandle<'_>, Reg> = FxHashMap::default();
            for instr in &mut block.instrs {
                if let JitInstr::ConstKlass { dest, klass } = instr {
                    match first_def.get(klass) {
                        Some(&src) => *instr = JitInstr::Move { dest: *dest, src },
                        None => { first_def.insert(*klass, *dest); }
                    }
                }
            }
        }
    }
}

// ===== Pass 2: Copy Propagation =====

/// Replaces uses of `Move { dest, src }` with direct use of `src`.
pub struct CopyPropagation;

impl OptPass for CopyPropagation {
    fn name(&self) -> &str { "copy-propagation" }

    fn run(&self, func: &mut JitFunction<'_>) {
        // Build copy chain: dest -> src for Move instructions
        let mut copies: FxHashMap<Reg, Reg> = FxHashMap::default();
        for block in &func.blocks {
            for instr in &block.instrs {
                if let JitInstr::Move { dest, src } = instr {
                    copies.insert(*dest, *src);
                }
            }
        }

        if copies.is_empty() {
            return;
        }

        // Resolve transitive copies: if r3 = Move(r2) and r2 = Move(r1), then r3 → r1
        let resolved: FxHashMap<Reg, Reg> = copies.keys().map(|&reg| {
            let mut current = reg;
            let mut depth = 0;
            while let Some(&src) = copies.get(&current) {
                current = src;
                depth += 1;
                if depth > 100 { break; } // cycle guard
            }
            (reg, current)
        }).collect();

        for block in &mut func.blocks {
            for instr in &mut block.instrs {
                replace_reg_uses(instr, &resolved);
            }
            replace_terminator_uses(&mut block.terminator, &resolved);
        }
    }
}

// ===== Pass 3: Klass Check Folding =====

/// Folds klass checks whose answer is known at compile time.
///
/// - `KlassEq` of two klass constants becomes a bool constant.
/// - `LoadKlass` of an object allocated in this function becomes a klass constant.
/// - `InstanceOf` / `CheckCast` against the object's exact allocation klass
///   become `true` / a move of the object.
///
/// A mismatch is never folded to `false`: the tested klass may be a
/// supertype, and the IR has no view of the hierarchy.
pub struct KlassCheckFolding;

impl OptPass for KlassCheckFolding {
    fn name(&self) -> &str { "klass-check-folding" }

    fn run(&self, func: &mut JitFunction<'_>) {
        let mut klass_consts: FxHashMap<Reg, MetadataHandle<'_>> = FxHashMap::default();
        let mut exact_klass: FxHashMap<Reg, MetadataHandle<'_>> = FxHashMap::default();

        for block in &func.blocks {
            for instr in &block.instrs {
                match instr {
                    JitInstr::ConstKlass { dest, klass } => { klass_consts.insert(*dest, *klass); }
                    JitInstr::NewObject { dest, klass } => { exact_klass.insert(*dest, *klass); }
                    _ => {}
                }
            }
        }

        if klass_consts.is_empty() && exact_klass.is_empty() {
            return;
        }

        for block in &mut func.blocks {
            for instr in &mut block.instrs {
                let replacement = match instr {
                    JitInstr::LoadKlass { dest, object } => {
                        exact_klass.get(object).map(|&klass| {
                            klass_consts.insert(*dest, klass);
                            JitInstr::ConstKlass { dest: *dest, klass }
                        })
                    }
                    JitInstr::KlassEq { dest, left, right } => {
                        if left == right {
                            Some(JitInstr::ConstBool { dest: *dest, value: true })
                        } else {
                            match (klass_consts.get(left), klass_consts.get(right)) {
                                (Some(l), Some(r)) => {
                                    Some(JitInstr::ConstBool { dest: *dest, value: l == r })
                                }
                                _ => None,
                            }
                        }
                    }
                    JitInstr::InstanceOf { dest, object, klass } => {
                        exact_klass.get(object)
                            .filter(|exact| **exact == *klass)
                            .map(|_| JitInstr::ConstBool { dest: *dest, value: true })
                    }
                    JitInstr::CheckCast { dest, object, klass } => {
                        match exact_klass.get(object).copied() {
                            Some(exact) if exact == *klass => {
                                exact_klass.insert(*dest, exact);
                                Some(JitInstr::Move { dest: *dest, src: *object })
                            }
                            _ => None,
                        }
                    }
                    _ => None,
                };

                if let Some(new_instr) = replacement {
                    *instr = new_instr;
                }
            }
        }
    }
}

// ===== Pass 4: Dead Code Elimination =====

/// Removes instructions whose destination register is never used
/// (and which have no side effects).
pub struct DeadCodeElimination;

impl OptPass for DeadCodeElimination {
    fn name(&self) -> &str { "dead-code-elimination" }

    fn run(&self, func: &mut JitFunction<'_>) {
        // Iterate until nothing else becomes dead
        loop {
            let mut used_regs = FxHashSet::default();
            for block in &func.blocks {
                for instr in &block.instrs {
                    collect_used_regs(instr, &mut used_regs);
                }
                collect_terminator_regs(&block.terminator, &mut used_regs);
            }

            let before = func.instr_count();
            for block in &mut func.blocks {
                block.instrs.retain(|instr| {
                    if instr.has_side_effects() {
                        return true;
                    }
                    match instr.dest() {
                        Some(dest) => used_regs.contains(&dest),
                        None => true,
                    }
                });
            }
            if func.instr_count() == before {
                break;
            }
        }
    }
}

/// Replace register uses in an instruction according to a substitution map
fn replace_reg_uses(instr: &mut JitInstr<'_>, subs: &FxHashMap<Reg, Reg>) {
    fn sub(reg: &mut Reg, subs: &FxHashMap<Reg, Reg>) {
        if let Some(&new_reg) = subs.get(reg) {
            *reg = new_reg;
        }
    }

    match instr {
        JitInstr::IAdd { left, right, .. }
        | JitInstr::ISub { left, right, .. }
        | JitInstr::IMul { left, right, .. }
        | JitInstr::ICmpEq { left, right, .. }
        | JitInstr::ICmpNe { left, right, .. }
        | JitInstr::ICmpLt { left, right, .. }
        | JitInstr::KlassEq { left, right, .. } => {
            sub(left, subs);
            sub(right, subs);
        }

        JitInstr::Not { operand, .. } => sub(operand, subs),
        JitInstr::Move { src, .. } => sub(src, subs),
        JitInstr::StoreLocal { value, .. } => sub(value, subs),

        JitInstr::LoadField { object, .. }
        | JitInstr::LoadKlass { object, .. }
        | JitInstr::InstanceOf { object, .. }
        | JitInstr::CheckCast { object, .. } => sub(object, subs),

        JitInstr::StoreField { object, value, .. } => {
            sub(object, subs);
            sub(value, subs);
        }

        JitInstr::Call { args, .. } => {
            for arg in args.iter_mut() { sub(arg, subs); }
        }

        JitInstr::Phi { sources, .. } => {
            for (_, reg) in sources.iter_mut() {
                sub(reg, subs);
            }
        }

        JitInstr::ConstI32 { .. }
        | JitInstr::ConstBool { .. }
        | JitInstr::ConstNull { .. }
        | JitInstr::ConstKlass { .. }
        | JitInstr::LoadLocal { .. }
        | JitInstr::NewObject { .. }
        | JitInstr::GcSafepoint => {}
    }
}

fn replace_terminator_uses(term: &mut JitTerminator, subs: &FxHashMap<Reg, Reg>) {
    let reg = match term {
        JitTerminator::Branch { cond, .. } => cond,
        JitTerminator::Return(Some(reg)) => reg,
        _ => return,
    };
    if let Some(&new_reg) = subs.get(reg) {
        *reg = new_reg;
    }
}

fn collect_used_regs(instr: &JitInstr<'_>, used: &mut FxHashSet<Reg>) {
    // Collect all register operands (not destinations)
    match instr {
        JitInstr::IAdd { left, right, .. }
        | JitInstr::ISub { left, right, .. }
        | JitInstr::IMul { left, right, .. }
        | JitInstr::ICmpEq { left, right, .. }
        | JitInstr::ICmpNe { left, right, .. }
        | JitInstr::ICmpLt { left, right, .. }
        | JitInstr::KlassEq { left, right, .. } => {
            used.insert(*left);
            used.insert(*right);
        }

        JitInstr::Not { operand, .. } => { used.insert(*operand); }
        JitInstr::Move { src, .. } => { used.insert(*src); }
        JitInstr::StoreLocal { value, .. } => { used.insert(*value); }

        JitInstr::LoadField { object, .. }
        | JitInstr::LoadKlass { object, .. }
        | JitInstr::InstanceOf { object, .. }
        | JitInstr::CheckCast { object, .. } => { used.insert(*object); }

        JitInstr::StoreField { object, value, .. } => {
            used.insert(*object);
            used.insert(*value);
        }

        JitInstr::Call { args, .. } => {
            for arg in args { used.insert(*arg); }
        }

        JitInstr::Phi { sources, .. } => {
            for (_, reg) in sources { used.insert(*reg); }
        }

        // Instructions with no register operands
        JitInstr::ConstI32 { .. }
        | JitInstr::ConstBool { .. }
        | JitInstr::ConstNull { .. }
        | JitInstr::ConstKlass { .. }
        | JitInstr::LoadLocal { .. }
        | JitInstr::NewObject { .. }
        | JitInstr::GcSafepoint => {}
    }
}

fn collect_terminator_regs(term: &JitTerminator, used: &mut FxHashSet<Reg>) {
    match term {
        JitTerminator::Branch { cond, .. } => { used.insert(*cond); }
        JitTerminator::Return(Some(reg)) => { used.insert(*reg); }
        _ => {}
    }
}
