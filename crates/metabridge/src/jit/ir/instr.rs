//! JIT IR instructions, blocks, and functions
//!
//! Defines the SSA-form intermediate representation used by the JIT compiler.
//! Instructions operate on virtual registers (Reg) and are grouped into basic
//! blocks with explicit terminators. Class metadata appears only as
//! `MetadataHandle` operands; the IR has no instruction that reads through one.

use rustc_hash::FxHashMap;
use super::types::JitType;
use crate::jit::handle::MetadataHandle;

/// Virtual register in the JIT IR (SSA form)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reg(pub u32);

impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Basic block identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JitBlockId(pub u32);

impl std::fmt::Display for JitBlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// A JIT IR instruction
///
/// Operand fields are virtual registers (`dest` receives the result) or
/// immediates; klass operands are `MetadataHandle`s.
#[allow(missing_docs)]
#[derive(Debug, Clone)]
pub enum JitInstr<'rt> {
    // ===== Constants =====
    /// i32 immediate
    ConstI32 { dest: Reg, value: i32 },
    /// Boolean immediate
    ConstBool { dest: Reg, value: bool },
    /// Null reference
    ConstNull { dest: Reg },
    /// Klass constant, lowered through the unit's klass pool
    ConstKlass { dest: Reg, klass: MetadataHandle<'rt> },

    // ===== Integer Arithmetic (unboxed i32) =====
    /// Wrapping add
    IAdd { dest: Reg, left: Reg, right: Reg },
    /// Wrapping subtract
    ISub { dest: Reg, left: Reg, right: Reg },
    /// Wrapping multiply
    IMul { dest: Reg, left: Reg, right: Reg },

    // ===== Integer Comparison (unboxed) =====
    /// `left == right`
    ICmpEq { dest: Reg, left: Reg, right: Reg },
    /// `left != right`
    ICmpNe { dest: Reg, left: Reg, right: Reg },
    /// Signed `left < right`
    ICmpLt { dest: Reg, left: Reg, right: Reg },

    // ===== Logical =====
    /// Boolean negation
    Not { dest: Reg, operand: Reg },

    // ===== Local Variable Access =====
    /// Read a local slot
    LoadLocal { dest: Reg, index: u16 },
    /// Write a local slot
    StoreLocal { index: u16, value: Reg },

    // ===== Object Operations =====
    /// Allocate an instance of `klass`
    NewObject { dest: Reg, klass: MetadataHandle<'rt> },
    /// Read an instance field
    LoadField { dest: Reg, object: Reg, offset: u16 },
    /// Write an instance field
    StoreField { object: Reg, offset: u16, value: Reg },

    // ===== Klass Operations =====
    /// Read the klass word of an object header
    LoadKlass { dest: Reg, object: Reg },
    /// Compare two klass registers by identity
    KlassEq { dest: Reg, left: Reg, right: Reg },
    /// Subtype test of `object` against `klass`
    InstanceOf { dest: Reg, object: Reg, klass: MetadataHandle<'rt> },
    /// Checked downcast; throws on mismatch
    CheckCast { dest: Reg, object: Reg, klass: MetadataHandle<'rt> },

    // ===== Function Calls =====
    /// Direct call of another function in the module
    Call { dest: Option<Reg>, func_index: u32, args: Vec<Reg> },

    // ===== Runtime Integration =====
    /// Poll for a pending GC
    GcSafepoint,

    // ===== SSA =====
    /// SSA merge of values from predecessor blocks
    Phi { dest: Reg, sources: Vec<(JitBlockId, Reg)> },
    /// Register copy
    Move { dest: Reg, src: Reg },
}

impl<'rt> JitInstr<'rt> {
    /// Get the destination register if this instruction produces a value
    pub fn dest(&self) -> Option<Reg> {
        match self {
            // Constants
            JitInstr::ConstI32 { dest, .. }
            | JitInstr::ConstBool { dest, .. }
            | JitInstr::ConstNull { dest }
            | JitInstr::ConstKlass { dest, .. } => Some(*dest),

            // Arithmetic and comparison
            JitInstr::IAdd { dest, .. }
            | JitInstr::ISub { dest, .. }
            | JitInstr::IMul { dest, .. }
            | JitInstr::ICmpEq { dest, .. }
            | JitInstr::ICmpNe { dest, .. }
            | JitInstr::ICmpLt { dest, .. }
            | JitInstr::Not { dest, .. } => Some(*dest),

            // Memory
            JitInstr::LoadLocal { dest, .. }
            | JitInstr::NewObject { dest, .. }
            | JitInstr::LoadField { dest, .. } => Some(*dest),

            // Klass
            JitInstr::LoadKlass { dest, .. }
            | JitInstr::KlassEq { dest, .. }
            | JitInstr::InstanceOf { dest, .. }
            | JitInstr::CheckCast { dest, .. } => Some(*dest),

            // Calls
            JitInstr::Call { dest, .. } => *dest,

            // SSA
            JitInstr::Phi { dest, .. }
            | JitInstr::Move { dest, .. } => Some(*dest),

            // No destination
            JitInstr::StoreLocal { .. }
            | JitInstr::StoreField { .. }
            | JitInstr::GcSafepoint => None,
        }
    }

    /// Whether this instruction has side effects (can't be dead-code eliminated)
    pub fn has_side_effects(&self) -> bool {
        match self {
            // Pure: constants, arithmetic, comparison, loads, klass tests, phi, move
            JitInstr::ConstI32 { .. }
            | JitInstr::ConstBool { .. }
            | JitInstr::ConstNull { .. }
            | JitInstr::ConstKlass { .. }
            | JitInstr::IAdd { .. } | JitInstr::ISub { .. } | JitInstr::IMul { .. }
            | JitInstr::ICmpEq { .. } | JitInstr::ICmpNe { .. } | JitInstr::ICmpLt { .. }
            | JitInstr::Not { .. }
            | JitInstr::LoadLocal { .. }
            | JitInstr::LoadField { .. }
            | JitInstr::LoadKlass { .. }
            | JitInstr::KlassEq { .. }
            | JitInstr::InstanceOf { .. }
            | JitInstr::Phi { .. } | JitInstr::Move { .. } => false,

            // Everything else has side effects (allocation, stores, casts that throw, calls)
            _ => true,
        }
    }

    /// The class metadata this instruction refers to, if any
    pub fn klass_ref(&self) -> Option<MetadataHandle<'rt>> {
        match self {
            JitInstr::ConstKlass { klass, .. }
            | JitInstr::NewObject { klass, .. }
            | JitInstr::InstanceOf { klass, .. }
            | JitInstr::CheckCast { klass, .. } => Some(*klass),
            _ => None,
        }
    }
}

/// A basic block in the JIT IR
#[derive(Debug, Clone)]
pub struct JitBlock<'rt> {
    /// Block ID (index into `JitFunction::blocks`)
    pub id: JitBlockId,
    /// Instructions in execution order
    pub instrs: Vec<JitInstr<'rt>>,
    /// How control leaves the block
    pub terminator: JitTerminator,
    /// Blocks that jump or branch here
    pub predecessors: Vec<JitBlockId>,
}

/// How a JIT IR block terminates
#[derive(Debug, Clone)]
pub enum JitTerminator {
    /// Unconditional jump to target block
    Jump(JitBlockId),
    /// Conditional branch on a boolean register
    Branch {
        /// Boolean condition register
        cond: Reg,
        /// Taken when `cond` is true
        then_block: JitBlockId,
        /// Taken when `cond` is false
        else_block: JitBlockId,
    },
    /// Return with a value
    Return(Option<Reg>),
    /// Unreachable code (after trap, etc.)
    Unreachable,
    /// Placeholder terminator (not yet assigned)
    None,
}

/// A complete JIT IR function
#[derive(Debug)]
pub struct JitFunction<'rt> {
    /// Index in the module's function table
    pub func_index: u32,
    /// Function name (for debugging)
    pub name: String,
    /// Number of parameters
    pub param_count: usize,
    /// Number of local variables
    pub local_count: usize,
    /// Basic blocks
    pub blocks: Vec<JitBlock<'rt>>,
    /// Entry block
    pub entry: JitBlockId,
    /// Next available register number
    pub next_reg: u32,
    /// Type of each register
    pub reg_types: FxHashMap<Reg, JitType>,
}

impl<'rt> JitFunction<'rt> {
    /// Create a new empty function
    pub fn new(func_index: u32, name: String, param_count: usize, local_count: usize) -> Self {
        JitFunction {
            func_index,
            name,
            param_count,
            local_count,
            blocks: vec![],
            entry: JitBlockId(0),
            next_reg: 0,
            reg_types: FxHashMap::default(),
        }
    }

    /// Allocate a fresh virtual register with a given type
    pub fn alloc_reg(&mut self, ty: JitType) -> Reg {
        let reg = Reg(self.next_reg);
        self.next_reg += 1;
        self.reg_types.insert(reg, ty);
        reg
    }

    /// Get the type of a register
    pub fn reg_type(&self, reg: Reg) -> JitType {
        self.reg_types.get(&reg).copied().unwrap_or(JitType::Value)
    }

    /// Get a block by ID
    pub fn block(&self, id: JitBlockId) -> &JitBlock<'rt> {
        &self.blocks[id.0 as usize]
    }

    /// Get a mutable block by ID
    pub fn block_mut(&mut self, id: JitBlockId) -> &mut JitBlock<'rt> {
        &mut self.blocks[id.0 as usize]
    }

    /// Add a new block and return its ID
    pub fn add_block(&mut self) -> JitBlockId {
        let id = JitBlockId(self.blocks.len() as u32);
        self.blocks.push(JitBlock {
            id,
            instrs: vec![],
            terminator: JitTerminator::None,
            predecessors: vec![],
        });
        id
    }

    /// Total number of instructions across all blocks
    pub fn instr_count(&self) -> usize {
        self.blocks.iter().map(|b| b.instrs.len()).sum()
    }

    /// Every klass reference in the function, in instruction order (with repeats)
    pub fn klass_refs(&self) -> impl Iterator<Item = MetadataHandle<'rt>> + '_ {
        self.blocks
            .iter()
            .flat_map(|b| b.instrs.iter())
            .filter_map(|i| i.klass_ref())
    }
}
