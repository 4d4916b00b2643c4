//! Pretty-printing for JIT IR
//!
//! Display implementations for debugging and dump output. Klass operands
//! print through `MetadataHandle`'s own Display, so dumps show class names
//! and never addresses.

use std::fmt;
use super::instr::{JitBlock, JitFunction, JitInstr, JitTerminator, Reg};

impl fmt::Display for JitFunction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "function @{} [{}] (params: {}, locals: {}) {{",
            self.name, self.func_index, self.param_count, self.local_count)?;

        for block in &self.blocks {
            write!(f, "{}", block)?;
        }

        writeln!(f, "}}")
    }
}

impl fmt::Display for JitBlock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  {}:", self.id)?;
        if !self.predecessors.is_empty() {
            write!(f, "    ; preds:")?;
            for pred in &self.predecessors {
                write!(f, " {}", pred)?;
            }
            writeln!(f)?;
        }

        for instr in &self.instrs {
            writeln!(f, "    {}", instr)?;
        }

        writeln!(f, "    {}", self.terminator)
    }
}

impl fmt::Display for JitInstr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Constants
            JitInstr::ConstI32 { dest, value } => write!(f, "{} = const.i32 {}", dest, value),
            JitInstr::ConstBool { dest, value } => write!(f, "{} = const.bool {}", dest, value),
            JitInstr::ConstNull { dest } => write!(f, "{} = const.null", dest),
            JitInstr::ConstKlass { dest, klass } => write!(f, "{} = const.klass {}", dest, klass),

            // Int arithmetic
            JitInstr::IAdd { dest, left, right } => write!(f, "{dest} = iadd {left}, {right}"),
            JitInstr::ISub { dest, left, right } => write!(f, "{dest} = isub {left}, {right}"),
            JitInstr::IMul { dest, left, right } => write!(f, "{dest} = imul {left}, {right}"),

            // Int comparison
            JitInstr::ICmpEq { dest, left, right } => write!(f, "{dest} = icmp.eq {left}, {right}"),
            JitInstr::ICmpNe { dest, left, right } => write!(f, "{dest} = icmp.ne {left}, {right}"),
            JitInstr::ICmpLt { dest, left, right } => write!(f, "{dest} = icmp.lt {left}, {right}"),

            // Logical
            JitInstr::Not { dest, operand } => write!(f, "{} = not {}", dest, operand),

            // Locals
            JitInstr::LoadLocal { dest, index } => write!(f, "{} = load.local {}", dest, index),
            JitInstr::StoreLocal { index, value } => write!(f, "store.local {}, {}", index, value),

            // Objects
            JitInstr::NewObject { dest, klass } => write!(f, "{} = new.object {}", dest, klass),
            JitInstr::LoadField { dest, object, offset } => {
                write!(f, "{dest} = load.field {object}+{offset}")
            }
            JitInstr::StoreField { object, offset, value } => {
                write!(f, "store.field {object}+{offset}, {value}")
            }

            // Klass
            JitInstr::LoadKlass { dest, object } => write!(f, "{} = load.klass {}", dest, object),
            JitInstr::KlassEq { dest, left, right } => {
                write!(f, "{dest} = klass.eq {left}, {right}")
            }
            JitInstr::InstanceOf { dest, object, klass } => {
                write!(f, "{dest} = instanceof {object}, {klass}")
            }
            JitInstr::CheckCast { dest, object, klass } => {
                write!(f, "{dest} = checkcast {object}, {klass}")
            }

            // Calls
            JitInstr::Call { dest, func_index, args } => {
                format_dest(f, dest)?;
                write!(f, "call @{} (", func_index)?;
                format_args_list(f, args)?;
                write!(f, ")")
            }

            // Runtime
            JitInstr::GcSafepoint => write!(f, "gc.safepoint"),

            // SSA
            JitInstr::Phi { dest, sources } => {
                write!(f, "{} = phi", dest)?;
                for (i, (block, reg)) in sources.iter().enumerate() {
                    if i > 0 { write!(f, ",")?; }
                    write!(f, " [{}:{}]", block, reg)?;
                }
                Ok(())
            }
            JitInstr::Move { dest, src } => write!(f, "{} = move {}", dest, src),
        }
    }
}

impl fmt::Display for JitTerminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JitTerminator::Jump(target) => write!(f, "jmp {}", target),
            JitTerminator::Branch { cond, then_block, else_block } =>
                write!(f, "br {}, {}, {}", cond, then_block, else_block),
            JitTerminator::Return(Some(reg)) => write!(f, "ret {}", reg),
            JitTerminator::Return(None) => write!(f, "ret void"),
            JitTerminator::Unreachable => write!(f, "unreachable"),
            JitTerminator::None => write!(f, "<no terminator>"),
        }
    }
}

fn format_dest(f: &mut fmt::Formatter<'_>, dest: &Option<Reg>) -> fmt::Result {
    match dest {
        Some(reg) => write!(f, "{} = ", reg),
        None => Ok(()),
    }
}

fn format_args_list(f: &mut fmt::Formatter<'_>, args: &[Reg]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 { write!(f, ", ")?; }
        write!(f, "{}", arg)?;
    }
    Ok(())
}
