//! SSA builder helpers
//!
//! Utilities for constructing JIT IR.

use super::instr::{JitBlockId, JitFunction, JitInstr, JitTerminator, Reg};
use super::types::JitType;
use crate::jit::handle::MetadataHandle;

/// Builder that simplifies JIT IR construction
pub struct JitBuilder<'a, 'rt> {
    func: &'a mut JitFunction<'rt>,
    current_block: JitBlockId,
}

impl<'a, 'rt> JitBuilder<'a, 'rt> {
    /// Create a builder targeting an existing function
    pub fn new(func: &'a mut JitFunction<'rt>) -> Self {
        let entry = func.entry;
        JitBuilder {
            func,
            current_block: entry,
        }
    }

    /// Switch to emitting into a different block
    pub fn switch_to_block(&mut self, block: JitBlockId) {
        self.current_block = block;
    }

    /// Get the current block ID
    pub fn current_block(&self) -> JitBlockId {
        self.current_block
    }

    /// Allocate a new virtual register with the given type
    pub fn alloc_reg(&mut self, ty: JitType) -> Reg {
        self.func.alloc_reg(ty)
    }

    /// Create a new basic block
    pub fn create_block(&mut self) -> JitBlockId {
        self.func.add_block()
    }

    /// Emit an instruction into the current block
    pub fn emit(&mut self, instr: JitInstr<'rt>) {
        self.func.block_mut(self.current_block).instrs.push(instr);
    }

    /// Set the terminator for the current block
    pub fn terminate(&mut self, term: JitTerminator) {
        let current = self.current_block;
        match &term {
            JitTerminator::Jump(target) => self.add_predecessor(*target, current),
            JitTerminator::Branch { then_block, else_block, .. } => {
                self.add_predecessor(*then_block, current);
                self.add_predecessor(*else_block, current);
            }
            _ => {}
        }
        self.func.block_mut(current).terminator = term;
    }

    fn add_predecessor(&mut self, block: JitBlockId, pred: JitBlockId) {
        let preds = &mut self.func.block_mut(block).predecessors;
        if !preds.contains(&pred) {
            preds.push(pred);
        }
    }

    /// Emit a constant i32 and return the destination register
    pub fn const_i32(&mut self, value: i32) -> Reg {
        let dest = self.alloc_reg(JitType::I32);
        self.emit(JitInstr::ConstI32 { dest, value });
        dest
    }

    /// Emit a constant bool and return the destination register
    pub fn const_bool(&mut self, value: bool) -> Reg {
        let dest = self.alloc_reg(JitType::Bool);
        self.emit(JitInstr::ConstBool { dest, value });
        dest
    }

    /// Emit a null constant
    pub fn const_null(&mut self) -> Reg {
        let dest = self.alloc_reg(JitType::Value);
        self.emit(JitInstr::ConstNull { dest });
        dest
    }

    /// Emit a klass constant
    pub fn const_klass(&mut self, klass: MetadataHandle<'rt>) -> Reg {
        let dest = self.alloc_reg(JitType::Klass);
        self.emit(JitInstr::ConstKlass { dest, klass });
        dest
    }

    /// Emit an allocation of an instance of `klass`
    pub fn new_object(&mut self, klass: MetadataHandle<'rt>) -> Reg {
        let dest = self.alloc_reg(JitType::Ptr);
        self.emit(JitInstr::NewObject { dest, klass });
        dest
    }

    /// Emit a load of an object's klass word
    pub fn load_klass(&mut self, object: Reg) -> Reg {
        let dest = self.alloc_reg(JitType::Klass);
        self.emit(JitInstr::LoadKlass { dest, object });
        dest
    }

    /// Emit an identity comparison of two klass registers
    pub fn klass_eq(&mut self, left: Reg, right: Reg) -> Reg {
        let dest = self.alloc_reg(JitType::Bool);
        self.emit(JitInstr::KlassEq { dest, left, right });
        dest
    }

    /// Emit an instance-of test against `klass`
    pub fn instance_of(&mut self, object: Reg, klass: MetadataHandle<'rt>) -> Reg {
        let dest = self.alloc_reg(JitType::Bool);
        self.emit(JitInstr::InstanceOf { dest, object, klass });
        dest
    }

    /// Emit a checked cast to `klass`
    pub fn check_cast(&mut self, object: Reg, klass: MetadataHandle<'rt>) -> Reg {
        let dest = self.alloc_reg(JitType::Ptr);
        self.emit(JitInstr::CheckCast { dest, object, klass });
        dest
    }

    /// Emit a field load
    pub fn load_field(&mut self, object: Reg, offset: u16) -> Reg {
        let dest = self.alloc_reg(JitType::Value);
        self.emit(JitInstr::LoadField { dest, object, offset });
        dest
    }

    /// Emit a LoadLocal instruction
    pub fn load_local(&mut self, index: u16) -> Reg {
        let dest = self.alloc_reg(JitType::Value);
        self.emit(JitInstr::LoadLocal { dest, index });
        dest
    }

    /// Emit a StoreLocal instruction
    pub fn store_local(&mut self, index: u16, value: Reg) {
        self.emit(JitInstr::StoreLocal { index, value });
    }

    /// Access the underlying function
    pub fn func(&self) -> &JitFunction<'rt> {
        self.func
    }

    /// Access the underlying function mutably
    pub fn func_mut(&mut self) -> &mut JitFunction<'rt> {
        self.func
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::mirror::ClassMirror;

    #[test]
    fn test_builder_klass_helpers() {
        let widget = ClassMirror::new(0, "example.Widget".to_string());
        let klass = MetadataHandle::new(&widget);

        let mut func = JitFunction::new(0, "test".to_string(), 0, 0);
        func.add_block();
        let mut builder = JitBuilder::new(&mut func);

        let obj = builder.new_object(klass);
        let k = builder.const_klass(klass);
        let loaded = builder.load_klass(obj);
        let same = builder.klass_eq(loaded, k);
        builder.terminate(JitTerminator::Return(Some(same)));

        assert_eq!(func.reg_type(obj), JitType::Ptr);
        assert_eq!(func.reg_type(k), JitType::Klass);
        assert_eq!(func.reg_type(loaded), JitType::Klass);
        assert_eq!(func.reg_type(same), JitType::Bool);
        assert_eq!(func.instr_count(), 4);
    }

    #[test]
    fn test_builder_tracks_predecessors() {
        let mut func = JitFunction::new(0, "test".to_string(), 0, 0);
        func.add_block();
        let mut builder = JitBuilder::new(&mut func);

        let then_block = builder.create_block();
        let else_block = builder.create_block();
        let cond = builder.const_bool(true);
        builder.terminate(JitTerminator::Branch { cond, then_block, else_block });

        assert_eq!(func.block(then_block).predecessors, vec![JitBlockId(0)]);
        assert_eq!(func.block(else_block).predecessors, vec![JitBlockId(0)]);
    }
}
