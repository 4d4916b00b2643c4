//! Stub backend for testing the pipeline without real codegen
//!
//! Produces placeholder machine code (INT3 / BRK) with real relocation
//! records, so klass patching can be checked end-to-end without a native
//! code generator.

use super::traits::*;
use crate::jit::ir::instr::{JitFunction, JitInstr};
use crate::jit::unit::KlassPool;

/// Width of every patchable slot the stub emits
const SLOT_SIZE: usize = 8;

/// A stub backend that produces placeholder code (INT3 on x86, BRK on ARM)
pub struct StubBackend;

impl StubBackend {
    fn trap_byte(&self) -> u8 {
        match self.target_info().arch {
            TargetArch::X86_64 => 0xCC,  // INT3
            TargetArch::AArch64 => 0x00, // BRK #0 (placeholder)
        }
    }
}

/// Append a trap byte followed by a zeroed slot for `target`
fn emit_slot(
    code: &mut Vec<u8>,
    relocations: &mut Vec<Relocation>,
    trap: u8,
    target: RelocationTarget,
) {
    code.push(trap);
    relocations.push(Relocation { code_offset: code.len(), target });
    code.extend_from_slice(&[0; SLOT_SIZE]);
}

impl CodegenBackend for StubBackend {
    fn name(&self) -> &str {
        "stub"
    }

    fn compile_function(
        &self,
        func: &JitFunction<'_>,
        ctx: &ModuleContext<'_, '_>,
    ) -> Result<CompiledCode, CodegenError> {
        let trap = self.trap_byte();
        let mut code = vec![trap];
        let mut relocations = Vec::new();

        for instr in func.blocks.iter().flat_map(|b| b.instrs.iter()) {
            if let Some(klass) = instr.klass_ref() {
                let slot = ctx
                    .klasses
                    .index_of(&klass)
                    .ok_or_else(|| CodegenError::UnresolvedKlass(klass.describe()))?;
                emit_slot(&mut code, &mut relocations, trap, RelocationTarget::Klass(slot));
                continue;
            }
            match instr {
                JitInstr::Call { func_index, .. } => {
                    let target = RelocationTarget::JitFunction(*func_index);
                    emit_slot(&mut code, &mut relocations, trap, target);
                }
                JitInstr::GcSafepoint => {
                    emit_slot(
                        &mut code,
                        &mut relocations,
                        trap,
                        RelocationTarget::RuntimeHelper(RuntimeHelper::SafepointPoll),
                    );
                }
                _ => code.push(trap),
            }
        }

        Ok(CompiledCode {
            code,
            entry_offset: 0,
            relocations,
        })
    }

    fn finalize(
        &self,
        code: &mut CompiledCode,
        klasses: &KlassPool<'_>,
        resolver: &dyn SymbolResolver,
    ) -> Result<(), CodegenError> {
        let code_len = code.code.len();
        for reloc in &code.relocations {
            let addr = match reloc.target {
                RelocationTarget::RuntimeHelper(helper) => resolver
                    .resolve_runtime_helper(helper)
                    .ok_or_else(|| CodegenError::UnresolvedSymbol(format!("{:?}", helper)))?,
                RelocationTarget::JitFunction(func_index) => resolver
                    .resolve_jit_function(func_index)
                    .ok_or_else(|| {
                        CodegenError::UnresolvedSymbol(format!("function #{}", func_index))
                    })?,
                RelocationTarget::Klass(slot) => {
                    let klass = klasses.get(slot).ok_or_else(|| {
                        CodegenError::UnresolvedKlass(format!("klass pool slot {}", slot))
                    })?;
                    resolver
                        .resolve_klass(&klass)
                        .ok_or_else(|| CodegenError::UnresolvedKlass(klass.describe()))?
                }
            };

            let end = reloc.code_offset + SLOT_SIZE;
            let slot = code.code.get_mut(reloc.code_offset..end).ok_or_else(|| {
                CodegenError::BackendError(format!(
                    "relocation at offset {} past end of code ({} bytes)",
                    reloc.code_offset, code_len
                ))
            })?;
            slot.copy_from_slice(&(addr as u64).to_le_bytes());
        }
        Ok(())
    }

    fn target_info(&self) -> TargetInfo {
        #[cfg(target_arch = "aarch64")]
        { TargetInfo { arch: TargetArch::AArch64 } }

        #[cfg(not(target_arch = "aarch64"))]
        { TargetInfo { arch: TargetArch::X86_64 } }
    }
}
