//! x86-64 encoder tests: byte-exact against hand-assembled references.

use pretty_assertions::assert_eq;

use n64_core::recompiler::cache::CodeBuffer;
use n64_core::recompiler::emitter::{Asm, Cond, Mem, R12, RAX, RBP, RCX, RSP};

fn emit(f: impl FnOnce(&mut Asm<'_>)) -> Vec<u8> {
    let mut buf = CodeBuffer::new(4096);
    let mut asm = Asm::new(&mut buf);
    f(&mut asm);
    assert!(!buf.has_failed());
    buf.bytes().to_vec()
}

#[test]
fn push_pop_prologue_forms() {
    assert_eq!(emit(|a| a.push_r64(RBP)), [0x55]);
    assert_eq!(emit(|a| a.push_r64(R12)), [0x41, 0x54]);
    assert_eq!(emit(|a| a.pop_r64(RBP)), [0x5D]);
    assert_eq!(emit(|a| a.ret()), [0xC3]);
}

#[test]
fn mov_imm64_is_movabs() {
    assert_eq!(
        emit(|a| a.mov_r64_imm64(RAX, 0x1122_3344_5566_7788)),
        [0x48, 0xB8, 0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11]
    );
}

#[test]
fn mov_reg_reg_uses_rex_w() {
    // mov rbp, rsp
    assert_eq!(emit(|a| a.mov_r64_r64(RBP, RSP)), [0x48, 0x89, 0xE5]);
    // mov rax, r12
    assert_eq!(emit(|a| a.mov_r64_r64(RAX, R12)), [0x4C, 0x89, 0xE0]);
}

#[test]
fn frame_slot_addressing() {
    // mov [rbp-8], rax
    assert_eq!(
        emit(|a| a.mov_mem_r64(Mem::base_disp(RBP, -8), RAX)),
        [0x48, 0x89, 0x45, 0xF8]
    );
    // mov rax, [rbp-0x100] takes the disp32 form.
    assert_eq!(
        emit(|a| a.mov_r64_mem(RAX, Mem::base_disp(RBP, -0x100))),
        [0x48, 0x8B, 0x85, 0x00, 0xFF, 0xFF, 0xFF]
    );
}

#[test]
fn indirect_through_rbp_needs_zero_disp() {
    // mov rax, [rbp] cannot use the pure indirect encoding.
    assert_eq!(
        emit(|a| a.mov_r64_mem(RAX, Mem::indirect(RBP))),
        [0x48, 0x8B, 0x45, 0x00]
    );
    // mov rax, [rcx] can.
    assert_eq!(
        emit(|a| a.mov_r64_mem(RAX, Mem::indirect(RCX))),
        [0x48, 0x8B, 0x01]
    );
}

#[test]
fn alu_forms() {
    assert_eq!(emit(|a| a.add_r64_r64(RAX, RCX)), [0x48, 0x01, 0xC8]);
    assert_eq!(emit(|a| a.sub_r64_r64(RAX, RCX)), [0x48, 0x29, 0xC8]);
    assert_eq!(emit(|a| a.and_r64_r64(RAX, RCX)), [0x48, 0x21, 0xC8]);
    assert_eq!(emit(|a| a.xor_r64_r64(RAX, RCX)), [0x48, 0x31, 0xC8]);
    assert_eq!(emit(|a| a.cmp_r64_r64(RAX, RCX)), [0x48, 0x39, 0xC8]);
    assert_eq!(emit(|a| a.imul_r64_r64(RAX, RCX)), [0x48, 0x0F, 0xAF, 0xC1]);
    assert_eq!(emit(|a| a.not_r64(RAX)), [0x48, 0xF7, 0xD0]);
}

#[test]
fn shifts_take_the_count_in_cl() {
    assert_eq!(emit(|a| a.shl_r64_cl(RAX)), [0x48, 0xD3, 0xE0]);
    assert_eq!(emit(|a| a.shr_r64_cl(RAX)), [0x48, 0xD3, 0xE8]);
    assert_eq!(emit(|a| a.sar_r64_cl(RAX)), [0x48, 0xD3, 0xF8]);
}

#[test]
fn extension_forms() {
    // movsxd rax, eax
    assert_eq!(emit(|a| a.movsxd_r64_r32(RAX, RAX)), [0x48, 0x63, 0xC0]);
    // movzx rax, al
    assert_eq!(emit(|a| a.movzx_r64_r8(RAX, RAX)), [0x48, 0x0F, 0xB6, 0xC0]);
    // mov eax, eax zero-extends.
    assert_eq!(emit(|a| a.mov_r32_r32(RAX, RAX)), [0x89, 0xC0]);
}

#[test]
fn accumulator_sign_extension_family() {
    assert_eq!(emit(|a| a.cbw()), [0x66, 0x98]);
    assert_eq!(emit(|a| a.cwde()), [0x98]);
    assert_eq!(emit(|a| a.cdqe()), [0x48, 0x98]);
    assert_eq!(emit(|a| a.cdq()), [0x99]);
    assert_eq!(emit(|a| a.cqo()), [0x48, 0x99]);
}

#[test]
fn setcc_and_test() {
    assert_eq!(emit(|a| a.test_r8_r8(RAX, RAX)), [0x84, 0xC0]);
    assert_eq!(emit(|a| a.setcc_r8(Cond::E, RAX)), [0x0F, 0x94, 0xC0]);
    assert_eq!(emit(|a| a.setcc_r8(Cond::L, RAX)), [0x0F, 0x9C, 0xC0]);
    assert_eq!(emit(|a| a.setcc_r8(Cond::B, RAX)), [0x0F, 0x92, 0xC0]);
}

#[test]
fn call_through_register() {
    assert_eq!(emit(|a| a.call_r64(RAX)), [0xFF, 0xD0]);
}

#[test]
fn jumps_patch_rel32() {
    let mut buf = CodeBuffer::new(4096);
    let mut asm = Asm::new(&mut buf);
    let at = asm.jmp_rel32();
    let target = asm.buf.len();
    asm.ret();
    buf.patch_rel32(at, target);
    // jmp +0 lands on the ret immediately after the 4-byte offset.
    assert_eq!(buf.bytes(), [0xE9, 0x00, 0x00, 0x00, 0x00, 0xC3]);
}

#[test]
fn jcc_encodes_condition() {
    let bytes = emit(|a| {
        let _ = a.jcc_rel32(Cond::Ne);
    });
    assert_eq!(&bytes[..2], [0x0F, 0x85]);
}

#[test]
fn sub_rsp_imm32() {
    assert_eq!(
        emit(|a| a.sub_r64_imm32(RSP, 0x28)),
        [0x48, 0x81, 0xEC, 0x28, 0x00, 0x00, 0x00]
    );
}

#[test]
fn buffer_fails_gracefully_when_full() {
    let mut buf = CodeBuffer::new(4);
    let mut asm = Asm::new(&mut buf);
    asm.mov_r64_imm64(RAX, 0);
    assert!(buf.has_failed());
    buf.rewind(0);
    assert!(!buf.has_failed());
    assert_eq!(buf.len(), 0);
}
