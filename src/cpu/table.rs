/*!
table.rs - Static 256-entry opcode table.

Each entry pairs an addressing resolver with an effect, a base cycle count and
a mnemonic. The CPU looks up the opcode byte, runs `mode` then `exec`, and
charges `cycles` plus any dynamic penalty:

- `page_penalty` entries (indexed reads) pay +1 when the resolver reports a
  page crossing.
- Branch effects charge their own +1/+2 when taken.

Entries with an empty mnemonic are unimplemented (all unofficial opcodes);
executing one is a fatal fault. An implemented entry with `cycles == 0` is a
table bug and is also rejected before any effect runs.

Stores, JMP and JSR use the address-only resolvers so the target is never read
before it is written.
*/

use std::fmt;

use crate::cpu::addressing::{
    AddrFn, absolute, absolute_addr, absolute_x, absolute_x_addr, absolute_y, absolute_y_addr,
    accumulator, immediate, implied, indexed_indirect, indexed_indirect_addr, indirect,
    indirect_indexed, indirect_indexed_addr, relative, zero_page, zero_page_addr, zero_page_x,
    zero_page_x_addr, zero_page_y, zero_page_y_addr,
};
use crate::cpu::execute::*;

#[derive(Clone, Copy)]
pub struct Opcode {
    pub mnemonic: &'static str,
    pub mode: AddrFn,
    pub exec: ExecFn,
    pub cycles: u32,
    pub page_penalty: bool,
}

impl Opcode {
    pub const fn new(mnemonic: &'static str, mode: AddrFn, exec: ExecFn, cycles: u32) -> Self {
        Self {
            mnemonic,
            mode,
            exec,
            cycles,
            page_penalty: false,
        }
    }

    /// Mark an indexed read that costs one more cycle across a page boundary.
    pub const fn with_page_penalty(self) -> Self {
        Self {
            page_penalty: true,
            ..self
        }
    }

    #[inline]
    pub fn is_implemented(&self) -> bool {
        !self.mnemonic.is_empty()
    }
}

impl fmt::Debug for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Opcode")
            .field("mnemonic", &self.mnemonic)
            .field("cycles", &self.cycles)
            .field("page_penalty", &self.page_penalty)
            .finish_non_exhaustive()
    }
}

pub const UNIMPLEMENTED: Opcode = Opcode::new("", implied, none, 0);

/// Official 6502 instruction set indexed by opcode byte.
pub static OPCODES: [Opcode; 256] = {
    use Opcode as O;
    let mut t = [UNIMPLEMENTED; 256];

    // Loads
    t[0xA9] = O::new("LDA", immediate, lda, 2);
    t[0xA5] = O::new("LDA", zero_page, lda, 3);
    t[0xB5] = O::new("LDA", zero_page_x, lda, 4);
    t[0xAD] = O::new("LDA", absolute, lda, 4);
    t[0xBD] = O::new("LDA", absolute_x, lda, 4).with_page_penalty();
    t[0xB9] = O::new("LDA", absolute_y, lda, 4).with_page_penalty();
    t[0xA1] = O::new("LDA", indexed_indirect, lda, 6);
    t[0xB1] = O::new("LDA", indirect_indexed, lda, 5).with_page_penalty();

    t[0xA2] = O::new("LDX", immediate, ldx, 2);
    t[0xA6] = O::new("LDX", zero_page, ldx, 3);
    t[0xB6] = O::new("LDX", zero_page_y, ldx, 4);
    t[0xAE] = O::new("LDX", absolute, ldx, 4);
    t[0xBE] = O::new("LDX", absolute_y, ldx, 4).with_page_penalty();

    t[0xA0] = O::new("LDY", immediate, ldy, 2);
    t[0xA4] = O::new("LDY", zero_page, ldy, 3);
    t[0xB4] = O::new("LDY", zero_page_x, ldy, 4);
    t[0xAC] = O::new("LDY", absolute, ldy, 4);
    t[0xBC] = O::new("LDY", absolute_x, ldy, 4).with_page_penalty();

    // Stores
    t[0x85] = O::new("STA", zero_page_addr, sta, 3);
    t[0x95] = O::new("STA", zero_page_x_addr, sta, 4);
    t[0x8D] = O::new("STA", absolute_addr, sta, 4);
    t[0x9D] = O::new("STA", absolute_x_addr, sta, 5);
    t[0x99] = O::new("STA", absolute_y_addr, sta, 5);
    t[0x81] = O::new("STA", indexed_indirect_addr, sta, 6);
    t[0x91] = O::new("STA", indirect_indexed_addr, sta, 6);

    t[0x86] = O::new("STX", zero_page_addr, stx, 3);
    t[0x96] = O::new("STX", zero_page_y_addr, stx, 4);
    t[0x8E] = O::new("STX", absolute_addr, stx, 4);

    t[0x84] = O::new("STY", zero_page_addr, sty, 3);
    t[0x94] = O::new("STY", zero_page_x_addr, sty, 4);
    t[0x8C] = O::new("STY", absolute_addr, sty, 4);

    // Transfers
    t[0xAA] = O::new("TAX", implied, tax, 2);
    t[0xA8] = O::new("TAY", implied, tay, 2);
    t[0x8A] = O::new("TXA", implied, txa, 2);
    t[0x98] = O::new("TYA", implied, tya, 2);
    t[0xBA] = O::new("TSX", implied, tsx, 2);
    t[0x9A] = O::new("TXS", implied, txs, 2);

    // Stack
    t[0x48] = O::new("PHA", implied, pha, 3);
    t[0x08] = O::new("PHP", implied, php, 3);
    t[0x68] = O::new("PLA", implied, pla, 4);
    t[0x28] = O::new("PLP", implied, plp, 4);

    // Logical
    t[0x29] = O::new("AND", immediate, and, 2);
    t[0x25] = O::new("AND", zero_page, and, 3);
    t[0x35] = O::new("AND", zero_page_x, and, 4);
    t[0x2D] = O::new("AND", absolute, and, 4);
    t[0x3D] = O::new("AND", absolute_x, and, 4).with_page_penalty();
    t[0x39] = O::new("AND", absolute_y, and, 4).with_page_penalty();
    t[0x21] = O::new("AND", indexed_indirect, and, 6);
    t[0x31] = O::new("AND", indirect_indexed, and, 5).with_page_penalty();

    t[0x09] = O::new("ORA", immediate, ora, 2);
    t[0x05] = O::new("ORA", zero_page, ora, 3);
    t[0x15] = O::new("ORA", zero_page_x, ora, 4);
    t[0x0D] = O::new("ORA", absolute, ora, 4);
    t[0x1D] = O::new("ORA", absolute_x, ora, 4).with_page_penalty();
    t[0x19] = O::new("ORA", absolute_y, ora, 4).with_page_penalty();
    t[0x01] = O::new("ORA", indexed_indirect, ora, 6);
    t[0x11] = O::new("ORA", indirect_indexed, ora, 5).with_page_penalty();

    t[0x49] = O::new("EOR", immediate, eor, 2);
    t[0x45] = O::new("EOR", zero_page, eor, 3);
    t[0x55] = O::new("EOR", zero_page_x, eor, 4);
    t[0x4D] = O::new("EOR", absolute, eor, 4);
    t[0x5D] = O::new("EOR", absolute_x, eor, 4).with_page_penalty();
    t[0x59] = O::new("EOR", absolute_y, eor, 4).with_page_penalty();
    t[0x41] = O::new("EOR", indexed_indirect, eor, 6);
    t[0x51] = O::new("EOR", indirect_indexed, eor, 5).with_page_penalty();

    t[0x24] = O::new("BIT", zero_page, bit, 3);
    t[0x2C] = O::new("BIT", absolute, bit, 4);

    // Arithmetic
    t[0x69] = O::new("ADC", immediate, adc, 2);
    t[0x65] = O::new("ADC", zero_page, adc, 3);
    t[0x75] = O::new("ADC", zero_page_x, adc, 4);
    t[0x6D] = O::new("ADC", absolute, adc, 4);
    t[0x7D] = O::new("ADC", absolute_x, adc, 4).with_page_penalty();
    t[0x79] = O::new("ADC", absolute_y, adc, 4).with_page_penalty();
    t[0x61] = O::new("ADC", indexed_indirect, adc, 6);
    t[0x71] = O::new("ADC", indirect_indexed, adc, 5).with_page_penalty();

    t[0xE9] = O::new("SBC", immediate, sbc, 2);
    t[0xE5] = O::new("SBC", zero_page, sbc, 3);
    t[0xF5] = O::new("SBC", zero_page_x, sbc, 4);
    t[0xED] = O::new("SBC", absolute, sbc, 4);
    t[0xFD] = O::new("SBC", absolute_x, sbc, 4).with_page_penalty();
    t[0xF9] = O::new("SBC", absolute_y, sbc, 4).with_page_penalty();
    t[0xE1] = O::new("SBC", indexed_indirect, sbc, 6);
    t[0xF1] = O::new("SBC", indirect_indexed, sbc, 5).with_page_penalty();

    t[0xC9] = O::new("CMP", immediate, cmp, 2);
    t[0xC5] = O::new("CMP", zero_page, cmp, 3);
    t[0xD5] = O::new("CMP", zero_page_x, cmp, 4);
    t[0xCD] = O::new("CMP", absolute, cmp, 4);
    t[0xDD] = O::new("CMP", absolute_x, cmp, 4).with_page_penalty();
    t[0xD9] = O::new("CMP", absolute_y, cmp, 4).with_page_penalty();
    t[0xC1] = O::new("CMP", indexed_indirect, cmp, 6);
    t[0xD1] = O::new("CMP", indirect_indexed, cmp, 5).with_page_penalty();

    t[0xE0] = O::new("CPX", immediate, cpx, 2);
    t[0xE4] = O::new("CPX", zero_page, cpx, 3);
    t[0xEC] = O::new("CPX", absolute, cpx, 4);

    t[0xC0] = O::new("CPY", immediate, cpy, 2);
    t[0xC4] = O::new("CPY", zero_page, cpy, 3);
    t[0xCC] = O::new("CPY", absolute, cpy, 4);

    // Increments / Decrements
    t[0xE6] = O::new("INC", zero_page, inc, 5);
    t[0xF6] = O::new("INC", zero_page_x, inc, 6);
    t[0xEE] = O::new("INC", absolute, inc, 6);
    t[0xFE] = O::new("INC", absolute_x, inc, 7);

    t[0xC6] = O::new("DEC", zero_page, dec, 5);
    t[0xD6] = O::new("DEC", zero_page_x, dec, 6);
    t[0xCE] = O::new("DEC", absolute, dec, 6);
    t[0xDE] = O::new("DEC", absolute_x, dec, 7);

    t[0xE8] = O::new("INX", implied, inx, 2);
    t[0xC8] = O::new("INY", implied, iny, 2);
    t[0xCA] = O::new("DEX", implied, dex, 2);
    t[0x88] = O::new("DEY", implied, dey, 2);

    // Shifts / Rotates
    t[0x0A] = O::new("ASL", accumulator, asl_acc, 2);
    t[0x06] = O::new("ASL", zero_page, asl, 5);
    t[0x16] = O::new("ASL", zero_page_x, asl, 6);
    t[0x0E] = O::new("ASL", absolute, asl, 6);
    t[0x1E] = O::new("ASL", absolute_x, asl, 7);

    t[0x4A] = O::new("LSR", accumulator, lsr_acc, 2);
    t[0x46] = O::new("LSR", zero_page, lsr, 5);
    t[0x56] = O::new("LSR", zero_page_x, lsr, 6);
    t[0x4E] = O::new("LSR", absolute, lsr, 6);
    t[0x5E] = O::new("LSR", absolute_x, lsr, 7);

    t[0x2A] = O::new("ROL", accumulator, rol_acc, 2);
    t[0x26] = O::new("ROL", zero_page, rol, 5);
    t[0x36] = O::new("ROL", zero_page_x, rol, 6);
    t[0x2E] = O::new("ROL", absolute, rol, 6);
    t[0x3E] = O::new("ROL", absolute_x, rol, 7);

    t[0x6A] = O::new("ROR", accumulator, ror_acc, 2);
    t[0x66] = O::new("ROR", zero_page, ror, 5);
    t[0x76] = O::new("ROR", zero_page_x, ror, 6);
    t[0x6E] = O::new("ROR", absolute, ror, 6);
    t[0x7E] = O::new("ROR", absolute_x, ror, 7);

    // Jumps / Calls
    t[0x4C] = O::new("JMP", absolute_addr, jmp, 3);
    t[0x6C] = O::new("JMP", indirect, jmp, 5);
    t[0x20] = O::new("JSR", absolute_addr, jsr, 6);
    t[0x60] = O::new("RTS", implied, rts, 6);
    t[0x40] = O::new("RTI", implied, rti, 6);
    t[0x00] = O::new("BRK", implied, brk, 7);

    // Branches
    t[0x90] = O::new("BCC", relative, bcc, 2);
    t[0xB0] = O::new("BCS", relative, bcs, 2);
    t[0xF0] = O::new("BEQ", relative, beq, 2);
    t[0xD0] = O::new("BNE", relative, bne, 2);
    t[0x30] = O::new("BMI", relative, bmi, 2);
    t[0x10] = O::new("BPL", relative, bpl, 2);
    t[0x50] = O::new("BVC", relative, bvc, 2);
    t[0x70] = O::new("BVS", relative, bvs, 2);

    // Status flags
    t[0x18] = O::new("CLC", implied, clc, 2);
    t[0xD8] = O::new("CLD", implied, cld, 2);
    t[0x58] = O::new("CLI", implied, cli, 2);
    t[0xB8] = O::new("CLV", implied, clv, 2);
    t[0x38] = O::new("SEC", implied, sec, 2);
    t[0xF8] = O::new("SED", implied, sed, 2);
    t[0x78] = O::new("SEI", implied, sei, 2);

    t[0xEA] = O::new("NOP", implied, nop, 2);

    t
};
