/*!
state.rs - 6502 architectural state (registers + flags) and flag helpers.

Overview
========
`CpuState` owns every architecturally visible register. It excludes:
  - Bus / memory logic
  - Instruction decode
  - Cycle accounting and lifecycle phase
Those live in `core` (the `Cpu` facade), `addressing`, `execute` and `table`.

6502 Status Register Bit Layout
===============================
Bit: 7 6 5 4 3 2 1 0
     N V 1 B D I Z C
Where:
  N = NEGATIVE
  V = OVERFLOW
  1 = UNUSED (always reads as 1 when pushed)
  B = BREAK (PHP/BRK push it set; IRQ/NMI push it clear)
  D = DECIMAL (no effect on the 2A03 but still toggled by CLD/SED)
  I = IRQ_DISABLE
  Z = ZERO
  C = CARRY
*/

use std::fmt;

/// Processor status flag bit masks.
pub const CARRY: u8 = 0b0000_0001;
pub const ZERO: u8 = 0b0000_0010;
pub const IRQ_DISABLE: u8 = 0b0000_0100;
pub const DECIMAL: u8 = 0b0000_1000;
pub const BREAK: u8 = 0b0001_0000;
pub const UNUSED: u8 = 0b0010_0000;
pub const OVERFLOW: u8 = 0b0100_0000;
pub const NEGATIVE: u8 = 0b1000_0000;

/// Status value after power-up (IRQ disabled, both B bits set).
pub const POWER_ON_STATUS: u8 = 0x34;

/// Stack pointer value after power-up.
pub const POWER_ON_SP: u8 = 0xFD;

/// Register file of the 2A03.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuState {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub status: u8,
}

impl CpuState {
    /// All-zero register file (the "powered off" contents).
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------------
    // Program Counter Helpers
    // ---------------------------------------------------------------------

    /// Advance PC by `delta` (wrapping at 16 bits).
    #[inline]
    pub fn advance_pc(&mut self, delta: u16) {
        self.pc = self.pc.wrapping_add(delta);
    }

    // ---------------------------------------------------------------------
    // Flag Operations
    // ---------------------------------------------------------------------

    /// Return true if a status flag (bit mask) is set.
    #[inline]
    pub fn is_flag_set(&self, mask: u8) -> bool {
        (self.status & mask) != 0
    }

    #[inline]
    pub fn set_flag_bit(&mut self, mask: u8) {
        self.status |= mask;
    }

    #[inline]
    pub fn clear_flag_bit(&mut self, mask: u8) {
        self.status &= !mask;
    }

    /// Assign a flag bit based on boolean `value`.
    #[inline]
    pub fn assign_flag(&mut self, mask: u8, value: bool) {
        if value {
            self.set_flag_bit(mask);
        } else {
            self.clear_flag_bit(mask);
        }
    }

    /// ZERO iff `result == 0`, NEGATIVE iff bit 7 of `result`.
    #[inline]
    pub fn update_zn(&mut self, result: u8) {
        self.assign_flag(ZERO, result == 0);
        self.assign_flag(NEGATIVE, (result & 0x80) != 0);
    }

    /// Compose the status byte for a stack push.
    ///
    /// - Bit 5 (UNUSED) always forced to 1.
    /// - BREAK bit included only if `set_break` is true (BRK/PHP).
    pub fn compose_status_for_push(&self, set_break: bool) -> u8 {
        let v = self.status | UNUSED;
        if set_break { v | BREAK } else { v & !BREAK }
    }
}

impl fmt::Display for CpuState {
    /// One-line register dump used in traces and by the binary.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} PC:{:04X}",
            self.a, self.x, self.y, self.status, self.sp, self.pc
        )
    }
}
