/*!
core::Cpu - 2A03 CPU façade owning the register file, cycle counter and bus.

Lifecycle
=========
```text
PoweredOff --power_on--> PoweredOn --step--> Running
     ^                      |  ^                |
     |                      |  +----reset-------+
     +---- power_on (any phase, clears a halt) -+--fault--> Halted(err)
```
- `step`, `execute`, `reset`, `nmi` and `irq` refuse to run while powered off
  or halted; a halt is sticky until the next `power_on`.
- Every fault is recorded in the phase and also returned to the caller.

Step
====
1. Read the opcode byte at PC, PC += 1.
2. Look up the `OPCODES` entry. Empty mnemonic or zero cycles faults before
   the resolver or effect runs.
3. Run the addressing resolver, then the effect.
4. Charge base cycles + page-cross penalty (flagged reads) + whatever the
   effect added (taken branches).

Interrupts are serviced immediately at an instruction boundary: there is no
pending-line latching between opcodes.
*/

use log::{debug, error, trace};

use crate::bus::Bus;
use crate::cpu::execute::{IRQ_VECTOR, push_status, push_word};
use crate::cpu::state::{CpuState, IRQ_DISABLE, POWER_ON_SP, POWER_ON_STATUS};
use crate::cpu::table::{OPCODES, Opcode};
use crate::error::{CpuError, DeviceError, InterruptKind};

pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;

/// APU status / channel enable register.
const APU_STATUS: u16 = 0x4015;
/// APU frame counter (shares its address with the second joypad port).
const APU_FRAME_COUNTER: u16 = 0x4017;

/// Cycles taken to service NMI/IRQ.
const INTERRUPT_CYCLES: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    PoweredOff,
    PoweredOn,
    Running,
    Halted(CpuError),
}

pub struct Cpu {
    pub(crate) state: CpuState,
    pub(crate) bus: Bus,
    cycles: u64,
    extra_cycles: u32,
    phase: Phase,
}

impl Cpu {
    /// Take ownership of an assembled bus. Registers are zero until `power_on`.
    pub fn new(bus: Bus) -> Self {
        Self {
            state: CpuState::new(),
            bus,
            cycles: 0,
            extra_cycles: 0,
            phase: Phase::PoweredOff,
        }
    }

    pub fn state(&self) -> &CpuState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut CpuState {
        &mut self.state
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    /// Total cycles executed since power-on.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_halted(&self) -> bool {
        matches!(self.phase, Phase::Halted(_))
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Power-up state: A=X=Y=0, P=$34, SP=$FD, APU silenced, PC from the
    /// reset vector. Allowed in any phase.
    pub fn power_on(&mut self) -> Result<(), DeviceError> {
        self.state = CpuState {
            sp: POWER_ON_SP,
            status: POWER_ON_STATUS,
            ..CpuState::new()
        };
        self.cycles = 0;
        self.extra_cycles = 0;
        self.bus.write(APU_STATUS, 0x00)?;
        self.bus.write(APU_FRAME_COUNTER, 0x00)?;
        self.state.pc = self.bus.read_word(RESET_VECTOR);
        self.phase = Phase::PoweredOn;
        debug!("Power on: {}", self.state);
        Ok(())
    }

    /// Reset button: SP -= 3, I set, APU silenced, PC reloaded. A/X/Y keep
    /// their values.
    pub fn reset(&mut self) -> Result<(), CpuError> {
        self.ensure_runnable()?;
        self.state.sp = self.state.sp.wrapping_sub(3);
        self.state.set_flag_bit(IRQ_DISABLE);
        if let Err(source) = self.bus.write(APU_STATUS, 0x00) {
            return Err(self.fault(CpuError::Interrupt {
                kind: InterruptKind::Reset,
                source,
            }));
        }
        self.state.pc = self.bus.read_word(RESET_VECTOR);
        self.phase = Phase::PoweredOn;
        debug!("Reset: {}", self.state);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Execution
    // ---------------------------------------------------------------------

    /// Fetch, decode and execute one instruction. Returns the cycles charged.
    pub fn step(&mut self) -> Result<u32, CpuError> {
        self.ensure_runnable()?;
        let code = self.bus.read(self.state.pc);
        self.state.advance_pc(1);
        self.execute(code, &OPCODES[code as usize])
    }

    /// Execute `entry` as if opcode `code` had just been fetched (PC already
    /// points past the opcode byte).
    pub fn execute(&mut self, code: u8, entry: &Opcode) -> Result<u32, CpuError> {
        self.ensure_runnable()?;
        let at = self.state.pc.wrapping_sub(1);

        if !entry.is_implemented() {
            return Err(self.fault(CpuError::UnimplementedOpcode { opcode: code, pc: at }));
        }
        // Checked ahead of the resolver, not after the effect: a zero-cycle
        // entry halts with PC, registers and memory untouched.
        if entry.cycles == 0 {
            return Err(self.fault(CpuError::MissingCycleCount { opcode: code, pc: at }));
        }

        self.extra_cycles = 0;
        let operand = (entry.mode)(self);
        if let Err(source) = (entry.exec)(self, operand) {
            return Err(self.fault(CpuError::Device {
                opcode: code,
                pc: at,
                source,
            }));
        }

        let mut total = entry.cycles + self.take_extra_cycles();
        if entry.page_penalty && operand.page_crossed {
            total += 1;
        }
        self.cycles += total as u64;
        self.phase = Phase::Running;

        trace!(
            "{at:04X}  {code:02X}  {:<3}  {}  CYC:{}",
            entry.mnemonic, self.state, self.cycles
        );
        Ok(total)
    }

    /// Execute up to `max_steps` instructions, stopping at the first fault.
    pub fn run(&mut self, max_steps: u64) -> Result<(), CpuError> {
        for _ in 0..max_steps {
            self.step()?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Interrupts
    // ---------------------------------------------------------------------

    /// Service a non-maskable interrupt now.
    pub fn nmi(&mut self) -> Result<u32, CpuError> {
        self.ensure_runnable()?;
        self.interrupt(InterruptKind::Nmi, NMI_VECTOR)
    }

    /// Service a maskable interrupt now. Returns 0 cycles when I is set.
    pub fn irq(&mut self) -> Result<u32, CpuError> {
        self.ensure_runnable()?;
        if self.state.is_flag_set(IRQ_DISABLE) {
            return Ok(0);
        }
        self.interrupt(InterruptKind::Irq, IRQ_VECTOR)
    }

    fn interrupt(&mut self, kind: InterruptKind, vector: u16) -> Result<u32, CpuError> {
        let pc = self.state.pc;
        let pushed = push_word(self, pc).and_then(|()| push_status(self, false));
        if let Err(source) = pushed {
            return Err(self.fault(CpuError::Interrupt { kind, source }));
        }
        self.state.set_flag_bit(IRQ_DISABLE);
        self.state.pc = self.bus.read_word(vector);
        self.cycles += INTERRUPT_CYCLES as u64;
        debug!("{kind} -> ${:04X}", self.state.pc);
        Ok(INTERRUPT_CYCLES)
    }

    // ---------------------------------------------------------------------
    // Internal helpers
    // ---------------------------------------------------------------------

    /// Charge extra cycles to the instruction currently executing.
    pub(crate) fn add_cycles(&mut self, n: u32) {
        self.extra_cycles += n;
    }

    pub(crate) fn take_extra_cycles(&mut self) -> u32 {
        std::mem::take(&mut self.extra_cycles)
    }

    fn ensure_runnable(&self) -> Result<(), CpuError> {
        match &self.phase {
            Phase::PoweredOff => Err(CpuError::PoweredOff),
            Phase::Halted(e) => Err(CpuError::Halted(Box::new(e.clone()))),
            Phase::PoweredOn | Phase::Running => Ok(()),
        }
    }

    fn fault(&mut self, e: CpuError) -> CpuError {
        error!("CPU fault: {e} ({})", self.state);
        self.phase = Phase::Halted(e.clone());
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::addressing::immediate;
    use crate::cpu::execute::lda;
    use crate::cpu::state::{BREAK, CARRY, NEGATIVE, OVERFLOW, UNUSED, ZERO};
    use crate::mem::Memory;
    use crate::test_utils::{cpu_with_program, fake_cpu};

    #[test]
    fn power_on_state() {
        let (mut cpu, seen) = fake_cpu();
        {
            let mut p = seen.borrow_mut();
            p.mem[0xFFFC] = 0x00;
            p.mem[0xFFFD] = 0x80;
        }
        assert_eq!(cpu.phase(), &Phase::PoweredOff);
        cpu.power_on().unwrap();

        let s = cpu.state();
        assert_eq!((s.a, s.x, s.y), (0, 0, 0));
        assert_eq!(s.status, 0x34);
        assert_eq!(s.sp, 0xFD);
        assert_eq!(s.pc, 0x8000);
        assert_eq!(cpu.phase(), &Phase::PoweredOn);
        assert_eq!(seen.borrow().writes, vec![(0x4015, 0x00), (0x4017, 0x00)]);
    }

    #[test]
    fn reset_keeps_registers_and_drops_sp() {
        let mut cpu = cpu_with_program(&[]);
        cpu.state_mut().a = 0x11;
        cpu.state_mut().x = 0x22;
        cpu.state_mut().status = 0x00;
        cpu.state_mut().pc = 0x9000;
        cpu.reset().unwrap();

        let s = cpu.state();
        assert_eq!(s.a, 0x11);
        assert_eq!(s.x, 0x22);
        assert_eq!(s.sp, 0xFA);
        assert!(s.is_flag_set(IRQ_DISABLE));
        assert_eq!(s.pc, 0x8000);
    }

    #[test]
    fn sp_wraps_on_reset() {
        let mut cpu = cpu_with_program(&[]);
        cpu.state_mut().sp = 0x01;
        cpu.reset().unwrap();
        assert_eq!(cpu.state().sp, 0xFE);
    }

    #[test]
    fn lda_then_sta_lands_in_ram() {
        let mut cpu = cpu_with_program(&[0xA9, 0x42, 0x8D, 0x10, 0x00]);
        assert_eq!(cpu.step().unwrap(), 2);
        assert_eq!(cpu.step().unwrap(), 4);
        assert_eq!(cpu.bus_mut().read(0x0010), 0x42);
        assert_eq!(cpu.state().pc, 0x8005);
        assert_eq!(cpu.cycles(), 6);
        assert_eq!(cpu.phase(), &Phase::Running);
    }

    #[test]
    fn unimplemented_opcode_halts() {
        let mut cpu = cpu_with_program(&[0x02]);
        let err = cpu.step().unwrap_err();
        assert_eq!(
            err,
            CpuError::UnimplementedOpcode {
                opcode: 0x02,
                pc: 0x8000
            }
        );
        assert!(cpu.is_halted());

        assert!(matches!(cpu.step(), Err(CpuError::Halted(_))));
        assert!(matches!(cpu.reset(), Err(CpuError::Halted(_))));
    }

    #[test]
    fn power_cycle_clears_halt() {
        let mut cpu = cpu_with_program(&[0x02]);
        cpu.step().unwrap_err();
        cpu.power_on().unwrap();
        assert_eq!(cpu.phase(), &Phase::PoweredOn);
        assert_eq!(cpu.cycles(), 0);
    }

    #[test]
    fn missing_cycle_count_rejected_before_effect() {
        let mut cpu = cpu_with_program(&[0x55]);
        cpu.state_mut().pc = 0x8001; // as if $A9 were fetched from $8000
        let entry = Opcode::new("LDA", immediate, lda, 0);
        let err = cpu.execute(0xA9, &entry).unwrap_err();
        assert_eq!(
            err,
            CpuError::MissingCycleCount {
                opcode: 0xA9,
                pc: 0x8000
            }
        );
        assert_eq!(cpu.state().a, 0x00);
        assert_eq!(cpu.state().pc, 0x8001);
        assert!(cpu.is_halted());
    }

    #[test]
    fn powered_off_cpu_refuses_to_run() {
        let mut cpu = Cpu::new(Bus::new());
        assert_eq!(cpu.step(), Err(CpuError::PoweredOff));
        assert_eq!(cpu.reset(), Err(CpuError::PoweredOff));
        assert_eq!(cpu.nmi(), Err(CpuError::PoweredOff));
        assert_eq!(cpu.cycles(), 0);
    }

    #[test]
    fn rom_write_is_a_device_fault() {
        let mut cpu = cpu_with_program(&[0x8D, 0x00, 0x80]);
        match cpu.step() {
            Err(CpuError::Device {
                opcode: 0x8D,
                pc: 0x8000,
                source: DeviceError::ReadOnlyWrite { address: 0x0000, .. },
            }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(cpu.is_halted());
    }

    #[test]
    fn indexed_read_pays_page_penalty() {
        // LDX #$01 ; LDA $00FF,X ; LDA $0010,X
        let mut cpu = cpu_with_program(&[0xA2, 0x01, 0xBD, 0xFF, 0x00, 0xBD, 0x10, 0x00]);
        assert_eq!(cpu.step().unwrap(), 2);
        assert_eq!(cpu.step().unwrap(), 5);
        assert_eq!(cpu.step().unwrap(), 4);
    }

    #[test]
    fn store_pays_no_dynamic_penalty() {
        // LDX #$01 ; STA $00FF,X
        let mut cpu = cpu_with_program(&[0xA2, 0x01, 0x9D, 0xFF, 0x00]);
        cpu.step().unwrap();
        assert_eq!(cpu.step().unwrap(), 5);
    }

    #[test]
    fn branch_cycles() {
        // BNE +2 (taken, power-on Z is clear) ; two NOPs skipped ; BEQ +0 (not taken)
        let mut cpu = cpu_with_program(&[0xD0, 0x02, 0xEA, 0xEA, 0xF0, 0x00]);
        assert_eq!(cpu.step().unwrap(), 3);
        assert_eq!(cpu.state().pc, 0x8004);
        assert_eq!(cpu.step().unwrap(), 2);
        assert_eq!(cpu.state().pc, 0x8006);
    }

    #[test]
    fn jsr_and_rts() {
        // $8000: JSR $8010 ; $8003: NOP ... $8010: RTS
        let mut program = vec![0xEA; 0x11];
        program[0] = 0x20;
        program[1] = 0x10;
        program[2] = 0x80;
        program[0x10] = 0x60;
        let mut cpu = cpu_with_program(&program);
        assert_eq!(cpu.step().unwrap(), 6);
        assert_eq!(cpu.state().pc, 0x8010);
        assert_eq!(cpu.state().sp, 0xFB);
        assert_eq!(cpu.step().unwrap(), 6);
        assert_eq!(cpu.state().pc, 0x8003);
        assert_eq!(cpu.state().sp, 0xFD);
    }

    #[test]
    fn run_executes_requested_steps() {
        let mut cpu = cpu_with_program(&[]);
        cpu.run(10).unwrap();
        assert_eq!(cpu.cycles(), 20);
        assert_eq!(cpu.state().pc, 0x800A);
    }

    #[test]
    fn run_stops_at_fault() {
        let mut cpu = cpu_with_program(&[0xEA, 0xEA, 0x02]);
        let err = cpu.run(100).unwrap_err();
        assert!(matches!(err, CpuError::UnimplementedOpcode { pc: 0x8002, .. }));
        assert_eq!(cpu.cycles(), 4);
    }

    #[test]
    fn nmi_pushes_state_and_vectors() {
        let mut cpu = cpu_with_program(&[]);
        cpu.state_mut().pc = 0x8123;
        cpu.state_mut().status = 0x00;
        assert_eq!(cpu.nmi().unwrap(), 7);
        assert_eq!(cpu.state().pc, 0x8000);
        assert!(cpu.state().is_flag_set(IRQ_DISABLE));
        assert_eq!(cpu.state().sp, 0xFA);

        let bus = cpu.bus_mut();
        assert_eq!(bus.read(0x01FD), 0x81);
        assert_eq!(bus.read(0x01FC), 0x23);
        assert_eq!(bus.read(0x01FB), UNUSED);
        assert_eq!(bus.read(0x01FB) & BREAK, 0);
    }

    #[test]
    fn irq_respects_interrupt_disable() {
        let mut cpu = cpu_with_program(&[]);
        assert!(cpu.state().is_flag_set(IRQ_DISABLE));
        assert_eq!(cpu.irq().unwrap(), 0);
        assert_eq!(cpu.state().sp, 0xFD);

        cpu.state_mut().clear_flag_bit(IRQ_DISABLE);
        assert_eq!(cpu.irq().unwrap(), 7);
        assert_eq!(cpu.cycles(), 7);
    }

    #[test]
    fn step_charges_table_cycles_per_mode() {
        // (program, X, Y, cycles, PC after)
        let cases: &[(&[u8], u8, u8, u32, u16)] = &[
            (&[0xE8], 0, 0, 2, 0x8001),             // INX implied
            (&[0x0A], 0, 0, 2, 0x8001),             // ASL A
            (&[0xA9, 0x01], 0, 0, 2, 0x8002),       // LDA #
            (&[0xA5, 0x10], 0, 0, 3, 0x8002),       // LDA zp
            (&[0xB5, 0x10], 1, 0, 4, 0x8002),       // LDA zp,X
            (&[0xB6, 0x10], 0, 1, 4, 0x8002),       // LDX zp,Y
            (&[0x96, 0x10], 0, 1, 4, 0x8002),       // STX zp,Y
            (&[0xE6, 0x10], 0, 0, 5, 0x8002),       // INC zp
            (&[0xAD, 0x00, 0x02], 0, 0, 4, 0x8003), // LDA abs
            (&[0x4E, 0x00, 0x02], 0, 0, 6, 0x8003), // LSR abs
            (&[0xBD, 0x00, 0x02], 1, 0, 4, 0x8003), // LDA abs,X
            (&[0xBD, 0xFF, 0x02], 1, 0, 5, 0x8003), // LDA abs,X across a page
            (&[0xB9, 0xFF, 0x02], 0, 1, 5, 0x8003), // LDA abs,Y across a page
            (&[0x99, 0xFF, 0x02], 0, 1, 5, 0x8003), // STA abs,Y
            (&[0xDE, 0xFF, 0x02], 1, 0, 7, 0x8003), // DEC abs,X
            (&[0xA1, 0x10], 0, 0, 6, 0x8002),       // LDA (zp,X)
            (&[0xB1, 0x10], 0, 0, 5, 0x8002),       // LDA (zp),Y
            (&[0xB1, 0x10], 0, 1, 6, 0x8002),       // LDA (zp),Y across a page
            (&[0x91, 0x10], 0, 1, 6, 0x8002),       // STA (zp),Y
            (&[0xF0, 0x05], 0, 0, 2, 0x8002),       // BEQ not taken
            (&[0x4C, 0x34, 0x12], 0, 0, 3, 0x1234), // JMP abs
            (&[0x6C, 0x20, 0x00], 0, 0, 5, 0x02FF), // JMP (ind)
            (&[0x24, 0x10], 0, 0, 3, 0x8002),       // BIT zp
            (&[0x48], 0, 0, 3, 0x8001),             // PHA
            (&[0x08], 0, 0, 3, 0x8001),             // PHP
            (&[0x68], 0, 0, 4, 0x8001),             // PLA
            (&[0x28], 0, 0, 4, 0x8001),             // PLP
            (&[0x00], 0, 0, 7, 0x8000),             // BRK
        ];
        for &(program, x, y, cycles, pc) in cases {
            let mut cpu = cpu_with_program(program);
            {
                let bus = cpu.bus_mut();
                // ($10) and ($20) both point at $02FF.
                for ptr in [0x10, 0x20] {
                    bus.write(ptr, 0xFF).unwrap();
                    bus.write(ptr + 1, 0x02).unwrap();
                }
            }
            cpu.state_mut().x = x;
            cpu.state_mut().y = y;
            let code = program[0];
            assert_eq!(cpu.step().unwrap(), cycles, "opcode {code:02X}");
            assert_eq!(cpu.state().pc, pc, "opcode {code:02X}");
        }
    }

    #[test]
    fn branch_opcodes_test_their_flag() {
        // (opcode, flag, taken when set)
        let cases = [
            (0x90, CARRY, false),
            (0xB0, CARRY, true),
            (0xD0, ZERO, false),
            (0xF0, ZERO, true),
            (0x10, NEGATIVE, false),
            (0x30, NEGATIVE, true),
            (0x50, OVERFLOW, false),
            (0x70, OVERFLOW, true),
        ];
        for (code, flag, when_set) in cases {
            for set in [false, true] {
                let mut cpu = cpu_with_program(&[code, 0x10]);
                cpu.state_mut().status = if set { flag | UNUSED } else { UNUSED };
                let cycles = cpu.step().unwrap();
                let want = if set == when_set { (0x8012, 3) } else { (0x8002, 2) };
                assert_eq!((cpu.state().pc, cycles), want, "opcode {code:02X} set={set}");
            }
        }
    }

    #[test]
    fn alu_and_transfer_program() {
        let mut cpu = cpu_with_program(&[
            0xA9, 0xF0, // LDA #$F0
            0x29, 0x3C, // AND #$3C  -> $30
            0x09, 0x03, // ORA #$03  -> $33
            0x49, 0xFF, // EOR #$FF  -> $CC
            0xAA, // TAX
            0xCA, // DEX       X=$CB
            0xA8, // TAY
            0x88, // DEY       Y=$CB
            0x8A, // TXA
            0x4A, // LSR A     A=$65, C=1
            0xE0, 0xCB, // CPX #$CB  Z=1
            0xC0, 0xCC, // CPY #$CC  C=0, N=1
            0x9A, // TXS       SP=$CB
            0xBA, // TSX
            0x98, // TYA       A=$CB
            0xE8, // INX       X=$CC
            0xC8, // INY       Y=$CC
        ]);

        cpu.run(10).unwrap();
        assert_eq!(cpu.state().a, 0x65);
        assert!(cpu.state().is_flag_set(CARRY));
        cpu.run(1).unwrap();
        assert!(cpu.state().is_flag_set(ZERO));
        cpu.run(6).unwrap();

        let s = cpu.state();
        assert_eq!((s.a, s.x, s.y, s.sp), (0xCB, 0xCC, 0xCC, 0xCB));
        assert!(!s.is_flag_set(CARRY));
        assert!(s.is_flag_set(NEGATIVE));
        assert_eq!(cpu.cycles(), 17 * 2);
    }

    #[test]
    fn interrupt_fault_reports_its_kind() {
        // Stack page is ROM, so pushing the return address fails.
        let mut bus = Bus::new();
        bus.add_device(Box::new(Memory::ram("RAM", 0x100)), 0x0000, 0x00FF)
            .unwrap();
        bus.add_device(Box::new(Memory::rom("STACK ROM", vec![0; 0x100])), 0x0100, 0x01FF)
            .unwrap();
        let mut cpu = Cpu::new(bus);
        cpu.power_on().unwrap();

        match cpu.nmi() {
            Err(CpuError::Interrupt {
                kind: InterruptKind::Nmi,
                source: DeviceError::ReadOnlyWrite { address: 0x00FD, .. },
            }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(cpu.is_halted());
    }
}
