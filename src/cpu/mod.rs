/*!
cpu::mod - Public façade for the 2A03 CPU core.

```text
    state.rs       - Register file, flag masks and flag helpers.
    addressing.rs  - Addressing-mode resolvers producing an `Operand`.
    execute.rs     - Instruction effects (ALU, stack, RMW, branch, control).
    table.rs       - Static 256-entry `OPCODES` table.
    core/          - `Cpu`: lifecycle, step loop, interrupts.
```

Usage:
```no_run
use nescore::bus::Bus;
use nescore::cpu::Cpu;

let mut cpu = Cpu::new(Bus::new());
cpu.power_on()?;
cpu.step()?;
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/

pub mod addressing;
pub mod core;
pub mod execute;
pub mod state;
pub mod table;

pub use self::core::{Cpu, Phase};
pub use addressing::{AddrFn, Operand};
pub use execute::ExecFn;
pub use state::CpuState;
pub use table::{OPCODES, Opcode};
