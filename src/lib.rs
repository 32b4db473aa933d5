pub mod cpu;     // What we need from the external 68000 core
pub mod devices; // Keyboard and mouse front ends
pub mod disc;    // Replacement .Sony floppy driver
pub mod iwm;     // Integrated Woz Machine (stub)
pub mod machine;
pub mod memory;
pub mod scc;     // Z8530 serial controller
pub mod via;     // 6522 Versatile Interface Adapter

pub use cpu::{Cpu, IRQ_SCC, IRQ_VIA};
pub use disc::{DiscData, DiscDescr, DiscOps};
pub use machine::{Fault, Machine, MachineConfig, EXECLOOP_QUANTUM_US};
