// Capability surface of the external 68000 core.
//
// The emulator proper doesn't execute instructions; it decodes bus
// accesses and models the periphery.  Whatever drives it (a Musashi
// binding, a test harness) exposes the CPU via this trait.

/// VIA interrupts arrive on level 1.
pub const IRQ_VIA: u32 = 1;
/// SCC interrupts arrive on level 2.
pub const IRQ_SCC: u32 = 2;

pub trait Cpu {
  /// Assert or release a virtual IRQ line.  Devices only call this on
  /// edges, never to re-state a level.  All interrupts are
  /// auto-vectored; an acknowledge cycle must resolve to the 68000
  /// autovector for `level`.
  fn set_irq(&self, level: u32, asserted: bool);

  /// Read address register An.
  fn addr_reg(&self, index: u8) -> u32;

  /// Write data register Dn.
  fn set_data_reg(&self, index: u8, value: u32);

  /// Pulse the RESET line.
  fn reset(&self);

  /// PC of the most recently executed instruction, for fault reports.
  fn last_pc(&self) -> u32;

  /// Register dump for fault reports.
  fn describe(&self) -> String;
}
