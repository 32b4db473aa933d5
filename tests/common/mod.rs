#![allow(dead_code)] // not every test binary uses every helper

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use mac_128k::cpu::Cpu;
use mac_128k::memory::ram::Ram;
use mac_128k::{Machine, MachineConfig};

/// Records what the machine does to the CPU side.
#[derive(Default)]
pub struct TestCpu {
  pub irq_edges: RefCell<Vec<(u32, bool)>>,
  pub a_regs: [Cell<u32>; 8],
  pub d0: Cell<u32>,
  pub resets: Cell<u32>,
}

impl Cpu for TestCpu {
  fn set_irq(&self, level: u32, asserted: bool) {
    self.irq_edges.borrow_mut().push((level, asserted));
  }

  fn addr_reg(&self, index: u8) -> u32 {
    self.a_regs[index as usize].get()
  }

  fn set_data_reg(&self, index: u8, value: u32) {
    assert_eq!(index, 0);
    self.d0.set(value);
  }

  fn reset(&self) {
    self.resets.set(self.resets.get() + 1);
  }

  fn last_pc(&self) -> u32 {
    0x40_0e12
  }

  fn describe(&self) -> String {
    String::from("<register dump>")
  }
}

pub fn test_rom(size: usize) -> Vec<u8> {
  // Nonzero everywhere zeroed RAM could be mistaken for it
  (0..size).map(|i| (i as u8) ^ (i >> 8) as u8 ^ 0x5a).collect()
}

pub fn machine(discs: [Option<mac_128k::DiscDescr>; 2]) -> (Machine, Rc<TestCpu>) {
  let cpu = Rc::new(TestCpu::default());
  let config = MachineConfig {
    rom: test_rom(0x1000),
    ram: Ram::new(0x8000),
    discs,
  };
  (Machine::new(config, cpu.clone()), cpu)
}

/// Address of VIA register `r` as the ROM addresses them.
pub fn via_reg(r: u32) -> u32 {
  0xef_e1fe | r << 9
}

// SCC control addresses: reads decode in the 0x9xxxxx page, writes in
// the 0xbxxxxx page.
pub const SCC_RD_CTL_B: u32 = 0x9f_fff8;
pub const SCC_RD_CTL_A: u32 = 0x9f_fffa;
pub const SCC_WR_CTL_B: u32 = 0xbf_fff8;
pub const SCC_WR_CTL_A: u32 = 0xbf_fffa;
