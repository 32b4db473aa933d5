// Top level: a Macintosh 128K/512K's worth of periphery around an
// external 68000 core.  The CPU calls in for every bus access; the
// host calls in for time (tick, vsync, one-second) and input.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::cpu::{Cpu, IRQ_SCC, IRQ_VIA};
use crate::devices::{Keyboard, Mouse};
use crate::disc::{DiscDescr, HookResult, SonyDriver, DISC_NUM_DRIVES};
use crate::iwm::Iwm;
use crate::memory::ram::Ram;
use crate::memory::rom::Rom;
use crate::memory::{is_rom, is_test_switches, Region, ADDR_MASK, ROM_BASE};
use crate::scc::{IrqPin, Scc};
use crate::via::{Ports, Via};

/// Time advanced per `tick`, in microseconds.
pub const EXECLOOP_QUANTUM_US: u64 = 5000;

// 512x342 1bpp frame buffer; the "main" screen sits 0x380 short of the
// top of RAM.
const FB_SIZE: usize = 512 * 342 / 8;
const FB_TOP_GAP: usize = 0x380;

/// A bus access the machine can't satisfy.  The 68000 side should
/// treat this as fatal (the real machine would bus-error, and the ROM
/// doesn't expect one).
#[derive(Debug, thiserror::Error)]
pub enum Fault {
  #[error("{access} of {address:#08x} unmapped, PC {pc:#08x}\n{regs}")]
  Unmapped { access: &'static str, address: u32, pc: u32, regs: String },
  #[error("disc driver op {opcode:#04x} unhandled, PC {pc:#08x}\n{regs}")]
  DriverFailed { opcode: u8, pc: u32, regs: String },
}

pub struct MachineConfig {
  pub rom: Vec<u8>,
  pub ram: Ram,
  pub discs: [Option<DiscDescr>; DISC_NUM_DRIVES],
}

// VIA pins, Mac style.  RA4 out is the overlay control; RB4/RB5 in are
// the mouse X/Y quadrature and RB3 the (active-low) button; the shift
// register talks to the keyboard.
struct MacViaPorts {
  overlay: Rc<Cell<bool>>,
  quadbits: Rc<Cell<u8>>,
  pressed: Rc<Cell<bool>>,
  keyboard: Rc<RefCell<Keyboard>>,
  clock: Rc<Cell<u64>>,
  cpu: Rc<dyn Cpu>,
}

impl Ports for MacViaPorts {
  fn ra_change(&mut self, value: u8) {
    let overlay = value & 0x10 != 0;
    if overlay != self.overlay.get() {
      log::trace!("overlay {}", if overlay { "set" } else { "cleared" });
      self.overlay.set(overlay);
    }
  }

  fn rb_change(&mut self, _value: u8) {}

  fn ra_in(&mut self) -> u8 {
    0
  }

  fn rb_in(&mut self) -> u8 {
    self.quadbits.get() | if self.pressed.get() { 0 } else { 1 << 3 }
  }

  fn sr_tx(&mut self, value: u8) {
    self.keyboard.borrow_mut().command(value, self.clock.get());
  }

  fn irq_set(&mut self, asserted: bool) {
    self.cpu.set_irq(IRQ_VIA, asserted);
  }
}

struct SccWire {
  cpu: Rc<dyn Cpu>,
}

impl IrqPin for SccWire {
  fn irq_set(&mut self, asserted: bool) {
    self.cpu.set_irq(IRQ_SCC, asserted);
  }
}

pub struct Machine {
  ram: Ram,
  rom: Rom,
  via: Via<MacViaPorts>,
  scc: Scc<SccWire>,
  iwm: Iwm,
  disc: SonyDriver,
  mouse: Mouse,
  keyboard: Rc<RefCell<Keyboard>>,
  overlay: Rc<Cell<bool>>,
  clock: Rc<Cell<u64>>,
  cpu: Rc<dyn Cpu>,
}

impl Machine {
  pub fn new(config: MachineConfig, cpu: Rc<dyn Cpu>) -> Machine {
    let overlay = Rc::new(Cell::new(true));
    let quadbits = Rc::new(Cell::new(0));
    let pressed = Rc::new(Cell::new(false));
    let keyboard = Rc::new(RefCell::new(Keyboard::new()));
    let clock = Rc::new(Cell::new(0));

    let via = Via::new(MacViaPorts {
      overlay: overlay.clone(),
      quadbits: quadbits.clone(),
      pressed: pressed.clone(),
      keyboard: keyboard.clone(),
      clock: clock.clone(),
      cpu: cpu.clone(),
    });
    let scc = Scc::new(SccWire { cpu: cpu.clone() });
    let mouse = Mouse::new(quadbits, pressed);

    Machine {
      ram: config.ram,
      rom: Rom::new(config.rom),
      via,
      scc,
      iwm: Iwm::new(),
      disc: SonyDriver::new(config.discs),
      mouse,
      keyboard,
      overlay,
      clock,
      cpu,
    }
  }

  fn fault(&self, access: &'static str, address: u32) -> Fault {
    Fault::Unmapped {
      access,
      address: address & ADDR_MASK,
      pc: self.cpu.last_pc(),
      regs: self.cpu.describe(),
    }
  }

  pub fn read_byte(&mut self, address: u32) -> u8 {
    match Region::decode(address, self.overlay.get()) {
      Region::Ram => self.ram.rd8(address),
      Region::Rom => self.rom.rd8(address),
      Region::Via => self.via.read(address),
      Region::Iwm => self.iwm.read(address),
      Region::SccRead => self.scc.read(address),
      Region::Dummy => 0,
      Region::SccWrite | Region::DiscHook | Region::Unknown => {
        log::debug!("RD8 {:#08x} unmapped, 0", address & ADDR_MASK);
        0
      },
    }
  }

  pub fn read_word(&mut self, address: u32) -> Result<u16, Fault> {
    match Region::decode(address, self.overlay.get()) {
      Region::Ram => Ok(self.ram.rd16(address)),
      Region::Rom => Ok(self.rom.rd16(address)),
      // ROM test routines scan up here expecting zeroes
      _ if is_test_switches(address) => Ok(0),
      _ => Err(self.fault("RD16", address)),
    }
  }

  pub fn read_long(&mut self, address: u32) -> Result<u32, Fault> {
    match Region::decode(address, self.overlay.get()) {
      Region::Ram => Ok(self.ram.rd32(address)),
      Region::Rom => Ok(self.rom.rd32(address)),
      _ if is_test_switches(address) => Ok(0),
      _ => Err(self.fault("RD32", address)),
    }
  }

  pub fn write_byte(&mut self, address: u32, value: u8) -> Result<(), Fault> {
    match Region::decode(address, self.overlay.get()) {
      Region::Ram => self.ram.wr8(address, value),
      Region::Via => self.via.write(address, value),
      Region::Iwm => self.iwm.write(address, value),
      Region::SccWrite => self.scc.write(address, value),
      Region::SccRead | Region::Dummy => {
        log::trace!("WR8 {:#08x} dummy, dropped", address & ADDR_MASK)
      },
      Region::DiscHook => {
        match self.disc.pv_hook(value, &mut self.ram, self.cpu.as_ref()) {
          HookResult::Done => {},
          HookResult::Ejected => {
            log::info!("disc ejected, resetting machine");
            self.reset();
          },
          HookResult::Unhandled => {
            return Err(Fault::DriverFailed {
              opcode: value,
              pc: self.cpu.last_pc(),
              regs: self.cpu.describe(),
            });
          },
        }
      },
      Region::Rom | Region::Unknown => {
        log::debug!("WR8 {value:#04x} -> {:#08x} unmapped, dropped", address & ADDR_MASK)
      },
    }
    Ok(())
  }

  pub fn write_word(&mut self, address: u32, value: u16) -> Result<(), Fault> {
    match Region::decode(address, self.overlay.get()) {
      Region::Ram => {
        self.ram.wr16(address, value);
        Ok(())
      },
      Region::Rom | Region::Dummy => {
        log::trace!("WR16 {value:#06x} -> {:#08x} dropped", address & ADDR_MASK);
        Ok(())
      },
      _ => Err(self.fault("WR16", address)),
    }
  }

  pub fn write_long(&mut self, address: u32, value: u32) -> Result<(), Fault> {
    match Region::decode(address, self.overlay.get()) {
      Region::Ram => {
        self.ram.wr32(address, value);
        Ok(())
      },
      Region::Rom | Region::Dummy => {
        log::trace!("WR32 {value:#010x} -> {:#08x} dropped", address & ADDR_MASK);
        Ok(())
      },
      _ => Err(self.fault("WR32", address)),
    }
  }

  /// Instruction fetch: a faster path that only knows RAM and ROM.
  /// Code never executes from I/O space, so anything not ROM is
  /// treated as RAM (and wraps/aliases like RAM does).
  pub fn read_instr(&self, address: u32) -> u16 {
    let a = address & ADDR_MASK;
    if self.overlay.get() {
      if is_rom(a, true) {
        self.rom.rd16(a)
      } else {
        self.ram.rd16(a)
      }
    } else if a & 0xf0_0000 != ROM_BASE {
      self.ram.rd16(a)
    } else {
      self.rom.rd16(a)
    }
  }

  /// Advance device time by one quantum.  Call at roughly 200Hz,
  /// between CPU bursts.
  pub fn tick(&mut self) {
    let now = self.clock.get() + EXECLOOP_QUANTUM_US;
    self.clock.set(now);
    self.via.tick(now);
    self.mouse.tick(&mut self.scc);
    let response = self.keyboard.borrow_mut().poll(now);
    if let Some(data) = response {
      self.via.sr_rx(data);
    }
  }

  /// Vertical blanking, nominally 60.15Hz.  Raises VIA CA2.
  pub fn vsync_event(&mut self) {
    self.via.ca_event(2);
  }

  /// RTC one-second tick.  Raises VIA CA1.
  pub fn one_second_event(&mut self) {
    self.via.ca_event(1);
  }

  pub fn kbd_event(&mut self, scancode: u8, down: bool) {
    self.keyboard.borrow_mut().key_event(scancode, down);
  }

  pub fn mouse_update(&mut self, deltax: i32, deltay: i32, button: bool) {
    self.mouse.update(deltax, deltay, button);
  }

  /// Offset of the frame buffer in RAM.
  pub fn fb_offset(&self) -> usize {
    self.ram.size() - (FB_SIZE + FB_TOP_GAP)
  }

  pub fn ram(&self) -> &Ram {
    &self.ram
  }

  pub fn ram_mut(&mut self) -> &mut Ram {
    &mut self.ram
  }

  /// Back to the reset state: overlay on, CPU reset.  Also the
  /// response to a disc eject, matching what the ROM expects.
  pub fn reset(&mut self) {
    self.overlay.set(true);
    self.cpu.reset();
  }
}
