// 6522 VIA, as the compact Mac wires it.
//
// Port A drives the overlay and sound/video page selects; port B
// carries the mouse quadrature and button plus RTC lines; the shift
// register clocks bytes to and from the keyboard over CB1/CB2.  The
// timers are register storage only.

const VIA_RB: usize = 0;
const VIA_RA: usize = 1;
const VIA_DDRB: usize = 2;
const VIA_DDRA: usize = 3;
const VIA_SR: usize = 10;
const VIA_ACR: usize = 11;
const VIA_PCR: usize = 12;
const VIA_IFR: usize = 13;
const VIA_IER: usize = 14;
const VIA_RA_ALT: usize = 15; // No-handshake version

// IFR/IER bit assignment:
// 6 Timer 1
// 5 Timer 2
// 4 Keyboard clock
// 3 Keyboard data bit
// 2 Keyboard data ready (shift register)
// 1 CA2: Vertical blanking interrupt
// 0 CA1: One-second interrupt
pub const VIA_IRQ_CA1: u8 = 0x01;
pub const VIA_IRQ_CA2: u8 = 0x02;
pub const VIA_IRQ_SR: u8 = 0x04;

const REG_NAMES: [&str; 16] = [
  "RB", "RA", "DDRB", "DDRA", "T1CL", "T1CH", "T1LL", "T1LH", "T2CL", "T2CH",
  "SR", "ACR", "PCR", "IFR", "IER", "RA_ALT",
];

/// The world beyond the VIA's pins.
pub trait Ports {
  // Output register changed (only called when bits actually flip)
  fn ra_change(&mut self, value: u8);
  fn rb_change(&mut self, value: u8);
  // Sample the input pins
  fn ra_in(&mut self) -> u8;
  fn rb_in(&mut self) -> u8;
  // A shift-register byte finished clocking out
  fn sr_tx(&mut self, value: u8);
  // IRQ line edge
  fn irq_set(&mut self, asserted: bool);
}

pub struct Via<P: Ports> {
  regs: [u8; 16],
  irq_active: u8,
  irq_enable: u8,
  irq_line: bool,
  sr_tx_pending: Option<u8>,
  ports: P,
}

impl<P: Ports> Via<P> {
  pub fn new(ports: P) -> Self {
    let mut regs = [0u8; 16];
    regs[VIA_RA] = 0x10; // Overlay set out of reset
    Via { regs, irq_active: 0, irq_enable: 0, irq_line: false, sr_tx_pending: None, ports }
  }

  // A[12:9] select regs
  const fn reg(address: u32) -> usize {
    (address as usize >> 9) & 0xf
  }

  fn update_rega(&mut self, data: u8) {
    if self.regs[VIA_RA] ^ data != 0 {
      self.ports.ra_change(data);
    }
  }

  fn update_regb(&mut self, data: u8) {
    if self.regs[VIA_RB] ^ data != 0 {
      self.ports.rb_change(data);
    }
  }

  fn update_sr(&mut self, data: u8) {
    // Mac assumption: SR is active when the ACR SR mode selects an
    // external clock.
    if self.regs[VIA_ACR] & 0x1c == 0x1c {
      if let Some(old) = self.sr_tx_pending {
        log::debug!("SR send whilst send ({old:#04x}) active!");
      }
      // The ROM waits for the IRQ that says the byte went out, then
      // expects a response (but not too soon).  Park the byte; the
      // transmit callback runs when the SR IRQ is acknowledged.
      self.sr_tx_pending = Some(data);
      self.irq_active |= VIA_IRQ_SR;
    } else if self.regs[VIA_ACR] & 0x1c == 0x18 {
      // A byte of zeroes fuelled by phi2: the Mac's way of pulling
      // KbdData low to get the keyboard's attention.  The datasheet
      // implies SRMC=110 completion should raise the SR IRQ too, but
      // empirically the ROM doesn't expect one.
      log::trace!("SR send (val {data:#04x})");
      self.regs[VIA_SR] = 0;
    }
  }

  // Runs when the SR interrupt is acknowledged, i.e. the Mac has seen
  // the last TX/RX.  Pacing the transmit callback off the ack keeps a
  // response from racing the IRQ that reports the TX completed.
  fn sr_done(&mut self) {
    if let Some(data) = self.sr_tx_pending.take() {
      self.ports.sr_tx(data);
    }
  }

  fn assess_irq(&mut self) {
    let active = self.irq_enable & self.irq_active & 0x7f;
    let irq = active != 0;
    if irq != self.irq_line {
      log::trace!("VIA IRQ {} (active {active:#04x})", if irq { "asserted" } else { "dropped" });
      self.ports.irq_set(irq);
      self.irq_line = irq;
    }
  }

  pub fn write(&mut self, address: u32, data: u8) {
    let r = Self::reg(address);
    log::trace!("write {data:#04x} -> VIA {}", REG_NAMES[r]);

    let mut target = r;
    let mut dowrite = true;
    match r {
      VIA_RA | VIA_RA_ALT => {
        self.update_rega(data);
        target = VIA_RA;
      },
      VIA_RB => self.update_regb(data),
      VIA_DDRA | VIA_DDRB => {},
      VIA_SR => {
        self.update_sr(data);
        dowrite = false;
      },
      VIA_IER => {
        if data & 0x80 != 0 {
          self.irq_enable |= data & 0x7f;
        } else {
          self.irq_enable &= !(data & 0x7f);
        }
      },
      VIA_IFR => {
        let which_acked = self.irq_active & data;
        self.irq_active &= !data;
        // An SR ack means a TX or RX is complete; that can trigger
        // further actions.
        if which_acked & VIA_IRQ_SR != 0 {
          self.sr_done();
        }
      },
      VIA_PCR => {},
      _ => log::trace!("unhandled write {data:#04x} to VIA {}", REG_NAMES[r]),
    }

    if dowrite {
      self.regs[target] = data;
    }
    self.assess_irq();
  }

  fn read_ifr(&self) -> u8 {
    let active = self.irq_enable & self.irq_active & 0x7f;
    self.irq_active | if active != 0 { 0x80 } else { 0 }
  }

  fn read_rega(&mut self) -> u8 {
    let data = self.ports.ra_in();
    let ddr = self.regs[VIA_DDRA];
    // DDR=1 is output, so take the ORA version
    (ddr & self.regs[VIA_RA]) | (!ddr & data)
  }

  fn read_regb(&mut self) -> u8 {
    let data = self.ports.rb_in();
    let ddr = self.regs[VIA_DDRB];
    (ddr & self.regs[VIA_RB]) | (!ddr & data)
  }

  pub fn read(&mut self, address: u32) -> u8 {
    let r = Self::reg(address);
    let data = match r {
      VIA_RA | VIA_RA_ALT => self.read_rega(),
      VIA_RB => self.read_regb(),
      VIA_SR => {
        self.irq_active &= !VIA_IRQ_SR;
        self.regs[VIA_SR]
      },
      VIA_IER => 0x80 | self.irq_enable,
      VIA_IFR => self.read_ifr(),
      _ => {
        log::warn!("unhandled read of VIA {}", REG_NAMES[r]);
        self.regs[r]
      },
    };
    log::trace!("read VIA {} -> {data:#04x}", REG_NAMES[r]);
    self.assess_irq();
    data
  }

  /// External world pipes CA1/CA2 events (passage of time) in here.
  pub fn ca_event(&mut self, ca: u8) {
    match ca {
      1 => self.irq_active |= VIA_IRQ_CA1,
      2 => self.irq_active |= VIA_IRQ_CA2,
      _ => {},
    }
    self.assess_irq();
  }

  /// Deliver a byte into the shift register (keyboard response).
  pub fn sr_rx(&mut self, val: u8) {
    // Only receive if the SR config in ACR is set to external clock
    // (again, a Mac assumption):
    if self.regs[VIA_ACR] & 0x1c == 0x0c {
      log::trace!("SR rx {val:#04x}, IRQ pending");
      self.regs[VIA_SR] = val;
      self.irq_active |= VIA_IRQ_SR;
      self.assess_irq();
    } else {
      log::trace!("ACR SR state {:#04x}, not receiving", self.regs[VIA_ACR]);
    }
  }

  /// Time param in us.
  pub fn tick(&mut self, _time: u64) {
    // FIXME: support actual timers
  }
}

#[cfg(test)]
#[derive(Default)]
struct TestPorts {
  ra: u8,
  rb_in: u8,
  ra_changes: Vec<u8>,
  sr_sent: Vec<u8>,
  irq_edges: Vec<bool>,
}

#[cfg(test)]
impl Ports for TestPorts {
  fn ra_change(&mut self, value: u8) { self.ra_changes.push(value); }
  fn rb_change(&mut self, _value: u8) {}
  fn ra_in(&mut self) -> u8 { self.ra }
  fn rb_in(&mut self) -> u8 { self.rb_in }
  fn sr_tx(&mut self, value: u8) { self.sr_sent.push(value); }
  fn irq_set(&mut self, asserted: bool) { self.irq_edges.push(asserted); }
}

#[cfg(test)]
fn reg_addr(r: usize) -> u32 {
  0xef_e1fe | (r as u32) << 9
}

#[test]
fn ier_set_clear_convention() {
  let mut via = Via::new(TestPorts::default());
  via.write(reg_addr(VIA_IER), 0x80 | 0x05);
  assert_eq!(via.read(reg_addr(VIA_IER)), 0x85);
  via.write(reg_addr(VIA_IER), 0x04); // bit 7 clear: mask out
  assert_eq!(via.read(reg_addr(VIA_IER)), 0x81);
}

#[test]
fn ca_events_raise_and_ack() {
  let mut via = Via::new(TestPorts::default());
  via.write(reg_addr(VIA_IER), 0x80 | VIA_IRQ_CA1 | VIA_IRQ_CA2);
  via.ca_event(1);
  assert_eq!(via.ports.irq_edges, vec![true]);
  via.ca_event(2); // already asserted, no second edge
  assert_eq!(via.ports.irq_edges, vec![true]);
  assert_eq!(via.read(reg_addr(VIA_IFR)), 0x80 | VIA_IRQ_CA1 | VIA_IRQ_CA2);
  via.write(reg_addr(VIA_IFR), VIA_IRQ_CA1);
  assert_eq!(via.ports.irq_edges, vec![true]); // CA2 still pending
  via.write(reg_addr(VIA_IFR), VIA_IRQ_CA2);
  assert_eq!(via.ports.irq_edges, vec![true, false]);
}

#[test]
fn masked_flags_do_not_interrupt() {
  let mut via = Via::new(TestPorts::default());
  via.ca_event(1);
  assert!(via.ports.irq_edges.is_empty());
  // Flag visible in IFR, but bit 7 stays clear while masked
  assert_eq!(via.read(reg_addr(VIA_IFR)), VIA_IRQ_CA1);
  via.write(reg_addr(VIA_IER), 0x80 | VIA_IRQ_CA1);
  assert_eq!(via.ports.irq_edges, vec![true]);
  assert_eq!(via.read(reg_addr(VIA_IFR)), 0x80 | VIA_IRQ_CA1);
}

#[test]
fn sr_transmit_is_paced_by_ack() {
  let mut via = Via::new(TestPorts::default());
  via.write(reg_addr(VIA_IER), 0x80 | VIA_IRQ_SR);
  via.write(reg_addr(VIA_ACR), 0x1c); // shift out under external clock
  via.write(reg_addr(VIA_SR), 0x10);
  // TX interrupt fires at once, but the byte is parked until acked
  assert_eq!(via.ports.irq_edges, vec![true]);
  assert!(via.ports.sr_sent.is_empty());
  via.write(reg_addr(VIA_IFR), VIA_IRQ_SR);
  assert_eq!(via.ports.sr_sent, vec![0x10]);
  assert_eq!(via.ports.irq_edges, vec![true, false]);
}

#[test]
fn sr_attention_kick_is_silent() {
  let mut via = Via::new(TestPorts::default());
  via.write(reg_addr(VIA_IER), 0x80 | VIA_IRQ_SR);
  via.write(reg_addr(VIA_ACR), 0x18);
  via.write(reg_addr(VIA_SR), 0x00);
  assert!(via.ports.irq_edges.is_empty());
  assert!(via.ports.sr_sent.is_empty());
}

#[test]
fn sr_receive_under_external_clock() {
  let mut via = Via::new(TestPorts::default());
  via.write(reg_addr(VIA_IER), 0x80 | VIA_IRQ_SR);
  via.write(reg_addr(VIA_ACR), 0x0c);
  via.sr_rx(0x7b);
  assert_eq!(via.ports.irq_edges, vec![true]);
  // Reading SR clears the flag
  assert_eq!(via.read(reg_addr(VIA_SR)), 0x7b);
  assert_eq!(via.ports.irq_edges, vec![true, false]);

  // Wrong ACR mode: byte is dropped
  via.write(reg_addr(VIA_ACR), 0x1c);
  via.sr_rx(0x42);
  assert_ne!(via.regs[VIA_SR], 0x42);
}

#[test]
fn unmodeled_registers_are_plain_storage() {
  let mut via = Via::new(TestPorts::default());
  const VIA_T1CL: usize = 4;
  via.write(reg_addr(VIA_T1CL), 0x42);
  assert_eq!(via.read(reg_addr(VIA_T1CL)), 0x42);
}

#[test]
fn port_reads_mix_ddr_and_pins() {
  let mut via = Via::new(TestPorts::default());
  via.ports.rb_in = 0b0011_1000;
  via.write(reg_addr(VIA_DDRB), 0b0000_0111);
  via.write(reg_addr(VIA_RB), 0b0000_0101);
  assert_eq!(via.read(reg_addr(VIA_RB)), 0b0011_1101);
}

#[test]
fn port_a_change_callback_fires_on_edges() {
  let mut via = Via::new(TestPorts::default());
  via.write(reg_addr(VIA_RA), 0x10); // same as reset value: no callback
  assert!(via.ports.ra_changes.is_empty());
  via.write(reg_addr(VIA_RA), 0x00); // overlay bit drops
  via.write(reg_addr(VIA_RA_ALT), 0x10);
  assert_eq!(via.ports.ra_changes, vec![0x00, 0x10]);
}
