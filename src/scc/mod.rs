// 85C30 SCC, modeled just far enough to carry the mouse.
//
// The quadrature phase lines arrive on the DCD pins (channel A = X,
// channel B = Y); each flip raises an external/status interrupt that
// the mouse driver consumes via the channel-B modified vector.  Serial
// data paths are not modeled at all.

pub trait IrqPin {
  fn irq_set(&mut self, asserted: bool);
}

const IE_DCD: u8 = 0x08;

const IP_B_EXT: u8 = 0x01;
const IP_A_EXT: u8 = 0x08;

pub struct Scc<P: IrqPin> {
  reg_ptr: u8,
  vec: u8,
  mie: bool,
  status_hi: bool,
  #[allow(dead_code)] // WR9 bit 5, accepted but acks are not modeled
  read_acks: bool,
  // External-status interrupt enables, [0] = channel B, [1] = channel A
  ie: [u8; 2],
  pending: u8,
  dcd_pins: u8, // bit 0 = A, bit 1 = B
  dcd_a_changed: bool,
  dcd_b_changed: bool,
  irq_line: bool,
  pin: P,
}

impl<P: IrqPin> Scc<P> {
  pub fn new(pin: P) -> Self {
    Scc {
      reg_ptr: 0,
      vec: 0,
      mie: false,
      status_hi: false,
      read_acks: false,
      ie: [0; 2],
      pending: 0,
      dcd_pins: 0,
      dcd_a_changed: false,
      dcd_b_changed: false,
      irq_line: false,
      pin,
    }
  }

  pub fn irq_asserted(&self) -> bool {
    self.irq_line
  }

  /// New state for the DCD pins.  Changes latch regardless of the
  /// interrupt enables.
  pub fn set_dcd(&mut self, a: bool, b: bool) {
    let v = a as u8 | (b as u8) << 1;
    if (v ^ self.dcd_pins) & 1 != 0 {
      self.dcd_a_changed = true;
    }
    if (v ^ self.dcd_pins) & 2 != 0 {
      self.dcd_b_changed = true;
    }
    self.dcd_pins = v;
    self.assess_irq();
  }

  // Promote latched pin changes into pending interrupts, then follow
  // MIE to the IRQ output.  Edges only.
  fn assess_irq(&mut self) {
    if self.dcd_a_changed && self.ie[1] & IE_DCD != 0 {
      self.pending |= IP_A_EXT;
      self.dcd_a_changed = false;
    }
    if self.dcd_b_changed && self.ie[0] & IE_DCD != 0 {
      self.pending |= IP_B_EXT;
      self.dcd_b_changed = false;
    }

    let irq = self.pending != 0 && self.mie;
    if irq != self.irq_line {
      self.pin.irq_set(irq);
      self.irq_line = irq;
    }
  }

  // WR0: register pointer, command
  fn wr0(&mut self, data: u8) {
    self.reg_ptr = data & 7;
    let cmd = (data & 0x38) >> 3;
    match cmd {
      0 => {},
      1 => self.reg_ptr |= 8, // Point high
      _ => log::trace!("SCC WR0 command {cmd} unhandled"),
    }
  }

  // WR9: master interrupt control
  fn wr9(&mut self, data: u8) {
    self.mie = data & 0x08 != 0;
    self.read_acks = data & 0x20 != 0;
    self.status_hi = data & 0x10 != 0;
  }

  // RR0: external status
  fn rr0(&self, a_nb: usize) -> u8 {
    // [3] reports the /DCD pin state for the channel
    let dcd = if a_nb != 0 { self.dcd_pins & 1 } else { self.dcd_pins & 2 };
    let mut v = if dcd != 0 { 0x08 } else { 0 };
    v |= 0x10; // Sync/Hunt
    v |= 0x40; // TxUnderrun/EOM
    v
  }

  // RR2: raw vector from channel A; the channel-B read hands out the
  // modified vector and consumes the highest pending external source.
  fn rr2(&mut self, a_nb: usize) -> u8 {
    if a_nb != 0 {
      return self.vec;
    }

    // status bits: B external = 001, A external = 101
    let v = if self.pending & IP_A_EXT != 0 {
      self.pending &= !IP_A_EXT;
      5
    } else if self.pending & IP_B_EXT != 0 {
      self.pending &= !IP_B_EXT;
      1
    } else {
      0
    };
    if self.status_hi {
      (self.vec & 0x8f) | v << 4
    } else {
      (self.vec & 0xf1) | v << 1
    }
  }

  pub fn write(&mut self, address: u32, data: u8) {
    let r = (address >> 1) & 3;
    let a_nb = (r & 1) as usize;
    let d_nc = r & 2 != 0;

    if d_nc {
      log::trace!("SCC data write ({}) ignored", channel_name(a_nb));
    } else {
      log::trace!("write {data:#04x} -> SCC WR{}{}", self.reg_ptr, channel_name(a_nb));
      match self.reg_ptr {
        0 => self.wr0(data),
        2 => {
          self.vec = data;
          self.reg_ptr = 0;
        },
        3 => {
          // Receive parameters; hunt-mode entry needs no action here
          self.reg_ptr = 0;
        },
        9 => {
          self.wr9(data);
          self.reg_ptr = 0;
        },
        15 => {
          self.ie[a_nb] = data;
          self.reg_ptr = 0;
        },
        ptr => {
          log::trace!("unhandled write {data:#04x} to SCC WR{ptr}");
          self.reg_ptr = 0;
        },
      }
    }
    self.assess_irq();
  }

  pub fn read(&mut self, address: u32) -> u8 {
    let r = (address >> 1) & 3;
    let a_nb = (r & 1) as usize;
    let d_nc = r & 2 != 0;

    let mut data = 0;
    if d_nc {
      log::trace!("SCC data read ({}) ignored", channel_name(a_nb));
    } else {
      data = match self.reg_ptr {
        0 => self.rr0(a_nb),
        1 => 0x01 /* All sent */ | 0x06 /* SDLC residue after reset */,
        2 => self.rr2(a_nb),
        // RR3: interrupt pending, channel A only
        3 => if a_nb != 0 { self.pending } else { 0 },
        15 => self.ie[a_nb] & 0xfa,
        ptr => {
          log::trace!("unhandled read of SCC RR{ptr}");
          0
        },
      };
      log::trace!("read SCC RR{}{} -> {data:#04x}", self.reg_ptr, channel_name(a_nb));
    }
    // Reads always reset the pointer
    self.reg_ptr = 0;
    data
  }
}

fn channel_name(a_nb: usize) -> char {
  if a_nb != 0 { 'A' } else { 'B' }
}

#[cfg(test)]
#[derive(Default)]
struct TestPin {
  edges: Vec<bool>,
}

#[cfg(test)]
impl IrqPin for TestPin {
  fn irq_set(&mut self, asserted: bool) {
    self.edges.push(asserted);
  }
}

// Control addresses: A[1] selects channel (set = A), A[2] set = data.
#[cfg(test)]
const CTL_A: u32 = 0x9f_fffa;
#[cfg(test)]
const CTL_B: u32 = 0x9f_fff8;

#[cfg(test)]
fn write_reg<P: IrqPin>(scc: &mut Scc<P>, channel: u32, reg: u8, data: u8) {
  let ptr_cmd = if reg >= 8 { (reg & 7) | 0x08 } else { reg };
  scc.write(channel, ptr_cmd);
  scc.write(channel, data);
}

#[cfg(test)]
fn setup_mouse_scc() -> Scc<TestPin> {
  let mut scc = Scc::new(TestPin::default());
  write_reg(&mut scc, CTL_A, 2, 0x40); // vector
  write_reg(&mut scc, CTL_A, 15, IE_DCD);
  write_reg(&mut scc, CTL_B, 15, IE_DCD);
  write_reg(&mut scc, CTL_A, 9, 0x08); // MIE
  scc
}

#[test]
fn pointer_auto_resets() {
  let mut scc = Scc::new(TestPin::default());
  write_reg(&mut scc, CTL_A, 2, 0x40);
  assert_eq!(scc.vec, 0x40);
  // The pointer reset after the data write, so the next write is a
  // pointer/command write again; point-high selects the upper bank
  write_reg(&mut scc, CTL_A, 15, 0xff);
  assert_eq!(scc.ie[1], 0xff);
  assert_eq!(scc.ie[0], 0);
  scc.write(CTL_A, 0x0f); // point high -> RR15
  assert_eq!(scc.read(CTL_A), 0xff & 0xfa);
  // Reads reset the pointer too: this one is RR0
  assert_eq!(scc.read(CTL_A), scc.rr0(1));
}

#[test]
fn dcd_edge_interrupts_when_enabled() {
  let mut scc = setup_mouse_scc();
  assert!(!scc.irq_asserted());
  scc.set_dcd(true, false);
  assert!(scc.irq_asserted());
  assert_eq!(scc.pin.edges, vec![true]);
  // Same pin state again: no new latch, no edge
  scc.set_dcd(true, false);
  assert_eq!(scc.pin.edges, vec![true]);
}

#[test]
fn dcd_edge_without_mie_stays_quiet() {
  let mut scc = Scc::new(TestPin::default());
  write_reg(&mut scc, CTL_A, 15, IE_DCD);
  scc.set_dcd(true, false);
  assert!(!scc.irq_asserted());
  // Pending was promoted though, and MIE releases it
  write_reg(&mut scc, CTL_A, 9, 0x08);
  assert!(scc.irq_asserted());
}

#[test]
fn latched_change_waits_for_enable() {
  let mut scc = Scc::new(TestPin::default());
  write_reg(&mut scc, CTL_A, 9, 0x08); // MIE only, DCD IE off
  scc.set_dcd(true, false);
  assert!(!scc.irq_asserted());
  // Enabling DCD interrupts afterwards promotes the stale latch
  write_reg(&mut scc, CTL_A, 15, IE_DCD);
  assert!(scc.irq_asserted());
}

#[test]
fn modified_vector_consumes_pending() {
  let mut scc = setup_mouse_scc();
  scc.set_dcd(true, true);
  assert!(scc.irq_asserted());

  // RR3 on A shows both external sources
  scc.write(CTL_A, 3);
  assert_eq!(scc.read(CTL_A), IP_A_EXT | IP_B_EXT);

  // Channel B RR2 hands out A-ext first (101 in the status field)
  scc.write(CTL_B, 2);
  assert_eq!(scc.read(CTL_B), (0x40 & 0xf1) | 5 << 1);
  // then B-ext
  scc.write(CTL_B, 2);
  assert_eq!(scc.read(CTL_B), (0x40 & 0xf1) | 1 << 1);
  // then the idle pattern; draining pending does not drop the line
  // by itself -- that happens on the next write or DCD update
  scc.write(CTL_B, 2);
  assert_eq!(scc.read(CTL_B), 0x40 & 0xf1);
  scc.write(CTL_B, 0);
  assert!(!scc.irq_asserted());

  // Channel A RR2 is always the raw vector
  scc.write(CTL_A, 2);
  assert_eq!(scc.read(CTL_A), 0x40);
}

#[test]
fn status_high_moves_the_field() {
  let mut scc = setup_mouse_scc();
  write_reg(&mut scc, CTL_A, 9, 0x08 | 0x10); // MIE + status high
  scc.set_dcd(true, false);
  scc.write(CTL_B, 2);
  assert_eq!(scc.read(CTL_B), (0x40 & 0x8f) | 5 << 4);
}

#[test]
fn rr0_reflects_pins() {
  let mut scc = setup_mouse_scc();
  scc.set_dcd(true, false);
  scc.write(CTL_A, 0);
  assert_eq!(scc.read(CTL_A), 0x08 | 0x10 | 0x40);
  scc.write(CTL_B, 0);
  assert_eq!(scc.read(CTL_B), 0x10 | 0x40);
}
