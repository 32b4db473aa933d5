// Mouse quadrature synthesis.
//
// X/Y quadrature signal pairs are wired to VIA port B bit 4 / SCC
// DCD_A (X) and port B bit 5 / SCC DCD_B (Y).  The VIA side isn't
// sampled until the SCC interrupt fires, so one step can toggle the
// DCD phase and set the VIA bit equal or opposite to it in one go --
// equal vs opposite encodes the direction.

use std::cell::Cell;
use std::rc::Rc;

use crate::scc::{IrqPin, Scc};

pub const MOUSE_MAX_PENDING_PIX: i32 = 30;

pub struct Mouse {
  pending_dx: i32,
  pending_dy: i32,
  dcd_a: bool,
  dcd_b: bool,
  // Shared with the VIA port B input sampler
  quadbits: Rc<Cell<u8>>,
  pressed: Rc<Cell<bool>>,
}

impl Mouse {
  pub fn new(quadbits: Rc<Cell<u8>>, pressed: Rc<Cell<bool>>) -> Self {
    Mouse { pending_dx: 0, pending_dy: 0, dcd_a: false, dcd_b: false, quadbits, pressed }
  }

  /// Movement (X right-positive, Y up-positive) and button input.
  /// Deltas accumulate but are clamped, so stale motion can't stack up
  /// faster than the quadrature can play it out.
  pub fn update(&mut self, deltax: i32, deltay: i32, button: bool) {
    self.pending_dx =
      (self.pending_dx + deltax).clamp(-MOUSE_MAX_PENDING_PIX, MOUSE_MAX_PENDING_PIX);
    self.pending_dy =
      (self.pending_dy + deltay).clamp(-MOUSE_MAX_PENDING_PIX, MOUSE_MAX_PENDING_PIX);
    // The button isn't rate-limited
    self.pressed.set(button);
  }

  /// Play out at most one quadrature step per axis.  A step posts an
  /// SCC interrupt, so no new step starts while one is still pending
  /// -- the OS handler hasn't consumed the last DCD event yet.
  pub fn tick<P: IrqPin>(&mut self, scc: &mut Scc<P>) {
    if self.pending_dx == 0 && self.pending_dy == 0 {
      return;
    }
    if scc.irq_asserted() {
      return;
    }

    let mut qb = self.quadbits.get();

    if self.pending_dx != 0 {
      self.dcd_a = !self.dcd_a;
      qb = (qb & !0x10) | if (self.pending_dx < 0) == self.dcd_a { 0x10 } else { 0 };
      self.pending_dx -= self.pending_dx.signum();
    }

    if self.pending_dy != 0 {
      self.dcd_b = !self.dcd_b;
      qb = (qb & !0x20) | if (self.pending_dy < 0) == self.dcd_b { 0x20 } else { 0 };
      self.pending_dy -= self.pending_dy.signum();
    }

    self.quadbits.set(qb);
    scc.set_dcd(self.dcd_a, self.dcd_b);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Default)]
  struct TestPin;
  impl IrqPin for TestPin {
    fn irq_set(&mut self, _asserted: bool) {}
  }

  fn harness() -> (Mouse, Scc<TestPin>, Rc<Cell<u8>>) {
    let quad = Rc::new(Cell::new(0));
    let mouse = Mouse::new(quad.clone(), Rc::new(Cell::new(false)));
    (mouse, Scc::new(TestPin), quad)
  }

  // Let the driver consume the event so back-pressure releases
  fn ack(scc: &mut Scc<TestPin>) {
    scc.write(CTL_B, 2);
    scc.read(CTL_B);
    scc.write(CTL_B, 0);
  }

  const CTL_B: u32 = 0x9f_fff8;
  const CTL_A: u32 = 0x9f_fffa;

  fn enable_mouse_irqs(scc: &mut Scc<TestPin>) {
    for ctl in [CTL_A, CTL_B] {
      scc.write(ctl, 0x0f); // point high -> WR15
      scc.write(ctl, 0x08); // DCD IE
    }
    scc.write(CTL_A, 0x09); // point high -> WR9
    scc.write(CTL_A, 0x08); // MIE
  }

  #[test]
  fn deltas_clamp() {
    let (mut mouse, _scc, _quad) = harness();
    mouse.update(100, -4, false);
    assert_eq!(mouse.pending_dx, MOUSE_MAX_PENDING_PIX);
    mouse.update(0, -100, false);
    assert_eq!(mouse.pending_dy, -MOUSE_MAX_PENDING_PIX);
  }

  #[test]
  fn steps_drain_deltas() {
    let (mut mouse, mut scc, _quad) = harness();
    mouse.update(2, -1, false);
    mouse.tick(&mut scc);
    assert_eq!((mouse.pending_dx, mouse.pending_dy), (1, 0));
    mouse.tick(&mut scc);
    assert_eq!((mouse.pending_dx, mouse.pending_dy), (0, 0));
    // Idle ticks don't touch the phases
    let phases = (mouse.dcd_a, mouse.dcd_b);
    mouse.tick(&mut scc);
    assert_eq!((mouse.dcd_a, mouse.dcd_b), phases);
  }

  #[test]
  fn direction_encoding() {
    let (mut mouse, mut scc, quad) = harness();
    // Rightwards: VIA bit differs from the new DCD phase
    mouse.update(1, 0, false);
    mouse.tick(&mut scc);
    assert!(mouse.dcd_a);
    assert_eq!(quad.get() & 0x10, 0);
    // Leftwards: VIA bit equals the new DCD phase
    mouse.update(-1, 0, false);
    mouse.tick(&mut scc);
    assert!(!mouse.dcd_a);
    assert_eq!(quad.get() & 0x10, 0);
    mouse.update(-1, 0, false);
    mouse.tick(&mut scc);
    assert!(mouse.dcd_a);
    assert_eq!(quad.get() & 0x10, 0x10);
  }

  #[test]
  fn irq_back_pressure_stalls_steps() {
    let (mut mouse, mut scc, _quad) = harness();
    enable_mouse_irqs(&mut scc);
    mouse.update(3, 0, false);
    mouse.tick(&mut scc);
    assert!(scc.irq_asserted());
    assert_eq!(mouse.pending_dx, 2);
    // Interrupt still pending: no further steps
    mouse.tick(&mut scc);
    mouse.tick(&mut scc);
    assert_eq!(mouse.pending_dx, 2);
    ack(&mut scc);
    assert!(!scc.irq_asserted());
    mouse.tick(&mut scc);
    assert_eq!(mouse.pending_dx, 1);
  }
}
