mod common;

use common::{machine, via_reg, SCC_RD_CTL_A, SCC_RD_CTL_B, SCC_WR_CTL_A, SCC_WR_CTL_B};
use mac_128k::{IRQ_SCC, IRQ_VIA};

const VIA_RB: u32 = 0;
const VIA_SR: u32 = 10;
const VIA_ACR: u32 = 11;
const VIA_IFR: u32 = 13;
const VIA_IER: u32 = 14;

#[test]
fn keyboard_model_query_round_trip() {
  let (mut mac, cpu) = machine([None, None]);

  // The ROM's sequence: SR to shift out under external clock, SR
  // interrupt enabled, then the command byte into the SR.
  mac.write_byte(via_reg(VIA_ACR), 0x1c).unwrap();
  mac.write_byte(via_reg(VIA_IER), 0x80 | 0x04).unwrap();
  mac.write_byte(via_reg(VIA_SR), 0x16).unwrap(); // Get Model
  assert_eq!(*cpu.irq_edges.borrow(), vec![(IRQ_VIA, true)]);
  assert_eq!(mac.read_byte(via_reg(VIA_IFR)), 0x80 | 0x04);

  // Handler acks the transmit IRQ and flips the SR around to receive
  mac.write_byte(via_reg(VIA_IFR), 0x04).unwrap();
  mac.write_byte(via_reg(VIA_ACR), 0x0c).unwrap();
  assert_eq!(*cpu.irq_edges.borrow(), vec![(IRQ_VIA, true), (IRQ_VIA, false)]);

  // The keyboard takes a beat to respond...
  mac.tick();
  assert_eq!(cpu.irq_edges.borrow().len(), 2);
  // ...then the model byte clocks in and interrupts
  mac.tick();
  assert_eq!(cpu.irq_edges.borrow().last(), Some(&(IRQ_VIA, true)));
  assert_eq!(mac.read_byte(via_reg(VIA_SR)), 0x01 | (5 << 1));
  assert_eq!(cpu.irq_edges.borrow().last(), Some(&(IRQ_VIA, false)));
}

#[test]
fn keyboard_inquiry_reports_key() {
  let (mut mac, _cpu) = machine([None, None]);
  mac.kbd_event(0x33, true);

  mac.write_byte(via_reg(VIA_ACR), 0x1c).unwrap();
  mac.write_byte(via_reg(VIA_SR), 0x10).unwrap(); // Inquiry
  mac.write_byte(via_reg(VIA_IFR), 0x04).unwrap();
  mac.write_byte(via_reg(VIA_ACR), 0x0c).unwrap();
  mac.tick();
  mac.tick();
  assert_eq!(mac.read_byte(via_reg(VIA_SR)), 0x33);
}

fn enable_mouse_irqs(mac: &mut mac_128k::Machine) {
  for ctl in [SCC_WR_CTL_A, SCC_WR_CTL_B] {
    mac.write_byte(ctl, 0x0f).unwrap(); // point high -> WR15
    mac.write_byte(ctl, 0x08).unwrap(); // DCD IE
  }
  mac.write_byte(SCC_WR_CTL_A, 0x09).unwrap(); // point high -> WR9
  mac.write_byte(SCC_WR_CTL_A, 0x08).unwrap(); // MIE
}

#[test]
fn mouse_steps_pace_against_scc_interrupts() {
  let (mut mac, cpu) = machine([None, None]);
  enable_mouse_irqs(&mut mac);

  mac.mouse_update(2, 0, false);
  mac.tick();
  assert_eq!(*cpu.irq_edges.borrow(), vec![(IRQ_SCC, true)]);
  // First rightwards step: DCD phase high, VIA bit opposite
  assert_eq!(mac.read_byte(via_reg(VIA_RB)), 0x08); // button up = bit 3
  assert_eq!(mac.read_byte(SCC_RD_CTL_A) & 0x08, 0x08);

  // Unserviced interrupt stalls the second step
  mac.tick();
  mac.tick();
  assert_eq!(cpu.irq_edges.borrow().len(), 1);

  // Handler reads the modified vector from RR2/B, which consumes the
  // pending DCD event
  mac.write_byte(SCC_WR_CTL_B, 2).unwrap();
  mac.read_byte(SCC_RD_CTL_B);
  mac.write_byte(SCC_WR_CTL_B, 0).unwrap();
  assert_eq!(cpu.irq_edges.borrow().last(), Some(&(IRQ_SCC, false)));

  // Second step goes out: phase back low, VIA bit equal... which the
  // OS decodes as the same direction as before
  mac.tick();
  assert_eq!(cpu.irq_edges.borrow().last(), Some(&(IRQ_SCC, true)));
  assert_eq!(mac.read_byte(via_reg(VIA_RB)), 0x18);
  assert_eq!(mac.read_byte(SCC_RD_CTL_A) & 0x08, 0);
}

#[test]
fn mouse_button_is_immediate() {
  let (mut mac, _cpu) = machine([None, None]);
  assert_eq!(mac.read_byte(via_reg(VIA_RB)) & 0x08, 0x08);
  mac.mouse_update(0, 0, true);
  assert_eq!(mac.read_byte(via_reg(VIA_RB)) & 0x08, 0);
  mac.mouse_update(0, 0, false);
  assert_eq!(mac.read_byte(via_reg(VIA_RB)) & 0x08, 0x08);
}

#[test]
fn timing_events_raise_via_flags() {
  let (mut mac, cpu) = machine([None, None]);
  mac.write_byte(via_reg(VIA_IER), 0x80 | 0x03).unwrap();

  mac.vsync_event();
  assert_eq!(*cpu.irq_edges.borrow(), vec![(IRQ_VIA, true)]);
  assert_eq!(mac.read_byte(via_reg(VIA_IFR)), 0x80 | 0x02);
  mac.write_byte(via_reg(VIA_IFR), 0x02).unwrap();

  mac.one_second_event();
  assert_eq!(mac.read_byte(via_reg(VIA_IFR)), 0x80 | 0x01);
}
