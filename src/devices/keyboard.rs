// Keyboard interface.
//
// Very roughly, the hardware uses CB2 as bidirectional data and CB1 as
// a clock always driven by the keyboard.  The Mac pulls data low as a
// "request to start clocking" and then shifts a command byte out of
// the VIA SR; the keyboard answers with a response byte clocked back
// in.  Here a command parks with a timestamp and the response is
// delivered a quantum later -- replies reflected back too soon get
// lost by the ROM's handler.

use crate::machine::EXECLOOP_QUANTUM_US;

pub const KBD_CMD_GET_MODEL: u8 = 0x16;
pub const KBD_CMD_INQUIRY: u8 = 0x10;
pub const KBD_MODEL: u8 = 5;
pub const KBD_RSP_NULL: u8 = 0x7b;

pub struct Keyboard {
  // Last command shifted out by the Mac, and when it arrived
  pending_cmd: Option<(u8, u64)>,
  // One-slot queue of key transitions
  pending_evt: Option<u8>,
}

impl Keyboard {
  pub fn new() -> Self {
    Keyboard { pending_cmd: None, pending_evt: None }
  }

  /// A key went down or up.  Scancodes use the Mac encoding; bit 7 set
  /// marks a release.
  pub fn key_event(&mut self, scancode: u8, down: bool) {
    if let Some(old) = self.pending_evt {
      log::debug!("received event {scancode:#04x} with event {old:#04x} pending");
    }
    self.pending_evt = Some(scancode | if down { 0 } else { 0x80 });
  }

  /// The VIA finished clocking a command byte out (SR transmit).
  pub fn command(&mut self, data: u8, now: u64) {
    if let Some((old, _)) = self.pending_cmd {
      log::debug!("transmitting {data:#04x} whilst cmd {old:#04x} pending!");
    }
    self.pending_cmd = Some((data, now));
  }

  /// Run the deferred command dispatch.  Returns the response byte to
  /// clock back into the VIA SR, once the settle delay has passed.
  pub fn poll(&mut self, now: u64) -> Option<u8> {
    let (cmd, stamp) = self.pending_cmd?;
    if now - stamp <= EXECLOOP_QUANTUM_US {
      return None;
    }
    self.pending_cmd = None;
    log::trace!("got cmd {cmd:#04x}");
    match cmd {
      KBD_CMD_GET_MODEL => Some(0x01 | (KBD_MODEL << 1)),
      KBD_CMD_INQUIRY => Some(self.pending_evt.take().unwrap_or(KBD_RSP_NULL)),
      _ => {
        log::warn!("unhandled keyboard command {cmd:#04x}");
        None
      },
    }
  }
}

impl Default for Keyboard {
  fn default() -> Self {
    Keyboard::new()
  }
}

#[test]
fn command_settles_before_reply() {
  let mut kbd = Keyboard::new();
  kbd.command(KBD_CMD_GET_MODEL, 1000);
  assert_eq!(kbd.poll(1000), None);
  assert_eq!(kbd.poll(1000 + EXECLOOP_QUANTUM_US), None);
  assert_eq!(kbd.poll(1001 + EXECLOOP_QUANTUM_US), Some(0x01 | (KBD_MODEL << 1)));
  // Consumed: nothing more to do
  assert_eq!(kbd.poll(1_000_000), None);
}

#[test]
fn inquiry_returns_event_or_null() {
  let mut kbd = Keyboard::new();
  kbd.command(KBD_CMD_INQUIRY, 0);
  assert_eq!(kbd.poll(EXECLOOP_QUANTUM_US + 1), Some(KBD_RSP_NULL));

  kbd.key_event(0x33, true);
  kbd.command(KBD_CMD_INQUIRY, 10_000);
  assert_eq!(kbd.poll(10_001 + EXECLOOP_QUANTUM_US), Some(0x33));

  kbd.key_event(0x33, false);
  kbd.command(KBD_CMD_INQUIRY, 20_000);
  assert_eq!(kbd.poll(20_001 + EXECLOOP_QUANTUM_US), Some(0x33 | 0x80));

  // An event is delivered exactly once
  kbd.command(KBD_CMD_INQUIRY, 30_000);
  assert_eq!(kbd.poll(30_001 + EXECLOOP_QUANTUM_US), Some(KBD_RSP_NULL));
}

#[test]
fn event_slot_overwrites() {
  let mut kbd = Keyboard::new();
  kbd.key_event(0x01, true);
  kbd.key_event(0x02, true);
  kbd.command(KBD_CMD_INQUIRY, 0);
  assert_eq!(kbd.poll(EXECLOOP_QUANTUM_US + 1), Some(0x02));
}

#[test]
fn unknown_command_is_swallowed() {
  let mut kbd = Keyboard::new();
  kbd.command(0x36, 0);
  assert_eq!(kbd.poll(EXECLOOP_QUANTUM_US + 1), None);
  assert_eq!(kbd.poll(2 * EXECLOOP_QUANTUM_US), None);
}
