mod common;

use common::{machine, test_rom, via_reg};
use mac_128k::Fault;

const VIA_RA: u32 = 1;

#[test]
fn boot_overlay_remaps_low_memory() {
  let (mut mac, _cpu) = machine([None, None]);
  let rom = test_rom(0x1000);

  // Out of reset the overlay is on: the low megabyte reads as ROM
  assert_eq!(mac.read_byte(0x00_0000), rom[0]);
  assert_eq!(mac.read_byte(0x00_0123), rom[0x123]);
  assert_eq!(mac.read_word(0x40_0000).unwrap(), u16::from_be_bytes([rom[0], rom[1]]));
  // ...and RAM is up at its alias
  mac.write_byte(0x60_0040, 0xa7).unwrap();
  assert_eq!(mac.read_byte(0x60_0040), 0xa7);

  // Writes to the overlaid low megabyte go nowhere
  mac.write_byte(0x00_0040, 0x55).unwrap();

  // ROM clears the overlay through VIA port A bit 4
  mac.write_byte(via_reg(VIA_RA), 0x00).unwrap();
  assert_eq!(mac.read_byte(0x00_0040), 0xa7); // the 0x600000 alias, not 0x55
  assert_eq!(mac.read_byte(0x40_0000), rom[0]); // ROM home never moves

  // Setting the bit again restores the boot map
  mac.write_byte(via_reg(VIA_RA), 0x10).unwrap();
  assert_eq!(mac.read_byte(0x00_0000), rom[0]);
}

#[test]
fn instruction_fetch_follows_overlay() {
  let (mut mac, _cpu) = machine([None, None]);
  let rom = test_rom(0x1000);
  let romw = u16::from_be_bytes([rom[0], rom[1]]);

  assert_eq!(mac.read_instr(0x00_0000), romw);
  assert_eq!(mac.read_instr(0x40_0000), romw);

  mac.write_byte(via_reg(VIA_RA), 0x00).unwrap();
  mac.write_word(0x00_0000, 0x4e71).unwrap();
  assert_eq!(mac.read_instr(0x00_0000), 0x4e71);
  assert_eq!(mac.read_instr(0x40_0000), romw);
  // Fetches never hit I/O: an odd region falls back to RAM rules
  assert_eq!(mac.read_instr(0x80_0000), 0x4e71); // wraps onto RAM
}

#[test]
fn byte_access_io_rules() {
  let (mut mac, _cpu) = machine([None, None]);
  // Dummy regions read zero, absorb writes
  assert_eq!(mac.read_byte(0x80_0000), 0);
  assert_eq!(mac.read_byte(0x58_0000), 0);
  mac.write_byte(0x80_0000, 0xff).unwrap();
  // ROM ignores byte writes
  mac.write_byte(0x40_0000, 0xff).unwrap();
  assert_eq!(mac.read_byte(0x40_0000), test_rom(0x1000)[0]);
  // Unknown addresses read zero and drop writes, no fault
  assert_eq!(mac.read_byte(0xc0_0000), 0);
  mac.write_byte(0xc0_0000, 0x01).unwrap();
}

#[test]
fn wide_access_faults_outside_memory() {
  let (mut mac, _cpu) = machine([None, None]);
  assert!(matches!(mac.read_word(0x90_0000), Err(Fault::Unmapped { .. })));
  assert!(matches!(mac.read_long(0xe8_0000), Err(Fault::Unmapped { .. })));
  assert!(matches!(mac.write_word(0x90_0000, 0), Err(Fault::Unmapped { .. })));
  assert!(matches!(mac.write_long(0xb0_0000, 0), Err(Fault::Unmapped { .. })));

  // ...except the test-software window, which reads zero
  assert_eq!(mac.read_word(0xf0_0004).unwrap(), 0);
  assert_eq!(mac.read_long(0xf8_0000).unwrap(), 0);

  // Wide writes to ROM and dummy space are dropped quietly
  mac.write_word(0x40_0010, 0x1234).unwrap();
  mac.write_long(0x80_0000, 0x1234_5678).unwrap();
}

#[test]
fn wide_memory_accesses() {
  let (mut mac, _cpu) = machine([None, None]);
  mac.write_long(0x60_1000, 0xdead_beef).unwrap();
  assert_eq!(mac.read_long(0x60_1000).unwrap(), 0xdead_beef);
  assert_eq!(mac.read_word(0x60_1002).unwrap(), 0xbeef);
  assert_eq!(mac.read_byte(0x60_1003), 0xef);
}

#[test]
fn fb_offset_tracks_ram_size() {
  let (mac, _cpu) = machine([None, None]);
  assert_eq!(mac.fb_offset(), 0x8000 - (512 * 342 / 8 + 0x380));
}
