pub mod ram;
pub mod rom;

//  Compact Mac memory map (24-bit address bus):
//
//  When overlay=1 (reset state):
//   - ROM at 0x000000-0x0fffff and 0x400000-0x4fffff
//   - RAM at 0x600000-0x7fffff
//
//  When overlay=0:
//   - ROM at 0x400000-0x4fffff
//   - RAM at 0x000000-0x3fffff
//   - manuals say 0x600000-0x7fffff is "unassigned", but it stays RAM here
//
//  I/O:
//   - SCC read  0x900000-0x9fffff
//   - SCC write 0xb00000-0xbfffff
//   - IWM       0xdfe1ff-0xe001fe
//   - VIA       0xe80000-0xefffff (sloppy decode, see IS_VIA below)
//   - test software region from 0xf00000

pub const ADDR_MASK: u32 = 0x00ff_ffff;
pub const ROM_BASE: u32 = 0x40_0000;
pub const RAM_HIGH_BASE: u32 = 0x60_0000;

/// Magic byte address the replacement .Sony driver traps to.
pub const SONY_HOOK_ADDR: u32 = 0xc0_0069;

const IWM_BASE: u32 = 0xdf_e1ff;

/// What a 24-bit address resolves to.  The variants follow the byte-read
/// decode order; the sized accessors on `Machine` map them onto the
/// per-width rules (e.g. a write seeing `SccRead` discards, a word read
/// seeing `Via` faults unless the test-switch range applies).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
  Ram,
  Rom,
  Via,
  Iwm,
  SccRead,
  SccWrite,
  Dummy,
  DiscHook,
  Unknown,
}

impl Region {
  pub fn decode(address: u32, overlay: bool) -> Region {
    let a = address & ADDR_MASK;
    if is_ram(a, overlay) {
      Region::Ram
    } else if is_rom(a, overlay) {
      Region::Rom
    } else if a & 0xe8_0000 == 0xe8_0000 {
      Region::Via
    } else if (IWM_BASE..IWM_BASE + 0x2000).contains(&a) {
      Region::Iwm
    } else if a & 0xf0_0000 == 0x90_0000 {
      Region::SccRead
    } else if a & 0xf0_0000 == 0xb0_0000 {
      Region::SccWrite
    } else if (0x80_0000..0x9f_fff8).contains(&a) || a & 0xf0_0000 == 0x50_0000 {
      Region::Dummy
    } else if a == SONY_HOOK_ADDR {
      Region::DiscHook
    } else {
      Region::Unknown
    }
  }
}

// RAM: always at 0x600000-0x7fffff, sometimes at 0 (0 most likely so check first)
pub const fn is_ram(address: u32, overlay: bool) -> bool {
  let a = address & ADDR_MASK;
  (!overlay && a & 0xc0_0000 == 0) || a & 0xe0_0000 == RAM_HIGH_BASE
}

pub const fn is_rom(address: u32, overlay: bool) -> bool {
  let a = address & ADDR_MASK;
  a & 0xf0_0000 == ROM_BASE || (overlay && a & 0xf0_0000 == 0)
}

/// ROM test software pokes around up here; word reads of it yield zero.
pub const fn is_test_switches(address: u32) -> bool {
  address & ADDR_MASK >= 0xf0_0000
}

#[test]
fn decode_overlay_remap() {
  // Low megabyte flips between ROM (at reset) and RAM
  assert_eq!(Region::decode(0x00_0000, true), Region::Rom);
  assert_eq!(Region::decode(0x0f_fffe, true), Region::Rom);
  assert_eq!(Region::decode(0x00_0000, false), Region::Ram);
  assert_eq!(Region::decode(0x3f_fffe, false), Region::Ram);
  // The 0x600000 alias and the ROM home address never move
  assert_eq!(Region::decode(0x60_0000, true), Region::Ram);
  assert_eq!(Region::decode(0x60_0000, false), Region::Ram);
  assert_eq!(Region::decode(0x40_0000, true), Region::Rom);
  assert_eq!(Region::decode(0x40_0000, false), Region::Rom);
}

#[test]
fn decode_io_regions() {
  assert_eq!(Region::decode(0xef_e1fe, false), Region::Via);
  assert_eq!(Region::decode(0xdf_e1ff, false), Region::Iwm);
  assert_eq!(Region::decode(0xe0_01fe, false), Region::Iwm);
  assert_eq!(Region::decode(0x9f_fff8, false), Region::SccRead);
  assert_eq!(Region::decode(0xbf_fff9, false), Region::SccWrite);
  assert_eq!(Region::decode(0x80_0000, false), Region::Dummy);
  assert_eq!(Region::decode(0x58_0000, false), Region::Dummy);
  assert_eq!(Region::decode(0xc0_0069, false), Region::DiscHook);
  assert_eq!(Region::decode(0xc0_0068, false), Region::Unknown);
  // VIA decode is deliberately wide and swallows the test region too
  assert_eq!(Region::decode(0xf8_0000, false), Region::Via);
  assert!(is_test_switches(0xf8_0000));
}

#[test]
fn ram_and_rom_never_overlap() {
  for overlay in [false, true] {
    for a in (0..=0xff_ffff).step_by(0x1_0000) {
      assert!(!(is_ram(a, overlay) && is_rom(a, overlay)), "{a:#08x} overlay={overlay}");
    }
  }
}

#[test]
fn decode_masks_to_24_bits() {
  assert_eq!(Region::decode(0xff40_0000, false), Region::Rom);
  assert_eq!(Region::decode(0x0160_0000, true), Region::Ram);
}
