// IWM floppy controller stub.  The replacement .Sony driver bypasses
// it entirely; the ROM still probes these registers at boot, so feed
// it agreeable status values.

pub struct Iwm {
  regs: [u8; 16],
}

impl Iwm {
  pub fn new() -> Self {
    Iwm { regs: [0; 16] }
  }

  // A[12:9] select regs, like the VIA
  const fn reg(address: u32) -> usize {
    (address as usize >> 9) & 0xf
  }

  pub fn write(&mut self, address: u32, data: u8) {
    let r = Self::reg(address);
    log::trace!("write {data:#04x} -> IWM reg {r}");
    self.regs[r] = data;
  }

  pub fn read(&self, address: u32) -> u8 {
    let r = Self::reg(address);
    let data = match r {
      8 => 0xff,
      14 => 0x1f,
      _ => self.regs[r],
    };
    log::trace!("read IWM reg {r} -> {data:#04x}");
    data
  }
}

impl Default for Iwm {
  fn default() -> Self {
    Iwm::new()
  }
}

#[test]
fn probe_registers_read_fixed() {
  let mut iwm = Iwm::new();
  iwm.write(8 << 9, 0x00);
  iwm.write(14 << 9, 0x00);
  assert_eq!(iwm.read(8 << 9), 0xff);
  assert_eq!(iwm.read(14 << 9), 0x1f);
  iwm.write(3 << 9, 0x42);
  assert_eq!(iwm.read(3 << 9), 0x42);
}
