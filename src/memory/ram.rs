use crate::memory::ADDR_MASK;

/// Guest RAM, big-endian, optionally split across two host segments.
///
/// The split is useful on hosts with distinct fast/slow memories (keep
/// the framebuffer at the top of RAM in the faster one).  Guest
/// addresses are contiguous regardless; only host storage is divided.
pub struct Ram {
  lo: Box<[u8]>,
  hi: Box<[u8]>,
}

impl Ram {
  pub fn new(size: usize) -> Ram {
    Ram { lo: vec![0; size].into_boxed_slice(), hi: Box::from([]) }
  }

  pub fn with_split(lo_size: usize, hi_size: usize) -> Ram {
    Ram {
      lo: vec![0; lo_size].into_boxed_slice(),
      hi: vec![0; hi_size].into_boxed_slice(),
    }
  }

  pub fn size(&self) -> usize {
    self.lo.len() + self.hi.len()
  }

  /// First guest address held by the high segment (== size when the
  /// RAM is one contiguous segment).
  pub fn split_point(&self) -> usize {
    self.lo.len()
  }

  // Accesses off the end of memory wrap.  For power-of-two sizes this
  // is a simple mask; for odd sizes (a Mac 208K...) it costs a divide,
  // but that should never happen post-boot.  The modulo also folds the
  // 0x600000 alias down onto RAM proper.
  fn index(&self, address: u32) -> usize {
    let a = (address & ADDR_MASK) as usize;
    if a >= self.size() { a % self.size() } else { a }
  }

  pub fn rd8(&self, address: u32) -> u8 {
    let i = self.index(address);
    if i < self.lo.len() { self.lo[i] } else { self.hi[i - self.lo.len()] }
  }

  pub fn wr8(&mut self, address: u32, value: u8) {
    let i = self.index(address);
    if i < self.lo.len() {
      self.lo[i] = value;
    } else {
      let split = self.lo.len();
      self.hi[i - split] = value;
    }
  }

  // 16/32-bit accesses are byte-composed, so words straddling the host
  // split (or the end of RAM) come out right.
  pub fn rd16(&self, address: u32) -> u16 {
    (self.rd8(address) as u16) << 8 | self.rd8(address + 1) as u16
  }

  pub fn rd32(&self, address: u32) -> u32 {
    (self.rd16(address) as u32) << 16 | self.rd16(address + 2) as u32
  }

  pub fn wr16(&mut self, address: u32, value: u16) {
    self.wr8(address, (value >> 8) as u8);
    self.wr8(address + 1, value as u8);
  }

  pub fn wr32(&mut self, address: u32, value: u32) {
    self.wr16(address, (value >> 16) as u16);
    self.wr16(address + 2, value as u16);
  }

  /// Borrow `len` bytes of host storage starting at a guest address.
  /// The range must lie within one host segment; bulk users split
  /// their transfers at `split_point` first.
  pub fn host_slice(&self, address: u32, len: usize) -> &[u8] {
    let i = self.index(address);
    let split = self.lo.len();
    if i < split {
      assert!(i + len <= split);
      &self.lo[i..i + len]
    } else {
      &self.hi[i - split..i - split + len]
    }
  }

  pub fn host_slice_mut(&mut self, address: u32, len: usize) -> &mut [u8] {
    let i = self.index(address);
    let split = self.lo.len();
    if i < split {
      assert!(i + len <= split);
      &mut self.lo[i..i + len]
    } else {
      &mut self.hi[i - split..i - split + len]
    }
  }

  pub fn load_at(&mut self, data: &[u8], address: u32) {
    for (offset, byte) in data.iter().enumerate() {
      self.wr8(address + offset as u32, *byte);
    }
  }
}

#[test]
fn big_endian_round_trip() {
  let mut ram = Ram::new(0x1000);
  ram.wr32(0x100, 0xdead_beef);
  assert_eq!(ram.rd8(0x100), 0xde);
  assert_eq!(ram.rd8(0x103), 0xef);
  assert_eq!(ram.rd16(0x102), 0xbeef);
  assert_eq!(ram.rd32(0x100), 0xdead_beef);
}

#[test]
fn high_alias_folds_down() {
  let mut ram = Ram::new(128 * 1024);
  ram.wr16(0x60_0040, 0x1234);
  assert_eq!(ram.rd16(0x40), 0x1234);
  ram.wr8(0x123, 0xab);
  assert_eq!(ram.rd8(0x60_0123), 0xab);
}

#[test]
fn non_power_of_two_wraps() {
  // A 208K-style machine: wrap is modulo, not a mask
  let mut ram = Ram::new(208 * 1024);
  let size = 208 * 1024;
  ram.wr8(7, 0x55);
  assert_eq!(ram.rd8(size as u32 + 7), 0x55);
}

#[test]
fn load_at_copies_and_wraps() {
  let mut ram = Ram::new(0x1000);
  ram.load_at(&[1, 2, 3, 4], 0xffe);
  assert_eq!(ram.rd16(0xffe), 0x0102);
  // Byte-wise store wraps at the end of memory
  assert_eq!(ram.rd8(0), 3);
  assert_eq!(ram.rd8(1), 4);
}

#[test]
fn word_across_split_segments() {
  let mut ram = Ram::with_split(0x1000, 0x1000);
  ram.wr32(0xffe, 0xcafe_f00d);
  assert_eq!(ram.rd16(0xffe), 0xcafe);
  assert_eq!(ram.rd16(0x1000), 0xf00d);
  assert_eq!(ram.rd32(0xffe), 0xcafe_f00d);
  assert_eq!(ram.size(), 0x2000);
  assert_eq!(ram.split_point(), 0x1000);
}

#[test]
fn host_slices_stay_in_segment() {
  let mut ram = Ram::with_split(0x1000, 0x1000);
  ram.host_slice_mut(0xf00, 0x100).fill(0x5a);
  assert_eq!(ram.rd8(0xfff), 0x5a);
  assert_eq!(ram.host_slice(0x1000, 4), &[0, 0, 0, 0]);
}
