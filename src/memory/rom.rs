/// ROM image.  Sizes are powers of two, so address decode is a mask.
pub struct Rom {
  data: Box<[u8]>,
}

impl Rom {
  pub fn new(image: Vec<u8>) -> Rom {
    assert!(image.len().is_power_of_two(), "ROM image size must be a power of two");
    Rom { data: image.into_boxed_slice() }
  }

  pub fn size(&self) -> usize {
    self.data.len()
  }

  fn index(&self, address: u32) -> usize {
    address as usize & (self.data.len() - 1)
  }

  pub fn rd8(&self, address: u32) -> u8 {
    self.data[self.index(address)]
  }

  pub fn rd16(&self, address: u32) -> u16 {
    (self.rd8(address) as u16) << 8 | self.rd8(address + 1) as u16
  }

  pub fn rd32(&self, address: u32) -> u32 {
    (self.rd16(address) as u32) << 16 | self.rd16(address + 2) as u32
  }
}

#[test]
fn rom_mirrors_through_mask() {
  let mut image = vec![0u8; 0x100];
  image[0] = 0x4e;
  image[1] = 0x71;
  let rom = Rom::new(image);
  assert_eq!(rom.rd16(0), 0x4e71);
  // Both the overlay alias at 0 and the 0x400000 home mirror the image
  assert_eq!(rom.rd16(0x40_0000), 0x4e71);
  assert_eq!(rom.rd16(0x40_0100), 0x4e71);
}
