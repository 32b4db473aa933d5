mod common;

use common::{machine, via_reg};
use mac_128k::disc::macos::*;
use mac_128k::disc::DISC_SECTOR_SIZE;
use mac_128k::memory::SONY_HOOK_ADDR;
use mac_128k::{DiscData, DiscDescr, Fault};

const PB: u32 = 0x400;
const DCE: u32 = 0x500;
const STATUS: u32 = 0x600;

const OP_OPEN: u8 = 0;
const OP_PRIME: u8 = 1;
const OP_CONTROL: u8 = 2;

fn floppy(sectors: usize) -> Option<DiscDescr> {
  let data = (0..sectors * DISC_SECTOR_SIZE).map(|i| i as u8).collect();
  Some(DiscDescr { data: DiscData::Buffer(data), read_only: false })
}

fn call(mac: &mut mac_128k::Machine, cpu: &common::TestCpu, op: u8) -> i16 {
  cpu.a_regs[0].set(PB);
  cpu.a_regs[1].set(DCE);
  cpu.a_regs[2].set(STATUS);
  mac.write_byte(SONY_HOOK_ADDR, op).unwrap();
  cpu.d0.get() as i16
}

#[test]
fn open_then_read_through_the_hook() {
  let (mut mac, cpu) = machine([floppy(4), None]);
  assert_eq!(call(&mut mac, &cpu, OP_OPEN), NO_ERR);
  assert_eq!(mac.ram().rd16(DSK_ERR), 0);
  assert_eq!(mac.ram().rd8(STATUS + DS_DISK_IN_PLACE), 1);

  let ram = mac.ram_mut();
  ram.wr16(PB + IO_TRAP, A_RD_CMD);
  ram.wr16(PB + IO_V_REF_NUM, 1);
  ram.wr32(PB + IO_BUFFER, 0x1000);
  ram.wr32(PB + IO_REQ_COUNT, 1024);
  ram.wr32(DCE + D_CTL_POSITION, 512);
  assert_eq!(call(&mut mac, &cpu, OP_PRIME), NO_ERR);
  // Sector 1 onward lands in the guest buffer
  assert_eq!(mac.ram().rd8(0x1000), 0);
  assert_eq!(mac.ram().rd8(0x1001), 1);
  assert_eq!(mac.ram().rd8(0x1000 + 1023), 0xff);
}

#[test]
fn errors_come_back_sign_extended_in_d0() {
  let (mut mac, cpu) = machine([floppy(4), None]);
  assert_eq!(call(&mut mac, &cpu, OP_OPEN), NO_ERR);

  let ram = mac.ram_mut();
  ram.wr16(PB + IO_TRAP, A_RD_CMD);
  ram.wr16(PB + IO_V_REF_NUM, 9); // no such drive
  ram.wr32(PB + IO_BUFFER, 0x1000);
  ram.wr32(PB + IO_REQ_COUNT, 512);
  assert_eq!(call(&mut mac, &cpu, OP_PRIME), NS_DRV_ERR);
  assert_eq!(cpu.d0.get(), NS_DRV_ERR as i32 as u32); // 0xffff_ffc8
  assert_eq!(mac.ram().rd16(DSK_ERR) as i16, NS_DRV_ERR);
}

#[test]
fn oversized_request_is_rejected() {
  let (mut mac, cpu) = machine([floppy(4), None]);
  assert_eq!(call(&mut mac, &cpu, OP_OPEN), NO_ERR);

  // A sector-aligned request so large that position + length wraps a
  // 32-bit sum must come back as a parameter error, not blow up
  let ram = mac.ram_mut();
  ram.wr16(PB + IO_TRAP, A_RD_CMD);
  ram.wr16(PB + IO_V_REF_NUM, 1);
  ram.wr32(PB + IO_BUFFER, 0x1000);
  ram.wr32(PB + IO_REQ_COUNT, 0xffff_fe00);
  ram.wr32(DCE + D_CTL_POSITION, 512);
  assert_eq!(call(&mut mac, &cpu, OP_PRIME), PARAM_ERR);
  assert_eq!(mac.ram().rd16(DSK_ERR) as i16, PARAM_ERR);
}

#[test]
fn eject_resets_the_machine() {
  let (mut mac, cpu) = machine([floppy(4), None]);
  assert_eq!(call(&mut mac, &cpu, OP_OPEN), NO_ERR);
  mac.write_byte(via_reg(1), 0x00).unwrap(); // boot done, overlay off

  mac.ram_mut().wr16(PB + IO_V_REF_NUM, 1);
  mac.ram_mut().wr16(PB + CS_CODE, 7);
  assert_eq!(call(&mut mac, &cpu, OP_CONTROL), NO_ERR);
  assert_eq!(cpu.resets.get(), 1);
  assert_eq!(mac.ram().rd8(STATUS + DS_DISK_IN_PLACE), 0);
  // Reset re-arms the boot overlay: low memory reads as ROM again
  assert_eq!(mac.read_byte(0x00_0000), common::test_rom(0x1000)[0]);
}

#[test]
fn unknown_opcode_is_a_fault() {
  let (mut mac, cpu) = machine([floppy(4), None]);
  cpu.a_regs[0].set(PB);
  assert!(matches!(
    mac.write_byte(SONY_HOOK_ADDR, 9),
    Err(Fault::DriverFailed { opcode: 9, .. })
  ));
}
