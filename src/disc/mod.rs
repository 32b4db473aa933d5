// Replacement .Sony driver back end.
//
// The guest ROM is patched so that the floppy driver's Open, Prime,
// Control and Status entry points write an opcode to a magic bus
// address; that lands in `pv_hook`, which services the call directly
// against host-side disc storage.  Largely follows the replacement
// driver from Basilisk II (sony.cpp, (C) 1997-2008 Christian Bauer).
//
// See also Inside Macintosh: Devices, chapter 1 "Device Manager", and
// Technotes DV 05, DV 07, DV 17, DV 23, FL 24.

pub mod macos;

use std::io;

use crate::cpu::Cpu;
use crate::memory::ram::Ram;
use crate::memory::ADDR_MASK;
use macos::*;

pub const DISC_SECTOR_SIZE: usize = 512;
pub const DISC_NUM_DRIVES: usize = 2;

/// Sector-addressed backing storage for a drive, for images too big to
/// hold in memory (or living behind some host filesystem).
pub trait DiscOps {
  fn read(&mut self, buf: &mut [u8], offset: u32) -> io::Result<()>;
  fn write(&mut self, buf: &[u8], offset: u32) -> io::Result<()>;
}

pub enum DiscData {
  /// Direct mapping of the whole image.
  Buffer(Vec<u8>),
  /// Callback-backed image of `size` bytes.
  Ops { size: u32, ops: Box<dyn DiscOps> },
}

pub struct DiscDescr {
  pub data: DiscData,
  pub read_only: bool,
}

struct DriveInfo {
  num: u16,                 // drive number, assigned at Open
  read_only: bool,          // force write protection
  status: u32,              // Mac address of the drive status record
  data: Option<DiscData>,
}

impl DriveInfo {
  fn empty() -> Self {
    DriveInfo { num: 0, read_only: false, status: 0, data: None }
  }

  fn size(&self) -> u32 {
    match &self.data {
      Some(DiscData::Buffer(b)) => b.len() as u32,
      Some(DiscData::Ops { size, .. }) => *size,
      None => 0,
    }
  }
}

#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub enum HookResult {
  Done,
  /// An Eject went through; the caller resets the machine.
  Ejected,
  /// Unknown opcode; the caller raises a bus fault.
  Unhandled,
}

#[derive(Clone, Copy)]
enum Dir {
  Read,
  Write,
}

pub struct SonyDriver {
  drives: [DriveInfo; DISC_NUM_DRIVES],
  sector_buf: [u8; DISC_SECTOR_SIZE],
  accrun_complained: bool,
}

impl SonyDriver {
  pub fn new(discs: [Option<DiscDescr>; DISC_NUM_DRIVES]) -> Self {
    let drives = discs.map(|d| match d {
      Some(descr) => DriveInfo {
        num: 0,
        read_only: descr.read_only,
        status: 0,
        data: Some(descr.data),
      },
      None => DriveInfo::empty(),
    });
    SonyDriver { drives, sector_buf: [0; DISC_SECTOR_SIZE], accrun_complained: false }
  }

  /// Entry point redirected from the PV .Sony replacement driver.
  /// A0..A2 carry the call arguments, D0 takes the result code.
  pub fn pv_hook(&mut self, opcode: u8, ram: &mut Ram, cpu: &dyn Cpu) -> HookResult {
    let a0 = cpu.addr_reg(0) & ADDR_MASK;
    let a1 = cpu.addr_reg(1) & ADDR_MASK;
    let a2 = cpu.addr_reg(2) & ADDR_MASK;

    let mut ejected = false;
    let d0 = match opcode {
      0 => {
        log::trace!("disc OPEN");
        self.open(ram, a0, a1, a2)
      },
      1 => {
        log::trace!("disc PRIME");
        self.prime(ram, a0, a1)
      },
      2 => {
        log::trace!("disc CONTROL");
        let (err, e) = self.control(ram, a0, a1);
        ejected = e;
        err
      },
      3 => {
        log::trace!("disc STATUS");
        self.status(ram, a0, a1)
      },
      _ => {
        log::error!("disc PV op {opcode:#04x} unhandled!");
        return HookResult::Unhandled;
      },
    };
    cpu.set_data_reg(0, d0 as i32 as u32);

    if ejected {
      HookResult::Ejected
    } else {
      HookResult::Done
    }
  }

  fn drive_index(&self, num: u16) -> Option<usize> {
    self.drives.iter().position(|d| d.num == num)
  }

  /// Driver Open() routine.
  fn open(&mut self, ram: &mut Ram, _pb: u32, dce: u32, status: u32) -> i16 {
    // Set up the DCE.  The version field must be >= 3 or System 8
    // will replace us.
    ram.wr32(dce + D_CTL_POSITION, 0);
    let flags = ram.rd16(dce + D_CTL_Q_HDR + Q_FLAGS);
    ram.wr16(dce + D_CTL_Q_HDR + Q_FLAGS, (flags & 0xff00) | 3);

    // Fake SonyVars
    ram.wr32(SONY_VARS, 0xdead_beef);

    set_dsk_err(ram, NO_ERR);

    // Install drive 0.  The original driver allocated the status
    // record itself (NewPtrSysClear trap); ours takes the record's
    // address as a parameter, and the caller adds the drive to the
    // drive queue after this call returns.
    let drnum = 0;
    let num = find_free_drive_number(ram, 1);
    let info = &mut self.drives[drnum];
    info.num = num;
    info.status = status;
    log::trace!("DrvSts at {status:#08x}, drive number {num}");

    // 800K, double sided (see IM)
    ram.wr16(status + DS_Q_TYPE, SONY);
    ram.wr8(status + DS_INSTALLED, 1);
    ram.wr8(status + DS_SIDES, 0xff); // 2 sides
    ram.wr8(status + DS_TWO_SIDE_FMT, 0xff);
    ram.wr8(status + DS_MFM_DRIVE, 0); // 0 = 400/800K GCR drive
    ram.wr8(status + DS_MFM_DISK, 0);

    // Disk in drive
    ram.wr8(status + DS_DISK_IN_PLACE, 1); // inserted removable disk
    ram.wr8(status + DS_WRITE_PROT, if info.read_only { 0xff } else { 0 });

    NO_ERR
  }

  /// Driver Prime() routine: sector-multiple reads and writes at the
  /// DCE position.
  fn prime(&mut self, ram: &mut Ram, pb: u32, dce: u32) -> i16 {
    ram.wr32(pb + IO_ACT_COUNT, 0);

    // Drive valid and disk inserted?
    let num = ram.rd16(pb + IO_V_REF_NUM);
    let Some(idx) = self.drive_index(num) else {
      return set_dsk_err(ram, NS_DRV_ERR);
    };
    let status = self.drives[idx].status;
    if ram.rd8(status + DS_DISK_IN_PLACE) == 0 {
      return set_dsk_err(ram, OFF_LIN_ERR);
    }
    ram.wr8(status + DS_DISK_IN_PLACE, 2); // disk accessed

    // Get parameters
    let buffer = ram.rd32(pb + IO_BUFFER) & ADDR_MASK;
    let length = ram.rd32(pb + IO_REQ_COUNT);
    let position = ram.rd32(dce + D_CTL_POSITION);
    if length & 0x1ff != 0 || position & 0x1ff != 0 {
      log::debug!("bad param: length {length:#x}, pos {position:#x}");
      return set_dsk_err(ram, PARAM_ERR);
    }
    // Guest-supplied values: the sums must not wrap
    let disc_end = position.checked_add(length);
    if disc_end.map_or(true, |end| end > self.drives[idx].size()) {
      log::debug!("off end: length {length:#x}, pos {position:#x}");
      return set_dsk_err(ram, PARAM_ERR);
    }
    let buffer_end = buffer.checked_add(length);
    if buffer_end.map_or(true, |end| end > ram.size() as u32) {
      log::debug!("buffer {buffer:#x}+{length:#x} outside RAM");
      return set_dsk_err(ram, PARAM_ERR);
    }

    let reading = ram.rd16(pb + IO_TRAP) & 0xff == A_RD_CMD;
    if !reading && self.drives[idx].read_only {
      return set_dsk_err(ram, W_PR_ERR);
    }
    let dir = if reading { Dir::Read } else { Dir::Write };
    log::trace!(
      "disc {} {length:#x} at +{position:#x}, guest buffer {buffer:#06x}",
      if reading { "READ" } else { "WRITE" }
    );
    if let Err(code) = self.transfer(idx, ram, buffer, length, position, dir) {
      return set_dsk_err(ram, code);
    }
    if reading {
      // Clear TagBuf
      ram.wr32(TAG_BUF, 0);
      ram.wr32(TAG_BUF + 4, 0);
      ram.wr32(TAG_BUF + 8, 0);
    }

    // Update ParamBlock and DCE
    // FIXME: account the transferred length into actual
    let actual = 0u32;
    ram.wr32(pb + IO_ACT_COUNT, actual);
    let dctl = ram.rd32(dce + D_CTL_POSITION);
    ram.wr32(dce + D_CTL_POSITION, dctl + actual);
    set_dsk_err(ram, NO_ERR)
  }

  // Move data between the guest buffer and the drive.  A buffer that
  // straddles the host RAM split is broken into whole sectors below,
  // at most one sector across (staged through sector_buf), and whole
  // sectors above; each span may be empty.
  fn transfer(
    &mut self,
    idx: usize,
    ram: &mut Ram,
    buffer: u32,
    length: u32,
    position: u32,
    dir: Dir,
  ) -> Result<(), i16> {
    let Self { drives, sector_buf, .. } = self;
    let drive = &mut drives[idx];
    let split = ram.split_point() as u32;

    if !(buffer < split && buffer + length >= split) {
      // Wholly within one host segment
      return match dir {
        Dir::Read => drive_read(drive, ram.host_slice_mut(buffer, length as usize), position),
        Dir::Write => drive_write(drive, ram.host_slice(buffer, length as usize), position),
      };
    }

    let sector = DISC_SECTOR_SIZE as u32;
    let total_sectors = length / sector; // at least 1
    let bytes_below_split = split - buffer;
    let secs_before = bytes_below_split / sector; // rounds down
    let partial = (bytes_below_split % sector) as usize;
    let across = partial != 0;
    let secs_after = total_sectors - secs_before - across as u32;
    log::trace!(
      "transfer straddles RAM split: {secs_before} sectors below, {} across, {secs_after} above",
      across as u32
    );

    if secs_before != 0 {
      let len = (secs_before * sector) as usize;
      match dir {
        Dir::Read => drive_read(drive, ram.host_slice_mut(buffer, len), position)?,
        Dir::Write => drive_write(drive, ram.host_slice(buffer, len), position)?,
      }
    }

    if across {
      let boffs = position + secs_before * sector;
      let dest = buffer + secs_before * sector;
      match dir {
        Dir::Read => {
          drive_read(drive, sector_buf, boffs)?;
          // Copy out to the two buffer halves
          ram.host_slice_mut(dest, partial).copy_from_slice(&sector_buf[..partial]);
          ram
            .host_slice_mut(dest + partial as u32, DISC_SECTOR_SIZE - partial)
            .copy_from_slice(&sector_buf[partial..]);
        },
        Dir::Write => {
          // Assemble the sector from the two buffer halves
          sector_buf[..partial].copy_from_slice(ram.host_slice(dest, partial));
          sector_buf[partial..]
            .copy_from_slice(ram.host_slice(dest + partial as u32, DISC_SECTOR_SIZE - partial));
          drive_write(drive, sector_buf, boffs)?;
        },
      }
    }

    if secs_after != 0 {
      let mut dest = buffer + secs_before * sector;
      let mut boffs = position + secs_before * sector;
      if across {
        dest += sector;
        boffs += sector;
      }
      let len = (secs_after * sector) as usize;
      match dir {
        Dir::Read => drive_read(drive, ram.host_slice_mut(dest, len), boffs)?,
        Dir::Write => drive_write(drive, ram.host_slice(dest, len), boffs)?,
      }
    }

    Ok(())
  }

  /// Driver Control() routine.  The bool reports an eject.
  fn control(&mut self, ram: &mut Ram, pb: u32, _dce: u32) -> (i16, bool) {
    let code = ram.rd16(pb + CS_CODE);
    log::trace!("Control({code})");

    // General codes
    match code {
      1 => return (set_dsk_err(ram, -1), false), // KillIO (not supported)
      9 => return (set_dsk_err(ram, NO_ERR), false), // track cache: host caches anyway
      65 => {
        // Periodic action (accRun, "insert" disks on startup).  The
        // Basilisk original hooked this to mount volumes and post
        // diskEvents; our caller mounts up front instead.
        if !self.accrun_complained {
          log::warn!("Control:accRun: not supported");
          self.accrun_complained = true;
        }
        return (set_dsk_err(ram, -1), false);
      },
      _ => {},
    }

    // Drive valid?
    let num = ram.rd16(pb + IO_V_REF_NUM);
    let Some(idx) = self.drive_index(num) else {
      return (set_dsk_err(ram, NS_DRV_ERR), false);
    };
    let info = &mut self.drives[idx];

    let mut ejected = false;
    let err = match code {
      5 => {
        // Verify disk
        if ram.rd8(info.status + DS_DISK_IN_PLACE) == 0 { OFF_LIN_ERR } else { NO_ERR }
      },
      6 => {
        // Format disk
        if info.read_only { W_PR_ERR } else { OFF_LIN_ERR }
      },
      7 => {
        // Eject
        if ram.rd8(info.status + DS_DISK_IN_PLACE) > 0 {
          log::info!("disc EJECT");
          ram.wr8(info.status + DS_DISK_IN_PLACE, 0);
          ejected = true;
        }
        NO_ERR
      },
      8 => NO_ERR, // Set tag buffer (ignore, not supported)
      23 => {
        // Get drive info
        let kind = if info.num == 1 {
          0x0004 // internal drive
        } else {
          0x0104 // external drive
        };
        ram.wr32(pb + CS_PARAM, kind);
        NO_ERR
      },
      _ => {
        log::warn!("unknown Control({code})");
        CONTROL_ERR
      },
    };
    (set_dsk_err(ram, err), ejected)
  }

  /// Driver Status() routine.
  fn status(&mut self, ram: &mut Ram, pb: u32, _dce: u32) -> i16 {
    let code = ram.rd16(pb + CS_CODE);
    log::trace!("Status({code})");

    // Drive valid?
    let num = ram.rd16(pb + IO_V_REF_NUM);
    let Some(idx) = self.drive_index(num) else {
      return set_dsk_err(ram, NS_DRV_ERR);
    };
    let info = &self.drives[idx];

    let err = match code {
      6 => {
        // Return list of supported disk formats
        if ram.rd16(pb + CS_PARAM) > 0 {
          // At least one entry requested
          let adr = ram.rd32(pb + CS_PARAM + 2);
          ram.wr16(pb + CS_PARAM, 1); // 1 format supported
          ram.wr32(adr, 2880); // 2880 sectors
          ram.wr32(adr + 4, 0xd212_0050); // DD, 2 heads, 18 secs/track, 80 tracks
          NO_ERR
        } else {
          PARAM_ERR
        }
      },
      8 => {
        // Get drive status: copy the record into the param block
        for i in 0..22 {
          let b = ram.rd8(info.status + i);
          ram.wr8(pb + CS_PARAM + i, b);
        }
        NO_ERR
      },
      10 => {
        // Get disk type and MFM info
        ram.wr32(pb + CS_PARAM, 0xfe); // 0xfe = SWIM2 controller
        NO_ERR
      },
      0x5343 => {
        // Get address header format byte ('SC')
        ram.wr8(pb + CS_PARAM, 0x02); // 500 kbit/s (HD) MFM
        NO_ERR
      },
      _ => {
        log::warn!("unknown Status({code})");
        STATUS_ERR
      },
    };
    set_dsk_err(ram, err)
  }
}

fn set_dsk_err(ram: &mut Ram, err: i16) -> i16 {
  log::trace!("set_dsk_err({err})");
  ram.wr16(DSK_ERR, err as u16);
  err
}

// Walk the guest drive queue looking for a taken number.
fn is_drive_number_free(ram: &Ram, num: u16) -> bool {
  let mut e = ram.rd32(DRV_Q_HDR + Q_HEAD);
  while e != 0 {
    let d = e - DS_Q_LINK;
    if ram.rd16(d + DS_Q_DRIVE) == num {
      return false;
    }
    e = ram.rd32(e + Q_LINK);
  }
  true
}

fn find_free_drive_number(ram: &Ram, mut num: u16) -> u16 {
  while !is_drive_number_free(ram, num) {
    num += 1;
  }
  num
}

fn drive_read(drive: &mut DriveInfo, buf: &mut [u8], position: u32) -> Result<(), i16> {
  match &mut drive.data {
    Some(DiscData::Buffer(data)) => {
      let p = position as usize;
      buf.copy_from_slice(&data[p..p + buf.len()]);
      Ok(())
    },
    Some(DiscData::Ops { ops, .. }) => ops.read(buf, position).map_err(|e| {
      log::error!("disc read op failed: {e}");
      PARAM_ERR
    }),
    None => {
      log::error!("no disc read strategy!");
      Err(OFF_LIN_ERR)
    },
  }
}

fn drive_write(drive: &mut DriveInfo, buf: &[u8], position: u32) -> Result<(), i16> {
  match &mut drive.data {
    Some(DiscData::Buffer(data)) => {
      let p = position as usize;
      data[p..p + buf.len()].copy_from_slice(buf);
      Ok(())
    },
    Some(DiscData::Ops { ops, .. }) => ops.write(buf, position).map_err(|e| {
      log::error!("disc write op failed: {e}");
      PARAM_ERR
    }),
    None => {
      log::error!("no disc write strategy!");
      Err(OFF_LIN_ERR)
    },
  }
}
