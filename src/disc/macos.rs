// Classic Mac OS structure offsets and error codes the .Sony driver
// touches.  See Inside Macintosh: Devices ch. 1 ("Device Manager") and
// Technote DV 05 ("Drive Queue Elements").

// Low-memory globals
pub const DSK_ERR: u32 = 0x142; // last .Sony error code
pub const SONY_VARS: u32 = 0x134; // .Sony private storage pointer
pub const TAG_BUF: u32 = 0x2fc; // three longs of sector tag data
pub const DRV_Q_HDR: u32 = 0x308; // drive queue header

// Queue header
pub const Q_FLAGS: u32 = 0;
pub const Q_HEAD: u32 = 2;

// Queue element
pub const Q_LINK: u32 = 0;

// Device control entry
pub const D_CTL_Q_HDR: u32 = 6;
pub const D_CTL_POSITION: u32 = 16;

// Parameter block (IOParam / CntrlParam)
pub const IO_TRAP: u32 = 6;
pub const IO_V_REF_NUM: u32 = 22;
pub const CS_CODE: u32 = 26;
pub const CS_PARAM: u32 = 28;
pub const IO_BUFFER: u32 = 32;
pub const IO_REQ_COUNT: u32 = 36;
pub const IO_ACT_COUNT: u32 = 40;

// Low byte of ioTrap for a Read call
pub const A_RD_CMD: u16 = 2;

// Drive status record (DrvSts)
pub const DS_WRITE_PROT: u32 = 2;
pub const DS_DISK_IN_PLACE: u32 = 3;
pub const DS_INSTALLED: u32 = 4;
pub const DS_SIDES: u32 = 5;
pub const DS_Q_LINK: u32 = 6;
pub const DS_Q_TYPE: u32 = 10;
pub const DS_Q_DRIVE: u32 = 12;
pub const DS_TWO_SIDE_FMT: u32 = 18;
pub const DS_MFM_DRIVE: u32 = 22;
pub const DS_MFM_DISK: u32 = 23;

// dsQType drive kind
pub const SONY: u16 = 0;

// Result codes
pub const NO_ERR: i16 = 0;
pub const CONTROL_ERR: i16 = -17;
pub const STATUS_ERR: i16 = -18;
pub const W_PR_ERR: i16 = -44;
pub const PARAM_ERR: i16 = -50;
pub const NS_DRV_ERR: i16 = -56;
pub const OFF_LIN_ERR: i16 = -65;
