//! Register map and register objects for the MCP2515.
//!
//! The addresses and bit layouts here are fixed by the chip and must stay
//! bit-exact with the datasheet register map.

use modular_bitfield::prelude::*;

use crate::macros::impl_reg;

/// A one-byte chip register with a fixed address.
pub trait Reg {
    /// Address of the register in the chip's register map.
    const ADDRESS: Register;

    /// Builds the register object from the byte read off the wire.
    fn read(byte: u8) -> Self;

    /// Converts the register object into the byte written to the wire.
    fn write(self) -> u8;
}

/// Marker for registers that accept the BIT MODIFY instruction.
///
/// Issuing BIT MODIFY against any other register makes the chip force the
/// mask to `0xFF`, turning the operation into a whole-byte write.
pub trait BitModifiable: Reg {}

/// MCP2515 register addresses.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    RXF0SIDH = 0x00,
    RXF0SIDL = 0x01,
    RXF0EID8 = 0x02,
    RXF0EID0 = 0x03,
    RXF1SIDH = 0x04,
    RXF1SIDL = 0x05,
    RXF1EID8 = 0x06,
    RXF1EID0 = 0x07,
    RXF2SIDH = 0x08,
    RXF2SIDL = 0x09,
    RXF2EID8 = 0x0A,
    RXF2EID0 = 0x0B,
    BFPCTRL = 0x0C,
    TXRTSCTRL = 0x0D,
    CANSTAT = 0x0E,
    CANCTRL = 0x0F,
    RXF3SIDH = 0x10,
    RXF3SIDL = 0x11,
    RXF3EID8 = 0x12,
    RXF3EID0 = 0x13,
    RXF4SIDH = 0x14,
    RXF4SIDL = 0x15,
    RXF4EID8 = 0x16,
    RXF4EID0 = 0x17,
    RXF5SIDH = 0x18,
    RXF5SIDL = 0x19,
    RXF5EID8 = 0x1A,
    RXF5EID0 = 0x1B,
    TEC = 0x1C,
    REC = 0x1D,
    RXM0SIDH = 0x20,
    RXM0SIDL = 0x21,
    RXM0EID8 = 0x22,
    RXM0EID0 = 0x23,
    RXM1SIDH = 0x24,
    RXM1SIDL = 0x25,
    RXM1EID8 = 0x26,
    RXM1EID0 = 0x27,
    CNF3 = 0x28,
    CNF2 = 0x29,
    CNF1 = 0x2A,
    CANINTE = 0x2B,
    CANINTF = 0x2C,
    EFLG = 0x2D,
    TXB0CTRL = 0x30,
    TXB0SIDH = 0x31,
    TXB0SIDL = 0x32,
    TXB0EID8 = 0x33,
    TXB0EID0 = 0x34,
    TXB0DLC = 0x35,
    TXB0D0 = 0x36,
    TXB0D1 = 0x37,
    TXB0D2 = 0x38,
    TXB0D3 = 0x39,
    TXB0D4 = 0x3A,
    TXB0D5 = 0x3B,
    TXB0D6 = 0x3C,
    TXB0D7 = 0x3D,
    TXB1CTRL = 0x40,
    TXB1SIDH = 0x41,
    TXB1SIDL = 0x42,
    TXB1EID8 = 0x43,
    TXB1EID0 = 0x44,
    TXB1DLC = 0x45,
    TXB1D0 = 0x46,
    TXB1D1 = 0x47,
    TXB1D2 = 0x48,
    TXB1D3 = 0x49,
    TXB1D4 = 0x4A,
    TXB1D5 = 0x4B,
    TXB1D6 = 0x4C,
    TXB1D7 = 0x4D,
    TXB2CTRL = 0x50,
    TXB2SIDH = 0x51,
    TXB2SIDL = 0x52,
    TXB2EID8 = 0x53,
    TXB2EID0 = 0x54,
    TXB2DLC = 0x55,
    TXB2D0 = 0x56,
    TXB2D1 = 0x57,
    TXB2D2 = 0x58,
    TXB2D3 = 0x59,
    TXB2D4 = 0x5A,
    TXB2D5 = 0x5B,
    TXB2D6 = 0x5C,
    TXB2D7 = 0x5D,
    RXB0CTRL = 0x60,
    RXB0SIDH = 0x61,
    RXB0SIDL = 0x62,
    RXB0EID8 = 0x63,
    RXB0EID0 = 0x64,
    RXB0DLC = 0x65,
    RXB0D0 = 0x66,
    RXB0D1 = 0x67,
    RXB0D2 = 0x68,
    RXB0D3 = 0x69,
    RXB0D4 = 0x6A,
    RXB0D5 = 0x6B,
    RXB0D6 = 0x6C,
    RXB0D7 = 0x6D,
    RXB1CTRL = 0x70,
    RXB1SIDH = 0x71,
    RXB1SIDL = 0x72,
    RXB1EID8 = 0x73,
    RXB1EID0 = 0x74,
    RXB1DLC = 0x75,
    RXB1D0 = 0x76,
    RXB1D1 = 0x77,
    RXB1D2 = 0x78,
    RXB1D3 = 0x79,
    RXB1D4 = 0x7A,
    RXB1D5 = 0x7B,
    RXB1D6 = 0x7C,
    RXB1D7 = 0x7D,
}

/// Operation mode of the device (`CANCTRL.REQOP` / `CANSTAT.OPMOD`).
#[derive(BitfieldSpecifier, Debug, Clone, Copy, PartialEq, Eq)]
#[bits = 3]
pub enum OpMode {
    Normal = 0,
    Sleep = 1,
    Loopback = 2,
    ListenOnly = 3,
    Configuration = 4,
}

/// Receive buffer operating mode (`RXBnCTRL.RXM`).
#[derive(BitfieldSpecifier, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvBufOpMode {
    /// Receive only frames matching the acceptance masks/filters.
    FilterOn = 0,
    /// Legacy mode: only standard-identifier frames that match.
    StandardOnly = 1,
    /// Legacy mode: only extended-identifier frames that match.
    ExtendedOnly = 2,
    /// Receive any frame, masks/filters off.
    ReceiveAny = 3,
}

/// Acceptance filter that accepted a frame (`RXBnCTRL.FILHIT`).
///
/// `Rollover0`/`Rollover1` are reported by RXB1 for frames that were accepted
/// under RXB0's filters but rolled over into RXB1.
#[derive(BitfieldSpecifier, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterHit {
    Filter0 = 0,
    Filter1 = 1,
    Filter2 = 2,
    Filter3 = 3,
    Filter4 = 4,
    Filter5 = 5,
    Rollover0 = 6,
    Rollover1 = 7,
}

/// `CANCTRL` — CAN control register.
#[bitfield]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CanCtrl {
    pub clkpre: B2,
    pub clken: bool,
    pub osm: bool,
    pub abat: bool,
    pub reqop: OpMode,
}

impl CanCtrl {
    pub const MASK_REQOP: CanCtrl = CanCtrl::from_bytes([0xE0]);
    pub const MASK_ABAT: CanCtrl = CanCtrl::from_bytes([0x10]);
    pub const MASK_OSM: CanCtrl = CanCtrl::from_bytes([0x08]);
}

impl_reg!(CanCtrl: CANCTRL, bit_modifiable);

/// `CANSTAT` — CAN status register.
#[bitfield]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CanStat {
    #[skip]
    __: B1,
    pub icod: B3,
    #[skip]
    __: B1,
    pub opmod: OpMode,
}

impl_reg!(CanStat: CANSTAT);

/// `CNF1` — bit timing: baud rate prescaler and synchronization jump width.
#[bitfield]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cnf1 {
    pub brp: B6,
    pub sjw: B2,
}

impl_reg!(Cnf1: CNF1, bit_modifiable);

/// `CNF2` — bit timing: propagation and phase segment 1.
///
/// Segment length fields hold the time-quanta count minus one.
#[bitfield]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cnf2 {
    pub prseg: B3,
    pub phseg1: B3,
    pub sam: bool,
    pub btlmode: bool,
}

impl_reg!(Cnf2: CNF2, bit_modifiable);

/// `CNF3` — bit timing: phase segment 2, wake-up filter, SOF pin mode.
#[bitfield]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cnf3 {
    pub phseg2: B3,
    #[skip]
    __: B3,
    pub wakfil: bool,
    pub sof: bool,
}

impl_reg!(Cnf3: CNF3, bit_modifiable);

/// `CANINTE` — interrupt enable flags.
#[bitfield]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CanInte {
    pub rx0ie: bool,
    pub rx1ie: bool,
    pub tx0ie: bool,
    pub tx1ie: bool,
    pub tx2ie: bool,
    pub errie: bool,
    pub wakie: bool,
    pub merre: bool,
}

impl_reg!(CanInte: CANINTE, bit_modifiable);

/// `CANINTF` — pending interrupt flags.
#[bitfield]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CanIntf {
    pub rx0if: bool,
    pub rx1if: bool,
    pub tx0if: bool,
    pub tx1if: bool,
    pub tx2if: bool,
    pub errif: bool,
    pub wakif: bool,
    pub merrf: bool,
}

impl_reg!(CanIntf: CANINTF, bit_modifiable);

/// `EFLG` — error flags.
///
/// Only `rx0ovr`/`rx1ovr` are host-clearable. The warning, error-passive and
/// bus-off flags track the TEC/REC counters and ignore BIT MODIFY; driving
/// the chip through configuration mode is the only way to reset the counters.
#[bitfield]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Eflg {
    pub ewarn: bool,
    pub rxwar: bool,
    pub txwar: bool,
    pub rxep: bool,
    pub txep: bool,
    pub txbo: bool,
    pub rx0ovr: bool,
    pub rx1ovr: bool,
}

impl_reg!(Eflg: EFLG, bit_modifiable);

/// `TXBnCTRL` — transmit buffer control.
///
/// Shared by all three transmit buffers, so it carries no fixed address;
/// callers pair it with [`crate::buffer::TxBuf::ctrl`].
#[bitfield]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxbCtrl {
    pub txp: B2,
    #[skip]
    __: B1,
    pub txreq: bool,
    pub txerr: bool,
    pub mloa: bool,
    pub abtf: bool,
    #[skip]
    __: B1,
}

impl TxbCtrl {
    pub const MASK_TXREQ: TxbCtrl = TxbCtrl::from_bytes([0x08]);
}

/// `RXB0CTRL` — receive buffer 0 control.
#[bitfield]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rxb0Ctrl {
    pub filhit0: bool,
    pub bukt1: bool,
    pub bukt: bool,
    pub rxrtr: bool,
    #[skip]
    __: B1,
    pub rxm: RecvBufOpMode,
    #[skip]
    __: B1,
}

impl_reg!(Rxb0Ctrl: RXB0CTRL, bit_modifiable);

/// `RXB1CTRL` — receive buffer 1 control.
#[bitfield]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rxb1Ctrl {
    pub filhit: FilterHit,
    pub rxrtr: bool,
    #[skip]
    __: B1,
    pub rxm: RecvBufOpMode,
    #[skip]
    __: B1,
}

impl_reg!(Rxb1Ctrl: RXB1CTRL, bit_modifiable);
